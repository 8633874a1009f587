use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::OwnerId;

/// One step of the production pipeline.
///
/// Declaration order is pipeline order; `Ord` is derived so the variants
/// compare in that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProductionStep {
    Design,
    Approval,
    Printing,
    Cutting,
    Assembly,
    QualityCheck,
    Packaging,
}

impl ProductionStep {
    /// All steps, in pipeline order.
    pub const PIPELINE: [ProductionStep; 7] = [
        ProductionStep::Design,
        ProductionStep::Approval,
        ProductionStep::Printing,
        ProductionStep::Cutting,
        ProductionStep::Assembly,
        ProductionStep::QualityCheck,
        ProductionStep::Packaging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStep::Design => "design",
            ProductionStep::Approval => "approval",
            ProductionStep::Printing => "printing",
            ProductionStep::Cutting => "cutting",
            ProductionStep::Assembly => "assembly",
            ProductionStep::QualityCheck => "quality-check",
            ProductionStep::Packaging => "packaging",
        }
    }

    pub fn first() -> Self {
        Self::PIPELINE[0]
    }

    pub fn last() -> Self {
        Self::PIPELINE[Self::PIPELINE.len() - 1]
    }

    /// Zero-based position in the pipeline.
    pub fn position(&self) -> usize {
        Self::PIPELINE
            .iter()
            .position(|step| step == self)
            .unwrap_or(0)
    }
}

impl core::fmt::Display for ProductionStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion state of one step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepState {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<OwnerId>,
    pub notes: Option<String>,
}

/// Workflow attached to exactly one order.
///
/// Any step may be toggled in any order (the floor works however it works);
/// `current_step` is recomputed after every mutation as the first incomplete
/// step, or the last step once everything is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionWorkflow {
    current_step: ProductionStep,
    steps: BTreeMap<ProductionStep, StepState>,
    started_at: Option<DateTime<Utc>>,
    estimated_completion_date: Option<NaiveDate>,
}

impl ProductionWorkflow {
    /// Fresh workflow: all steps incomplete, current step `design`.
    pub fn new() -> Self {
        let steps = ProductionStep::PIPELINE
            .iter()
            .map(|step| (*step, StepState::default()))
            .collect();
        Self {
            current_step: ProductionStep::first(),
            steps,
            started_at: None,
            estimated_completion_date: None,
        }
    }

    /// Fresh workflow stamped with its attachment time.
    pub fn attached(now: DateTime<Utc>, estimated_completion_date: Option<NaiveDate>) -> Self {
        let mut workflow = Self::new();
        workflow.started_at = Some(now);
        workflow.estimated_completion_date = estimated_completion_date;
        workflow
    }

    pub fn current_step(&self) -> ProductionStep {
        self.current_step
    }

    pub fn step(&self, step: ProductionStep) -> Option<&StepState> {
        self.steps.get(&step)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn estimated_completion_date(&self) -> Option<NaiveDate> {
        self.estimated_completion_date
    }

    pub fn completed_count(&self) -> usize {
        ProductionStep::PIPELINE
            .iter()
            .filter(|step| self.is_step_completed(**step))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == ProductionStep::PIPELINE.len()
    }

    fn is_step_completed(&self, step: ProductionStep) -> bool {
        self.steps.get(&step).is_some_and(|state| state.completed)
    }

    /// Toggle a step's completion.
    ///
    /// Completing stamps `completed_at`/`completed_by`; un-completing clears
    /// them. Notes are written only when provided, and survive un-completion.
    pub fn set_step_completion(
        &mut self,
        step: ProductionStep,
        completed: bool,
        completed_by: &OwnerId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        let state = self.steps.entry(step).or_default();
        state.completed = completed;
        if completed {
            state.completed_at = Some(now);
            state.completed_by = Some(completed_by.clone());
        } else {
            state.completed_at = None;
            state.completed_by = None;
        }
        if let Some(notes) = notes {
            state.notes = Some(notes);
        }
        self.current_step = Self::derive_current_step(&self.steps);
    }

    /// First step in pipeline order that is not completed, or the last step
    /// when every step is done. Missing entries count as incomplete.
    pub fn derive_current_step(steps: &BTreeMap<ProductionStep, StepState>) -> ProductionStep {
        ProductionStep::PIPELINE
            .iter()
            .copied()
            .find(|step| !steps.get(step).is_some_and(|state| state.completed))
            .unwrap_or_else(ProductionStep::last)
    }
}

impl Default for ProductionWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

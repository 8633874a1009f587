//! Production workflow state machine.
//!
//! Seven ordered steps, each independently toggleable; the current step is
//! always derived from completion state, never set directly.

pub mod pipeline;

pub use pipeline::{ProductionStep, ProductionWorkflow, StepState};

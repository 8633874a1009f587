//! Customer records and their running order statistics.

pub mod customer;

pub use customer::{Customer, NewCustomer};

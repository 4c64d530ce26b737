//! Pipeline entry points for monitor operations.
//!
//! - `compare`: decide whether a resource changed between two snapshots
//! - `run_poll`: run one poll cycle over every registered resource

pub mod compare;
pub mod poll;

pub use compare::{Verdict, compare};
pub use poll::{CycleReport, Monitor, ResourceOutcome, run_poll};

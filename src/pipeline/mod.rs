//! Pipeline layer
//! - runner.rs: `Checker` and the pull-based `UpdateRun` producing decisions
//! - output.rs: Writing decisions to stdout

pub mod output;
pub mod runner;

pub use output::{DecisionWriter, OutputFormat};
pub use runner::{Checker, Decision, RunError, RunOutcome, UpdateRun};

//! # refit-engine
//!
//! The replacement engine behind refit:
//! - Planning: scanning a file's lines for outdated image references and
//!   emitting exact, non-overlapping text edits
//! - Execution: applying a file's edits through an atomic temp-file swap
//! - File discovery with include/exclude globs
//!
//! Planning and execution are decoupled: a plan is a list of immutable
//! [`TextReplacement`] records handed off by ownership, so files can be
//! planned concurrently against the shared version cache and executed in
//! any order.

pub mod executor;
pub mod planner;
pub mod replacement;
pub mod walker;

pub use executor::{ExecutionReport, ReplacementExecutor};
pub use planner::ReplacementPlanner;
pub use replacement::TextReplacement;
pub use walker::FileWalker;

//! Shared data types for queries, passages, and solver outcomes

pub mod outcome;
pub mod query;

pub use outcome::{EvalRecord, SolveOutcome};
pub use query::{Passage, Query, MAX_PASSAGES};

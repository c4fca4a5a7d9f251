//! Status-change pipeline: record store → diff → client notifications
//!
//! - `diff`: the pure status diff engine (at-most-once notification rules)
//! - `pipeline`: the scheduled run around it (filtering, sending,
//!   snapshot persistence)

mod diff;
mod pipeline;

pub use diff::{diff_statuses, DiffOutcome, StatusChange, StatusRow};
pub use pipeline::run_status_sync;

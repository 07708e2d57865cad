//! Pipeline stages for a watch run.
//!
//! - `dedupe`: collapse repeated listing rows
//! - `calculate_diff`: status transitions since the last snapshot
//! - `StartupDelay`: production-only start jitter
//! - `run_pipeline`: the whole scrape, diff, notify, persist sequence

pub mod dedupe;
pub mod delay;
pub mod diff;
pub mod run;

pub use dedupe::dedupe;
pub use delay::StartupDelay;
pub use diff::{ChangeSet, StatusChange, calculate_diff};
pub use run::{PipelineContext, RunOutcome, run_pipeline, scrape};

pub mod engine;
mod fill_controller;
pub mod frontier;
pub mod monitor;
pub mod stats;
pub mod sync_merge;

pub use engine::{merge, MergeEngine, MergePhase};
pub use frontier::{Frontier, FrontierEntry};
pub use monitor::MergeMonitor;
pub use stats::{MergeSummary, SourceStats, SourceSummary};
pub use sync_merge::merge_sync;

mod collecting_sink;
mod failing_sink;
mod random_entries;
mod scripted_source;

pub use collecting_sink::CollectingSink;
pub use failing_sink::FailingSink;
pub use random_entries::random_sorted_entries;
pub use scripted_source::{FetchTracker, ScriptedSource};

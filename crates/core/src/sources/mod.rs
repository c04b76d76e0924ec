pub mod file_source;
pub mod log_source;
pub mod vec_source;

pub use file_source::FileSource;
pub use log_source::{LogSource, SyncLogSource};
pub use vec_source::VecSource;

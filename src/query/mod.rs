pub mod cache;
pub mod classify;
pub mod engine;

pub use cache::{CacheStatus, PartitionCache, PartitionRecords};
pub use classify::{classify, QueryKind, Strategy};
pub use engine::{QueryEngine, ScanFailure, SearchOutcome, DEFAULT_DISPLAY_LIMIT};

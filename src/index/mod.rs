pub mod build;
pub mod fingerprint;
pub mod reader;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use build::{build_all, BuildOptions, BuildSummary, BuiltPartition, PartitionBuilder};
pub use fingerprint::FingerprintParams;
pub use store::{DirectoryStore, PartitionSource};
pub use types::*;

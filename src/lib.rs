//! # munidx - Partitioned municipality index
//!
//! Builds one binary index file per region (UF) from the municipality
//! dataset, each record carrying a PBKDF2-HMAC-SHA256 fingerprint, and
//! answers lookups against those files through a load-once cache.
//!
//! ## Architecture
//!
//! - [`ingest`] - CSV dataset reading and grouping by partition
//! - [`index`] - Fingerprints, the `MUNHASH` file format, building and stats
//! - [`query`] - Query classification, partition cache and search engine
//! - [`output`] - Result tables
//! - [`shell`] - Interactive query loop
//! - [`utils`] - Settings, string/integer encoding, progress bars
//!
//! ## Quick Start
//!
//! ```ignore
//! use munidx::index::{build_all, BuildOptions, DirectoryStore};
//! use munidx::query::{PartitionCache, QueryEngine};
//! use std::sync::Arc;
//!
//! let records = munidx::ingest::load_csv("municipios.csv".as_ref()).unwrap();
//! build_all(records, &BuildOptions::new("mun_hash_por_uf")).unwrap();
//!
//! let cache = Arc::new(PartitionCache::new(DirectoryStore::new("mun_hash_por_uf")));
//! let engine = QueryEngine::new(cache);
//! let outcome = engine.search("campinas").unwrap();
//!
//! for record in &outcome.records {
//!     println!("{} {} {}", record.partition_code, record.ibge_code, record.display_name());
//! }
//! ```

pub mod error;
pub mod index;
pub mod ingest;
pub mod output;
pub mod query;
pub mod shell;
pub mod utils;

pub use error::{IndexError, Result};

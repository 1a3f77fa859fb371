use crate::error::{IndexError, Result};
use crate::index::store::PartitionSource;
use crate::index::types::MunicipalRecord;
use crate::query::cache::PartitionCache;
use crate::query::classify::{classify, QueryKind, Strategy};
use std::sync::Arc;

/// Default cap on displayed results for partition and name searches
pub const DEFAULT_DISPLAY_LIMIT: usize = 20;

/// A partition that could not be read during a search
#[derive(Debug)]
pub struct ScanFailure {
    pub partition: String,
    pub error: IndexError,
}

/// Result of one search
#[derive(Debug)]
pub struct SearchOutcome {
    pub query: String,
    pub strategy: Strategy,
    /// Matches, already ordered and truncated to the display limit
    pub records: Vec<MunicipalRecord>,
    /// Matches before truncation
    pub total: usize,
    /// Matches left out by the display limit
    pub omitted: usize,
    pub failures: Vec<ScanFailure>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }
}

/// Answers queries against cached partitions
pub struct QueryEngine<S> {
    cache: Arc<PartitionCache<S>>,
    display_limit: usize,
}

impl<S: PartitionSource> QueryEngine<S> {
    pub fn new(cache: Arc<PartitionCache<S>>) -> Self {
        Self {
            cache,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }

    pub fn cache(&self) -> &PartitionCache<S> {
        &self.cache
    }

    /// Classify and run a query.
    ///
    /// Unreadable partitions are reported in [`SearchOutcome::failures`];
    /// only failing to enumerate the partitions is an error.
    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        let kind = classify(query);
        tracing::debug!(query, strategy = ?kind.strategy(), "search");

        let (matches, failures, capped) = match &kind {
            QueryKind::Partition(code) => {
                let (matches, failures) = self.by_partition(code);
                (matches, failures, true)
            }
            QueryKind::Code(code) => {
                let (matches, failures) = self.by_code(code)?;
                (matches, failures, false)
            }
            QueryKind::Name(term) => {
                let (matches, failures) = self.by_name(term)?;
                (matches, failures, true)
            }
        };

        Ok(self.assemble(query, kind.strategy(), matches, failures, capped))
    }

    /// Every record of one partition, in stored order
    fn by_partition(&self, code: &str) -> (Vec<MunicipalRecord>, Vec<ScanFailure>) {
        match self.cache.get(code) {
            Ok(Some(records)) => (records.to_vec(), Vec::new()),
            Ok(None) => (Vec::new(), Vec::new()),
            Err(error) => {
                tracing::warn!(partition = %code, %error, "failed to load partition");
                (
                    Vec::new(),
                    vec![ScanFailure {
                        partition: code.to_string(),
                        error,
                    }],
                )
            }
        }
    }

    /// Records whose TOM or IBGE code equals `code`, from every partition
    fn by_code(&self, code: &str) -> Result<(Vec<MunicipalRecord>, Vec<ScanFailure>)> {
        self.scan(|record| {
            record.ibge_code.eq_ignore_ascii_case(code) || record.tom_code.eq_ignore_ascii_case(code)
        })
    }

    /// Records whose TOM or IBGE name contains `term`, sorted by (UF, TOM name)
    fn by_name(&self, term: &str) -> Result<(Vec<MunicipalRecord>, Vec<ScanFailure>)> {
        let needle = term.to_lowercase();
        let (mut matches, failures) = self.scan(|record| {
            record.name_tom.to_lowercase().contains(&needle)
                || record.name_ibge.to_lowercase().contains(&needle)
        })?;

        matches.sort_by_cached_key(|r| (r.partition_code.clone(), r.name_tom.to_lowercase()));
        Ok((matches, failures))
    }

    /// Filter every available partition, skipping the ones that fail to load
    fn scan<F>(&self, predicate: F) -> Result<(Vec<MunicipalRecord>, Vec<ScanFailure>)>
    where
        F: Fn(&MunicipalRecord) -> bool,
    {
        let mut matches = Vec::new();
        let mut failures = Vec::new();

        for code in self.cache.available()? {
            match self.cache.get(&code) {
                Ok(Some(records)) => {
                    matches.extend(records.iter().filter(|r| predicate(*r)).cloned());
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(partition = %code, %error, "skipping unreadable partition");
                    failures.push(ScanFailure {
                        partition: code,
                        error,
                    });
                }
            }
        }

        Ok((matches, failures))
    }

    fn assemble(
        &self,
        query: &str,
        strategy: Strategy,
        mut records: Vec<MunicipalRecord>,
        failures: Vec<ScanFailure>,
        capped: bool,
    ) -> SearchOutcome {
        let total = records.len();
        if capped {
            records.truncate(self.display_limit);
        }

        SearchOutcome {
            query: query.to_string(),
            strategy,
            omitted: total - records.len(),
            records,
            total,
            failures,
        }
    }
}

//! ZoomDB Series Database
//!
//! Registry of named channels. Channels are created on first access and
//! live as long as the database; there is no deletion.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::Aggregation;
use crate::query::{Query, QueryResult, RangeQueryResult};
use crate::series::{SampleSink, ZoomSeries};
use crate::timespan::TimeSpan;
use crate::types::Sample;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;
use zoomdb_common::{DatabaseConfig, Result};

// =============================================================================
// Series Database
// =============================================================================

/// In-memory database of named series.
///
/// Not synchronized; wrap it in a lock or funnel writes through a single
/// consumer to share it between threads.
#[derive(Debug, Default)]
pub struct SeriesDatabase {
    config: DatabaseConfig,
    /// Empty series built from `config.tree`, cloned for every new channel.
    blank: ZoomSeries,
    series: HashMap<String, ZoomSeries>,
}

impl SeriesDatabase {
    /// Create an empty database with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty database, checking the tree settings up front.
    pub fn with_config(config: DatabaseConfig) -> Result<Self> {
        let blank = ZoomSeries::with_config(&config.tree)?;
        Ok(Self {
            config,
            blank,
            series: HashMap::new(),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Channel Registry
    // -------------------------------------------------------------------------

    /// Return the series for `name`, registering an empty one if needed.
    pub fn get_or_create(&mut self, name: &str) -> &mut ZoomSeries {
        match self.series.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(channel = name, "Creating series");
                entry.insert(self.blank.clone())
            }
        }
    }

    /// Look up a series without creating it.
    pub fn get(&self, name: &str) -> Option<&ZoomSeries> {
        self.series.get(name)
    }

    /// Resolve a series on a read path, honouring `create_on_query`.
    fn lookup(&mut self, name: &str) -> Option<&ZoomSeries> {
        if self.config.create_on_query {
            Some(&*self.get_or_create(name))
        } else {
            self.series.get(name)
        }
    }

    /// Channel names in sorted order.
    pub fn signal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    // -------------------------------------------------------------------------
    // Data Ingestion
    // -------------------------------------------------------------------------

    /// Add one sample to a channel.
    pub fn add_sample(&mut self, name: &str, sample: Sample) -> Result<()> {
        self.get_or_create(name).add_sample(sample)
    }

    /// Add a time-ordered batch to a channel. All or nothing.
    pub fn add_samples(&mut self, name: &str, samples: &[Sample]) -> Result<()> {
        self.get_or_create(name).add_samples(samples)
    }

    // -------------------------------------------------------------------------
    // Querying
    // -------------------------------------------------------------------------

    /// Number of samples in a channel, 0 if unknown.
    pub fn query_len(&mut self, name: &str) -> usize {
        self.lookup(name).map_or(0, ZoomSeries::len)
    }

    /// Aggregate of a channel over a span, or over all time.
    pub fn query_summary(&mut self, name: &str, timespan: Option<&TimeSpan>) -> Result<Aggregation> {
        if let Some(span) = timespan {
            span.validate()?;
        }
        match self.lookup(name) {
            Some(series) => series.query_summary(timespan),
            None => Ok(Aggregation::empty()),
        }
    }

    /// Aggregate of a channel over a span.
    pub fn query_metrics(&mut self, name: &str, timespan: &TimeSpan) -> Result<Aggregation> {
        self.query_summary(name, Some(timespan))
    }

    /// Level-of-detail query on a channel.
    pub fn query(&mut self, name: &str, query: Query) -> Result<QueryResult> {
        query.timespan.validate()?;
        let start_time = Instant::now();

        let inner = match self.lookup(name) {
            Some(series) => series.query(&query)?,
            None => RangeQueryResult::empty(),
        };

        Ok(QueryResult {
            query,
            inner,
            query_time_us: start_time.elapsed().as_micros() as u64,
        })
    }

    /// Latest timestamp of a channel, `None` if unknown or empty.
    pub fn last_timestamp(&self, name: &str) -> Option<f64> {
        self.series.get(name)?.last_timestamp()
    }
}

impl std::fmt::Display for SeriesDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let samples: usize = self.series.values().map(ZoomSeries::len).sum();
        write!(f, "SeriesDatabase with {} series and {} samples", self.series.len(), samples)
    }
}

// =============================================================================
// Tests
// =============================================================================

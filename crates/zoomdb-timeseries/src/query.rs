//! ZoomDB Time Series Query
//!
//! Query descriptions and results for level-of-detail range queries.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::Aggregation;
use crate::timespan::TimeSpan;
use crate::types::Sample;
use serde::{Deserialize, Serialize};
use zoomdb_common::{Result, ZoomError};

// =============================================================================
// Query
// =============================================================================

/// A level-of-detail range query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub timespan: TimeSpan,
    /// Point budget; the result holds at least this many entries when the
    /// series has enough detail, and raw samples otherwise.
    pub min_count: usize,
}

impl Query {
    pub fn new(timespan: TimeSpan, min_count: usize) -> Self {
        Self {
            timespan,
            min_count,
        }
    }

    pub fn create() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    start: Option<f64>,
    end: Option<f64>,
    min_count: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    /// Query the trailing `duration` seconds up to `end`.
    pub fn last(self, end: f64, duration: f64) -> Self {
        self.start(end - duration).end(end)
    }

    pub fn min_count(mut self, min_count: usize) -> Self {
        self.min_count = Some(min_count);
        self
    }

    pub fn build(self) -> Result<Query> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(ZoomError::InvalidRange {
                start: self.start.unwrap_or(f64::NAN),
                end: self.end.unwrap_or(f64::NAN),
            });
        };
        let timespan = TimeSpan::new(start, end)?;
        Ok(Query::new(timespan, self.min_count.unwrap_or(DEFAULT_MIN_COUNT)))
    }
}

const DEFAULT_MIN_COUNT: usize = 10;

// =============================================================================
// Range Query Result
// =============================================================================

/// Summary of one tree node selected by a range query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Span this summary stands for. Summaries of one result tile time:
    /// each runs from its first sample up to the next summary's first
    /// sample, and the last one ends just past its last sample.
    pub timespan: TimeSpan,
    pub aggregation: Aggregation,
}

/// Data returned for a range: raw samples, or node summaries when the range
/// holds more detail than the point budget asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeQueryResult {
    Observations(Vec<Sample>),
    Aggregations(Vec<Summary>),
}

impl RangeQueryResult {
    pub fn empty() -> Self {
        Self::Observations(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Observations(samples) => samples.len(),
            Self::Aggregations(summaries) => summaries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Observations(_))
    }

    /// Time extent covered by the returned data.
    pub fn timespan(&self) -> Option<TimeSpan> {
        match self {
            Self::Observations(samples) => {
                let first = samples.first()?;
                let last = samples.last()?;
                Some(TimeSpan::closed(first.timestamp, last.timestamp))
            }
            Self::Aggregations(summaries) => {
                let first = summaries.first()?;
                let last = summaries.last()?;
                Some(TimeSpan {
                    start: first.timespan.start,
                    end: last.timespan.end,
                })
            }
        }
    }

    /// Timestamp of the newest sample represented in the result.
    pub fn last_timestamp(&self) -> Option<f64> {
        match self {
            Self::Observations(samples) => samples.last().map(|s| s.timestamp),
            Self::Aggregations(summaries) => summaries.last().map(|s| s.aggregation.last_timestamp),
        }
    }

    /// Merge everything returned into one aggregation.
    pub fn aggregation(&self) -> Aggregation {
        match self {
            Self::Observations(samples) => Aggregation::from_samples(samples),
            Self::Aggregations(summaries) => summaries
                .iter()
                .fold(Aggregation::empty(), |acc, s| acc.merge(&s.aggregation)),
        }
    }
}

// =============================================================================
// Query Result
// =============================================================================

/// Result of a query against a named channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: Query,
    pub inner: RangeQueryResult,
    pub query_time_us: u64,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! ZoomDB Series
//!
//! A named channel's storage. `ZoomSeries` keeps its samples in an
//! [`AggregationTree`] and forwards every call to it.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::Aggregation;
use crate::query::{Query, RangeQueryResult};
use crate::timespan::TimeSpan;
use crate::tree::{AggregationTree, Iter};
use crate::types::Sample;
use zoomdb_common::{Result, TreeConfig};

// =============================================================================
// Sample Sink
// =============================================================================

/// Capability shared by every kind of channel storage.
pub trait SampleSink {
    fn add_sample(&mut self, sample: Sample) -> Result<()>;

    /// Add a batch, one sample at a time.
    ///
    /// This default stops at the first rejected sample, keeping the ones
    /// before it. Storage that can check a batch up front should override it
    /// to reject the whole batch instead.
    fn add_samples(&mut self, samples: &[Sample]) -> Result<()> {
        for sample in samples {
            self.add_sample(*sample)?;
        }
        Ok(())
    }
}

// =============================================================================
// Zoom Series
// =============================================================================

/// Series backed by a zoomable aggregation tree.
#[derive(Debug, Clone, Default)]
pub struct ZoomSeries {
    tree: AggregationTree,
}

impl ZoomSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &TreeConfig) -> Result<Self> {
        Ok(Self {
            tree: AggregationTree::with_config(config)?,
        })
    }

    /// Level-of-detail query over a span.
    pub fn query(&self, query: &Query) -> Result<RangeQueryResult> {
        self.tree.query(&query.timespan, query.min_count)
    }

    /// Aggregate of a span, or of the whole series when `timespan` is `None`.
    pub fn query_summary(&self, timespan: Option<&TimeSpan>) -> Result<Aggregation> {
        match timespan {
            Some(span) => self.tree.query_metrics(span),
            None => Ok(self.tree.summary()),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.tree.last_timestamp()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.tree.iter()
    }

    pub fn tree(&self) -> &AggregationTree {
        &self.tree
    }
}

impl SampleSink for ZoomSeries {
    fn add_sample(&mut self, sample: Sample) -> Result<()> {
        self.tree.append(sample)
    }

    fn add_samples(&mut self, samples: &[Sample]) -> Result<()> {
        self.tree.extend(samples)
    }
}

impl<'a> IntoIterator for &'a ZoomSeries {
    type Item = &'a Sample;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

//! ZoomDB Time Series Aggregation
//!
//! Summary statistics over a set of samples. Aggregations merge as a
//! commutative monoid, which lets every tree node derive its summary from its
//! children alone.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::timespan::TimeSpan;
use crate::types::Sample;
use serde::{Deserialize, Serialize};

// =============================================================================
// Aggregation
// =============================================================================

/// Count, extrema, mean and time extent of a set of samples.
///
/// When `count == 0` the remaining fields carry no meaning; use
/// [`Aggregation::is_empty`] before reading them. Serialized empty
/// aggregations carry only the count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "AggregationRecord", try_from = "AggregationRecord")]
pub struct Aggregation {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
}

impl Aggregation {
    /// The identity element of [`Aggregation::merge`].
    pub fn empty() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            first_timestamp: f64::INFINITY,
            last_timestamp: f64::NEG_INFINITY,
        }
    }

    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            count: 1,
            min: sample.value,
            max: sample.value,
            mean: sample.value,
            first_timestamp: sample.timestamp,
            last_timestamp: sample.timestamp,
        }
    }

    /// Aggregate a time-ordered run of samples in one pass.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Self::empty();
        };

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for sample in samples {
            sum += sample.value;
            min = min.min(sample.value);
            max = max.max(sample.value);
        }

        Self {
            count: samples.len(),
            min,
            max,
            mean: bounded_mean(sum / samples.len() as f64, min, max),
            first_timestamp: first.timestamp,
            last_timestamp: last.timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Combine two aggregations into the aggregation of their union.
    pub fn merge(&self, other: &Aggregation) -> Aggregation {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }

        let count = self.count + other.count;
        let min = self.min.min(other.min);
        let max = self.max.max(other.max);
        let weighted = self.mean * self.count as f64 + other.mean * other.count as f64;

        Aggregation {
            count,
            min,
            max,
            mean: bounded_mean(weighted / count as f64, min, max),
            first_timestamp: self.first_timestamp.min(other.first_timestamp),
            last_timestamp: self.last_timestamp.max(other.last_timestamp),
        }
    }

    /// Merge `other` into this aggregation in place.
    pub fn merge_in(&mut self, other: &Aggregation) {
        *self = self.merge(other);
    }

    /// Add a single sample.
    pub fn include(&mut self, sample: &Sample) {
        self.merge_in(&Self::from_sample(sample));
    }

    /// The smallest span holding every summarized sample, `None` when empty.
    pub fn timespan(&self) -> Option<TimeSpan> {
        if self.is_empty() {
            return None;
        }
        Some(TimeSpan::closed(self.first_timestamp, self.last_timestamp))
    }

    /// Check if the extent `[first, last]` touches the closed range of `span`.
    ///
    /// Used for node selection, where boundary nodes are returned whole.
    pub(crate) fn touches(&self, span: &TimeSpan) -> bool {
        !self.is_empty() && self.first_timestamp <= span.end && self.last_timestamp >= span.start
    }

    /// Check if every sample summarized here lies in `span`.
    pub(crate) fn within(&self, span: &TimeSpan) -> bool {
        !self.is_empty() && span.start <= self.first_timestamp && self.last_timestamp < span.end
    }
}

/// Keep rounding error from pushing the mean outside `[min, max]`.
fn bounded_mean(mean: f64, min: f64, max: f64) -> f64 {
    mean.max(min).min(max)
}

// -----------------------------------------------------------------------------
// Serialized Form
// -----------------------------------------------------------------------------

/// Wire form of [`Aggregation`]. The statistics are absent for an empty one,
/// since its infinite sentinels have no JSON representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AggregationRecord {
    count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_timestamp: Option<f64>,
}

impl From<Aggregation> for AggregationRecord {
    fn from(aggregation: Aggregation) -> Self {
        let present = |value: f64| (!aggregation.is_empty()).then_some(value);
        Self {
            count: aggregation.count,
            min: present(aggregation.min),
            max: present(aggregation.max),
            mean: present(aggregation.mean),
            first_timestamp: present(aggregation.first_timestamp),
            last_timestamp: present(aggregation.last_timestamp),
        }
    }
}

impl TryFrom<AggregationRecord> for Aggregation {
    type Error = String;

    fn try_from(record: AggregationRecord) -> std::result::Result<Self, Self::Error> {
        if record.count == 0 {
            return Ok(Self::empty());
        }
        match (
            record.min,
            record.max,
            record.mean,
            record.first_timestamp,
            record.last_timestamp,
        ) {
            (Some(min), Some(max), Some(mean), Some(first_timestamp), Some(last_timestamp)) => {
                Ok(Self {
                    count: record.count,
                    min,
                    max,
                    mean,
                    first_timestamp,
                    last_timestamp,
                })
            }
            _ => Err(format!(
                "aggregation of {} samples is missing its statistics",
                record.count
            )),
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> FromIterator<&'a Sample> for Aggregation {
    fn from_iter<I: IntoIterator<Item = &'a Sample>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |mut agg, sample| {
            agg.include(sample);
            agg
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! ZoomDB Time Span
//!
//! Half-open time interval `[start, end)` used by every query.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use zoomdb_common::{Result, ZoomError};

// =============================================================================
// Time Span
// =============================================================================

/// A half-open interval of time in seconds.
///
/// The fields are public for cheap construction in hot paths; spans coming
/// from outside should go through [`TimeSpan::new`] or be checked with
/// [`TimeSpan::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    /// Create a span, rejecting `start > end` and NaN bounds.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let span = Self { start, end };
        span.validate()?;
        Ok(span)
    }

    /// The span of the trailing `duration` seconds up to `end`.
    pub fn last(end: f64, duration: f64) -> Result<Self> {
        Self::new(end - duration, end)
    }

    /// The smallest span holding every timestamp of the closed range
    /// `[first, last]`.
    pub fn closed(first: f64, last: f64) -> Self {
        Self {
            start: first,
            end: timestamp_after(last),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start.is_nan() || self.end.is_nan() || self.start > self.end {
            return Err(ZoomError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn middle(&self) -> f64 {
        self.start + self.duration() / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if a timestamp lies in `[start, end)`.
    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Check if both spans share at least one instant.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of both spans, if any.
    pub fn intersects(&self, other: &TimeSpan) -> Option<TimeSpan> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeSpan {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Check if `other` lies entirely inside this span.
    pub fn covers(&self, other: &TimeSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Grow the span so it contains `timestamp`.
    pub fn extend_to_include(&mut self, timestamp: f64) {
        if timestamp < self.start {
            self.start = timestamp;
        }
        if timestamp >= self.end {
            self.end = timestamp_after(timestamp);
        }
    }
}

/// The next representable timestamp above `t`.
pub(crate) fn timestamp_after(t: f64) -> f64 {
    if !t.is_finite() {
        return t;
    }
    if t == 0.0 {
        return f64::from_bits(1);
    }
    let bits = t.to_bits();
    if t > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// =============================================================================
// Tests
// =============================================================================

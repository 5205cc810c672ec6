//! ZoomDB Time Series Types
//!
//! Core data types for time series storage and querying.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use zoomdb_common::{Result, ZoomError};

// =============================================================================
// Sample
// =============================================================================

/// A single time series sample: a scalar value at a timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Reject samples that cannot be ordered or summarized.
    pub fn validate(&self) -> Result<()> {
        if !self.timestamp.is_finite() {
            return Err(ZoomError::InvalidSample(format!(
                "timestamp must be finite, got {}",
                self.timestamp
            )));
        }
        if !self.value.is_finite() {
            return Err(ZoomError::InvalidSample(format!(
                "value at {} must be finite, got {}",
                self.timestamp, self.value
            )));
        }
        Ok(())
    }
}

impl From<(f64, f64)> for Sample {
    fn from((timestamp, value): (f64, f64)) -> Self {
        Self { timestamp, value }
    }
}

/// Check that a batch is well formed and continues after `last`.
///
/// Timestamps may repeat but never decrease.
pub(crate) fn check_ordered(samples: &[Sample], last: Option<f64>) -> Result<()> {
    let mut previous = last;
    for sample in samples {
        sample.validate()?;
        if let Some(prev) = previous {
            if sample.timestamp < prev {
                return Err(ZoomError::OutOfOrderSample {
                    timestamp: sample.timestamp,
                    last: prev,
                });
            }
        }
        previous = Some(sample.timestamp);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

//! ZoomDB Sample Frames
//!
//! Messages carried from producers to the ingest worker. A frame is the
//! decoded form of a transport packet: evenly spaced values for one channel.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use zoomdb_common::{Result, ZoomError};
use zoomdb_timeseries::Sample;

// =============================================================================
// Sample Frame
// =============================================================================

/// Evenly spaced values for one channel starting at `start_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    pub name: String,
    pub start_time: f64,
    pub sample_interval: f64,
    pub values: Vec<f64>,
}

impl SampleFrame {
    pub fn new(
        name: impl Into<String>,
        start_time: f64,
        sample_interval: f64,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            start_time,
            sample_interval,
            values,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() {
            return Err(ZoomError::InvalidSample(format!(
                "frame start time must be finite, got {}",
                self.start_time
            )));
        }
        if !(self.sample_interval.is_finite() && self.sample_interval >= 0.0) {
            return Err(ZoomError::InvalidSample(format!(
                "frame sample interval must be a non-negative number, got {}",
                self.sample_interval
            )));
        }
        Ok(())
    }

    /// Timestamp of the last value, `None` for an empty frame.
    pub fn end_time(&self) -> Option<f64> {
        let last = self.values.len().checked_sub(1)?;
        Some(self.start_time + last as f64 * self.sample_interval)
    }

    /// Expand to samples at `start_time + i * sample_interval`.
    pub fn to_samples(&self) -> Result<Vec<Sample>> {
        self.validate()?;
        Ok(self
            .values
            .iter()
            .enumerate()
            .map(|(i, value)| Sample::new(self.start_time + i as f64 * self.sample_interval, *value))
            .collect())
    }
}

// =============================================================================
// Ingest Message
// =============================================================================

/// One unit of work for the ingest worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestMessage {
    Sample { name: String, sample: Sample },
    Samples { name: String, samples: Vec<Sample> },
    Frame(SampleFrame),
}

impl IngestMessage {
    /// Target channel name.
    pub fn channel(&self) -> &str {
        match self {
            Self::Sample { name, .. } | Self::Samples { name, .. } => name,
            Self::Frame(frame) => &frame.name,
        }
    }

    /// Split into the channel name and its time-ordered samples.
    pub fn into_batch(self) -> Result<(String, Vec<Sample>)> {
        match self {
            Self::Sample { name, sample } => Ok((name, vec![sample])),
            Self::Samples { name, samples } => Ok((name, samples)),
            Self::Frame(frame) => {
                let samples = frame.to_samples()?;
                Ok((frame.name, samples))
            }
        }
    }
}

impl From<SampleFrame> for IngestMessage {
    fn from(frame: SampleFrame) -> Self {
        Self::Frame(frame)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_expansion() {
        let frame = SampleFrame::new("Trace1", 2.0, 0.5, vec![1.0, 2.0, 3.0]);
        let samples = frame.to_samples().expect("valid frame");
        assert_eq!(
            samples,
            vec![Sample::new(2.0, 1.0), Sample::new(2.5, 2.0), Sample::new(3.0, 3.0)]
        );
        assert_eq!(frame.end_time(), Some(3.0));
    }

    #[test]
    fn test_empty_frame() {
        let frame = SampleFrame::new("empty", 0.0, 0.1, Vec::new());
        assert!(frame.to_samples().expect("valid frame").is_empty());
        assert_eq!(frame.end_time(), None);
    }

    #[test]
    fn test_invalid_frames() {
        assert!(SampleFrame::new("a", 0.0, -1.0, vec![1.0]).to_samples().is_err());
        assert!(SampleFrame::new("a", f64::NAN, 1.0, vec![1.0]).to_samples().is_err());
        assert!(SampleFrame::new("a", 0.0, f64::INFINITY, vec![1.0]).to_samples().is_err());
    }

    #[test]
    fn test_message_batch() {
        let message = IngestMessage::Sample {
            name: "a".to_string(),
            sample: Sample::new(1.0, 1.0),
        };
        assert_eq!(message.channel(), "a");
        let (name, samples) = message.into_batch().expect("valid message");
        assert_eq!(name, "a");
        assert_eq!(samples.len(), 1);

        let message: IngestMessage = SampleFrame::new("b", 0.0, 1.0, vec![0.0; 4]).into();
        assert_eq!(message.channel(), "b");
        assert_eq!(message.into_batch().expect("valid frame").1.len(), 4);
    }

    #[test]
    fn test_frame_json() {
        let frame = SampleFrame::new("Trace2", 0.0, 0.0001, vec![5.0, 5.5]);
        let json = serde_json::to_string(&frame).expect("serialize");
        let back: SampleFrame = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, frame);
    }
}

//! ZoomDB Tailing View
//!
//! Follows the newest data of a set of channels: every refresh queries the
//! trailing window ending at the latest timestamp seen on any of them.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::handle::SharedDatabase;
use zoomdb_common::{Result, ViewerConfig};
use zoomdb_timeseries::{Query, RangeQueryResult, SeriesDatabase, TimeSpan};

/// One refresh of a tailing view.
#[derive(Debug, Clone)]
pub struct TailFrame {
    pub window: TimeSpan,
    pub results: Vec<(String, RangeQueryResult)>,
}

impl TailFrame {
    pub fn result(&self, name: &str) -> Option<&RangeQueryResult> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

#[derive(Debug, Clone)]
pub struct TailingView {
    channels: Vec<String>,
    tail_duration: Option<f64>,
    point_budget: usize,
}

impl TailingView {
    /// A view over `channels` with tailing off.
    pub fn new(channels: Vec<String>, point_budget: usize) -> Self {
        Self {
            channels,
            tail_duration: None,
            point_budget,
        }
    }

    /// A view tailing the configured duration.
    pub fn from_config(channels: Vec<String>, config: &ViewerConfig) -> Result<Self> {
        let mut view = Self::new(channels, config.point_budget);
        view.enable_tailing(config.tail_duration)?;
        Ok(view)
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn point_budget(&self) -> usize {
        self.point_budget
    }

    pub fn set_point_budget(&mut self, point_budget: usize) {
        self.point_budget = point_budget;
    }

    /// Follow the last `duration` seconds of data.
    pub fn enable_tailing(&mut self, duration: f64) -> Result<()> {
        TimeSpan::new(0.0, duration)?;
        self.tail_duration = Some(duration);
        Ok(())
    }

    pub fn disable_tailing(&mut self) {
        self.tail_duration = None;
    }

    pub fn is_tailing(&self) -> bool {
        self.tail_duration.is_some()
    }

    pub fn tail_duration(&self) -> Option<f64> {
        self.tail_duration
    }

    /// The trailing window, if tailing is on and any channel has data.
    pub fn window(&self, db: &SeriesDatabase) -> Option<TimeSpan> {
        let duration = self.tail_duration?;
        let latest = self
            .channels
            .iter()
            .filter_map(|name| db.last_timestamp(name))
            .reduce(f64::max)?;
        TimeSpan::last(latest, duration).ok()
    }

    /// Query every channel over the current window.
    ///
    /// `None` when tailing is off or there is nothing to show yet.
    pub fn refresh(&self, db: &SharedDatabase) -> Result<Option<TailFrame>> {
        let mut guard = db.lock();
        let Some(window) = self.window(&guard) else {
            return Ok(None);
        };

        let query = Query::new(window, self.point_budget);
        let mut results = Vec::with_capacity(self.channels.len());
        for name in &self.channels {
            let result = guard.query(name, query)?;
            results.push((name.clone(), result.inner));
        }
        Ok(Some(TailFrame { window, results }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use zoomdb_timeseries::Sample;

    fn filled(name: &str, count: usize, step: f64) -> SharedDatabase {
        let db = SharedDatabase::default();
        let samples: Vec<Sample> = (0..count)
            .map(|i| Sample::new(i as f64 * step, (i as f64).sin()))
            .collect();
        db.add_samples(name, &samples).expect("add samples");
        db
    }

    #[test]
    fn test_tailing_toggle() {
        let mut view = TailingView::new(vec!["a".to_string()], 100);
        assert!(!view.is_tailing());

        view.enable_tailing(5.0).expect("valid duration");
        assert!(view.is_tailing());
        assert_eq!(view.tail_duration(), Some(5.0));

        assert!(view.enable_tailing(-1.0).is_err());
        assert_eq!(view.tail_duration(), Some(5.0));

        view.disable_tailing();
        assert!(!view.is_tailing());
    }

    #[test]
    fn test_refresh_off_or_empty() {
        let db = SharedDatabase::default();
        let mut view = TailingView::new(vec!["a".to_string()], 100);
        assert!(view.refresh(&db).expect("refresh").is_none());

        view.enable_tailing(1.0).expect("valid duration");
        assert!(view.refresh(&db).expect("refresh").is_none());
    }

    #[test]
    fn test_window_follows_latest_channel() {
        let db = filled("slow", 10, 1.0);
        db.add_samples("fast", &[Sample::new(3.0, 0.0), Sample::new(20.0, 1.0)])
            .expect("add samples");

        let mut view = TailingView::new(vec!["slow".to_string(), "fast".to_string()], 100);
        view.enable_tailing(5.0).expect("valid duration");

        let window = view.window(&db.lock()).expect("window");
        assert_eq!(window, TimeSpan::new(15.0, 20.0).expect("valid span"));
    }

    #[test]
    fn test_refresh_ends_at_latest() {
        let db = filled("a", 10_000, 0.01);
        let latest = db.last_timestamp("a").expect("has data");

        for budget in [10, 1000] {
            let view = TailingView::from_config(
                vec!["a".to_string()],
                &ViewerConfig {
                    point_budget: budget,
                    tail_duration: 5.0,
                    ..Default::default()
                },
            )
            .expect("valid config");

            let frame = view.refresh(&db).expect("refresh").expect("frame");
            assert_eq!(frame.window.end, latest);
            let result = frame.result("a").expect("channel queried");
            assert!(!result.is_empty());
            assert_eq!(result.last_timestamp(), Some(latest));
            assert!(result.timespan().expect("non-empty result").contains(latest));
        }
    }
}

//! ZoomDB Shared Database
//!
//! Thread-safe handle around a [`SeriesDatabase`] with change notification
//! for viewers that redraw when their channels receive data.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::broadcast;
use zoomdb_common::Result;
use zoomdb_timeseries::{Aggregation, Query, QueryResult, Sample, SeriesDatabase, TimeSpan};

const DEFAULT_CHANGE_BUFFER: usize = 64;

// =============================================================================
// Data Change Event
// =============================================================================

/// Channels that received samples since the previous event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChangeEvent {
    pub names: Vec<String>,
}

impl DataChangeEvent {
    pub fn touches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

// =============================================================================
// Shared Database
// =============================================================================

/// Cloneable handle to one database shared between threads and tasks.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<SeriesDatabase>>,
    changes: broadcast::Sender<DataChangeEvent>,
}

impl SharedDatabase {
    pub fn new(db: SeriesDatabase) -> Self {
        Self::with_change_buffer(db, DEFAULT_CHANGE_BUFFER)
    }

    pub fn with_change_buffer(db: SeriesDatabase, change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer.max(1));
        Self {
            inner: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Lock the database for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, SeriesDatabase> {
        self.inner.lock()
    }

    /// Receive an event each time channels change.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChangeEvent> {
        self.changes.subscribe()
    }

    pub(crate) fn notify(&self, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        // No subscribers is not an error.
        let _ = self.changes.send(DataChangeEvent { names });
    }

    // -------------------------------------------------------------------------
    // Database Operations
    // -------------------------------------------------------------------------

    pub fn add_sample(&self, name: &str, sample: Sample) -> Result<()> {
        self.lock().add_sample(name, sample)?;
        self.notify(vec![name.to_string()]);
        Ok(())
    }

    /// Add a batch and notify subscribers. An empty batch is a no-op.
    pub fn add_samples(&self, name: &str, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.lock().add_samples(name, samples)?;
        self.notify(vec![name.to_string()]);
        Ok(())
    }

    pub fn query_len(&self, name: &str) -> usize {
        self.lock().query_len(name)
    }

    pub fn query_summary(&self, name: &str, timespan: Option<&TimeSpan>) -> Result<Aggregation> {
        self.lock().query_summary(name, timespan)
    }

    pub fn query(&self, name: &str, query: Query) -> Result<QueryResult> {
        self.lock().query(name, query)
    }

    pub fn signal_names(&self) -> Vec<String> {
        self.lock().signal_names()
    }

    pub fn last_timestamp(&self, name: &str) -> Option<f64> {
        self.lock().last_timestamp(name)
    }
}

impl Default for SharedDatabase {
    fn default() -> Self {
        Self::new(SeriesDatabase::new())
    }
}

impl std::fmt::Debug for SharedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDatabase")
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_writes_are_visible_to_clones() {
        let db = SharedDatabase::default();
        let writer = db.clone();

        writer
            .add_samples("a", &[Sample::new(0.0, 1.0), Sample::new(1.0, 2.0)])
            .expect("add samples");
        writer.add_sample("a", Sample::new(2.0, 3.0)).expect("add sample");

        assert_eq!(db.query_len("a"), 3);
        assert_eq!(db.last_timestamp("a"), Some(2.0));
        assert_eq!(db.signal_names(), vec!["a"]);
        assert_eq!(db.query_summary("a", None).expect("summary").max, 3.0);
    }

    #[test]
    fn test_change_notification() {
        let db = SharedDatabase::default();
        let mut changes = db.subscribe();

        db.add_sample("x", Sample::new(0.0, 0.0)).expect("add sample");
        let event = changes.try_recv().expect("event published");
        assert!(event.touches("x"));
        assert!(!event.touches("y"));
    }

    #[test]
    fn test_rejected_write_does_not_notify() {
        let db = SharedDatabase::default();
        db.add_sample("x", Sample::new(5.0, 0.0)).expect("add sample");

        let mut changes = db.subscribe();
        assert!(db.add_sample("x", Sample::new(1.0, 0.0)).is_err());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_empty_batch_does_not_notify() {
        let db = SharedDatabase::default();
        let mut changes = db.subscribe();

        db.add_samples("x", &[]).expect("empty batch");
        assert!(changes.try_recv().is_err());
        assert!(db.signal_names().is_empty());
    }

    #[test]
    fn test_threads_share_database() {
        let db = SharedDatabase::default();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let name = format!("thread{}", t);
                    for i in 0..100 {
                        db.add_sample(&name, Sample::new(i as f64, t as f64)).expect("add sample");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread finished");
        }

        assert_eq!(db.signal_names().len(), 4);
        assert_eq!(db.query_len("thread3"), 100);
    }
}

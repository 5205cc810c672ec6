//! ZoomDB Ingest Worker
//!
//! Single consumer of the ingest queue. On every tick it drains whatever is
//! queued, applies it to the database under one lock, and publishes the set
//! of changed channels.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::handle::SharedDatabase;
use crate::queue::IngestReceiver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use zoomdb_common::IngestConfig;

// =============================================================================
// Statistics
// =============================================================================

/// Counters kept by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub ticks: u64,
    pub messages: u64,
    pub samples_applied: u64,
    pub batches_rejected: u64,
}

// =============================================================================
// Shutdown Handle
// =============================================================================

/// Asks a running worker to apply what is queued and stop.
#[derive(Debug)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }
}

// =============================================================================
// Ingest Worker
// =============================================================================

pub struct IngestWorker {
    db: SharedDatabase,
    receiver: IngestReceiver,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    stats: IngestStats,
    disconnected: bool,
}

impl IngestWorker {
    pub fn new(
        db: SharedDatabase,
        receiver: IngestReceiver,
        config: &IngestConfig,
    ) -> (Self, ShutdownHandle) {
        let (sender, shutdown) = watch::channel(false);
        let worker = Self {
            db,
            receiver,
            interval: config.drain_interval().max(Duration::from_millis(1)),
            shutdown,
            stats: IngestStats::default(),
            disconnected: false,
        };
        (worker, ShutdownHandle { sender })
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// True once every sender is dropped and the queue has been emptied.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Apply every queued message and return the channels that changed.
    ///
    /// A rejected batch is logged and skipped; the rest still apply.
    pub fn drain_pending(&mut self) -> Vec<String> {
        let mut changed = BTreeSet::new();
        {
            let mut db = self.db.lock();
            loop {
                let message = match self.receiver.try_recv() {
                    Ok(Some(message)) => message,
                    Ok(None) => break,
                    Err(_) => {
                        self.disconnected = true;
                        break;
                    }
                };
                self.stats.messages += 1;

                let applied = message
                    .into_batch()
                    .and_then(|(name, samples)| {
                        if !samples.is_empty() {
                            db.add_samples(&name, &samples)?;
                        }
                        Ok((name, samples.len()))
                    });
                match applied {
                    // Nothing arrived for this channel.
                    Ok((_, 0)) => {}
                    Ok((name, count)) => {
                        self.stats.samples_applied += count as u64;
                        changed.insert(name);
                    }
                    Err(err) => {
                        self.stats.batches_rejected += 1;
                        warn!(error = %err, "Rejected ingest batch");
                    }
                }
            }
        }

        let names: Vec<String> = changed.into_iter().collect();
        if !names.is_empty() {
            debug!(channels = names.len(), "Applied queued samples");
        }
        self.db.notify(names.clone());
        names
    }

    /// Drain on every tick until shutdown is requested or all senders are gone.
    pub async fn run(mut self) -> IngestStats {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown.clone();
        let mut shutdown_open = true;

        info!(interval_ms = self.interval.as_millis() as u64, "Ingest worker started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.stats.ticks += 1;
                    self.drain_pending();
                    if self.disconnected {
                        break;
                    }
                }
                changed = shutdown.changed(), if shutdown_open => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => {
                            self.drain_pending();
                            break;
                        }
                        Ok(()) => {}
                        Err(_) => shutdown_open = false,
                    }
                }
            }
        }
        info!(
            messages = self.stats.messages,
            samples = self.stats.samples_applied,
            rejected = self.stats.batches_rejected,
            "Ingest worker stopped"
        );
        self.stats
    }

    /// Run the worker on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<IngestStats> {
        tokio::spawn(self.run())
    }
}

impl std::fmt::Debug for IngestWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestWorker")
            .field("interval", &self.interval)
            .field("stats", &self.stats)
            .field("disconnected", &self.disconnected)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

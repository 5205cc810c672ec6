//! ZoomDB Streaming - Live Ingestion and Tailing
//!
//! Plumbing between sample producers and a shared series database. Producers
//! push into a queue from any thread or task; a single worker drains it on a
//! fixed interval and tells viewers which channels changed.
//!
//! Key Features:
//! - Bounded or unbounded multi-producer ingest queue
//! - Periodic drain worker applying batches under one lock
//! - Change notification listing the channels that received data
//! - Tailing view following the newest window of a set of channels
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod frame;
pub mod handle;
pub mod queue;
pub mod worker;
pub mod tail;

pub use frame::{IngestMessage, SampleFrame};
pub use handle::{DataChangeEvent, SharedDatabase};
pub use queue::{ingest_queue, IngestReceiver, IngestSender};
pub use worker::{IngestStats, IngestWorker, ShutdownHandle};
pub use tail::{TailFrame, TailingView};

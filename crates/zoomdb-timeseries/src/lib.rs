//! ZoomDB Time Series - Level-of-Detail Time Series Engine
//!
//! In-memory storage and query engine for plotting high-rate numeric
//! signals. Each channel keeps its samples in an append-only aggregation
//! tree, so a viewer can ask for either the exact points of a window or a
//! summary of it sized to its pixel budget, in logarithmic time.
//!
//! Key Features:
//! - Append-only zoom tree growing from the top, never split from the bottom
//! - Batched ingestion merging each ancestor once per batch
//! - Level-of-detail range queries returning raw samples or node summaries
//! - Range aggregation (count, min, max, mean, extent) without full scans
//! - Lazily created named channels
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod types;
pub mod timespan;
pub mod aggregation;
pub mod tree;
pub mod query;
pub mod series;
pub mod database;

pub use types::Sample;
pub use timespan::TimeSpan;
pub use aggregation::Aggregation;
pub use tree::AggregationTree;
pub use query::{Query, QueryBuilder, QueryResult, RangeQueryResult, Summary};
pub use series::{SampleSink, ZoomSeries};
pub use database::SeriesDatabase;

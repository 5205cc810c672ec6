//! ZoomDB Aggregation Tree
//!
//! Append-optimized hierarchical index over one series. Leaves hold raw
//! samples, internal nodes hold the aggregation of each child subtree. The
//! tree only grows at its tail: a full leaf gets a new sibling, and a full
//! root gets a new parent one level higher. All leaves stay at the same depth.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::Aggregation;
use crate::query::{RangeQueryResult, Summary};
use crate::timespan::{timestamp_after, TimeSpan};
use crate::types::{check_ordered, Sample};
use tracing::debug;
use zoomdb_common::{Result, TreeConfig, ZoomError, DEFAULT_FAN_OUT};

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone)]
enum Node {
    Leaf(Vec<Sample>),
    Internal(Vec<ChildEntry>),
}

/// A child subtree tagged with its aggregation.
#[derive(Debug, Clone)]
struct ChildEntry {
    aggregation: Aggregation,
    node: Node,
}

impl Node {
    /// A chain of empty nodes reaching down to a single empty leaf.
    fn empty(height: usize) -> Self {
        if height == 0 {
            Node::Leaf(Vec::new())
        } else {
            Node::Internal(vec![ChildEntry {
                aggregation: Aggregation::empty(),
                node: Node::empty(height - 1),
            }])
        }
    }

    fn children(&self) -> &[ChildEntry] {
        match self {
            Node::Leaf(_) => &[],
            Node::Internal(children) => children,
        }
    }

    fn height(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Internal(children) => 1 + children.first().map_or(0, |c| c.node.height()),
        }
    }

    /// Append as many of `samples` as fit below this node.
    ///
    /// Returns the number consumed and their aggregation. Each entry on the
    /// tail path is merged once per call, not once per sample.
    fn extend(&mut self, samples: &[Sample], fan_out: usize) -> (usize, Aggregation) {
        match self {
            Node::Leaf(items) => {
                let room = fan_out.saturating_sub(items.len()).min(samples.len());
                let chunk = &samples[..room];
                items.extend_from_slice(chunk);
                (room, Aggregation::from_samples(chunk))
            }
            Node::Internal(children) => {
                let mut consumed = 0;
                let mut total = Aggregation::empty();

                while let Some(last) = children.last_mut() {
                    let (taken, chunk) = last.node.extend(&samples[consumed..], fan_out);
                    last.aggregation.merge_in(&chunk);
                    total.merge_in(&chunk);
                    consumed += taken;

                    let child_height = last.node.height();
                    if consumed == samples.len() || children.len() >= fan_out {
                        break;
                    }
                    children.push(ChildEntry {
                        aggregation: Aggregation::empty(),
                        node: Node::empty(child_height),
                    });
                }

                (consumed, total)
            }
        }
    }
}

// =============================================================================
// Aggregation Tree
// =============================================================================

/// Zoomable index over a monotonically growing series.
#[derive(Debug, Clone)]
pub struct AggregationTree {
    root: Node,
    summary: Aggregation,
    height: usize,
    fan_out: usize,
}

impl AggregationTree {
    /// Create an empty tree with the default fan-out.
    pub fn new() -> Self {
        Self {
            root: Node::Leaf(Vec::new()),
            summary: Aggregation::empty(),
            height: 0,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    /// Create an empty tree with a custom fan-out of at least 2.
    pub fn with_fan_out(fan_out: usize) -> Result<Self> {
        if fan_out < 2 {
            return Err(ZoomError::Configuration(format!(
                "tree fan_out must be at least 2, got {}",
                fan_out
            )));
        }
        Ok(Self {
            fan_out,
            ..Self::new()
        })
    }

    pub fn with_config(config: &TreeConfig) -> Result<Self> {
        Self::with_fan_out(config.fan_out)
    }

    // -------------------------------------------------------------------------
    // Ingestion
    // -------------------------------------------------------------------------

    /// Append one sample at the tail.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        self.extend(std::slice::from_ref(&sample))
    }

    /// Append a time-ordered batch at the tail.
    ///
    /// The whole batch is checked before anything is inserted, so a rejected
    /// batch leaves the tree untouched.
    pub fn extend(&mut self, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        check_ordered(samples, self.last_timestamp())?;

        let mut rest = samples;
        loop {
            let (consumed, chunk) = self.root.extend(rest, self.fan_out);
            self.summary.merge_in(&chunk);
            rest = &rest[consumed..];
            if rest.is_empty() {
                break;
            }
            self.grow();
        }

        Ok(())
    }

    /// Put a new root above the full one.
    fn grow(&mut self) {
        let old_root = std::mem::replace(&mut self.root, Node::Leaf(Vec::new()));
        let mut children = Vec::with_capacity(self.fan_out);
        children.push(ChildEntry {
            aggregation: self.summary,
            node: old_root,
        });
        children.push(ChildEntry {
            aggregation: Aggregation::empty(),
            node: Node::empty(self.height),
        });
        self.root = Node::Internal(children);
        self.height += 1;

        debug!(
            height = self.height,
            samples = self.summary.count,
            "Aggregation tree grew a level"
        );
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Level-of-detail range query.
    ///
    /// Walks down one level at a time from the root, keeping the entries
    /// whose extent touches `span`. The first level holding at least
    /// `min_count` entries is returned as summaries whose spans tile time; if
    /// the leaves are reached first, the raw samples in `span` are returned
    /// together with one neighbour on each side. Boundary nodes are never
    /// split.
    pub fn query(&self, span: &TimeSpan, min_count: usize) -> Result<RangeQueryResult> {
        span.validate()?;

        let mut level: Vec<(&Aggregation, &Node)> = vec![(&self.summary, &self.root)];
        level.retain(|(aggregation, _)| aggregation.touches(span));

        loop {
            let Some((_, first)) = level.first() else {
                return Ok(RangeQueryResult::empty());
            };

            if level.len() >= min_count {
                let bounds = TimeSpan {
                    start: span.start.max(self.summary.first_timestamp),
                    end: span.end.min(timestamp_after(self.summary.last_timestamp)),
                };
                return Ok(RangeQueryResult::Aggregations(tile(&level, &bounds)));
            }

            if let Node::Leaf(_) = first {
                let samples: Vec<Sample> = level
                    .iter()
                    .flat_map(|&(_, node)| match node {
                        Node::Leaf(items) => items.as_slice(),
                        Node::Internal(_) => &[],
                    })
                    .copied()
                    .collect();
                return Ok(RangeQueryResult::Observations(trim_to_span(samples, span)));
            }

            level = level
                .iter()
                .flat_map(|&(_, node)| node.children())
                .filter(|child| child.aggregation.touches(span))
                .map(|child| (&child.aggregation, &child.node))
                .collect();
        }
    }

    /// Aggregate all samples in `span`.
    ///
    /// Entries fully inside the span are merged as-is; only entries on the
    /// span's edges are opened.
    pub fn query_metrics(&self, span: &TimeSpan) -> Result<Aggregation> {
        span.validate()?;
        Ok(metrics_in(&self.summary, &self.root, span))
    }

    /// Aggregation of the whole series.
    pub fn summary(&self) -> Aggregation {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.summary.count
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Number of internal levels above the leaves.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        (!self.summary.is_empty()).then_some(self.summary.last_timestamp)
    }

    /// Iterate all samples in time order.
    pub fn iter(&self) -> Iter<'_> {
        match &self.root {
            Node::Leaf(items) => Iter {
                stack: Vec::new(),
                leaf: items.iter(),
            },
            Node::Internal(children) => Iter {
                stack: vec![children.iter()],
                leaf: [].iter(),
            },
        }
    }
}

impl Default for AggregationTree {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a AggregationTree {
    type Item = &'a Sample;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn metrics_in(aggregation: &Aggregation, node: &Node, span: &TimeSpan) -> Aggregation {
    if !aggregation.touches(span) {
        return Aggregation::empty();
    }
    if aggregation.within(span) {
        return *aggregation;
    }

    match node {
        Node::Leaf(items) => items.iter().filter(|s| span.contains(s.timestamp)).collect(),
        Node::Internal(children) => children.iter().fold(Aggregation::empty(), |acc, child| {
            acc.merge(&metrics_in(&child.aggregation, &child.node, span))
        }),
    }
}

/// Summaries for one level. Each span reaches up to the next entry's first
/// sample, and the outer spans are widened to `bounds`, so the result tiles
/// every instant of `bounds` exactly once.
fn tile(level: &[(&Aggregation, &Node)], bounds: &TimeSpan) -> Vec<Summary> {
    level
        .iter()
        .enumerate()
        .filter_map(|(index, &(aggregation, _))| {
            let mut timespan = aggregation.timespan()?;
            if index == 0 {
                timespan.start = timespan.start.min(bounds.start);
            }
            match level.get(index + 1) {
                Some(&(next, _)) => timespan.end = next.first_timestamp,
                None => timespan.end = timespan.end.max(bounds.end),
            }
            Some(Summary {
                timespan,
                aggregation: *aggregation,
            })
        })
        .collect()
}

/// Keep the samples inside `span` plus the nearest one on either side.
fn trim_to_span(mut samples: Vec<Sample>, span: &TimeSpan) -> Vec<Sample> {
    let begin = samples
        .partition_point(|s| s.timestamp < span.start)
        .saturating_sub(1);
    let end = (samples.partition_point(|s| s.timestamp < span.end) + 1).min(samples.len());
    samples.truncate(end);
    samples.drain(..begin);
    samples
}

// =============================================================================
// Iterator
// =============================================================================

/// Lazy in-order iterator over the samples of an [`AggregationTree`].
pub struct Iter<'a> {
    stack: Vec<std::slice::Iter<'a, ChildEntry>>,
    leaf: std::slice::Iter<'a, Sample>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.leaf.next() {
                return Some(sample);
            }

            let entry = loop {
                let top = self.stack.last_mut()?;
                match top.next() {
                    Some(entry) => break entry,
                    None => {
                        self.stack.pop();
                    }
                }
            };

            match &entry.node {
                Node::Leaf(items) => self.leaf = items.iter(),
                Node::Internal(children) => self.stack.push(children.iter()),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(i as f64, i as f64)).collect()
    }

    fn span(start: f64, end: f64) -> TimeSpan {
        TimeSpan::new(start, end).expect("valid span")
    }

    /// Walk the tree checking that every entry summarizes its subtree.
    fn check_node(node: &Node, fan_out: usize) -> (Aggregation, usize) {
        match node {
            Node::Leaf(items) => {
                assert!(items.len() <= fan_out);
                (Aggregation::from_samples(items), 0)
            }
            Node::Internal(children) => {
                assert!(!children.is_empty() && children.len() <= fan_out);
                let mut total = Aggregation::empty();
                let mut heights = Vec::new();
                for pair in children.windows(2) {
                    assert!(pair[0].aggregation.last_timestamp <= pair[1].aggregation.first_timestamp);
                }
                for child in children {
                    let (actual, height) = check_node(&child.node, fan_out);
                    assert_eq!(actual.count, child.aggregation.count);
                    assert_eq!(actual.min, child.aggregation.min);
                    assert_eq!(actual.max, child.aggregation.max);
                    assert!((actual.mean - child.aggregation.mean).abs() < 1e-9);
                    total.merge_in(&actual);
                    heights.push(height);
                }
                assert!(heights.windows(2).all(|h| h[0] == h[1]), "leaves at mixed depth");
                (total, heights[0] + 1)
            }
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = AggregationTree::new();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.last_timestamp(), None);
        assert_eq!(tree.iter().count(), 0);
        assert!(tree.query(&span(0.0, 10.0), 10).expect("query").is_empty());
        assert!(tree.query_metrics(&span(0.0, 10.0)).expect("metrics").is_empty());
    }

    #[test]
    fn test_fan_out_validation() {
        assert!(AggregationTree::with_fan_out(1).is_err());
        assert_eq!(AggregationTree::with_fan_out(2).expect("valid").fan_out(), 2);
        assert_eq!(AggregationTree::new().fan_out(), DEFAULT_FAN_OUT);
    }

    #[test]
    fn test_append_grows_levels() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        for sample in ramp(4) {
            tree.append(sample).expect("append");
        }
        assert_eq!(tree.height(), 0);

        tree.append(Sample::new(4.0, 4.0)).expect("append");
        assert_eq!(tree.height(), 1);

        for sample in ramp(100).into_iter().skip(5) {
            tree.append(sample).expect("append");
        }
        assert_eq!(tree.len(), 100);
        // 4^3 = 64 < 100 <= 4^4
        assert_eq!(tree.height(), 3);

        let (total, height) = check_node(&tree.root, 4);
        assert_eq!(height, tree.height());
        assert_eq!(total.count, 100);
    }

    #[test]
    fn test_extend_matches_append() {
        let samples = ramp(1000);

        let mut appended = AggregationTree::with_fan_out(8).expect("valid fan out");
        for sample in &samples {
            appended.append(*sample).expect("append");
        }

        let mut extended = AggregationTree::with_fan_out(8).expect("valid fan out");
        for chunk in samples.chunks(77) {
            extended.extend(chunk).expect("extend");
        }

        assert_eq!(appended.len(), extended.len());
        assert_eq!(appended.height(), extended.height());
        let (a, b) = (appended.summary(), extended.summary());
        assert_eq!((a.count, a.min, a.max), (b.count, b.min, b.max));
        assert!((a.mean - b.mean).abs() < 1e-9);
        assert!(appended.iter().eq(extended.iter()));
        check_node(&extended.root, 8);
    }

    #[test]
    fn test_out_of_order_is_rejected_atomically() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        tree.extend(&ramp(10)).expect("extend");
        let before = tree.summary();

        let err = tree.append(Sample::new(3.0, 0.0)).expect_err("older sample");
        assert!(matches!(err, ZoomError::OutOfOrderSample { .. }));

        let batch = vec![Sample::new(10.0, 1.0), Sample::new(11.0, 1.0), Sample::new(10.5, 1.0)];
        assert!(tree.extend(&batch).is_err());

        assert_eq!(tree.summary(), before);
        assert_eq!(tree.len(), 10);

        tree.append(Sample::new(9.0, 0.0)).expect("equal timestamps are allowed");
        assert_eq!(tree.len(), 11);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut tree = AggregationTree::with_fan_out(3).expect("valid fan out");
        tree.extend(&ramp(50)).expect("extend");

        let first: Vec<Sample> = tree.iter().copied().collect();
        let second: Vec<Sample> = (&tree).into_iter().copied().collect();
        assert_eq!(first, ramp(50));
        assert_eq!(first, second);
    }

    #[test]
    fn test_query_small_series_returns_raw() {
        let mut tree = AggregationTree::new();
        tree.extend(&[Sample::new(0.0, 0.0), Sample::new(1.0, 10.0)]).expect("extend");

        let result = tree.query(&span(0.0, 1.0), 10).expect("query");
        assert_eq!(
            result,
            RangeQueryResult::Observations(vec![Sample::new(0.0, 0.0), Sample::new(1.0, 10.0)])
        );
    }

    #[test]
    fn test_query_raw_trims_to_span() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        tree.extend(&ramp(40)).expect("extend");

        let result = tree.query(&span(10.0, 13.0), 1000).expect("query");
        let RangeQueryResult::Observations(samples) = result else {
            panic!("expected raw samples");
        };
        let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![9.0, 10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_query_selects_shallowest_sufficient_level() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        tree.extend(&ramp(256)).expect("extend");
        assert_eq!(tree.height(), 3);

        // Levels below the root hold 4, 16, 64 entries; leaves hold 4 samples.
        let whole = span(0.0, 256.0);
        for (min_count, expected) in [(1, 1), (3, 4), (4, 4), (5, 16), (16, 16), (17, 64), (64, 64)] {
            let result = tree.query(&whole, min_count).expect("query");
            assert!(!result.is_raw(), "min_count {} should summarize", min_count);
            assert_eq!(result.len(), expected, "min_count {}", min_count);
            assert_eq!(result.aggregation().count, 256);
        }

        let result = tree.query(&whole, 65).expect("query");
        assert!(result.is_raw());
        assert_eq!(result.len(), 256);
    }

    /// Assert the summary spans tile `query_span ∩ [first, last]` and hold
    /// their own samples.
    fn assert_tiled(samples: &[Sample], query_span: &TimeSpan, summaries: &[Summary]) {
        for pair in summaries.windows(2) {
            assert_eq!(pair[0].timespan.end, pair[1].timespan.start, "gap or overlap");
        }
        for summary in summaries {
            assert!(summary.timespan.contains(summary.aggregation.first_timestamp));
            assert!(summary.timespan.contains(summary.aggregation.last_timestamp));
        }

        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return;
        };
        let start = query_span.start.max(first.timestamp);
        let end = query_span.end.min(last.timestamp);
        let steps = 997;
        for i in 0..=steps {
            let t = start + (end - start) * i as f64 / steps as f64;
            if !query_span.contains(t) || t > last.timestamp {
                continue;
            }
            let covering = summaries.iter().filter(|s| s.timespan.contains(t)).count();
            assert_eq!(covering, 1, "{} covered {} times", t, covering);
        }
        if query_span.contains(last.timestamp) {
            assert!(summaries.iter().any(|s| s.timespan.contains(last.timestamp)));
        }
    }

    #[test]
    fn test_query_summaries_tile_between_nodes() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        let samples = ramp(16);
        tree.extend(&samples).expect("extend");

        let query_span = span(0.0, 16.0);
        let RangeQueryResult::Aggregations(summaries) = tree.query(&query_span, 4).expect("query") else {
            panic!("expected summaries");
        };
        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0].timespan, span(0.0, 4.0));
        assert!(summaries[0].timespan.contains(3.0));
        assert!(summaries[0].timespan.contains(3.5));
        assert!(summaries[3].timespan.contains(15.0));
        assert_tiled(&samples, &query_span, &summaries);
    }

    #[test]
    fn test_query_summaries_cover_span_without_overlap() {
        let mut tree = AggregationTree::with_fan_out(5).expect("valid fan out");
        let samples: Vec<Sample> = (0..2000).map(|i| Sample::new(i as f64 * 0.01, (i % 17) as f64)).collect();
        tree.extend(&samples).expect("extend");

        for (start, end, min_count) in [(0.0, 20.0, 30), (3.3, 7.7, 10), (-5.0, 2.0, 4), (19.0, 40.0, 2), (0.0, 20.0, 1)] {
            let query_span = span(start, end);
            let result = tree.query(&query_span, min_count).expect("query");
            let RangeQueryResult::Aggregations(summaries) = &result else {
                continue;
            };
            assert_tiled(&samples, &query_span, summaries);
        }
    }

    #[test]
    fn test_single_sample_nodes_get_non_empty_spans() {
        let mut tree = AggregationTree::with_fan_out(2).expect("valid fan out");
        let samples = ramp(3);
        tree.extend(&samples).expect("extend");

        let query_span = span(0.0, 3.0);
        let RangeQueryResult::Aggregations(summaries) = tree.query(&query_span, 2).expect("query") else {
            panic!("expected summaries");
        };
        let last = summaries.last().expect("non-empty");
        assert_eq!(last.aggregation.count, 1);
        assert!(!last.timespan.is_empty());
        assert_tiled(&samples, &query_span, &summaries);
    }

    #[test]
    fn test_query_metrics_matches_scan() {
        let mut tree = AggregationTree::with_fan_out(4).expect("valid fan out");
        let samples: Vec<Sample> = (0..500).map(|i| Sample::new(i as f64, ((i * 31) % 97) as f64)).collect();
        tree.extend(&samples).expect("extend");

        for (start, end) in [(0.0, 500.0), (13.0, 14.0), (13.5, 402.2), (499.0, 1000.0), (600.0, 700.0)] {
            let query_span = span(start, end);
            let expected: Aggregation = samples.iter().filter(|s| query_span.contains(s.timestamp)).collect();
            let actual = tree.query_metrics(&query_span).expect("metrics");
            assert_eq!(actual.count, expected.count);
            assert_eq!(actual.min, expected.min);
            assert_eq!(actual.max, expected.max);
            assert!((actual.mean - expected.mean).abs() < 1e-9);
        }
    }

    #[test]
    fn test_malformed_span_is_rejected() {
        let tree = AggregationTree::new();
        let reversed = TimeSpan { start: 3.0, end: 1.0 };
        assert!(matches!(tree.query(&reversed, 10), Err(ZoomError::InvalidRange { .. })));
        assert!(matches!(tree.query_metrics(&reversed), Err(ZoomError::InvalidRange { .. })));
    }
}

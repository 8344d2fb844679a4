//! Rolling Window Store
//!
//! Bounded per-node time series for live display. Each node keeps at most
//! `capacity` points, oldest evicted first. Windows are created lazily the
//! first time a node reports.
//!
//! The store is a display cache: it is reset on restart and may be lossy.
//! The reading log is the authoritative history.

use crate::types::{Reading, WindowPoint};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle shared between the ingestion loop (writer) and a renderer (reader).
pub type SharedWindowStore = Arc<RwLock<WindowStore>>;

/// Per-node FIFO windows of display points.
#[derive(Debug, Clone)]
pub struct WindowStore {
    capacity: usize,
    windows: BTreeMap<String, VecDeque<WindowPoint>>,
}

impl WindowStore {
    /// Create an empty store keeping `capacity` points per node (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: BTreeMap::new(),
        }
    }

    /// Wrap into the shared handle used by the ingestion loop.
    pub fn shared(capacity: usize) -> SharedWindowStore {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Append the reading's point to its node's window, evicting from the front.
    pub fn record(&mut self, reading: &Reading) {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(reading.node_id().to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        window.push_back(reading.window_point());
        while window.len() > capacity {
            window.pop_front();
        }
    }

    /// Point-in-time copy of one node's window, oldest first.
    ///
    /// Unknown nodes yield an empty sequence.
    pub fn snapshot(&self, node_id: &str) -> Vec<WindowPoint> {
        self.windows
            .get(node_id)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Copies of every window, keyed by node id.
    pub fn snapshot_all(&self) -> BTreeMap<String, Vec<WindowPoint>> {
        self.windows
            .iter()
            .map(|(node, w)| (node.clone(), w.iter().copied().collect()))
            .collect()
    }

    /// Nodes seen so far, sorted.
    pub fn nodes(&self) -> Vec<String> {
        self.windows.keys().cloned().collect()
    }

    pub fn len(&self, node_id: &str) -> usize {
        self.windows.get(node_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn reading(node: &str, i: i64) -> Reading {
        let at = Utc::now() + Duration::seconds(i);
        Reading::new(node, i as f64, 50.0, at).unwrap()
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut store = WindowStore::new(5);

        for i in 0..12 {
            store.record(&reading("Node1", i));
            assert!(store.len("Node1") <= 5);
        }

        let temps: Vec<f64> = store.snapshot("Node1").iter().map(|p| p.temperature).collect();
        assert_eq!(temps, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_nodes_created_lazily() {
        let mut store = WindowStore::new(3);
        assert!(store.is_empty());
        assert!(store.snapshot("Node9").is_empty());

        store.record(&reading("Node9", 1));
        store.record(&reading("Node2", 2));

        assert_eq!(store.nodes(), vec!["Node2".to_string(), "Node9".to_string()]);
        assert_eq!(store.len("Node9"), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = WindowStore::new(2);
        store.record(&reading("Node1", 1));

        let before = store.snapshot("Node1");
        store.record(&reading("Node1", 2));
        store.record(&reading("Node1", 3));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].temperature, 1.0);
        assert_eq!(store.snapshot_all()["Node1"].len(), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut store = WindowStore::new(0);
        store.record(&reading("Node1", 1));
        store.record(&reading("Node1", 2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.snapshot("Node1")[0].temperature, 2.0);
    }
}

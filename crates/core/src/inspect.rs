use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::node::Node;
use crate::overlay::Overlay;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayInspect {
    pub nodes: Vec<NodeInspect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInspect {
    pub id: String,
    pub available: bool,
    pub join_state: String,
    #[serde(default)]
    pub sponsor: Option<String>,
    pub endpoint: String,
    pub pool: Vec<String>,
    pub previous: Vec<String>,
    pub next: Vec<String>,
}

/// Sizes of the connection tables of an overlay, and its routing counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayStats {
    pub nodes: usize,
    pub live: usize,
    pub total_pool_edges: usize,
    pub total_previous: usize,
    pub total_next: usize,
    /// size -> number of nodes with a pool of that size
    pub pool_histogram: BTreeMap<usize, usize>,
    pub previous_histogram: BTreeMap<usize, usize>,
    pub next_histogram: BTreeMap<usize, usize>,
    pub max_pool: usize,
    pub max_previous: usize,
    pub max_next: usize,
    pub counters: BTreeMap<String, u64>,
    #[serde(default)]
    pub average_hops: Option<f64>,
}

impl OverlayInspect {
    pub fn inspect(overlay: &Overlay) -> crate::error::Result<Self> {
        let nodes = overlay
            .nodes()
            .map(|n| NodeInspect::inspect(n))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self { nodes })
    }
}

impl NodeInspect {
    pub fn inspect(node: &Node) -> crate::error::Result<Self> {
        let snapshot = node.snapshot()?;
        let stringify = |ids: Vec<crate::identity::Identity>| -> Vec<String> {
            ids.into_iter().map(|id| id.to_string()).collect()
        };
        Ok(Self {
            id: node.id().to_string(),
            available: node.is_available(),
            join_state: node.join_state()?.to_string(),
            sponsor: node.sponsor().map(|s| s.to_string()),
            endpoint: node.endpoint().to_string(),
            pool: stringify(snapshot.pool),
            previous: stringify(snapshot.previous),
            next: stringify(snapshot.next),
        })
    }
}

impl OverlayStats {
    pub fn collect(overlay: &Overlay) -> crate::error::Result<Self> {
        let mut stats = Self {
            nodes: overlay.len(),
            live: 0,
            total_pool_edges: 0,
            total_previous: 0,
            total_next: 0,
            pool_histogram: BTreeMap::new(),
            previous_histogram: BTreeMap::new(),
            next_histogram: BTreeMap::new(),
            max_pool: 0,
            max_previous: 0,
            max_next: 0,
            counters: overlay.measure().snapshot(),
            average_hops: overlay.measure().average_hops(),
        };

        for node in overlay.nodes() {
            if node.is_available() {
                stats.live += 1;
            }
            let (pool, previous, next) = {
                let table = node.lock_table()?;
                (table.pool().len(), table.previous().len(), table.next().len())
            };
            stats.total_pool_edges += pool;
            stats.total_previous += previous;
            stats.total_next += next;
            *stats.pool_histogram.entry(pool).or_insert(0) += 1;
            *stats.previous_histogram.entry(previous).or_insert(0) += 1;
            *stats.next_histogram.entry(next).or_insert(0) += 1;
            stats.max_pool = stats.max_pool.max(pool);
            stats.max_previous = stats.max_previous.max(previous);
            stats.max_next = stats.max_next.max(next);
        }
        Ok(stats)
    }

    /// Mean pool size per node.
    pub fn average_pool(&self) -> f64 {
        if self.nodes == 0 {
            return 0.0;
        }
        self.total_pool_edges as f64 / self.nodes as f64
    }
}

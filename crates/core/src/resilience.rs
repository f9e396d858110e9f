//! Failure injection and partition detection.
//!
//! The harness only flips node availability and reads connection tables,
//! it never touches any other node state.
use std::collections::BTreeMap;
use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::node::Node;
use crate::overlay::Overlay;

/// Union-find over `0..n` with path compression and union by size.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of the set holding `x`.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if they were one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        true
    }
}

/// Component label of every available node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    pub labels: HashMap<Identity, usize>,
}

impl Partitions {
    /// Number of distinct labels. More than one means the overlay split.
    pub fn component_count(&self) -> usize {
        let mut labels: Vec<usize> = self.labels.values().copied().collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Whether both identities are available and mutually reachable.
    pub fn same_component(&self, a: &Identity, b: &Identity) -> bool {
        match (self.labels.get(a), self.labels.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn label(&self, id: &Identity) -> Option<usize> {
        self.labels.get(id).copied()
    }

    /// Members per component, each sorted, largest component first.
    pub fn components(&self) -> Vec<Vec<Identity>> {
        let mut by_label: BTreeMap<usize, Vec<Identity>> = BTreeMap::new();
        for (id, label) in self.labels.iter() {
            by_label.entry(*label).or_default().push(*id);
        }
        let mut components: Vec<Vec<Identity>> = by_label
            .into_values()
            .map(|mut ids| {
                ids.sort();
                ids
            })
            .collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        components
    }
}

/// Failure injection over one overlay.
pub struct ResilienceHarness<'a> {
    overlay: &'a Overlay,
}

impl<'a> ResilienceHarness<'a> {
    pub fn new(overlay: &'a Overlay) -> Self {
        Self { overlay }
    }

    /// Mark every node matching `predicate` unavailable. Returns how many
    /// nodes went down, nodes already unavailable are not counted again.
    pub fn mark_unavailable<F>(&self, predicate: F) -> usize
    where F: Fn(&Node) -> bool {
        let mut count = 0;
        for node in self.overlay.nodes() {
            if node.is_available() && predicate(node.as_ref()) {
                node.set_available(false);
                count += 1;
            }
        }
        tracing::info!("Marked {} nodes unavailable", count);
        count
    }

    /// Mark `round(fraction * n)` uniformly chosen nodes unavailable.
    pub fn mark_random_unavailable<R: Rng + ?Sized>(
        &self,
        fraction: f64,
        rng: &mut R,
    ) -> Result<usize> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidFraction(fraction));
        }
        let ids = self.overlay.identities();
        let amount = (fraction * ids.len() as f64).round() as usize;
        let chosen: Vec<Identity> = ids.choose_multiple(rng, amount).copied().collect();
        let count = self.mark_unavailable(|n| chosen.contains(&n.id()));
        Ok(count)
    }

    /// Mark every node of one locality unavailable.
    pub fn mark_locality_unavailable(&self, locality: u32) -> usize {
        self.mark_unavailable(|n| n.id().locality == locality)
    }

    /// Make every node available again.
    pub fn reset(&self) {
        for node in self.overlay.nodes() {
            node.set_available(true);
        }
    }

    /// Label the connected components of the subgraph of available nodes,
    /// linked through pool, previous and next edges to available targets.
    pub fn detect_partitions(&self) -> Result<Partitions> {
        let nodes: Vec<_> = self.overlay.nodes().collect();
        let mut set = DisjointSet::new(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if !node.is_available() {
                continue;
            }
            let table = node.lock_table()?;
            for edge in table.edges() {
                if !edge.is_available() {
                    continue;
                }
                if let Some(other) = self.overlay.index_of(&edge.target) {
                    set.union(idx, other);
                }
            }
        }

        let mut labels = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            if node.is_available() {
                labels.insert(node.id(), set.find(idx));
            }
        }
        let partitions = Partitions { labels };
        tracing::info!(
            "Detected {} components over {} available nodes",
            partitions.component_count(),
            partitions.labels.len()
        );
        Ok(partitions)
    }
}

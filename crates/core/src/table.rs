//! ConnectionTable of a node: a bounded general pool plus the previous and
//! next ring-neighbour lists, nearest first.
use serde::Deserialize;
use serde::Serialize;

use crate::edge::Edge;
use crate::identity::Identity;
use crate::identity::IdentitySpace;
use crate::keys::SharedSecret;

/// Which collections a lookup scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Pool,
    Previous,
    Next,
    All,
    /// All collections, skipping edges whose identity equals the target.
    AllExceptExact,
}

/// One side of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Previous,
    Next,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Previous => Side::Next,
            Side::Next => Side::Previous,
        }
    }
}

/// Identities held per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub pool: Vec<Identity>,
    pub previous: Vec<Identity>,
    pub next: Vec<Identity>,
}

impl TableSnapshot {
    /// Distinct identities over the three collections.
    pub fn neighbours(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = vec![];
        for id in self.pool.iter().chain(&self.previous).chain(&self.next) {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionTable {
    /// self id
    id: Identity,
    space: IdentitySpace,
    /// bound of the pool
    max_edges: usize,
    pool: Vec<Edge>,
    previous: Vec<Edge>,
    next: Vec<Edge>,
}

impl ConnectionTable {
    pub fn new(id: Identity, space: IdentitySpace, max_edges: usize) -> Self {
        Self {
            id,
            space,
            max_edges,
            pool: vec![],
            previous: vec![],
            next: vec![],
        }
    }

    fn scoped(&self, scope: Scope) -> impl Iterator<Item = &Edge> {
        let none: &[Edge] = &[];
        let (pool, previous, next) = match scope {
            Scope::Pool => (self.pool.as_slice(), none, none),
            Scope::Previous => (none, self.previous.as_slice(), none),
            Scope::Next => (none, none, self.next.as_slice()),
            Scope::All | Scope::AllExceptExact => (
                self.pool.as_slice(),
                self.previous.as_slice(),
                self.next.as_slice(),
            ),
        };
        pool.iter().chain(previous).chain(next)
    }

    /// The available edge nearest to `target` within `scope`.
    /// First found wins on ties.
    pub fn find_closest(
        &self,
        target: &Identity,
        scope: Scope,
        exclude: &[Identity],
    ) -> Option<Edge> {
        let mut best: Option<(&Edge, u128)> = None;
        for e in self.scoped(scope) {
            if !e.is_available() || exclude.contains(&e.target) {
                continue;
            }
            if scope == Scope::AllExceptExact && e.target == *target {
                continue;
            }
            let d = self.space.distance(target, &e.target).unsigned_abs();
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((e, d)),
            }
        }
        best.map(|(e, _)| e.clone())
    }

    /// Replace every entry with the same identity, in all three collections.
    /// Returns whether anything was replaced.
    pub fn upsert(&mut self, edge: &Edge) -> bool {
        let mut replaced = false;
        for list in [&mut self.pool, &mut self.previous, &mut self.next] {
            for e in list.iter_mut().filter(|e| e.target == edge.target) {
                *e = edge.clone();
                replaced = true;
            }
        }
        replaced
    }

    /// Secret already agreed with `id`, if any entry holds one.
    pub fn secret_of(&self, id: &Identity) -> Option<SharedSecret> {
        self.edges()
            .filter(|e| e.target == *id)
            .find_map(|e| e.shared_secret)
    }

    fn keep_secret(&self, edge: &mut Edge) {
        if edge.shared_secret.is_none() {
            edge.shared_secret = self.secret_of(&edge.target);
        }
    }

    /// Append to the pool, then evict the least recently used beyond the bound.
    pub fn insert_pool(&mut self, mut edge: Edge) {
        if edge.target == self.id {
            return;
        }
        self.keep_secret(&mut edge);
        self.pool.push(edge);
        while self.pool.len() > self.max_edges {
            let oldest = self
                .pool
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    let evicted = self.pool.remove(i);
                    tracing::debug!("[ConnectionTable] {} evicts {}", self.id, evicted.target);
                }
                None => break,
            }
        }
    }

    /// Replace wherever the identity is known, and make sure the pool
    /// holds it.
    pub fn upsert_or_insert(&mut self, edge: Edge) {
        self.upsert(&edge);
        if !self.pool.iter().any(|e| e.target == edge.target) {
            self.insert_pool(edge);
        }
    }

    /// Prepend to one side. An entry with the same identity is replaced,
    /// never duplicated.
    pub fn insert_neighbor(&mut self, side: Side, mut edge: Edge) {
        if edge.target == self.id {
            return;
        }
        self.keep_secret(&mut edge);
        let list = match side {
            Side::Previous => &mut self.previous,
            Side::Next => &mut self.next,
        };
        list.retain(|e| e.target != edge.target);
        list.insert(0, edge);
    }

    pub fn remove(&mut self, id: &Identity) {
        for list in [&mut self.pool, &mut self.previous, &mut self.next] {
            list.retain(|e| e.target != *id);
        }
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.edges().any(|e| e.target == *id)
    }

    pub fn is_neighbor(&self, id: &Identity) -> bool {
        self.previous
            .iter()
            .chain(&self.next)
            .any(|e| e.target == *id)
    }

    pub fn first(&self, side: Side) -> Option<&Edge> {
        match side {
            Side::Previous => self.previous.first(),
            Side::Next => self.next.first(),
        }
    }

    /// Iterate pool, previous and next, in that order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.scoped(Scope::All)
    }

    pub fn pool(&self) -> &[Edge] {
        &self.pool
    }

    pub fn previous(&self) -> &[Edge] {
        &self.previous
    }

    pub fn next(&self) -> &[Edge] {
        &self.next
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let ids = |list: &[Edge]| list.iter().map(|e| e.target).collect();
        TableSnapshot {
            pool: ids(&self.pool),
            previous: ids(&self.previous),
            next: ids(&self.next),
        }
    }
}

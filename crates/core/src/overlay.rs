#![warn(missing_docs)]
//! The overlay context: owns every node of one simulated overlay and the
//! infrastructure they share (identity space, counters, quiescence
//! tracking, callback). Nodes never reach each other through it; they only
//! hold edges.
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::RwLock;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tokio::task::JoinHandle;

use crate::callback::SharedOverlayCallback;
use crate::config::OverlayConfig;
use crate::edge::Edge;
use crate::edge::InFlight;
use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::identity::IdentitySpace;
use crate::inspect::OverlayInspect;
use crate::inspect::OverlayStats;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::measure::OverlayMeasure;
use crate::message::ChordConnection;
use crate::message::Message;
use crate::node::Node;
use crate::resilience::ResilienceHarness;
use crate::table::Side;

/// Infrastructure shared by the nodes of one overlay.
pub struct OverlayContext {
    pub(crate) space: IdentitySpace,
    pub(crate) config: OverlayConfig,
    pub(crate) measure: OverlayMeasure,
    pub(crate) inflight: Arc<InFlight>,
    callback: RwLock<Option<SharedOverlayCallback>>,
}

impl OverlayContext {
    /// Create a context from a validated config.
    pub fn new(config: OverlayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            space: config.space()?,
            config,
            measure: OverlayMeasure::new(),
            inflight: Arc::new(InFlight::new()),
            callback: RwLock::new(None),
        })
    }

    pub(crate) fn callback(&self) -> Result<Option<SharedOverlayCallback>> {
        Ok(self
            .callback
            .read()
            .map_err(|_| Error::CallbackSyncLock)?
            .clone())
    }

    fn set_callback(&self, callback: SharedOverlayCallback) -> Result<()> {
        let mut inner = self
            .callback
            .write()
            .map_err(|_| Error::CallbackSyncLock)?;
        *inner = Some(callback);
        Ok(())
    }
}

struct NodeHandle {
    node: Arc<Node>,
    task: JoinHandle<()>,
}

/// A simulated overlay.
pub struct Overlay {
    ctx: Arc<OverlayContext>,
    nodes: Vec<NodeHandle>,
    index: HashMap<Identity, usize>,
    rng: StdRng,
}

impl Overlay {
    /// Create an empty overlay. Must be called inside a tokio runtime
    /// before nodes are added.
    pub fn new(config: OverlayConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            ctx: Arc::new(OverlayContext::new(config)?),
            nodes: vec![],
            index: HashMap::new(),
            rng,
        })
    }

    /// Config of the overlay.
    pub fn config(&self) -> &OverlayConfig {
        &self.ctx.config
    }

    /// Identity space of the overlay.
    pub fn space(&self) -> IdentitySpace {
        self.ctx.space
    }

    /// Counters shared by every node.
    pub fn measure(&self) -> &OverlayMeasure {
        &self.ctx.measure
    }

    /// Set callback for the overlay.
    pub fn set_callback(&self, callback: SharedOverlayCallback) -> Result<()> {
        self.ctx.set_callback(callback)
    }

    /// Number of nodes, available or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by index of creation.
    pub fn node(&self, idx: usize) -> Result<&Arc<Node>> {
        self.nodes
            .get(idx)
            .map(|h| &h.node)
            .ok_or(Error::NodeIndexNotFound(idx))
    }

    /// Node by identity.
    pub fn node_by_id(&self, id: &Identity) -> Result<&Arc<Node>> {
        let idx = self.index.get(id).ok_or(Error::NodeNotFound(*id))?;
        self.node(*idx)
    }

    /// Index of creation of a node.
    pub fn index_of(&self, id: &Identity) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Every node, in order of creation.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.iter().map(|h| &h.node)
    }

    /// Identities of every node, in order of creation.
    pub fn identities(&self) -> Vec<Identity> {
        self.nodes().map(|n| n.id()).collect()
    }

    /// Harness for failure injection and partition detection.
    pub fn resilience(&self) -> ResilienceHarness<'_> {
        ResilienceHarness::new(self)
    }

    fn endpoint(&self, idx: usize) -> SocketAddr {
        let port = self.ctx.config.base_port.wrapping_add(idx as u16);
        SocketAddr::from((Ipv4Addr::LOCALHOST, port))
    }

    fn spawn(&mut self, id: Identity, sponsor: Option<&Edge>) -> Arc<Node> {
        let endpoint = self.endpoint(self.nodes.len());
        let (node, inbox) = Node::new(id, sponsor, endpoint, self.ctx.clone());
        let task = tokio::spawn(node.clone().listen(inbox));
        // a colliding identity keeps pointing at the first holder
        self.index.entry(id).or_insert(self.nodes.len());
        self.nodes.push(NodeHandle {
            node: node.clone(),
            task,
        });
        node
    }

    /// Create the single node every other node joins through.
    pub fn bootstrap(&mut self) -> Result<Identity> {
        let id = self.ctx.space.generate(&mut self.rng);
        self.bootstrap_with_identity(id)
    }

    /// Like [Overlay::bootstrap] with a given identity.
    pub fn bootstrap_with_identity(&mut self, id: Identity) -> Result<Identity> {
        if !self.nodes.is_empty() {
            return Err(Error::AlreadyBootstrapped);
        }
        self.check_identity(&id)?;
        tracing::info!("Bootstrap node {}", id);
        Ok(self.spawn(id, None).id())
    }

    fn check_identity(&self, id: &Identity) -> Result<()> {
        if !self.ctx.space.contains(id) {
            return Err(Error::InvalidConfig(format!(
                "{} lies outside {} localities",
                id,
                self.ctx.space.localities()
            )));
        }
        Ok(())
    }

    /// Create a node with a fresh identity and start its join through the
    /// node at `sponsor`. Returns before the join completes, see
    /// [Overlay::settle].
    pub fn join(&mut self, sponsor: usize) -> Result<Identity> {
        let id = self.ctx.space.generate(&mut self.rng);
        self.join_with_identity(sponsor, id)
    }

    /// Like [Overlay::join] with a given identity. Collisions are not
    /// prevented here, the sponsor rejects them.
    pub fn join_with_identity(&mut self, sponsor: usize, id: Identity) -> Result<Identity> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyOverlay);
        }
        self.check_identity(&id)?;
        let sponsor = self.node(sponsor)?.edge();
        tracing::debug!("Node {} joins through {}", id, sponsor.target);
        let node = self.spawn(id, Some(&sponsor));
        node.join(&sponsor)?;
        Ok(id)
    }

    /// Grow the overlay to `n` nodes, one join at a time, each sponsored by
    /// a uniformly random existing node.
    pub async fn populate(&mut self, n: usize) -> Result<()> {
        if self.nodes.is_empty() && n > 0 {
            self.bootstrap()?;
        }
        while self.nodes.len() < n {
            let sponsor = self.rng.gen_range(0..self.nodes.len());
            self.join(sponsor)?;
            self.settle().await?;
        }
        Ok(())
    }

    /// Wait until no message is in flight.
    pub async fn settle(&self) -> Result<()> {
        let timeout = self.ctx.config.settle_timeout();
        tokio::time::timeout(timeout, self.ctx.inflight.quiesce())
            .await
            .map_err(|_| Error::SettleTimeout(self.ctx.config.settle_timeout_ms))
    }

    /// Send an application payload from one node to another.
    pub fn send<T: Into<Bytes>>(&self, from: usize, to: usize, data: T) -> Result<()> {
        let from = self.node(from)?;
        let to = self.node(to)?.edge();
        self.ctx.measure.incr(MeasureCounter::Sent);
        from.send_message(Message::payload(data), to)
    }

    /// Let every available node look for its global and local shortcuts,
    /// then wait for the searches and handshakes to finish.
    pub async fn build_chords(&self, count: usize) -> Result<()> {
        let space = self.ctx.space;
        for node in self.nodes().filter(|n| n.is_available()) {
            let id = node.id();
            let mut targets = space.global_chords(&id, count);
            targets.extend(space.local_chords(&id, count));
            for target in targets {
                node.send_message(
                    Message::ChordConnection(ChordConnection { target }),
                    node.edge(),
                )?;
            }
        }
        self.settle().await
    }

    /// Ask the node at `introducer` to introduce the nodes at `a` and `b`.
    pub fn introduce(&self, introducer: usize, a: usize, b: usize) -> Result<()> {
        let a = self.node(a)?.edge();
        let b = self.node(b)?.edge();
        self.node(introducer)?.introduce(&a, &b)
    }

    /// Follow the first `side` neighbour from the node at `start` until the
    /// walk returns to it, repeats a node or leaves the overlay.
    pub fn ring_walk(&self, start: usize, side: Side) -> Result<Vec<Identity>> {
        let start = self.node(start)?.id();
        let mut walk = vec![start];
        let mut current = start;
        for _ in 0..self.nodes.len() {
            let node = self.node_by_id(&current)?;
            let next = match node.lock_table()?.first(side) {
                Some(e) => e.target,
                None => break,
            };
            if next == start || walk.contains(&next) || !self.index.contains_key(&next) {
                break;
            }
            walk.push(next);
            current = next;
        }
        Ok(walk)
    }

    /// Whether following the first `side` neighbour from every node visits
    /// every node exactly once before returning to it.
    pub fn is_ring_well_formed(&self, side: Side) -> Result<bool> {
        let n = self.nodes.len();
        for idx in 0..n {
            let walk = self.ring_walk(idx, side)?;
            if walk.len() != n {
                return Ok(false);
            }
            if n > 1 {
                let last = self.node_by_id(&walk[n - 1])?;
                let closes = last.lock_table()?.first(side).map(|e| e.target);
                if closes != Some(walk[0]) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Inspect every node.
    pub fn inspect(&self) -> Result<OverlayInspect> {
        OverlayInspect::inspect(self)
    }

    /// Connection table statistics and routing counters.
    pub fn stats(&self) -> Result<OverlayStats> {
        OverlayStats::collect(self)
    }

    /// Stop every node task.
    pub fn shutdown(&mut self) {
        for h in self.nodes.iter() {
            h.task.abort();
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.shutdown()
    }
}

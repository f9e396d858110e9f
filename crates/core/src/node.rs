#![warn(missing_docs)]
//! A node of the overlay: one actor owning one connection table.
//!
//! Every node runs [Node::listen] on its own task and handles its inbox one
//! envelope at a time, so handling a message is atomic with respect to the
//! node's own state. Nodes never read each other's tables: the only way to
//! affect another node is to post an envelope through an [Edge].
use std::collections::HashMap;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::callback::FailureKind;
use crate::callback::RouteFailure;
use crate::edge::Capability;
use crate::edge::Edge;
use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::identity::IdentitySpace;
use crate::keys::SecretKey;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::message::ConfirmConnection;
use crate::message::Envelope;
use crate::message::IntroducedTo;
use crate::message::Message;
use crate::message::MessageHandlerEvent;
use crate::overlay::OverlayContext;
use crate::router::RouteDecision;
use crate::router::Router;
use crate::table::ConnectionTable;
use crate::table::Side;
use crate::table::TableSnapshot;

/// Progress of a node through the join protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinState {
    /// Asked the sponsor for a connection.
    Requesting,
    /// The sponsor approved the connection.
    Confirmed,
    /// Both ring neighbours are installed.
    Inserted,
}

impl std::fmt::Display for JoinState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            JoinState::Requesting => "requesting",
            JoinState::Confirmed => "confirmed",
            JoinState::Inserted => "inserted",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub(crate) struct NodeState {
    pub(crate) join: JoinState,
    /// Joining nodes this node already ran ring insertion for.
    pub(crate) sponsored: HashSet<Identity>,
    /// Observed endpoints of peers.
    pub(crate) endpoints: HashMap<Identity, SocketAddr>,
}

/// A node of the overlay.
pub struct Node {
    id: Identity,
    sponsor: Option<Identity>,
    endpoint: SocketAddr,
    pub(crate) secret_key: SecretKey,
    capability: Capability,
    router: Router,
    table: Mutex<ConnectionTable>,
    state: Mutex<NodeState>,
    pub(crate) ctx: Arc<OverlayContext>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("sponsor", &self.sponsor)
            .field("available", &self.is_available())
            .finish()
    }
}

impl Node {
    /// Create a node and its inbox. When a sponsor is given its edge seeds
    /// the pool and the node starts in [JoinState::Requesting], otherwise it
    /// is a bootstrap node and starts [JoinState::Inserted].
    pub fn new(
        id: Identity,
        sponsor: Option<&Edge>,
        endpoint: SocketAddr,
        ctx: Arc<OverlayContext>,
    ) -> (Arc<Self>, UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let capability = Capability::new(
            id,
            tx,
            Arc::new(AtomicBool::new(true)),
            ctx.inflight.clone(),
        );
        let mut table = ConnectionTable::new(id, ctx.space, ctx.config.max_edges);
        if let Some(s) = sponsor {
            table.insert_pool(Edge::from_edge(s));
        }
        let join = if sponsor.is_some() {
            JoinState::Requesting
        } else {
            JoinState::Inserted
        };
        let node = Self {
            id,
            sponsor: sponsor.map(|s| s.target),
            endpoint,
            secret_key: SecretKey::random(&mut rand::thread_rng()),
            capability,
            router: Router::new(ctx.config.max_hops),
            table: Mutex::new(table),
            state: Mutex::new(NodeState {
                join,
                sponsored: HashSet::new(),
                endpoints: HashMap::new(),
            }),
            ctx,
        };
        (Arc::new(node), rx)
    }

    /// Identity of self.
    pub fn id(&self) -> Identity {
        self.id
    }

    /// The node this one joined through.
    pub fn sponsor(&self) -> Option<Identity> {
        self.sponsor
    }

    /// Synthetic public endpoint of self.
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Space the identity of self lives in.
    pub fn space(&self) -> IdentitySpace {
        self.ctx.space
    }

    /// A fresh edge addressing self.
    pub fn edge(&self) -> Edge {
        Edge::new(self.id, self.capability.clone())
            .with_sponsor(self.sponsor)
            .with_endpoint(Some(self.endpoint))
    }

    /// Whether other nodes may route through self.
    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.capability.set_available(available)
    }

    /// Lock the connection table.
    pub fn lock_table(&self) -> Result<MutexGuard<ConnectionTable>> {
        self.table.lock().map_err(|_| Error::TableSyncLock)
    }

    pub(crate) fn lock_state(&self) -> Result<MutexGuard<NodeState>> {
        self.state.lock().map_err(|_| Error::NodeStateSyncLock)
    }

    /// Current join state.
    pub fn join_state(&self) -> Result<JoinState> {
        Ok(self.lock_state()?.join)
    }

    /// Identities per collection of the connection table.
    pub fn snapshot(&self) -> Result<TableSnapshot> {
        Ok(self.lock_table()?.snapshot())
    }

    /// Endpoint of `peer` as told by the peer itself.
    pub fn endpoint_of(&self, peer: &Identity) -> Result<Option<SocketAddr>> {
        Ok(self.lock_state()?.endpoints.get(peer).copied())
    }

    /// Count, log and build the error for a node claiming an identity that
    /// is already taken.
    pub(crate) fn collision(&self, id: Identity) -> Error {
        self.ctx.measure.incr(MeasureCounter::Collision);
        tracing::error!("Node {} rejects identity collision on {}", self.id, id);
        Error::IdentityCollision(id)
    }

    /// Whether `edge` addresses self rather than another node.
    pub(crate) fn is_self(&self, edge: &Edge) -> bool {
        edge.capability.same_inbox(&self.capability)
    }

    /// Reject `edge` when it claims the identity of self or of a known node
    /// while addressing another inbox.
    pub(crate) fn check_collision(&self, table: &ConnectionTable, edge: &Edge) -> Result<()> {
        let clash = (edge.target == self.id && !self.is_self(edge))
            || table
                .edges()
                .any(|e| e.target == edge.target && !e.capability.same_inbox(&edge.capability));
        if clash {
            return Err(self.collision(edge.target));
        }
        Ok(())
    }

    /// Move to [JoinState::Inserted] once both ring sides are known.
    /// Returns whether the move happened now.
    pub(crate) fn update_join_state(&self, table: &ConnectionTable) -> Result<bool> {
        let mut state = self.lock_state()?;
        if state.join != JoinState::Inserted
            && table.first(Side::Previous).is_some()
            && table.first(Side::Next).is_some()
        {
            state.join = JoinState::Inserted;
            return Ok(true);
        }
        Ok(false)
    }

    /// Route `message` from self toward `to`.
    pub fn send_message(&self, message: Message, to: Edge) -> Result<()> {
        self.send_message_as(self.edge(), message, to)
    }

    /// Route `message` toward `to`, on behalf of the sender edge `from`.
    /// Routing starts at self.
    pub fn send_message_as(&self, from: Edge, message: Message, to: Edge) -> Result<()> {
        self.capability.post(Envelope::new(from, to, message))
    }

    /// Edge of self for a handshake with `peer`, carrying the secret self
    /// still holds for it.
    pub(crate) fn handshake_edge(&self, peer: &Identity) -> Result<Edge> {
        let mut edge = self.edge();
        edge.shared_secret = self.lock_table()?.secret_of(peer);
        Ok(edge)
    }

    /// Event asking `peer` to accept a connection from self.
    pub(crate) fn confirm_connection(&self, peer: &Edge) -> Result<MessageHandlerEvent> {
        Ok(MessageHandlerEvent::SendMessageAs(
            self.handshake_edge(&peer.target)?,
            Message::ConfirmConnection(ConfirmConnection),
            Edge::from_edge(peer),
        ))
    }

    /// Ask the sponsor to accept self. First step of joining.
    pub fn join(&self, sponsor: &Edge) -> Result<()> {
        tracing::debug!("[join] {} asks sponsor {}", self.id, sponsor.target);
        self.send_message_as(
            self.handshake_edge(&sponsor.target)?,
            Message::ConfirmConnection(ConfirmConnection),
            Edge::from_edge(sponsor),
        )
    }

    /// Introduce two peers to each other. Self must hold an edge to both.
    pub fn introduce(&self, a: &Edge, b: &Edge) -> Result<()> {
        {
            let table = self.lock_table()?;
            if let Some(stranger) = [a, b].into_iter().find(|p| !table.contains(&p.target)) {
                return Err(Error::IntroduceStranger(self.id, stranger.target));
            }
        }
        let introducer = self.edge().public_info();
        for (to, peer) in [(a, b), (b, a)] {
            self.send_message(
                Message::IntroducedTo(IntroducedTo {
                    peer: Edge::from_edge(peer),
                    introducer: introducer.clone(),
                }),
                Edge::from_edge(to),
            )?;
        }
        Ok(())
    }

    /// Handle the inbox until every sender is dropped.
    pub async fn listen(self: Arc<Self>, mut inbox: UnboundedReceiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            self.listen_once(envelope).await;
            self.ctx.inflight.done();
        }
    }

    /// Route or handle one envelope.
    pub async fn listen_once(&self, envelope: Envelope) {
        let kind = envelope.message.kind();
        if let Err(e) = self.process(envelope).await {
            tracing::error!("Node {} failed on handling {}: {}", self.id, kind, e);
        }
    }

    async fn process(&self, mut envelope: Envelope) -> Result<()> {
        if !self.is_available() {
            return self.report_failure(&envelope, FailureKind::Dropped).await;
        }
        envelope.from.hop_count += 1;
        let decision = {
            let table = self.lock_table()?;
            self.router.route(&table, &self.edge(), &mut envelope)
        };
        match decision {
            RouteDecision::Deliver => {
                let events = self.handle_message(&envelope).await?;
                self.handle_message_handler_events(events).await
            }
            RouteDecision::Forward(next) => {
                tracing::debug!(
                    "[route] {} forwards {} for {} to {}",
                    self.id,
                    envelope.message,
                    envelope.to.target,
                    next.target
                );
                next.post(envelope)
            }
            RouteDecision::Backtrack(prev) => {
                self.ctx.measure.incr(MeasureCounter::DeadEnd);
                tracing::warn!(
                    "[route] {} is a dead end for {}, stepping back to {}",
                    self.id,
                    envelope.to.target,
                    prev.target
                );
                prev.post(envelope)
            }
            RouteDecision::Fail(kind) => self.report_failure(&envelope, kind).await,
        }
    }

    async fn report_failure(&self, envelope: &Envelope, kind: FailureKind) -> Result<()> {
        let counter = match kind {
            FailureKind::NoRoute => MeasureCounter::NoRoute,
            FailureKind::HopLimit => MeasureCounter::HopLimit,
            FailureKind::Dropped => MeasureCounter::Dropped,
        };
        self.ctx.measure.incr(counter);
        tracing::warn!(
            "[route] {} gives up {} from {} to {}: {:?}",
            self.id,
            envelope.message,
            envelope.from.target,
            envelope.to.target,
            kind
        );
        let failure = RouteFailure {
            origin: envelope.from.target,
            destination: envelope.to.target,
            at: self.id,
            kind,
            hops: envelope.from.hop_count,
            message: envelope.message.kind().to_string(),
        };
        if let Some(cb) = self.ctx.callback()? {
            if let Err(e) = cb.on_failed(&failure).await {
                tracing::error!("Callback on_failed failed: {:?}", e);
            }
        }
        Ok(())
    }

    /// Carry out what the message handlers asked for.
    pub async fn handle_message_handler_events(
        &self,
        events: Vec<MessageHandlerEvent>,
    ) -> Result<()> {
        for event in events {
            tracing::trace!("Node {} handles event {:?}", self.id, event);
            match event {
                MessageHandlerEvent::SendMessage(message, to) => self.send_message(message, to)?,
                MessageHandlerEvent::SendMessageAs(from, message, to) => {
                    self.send_message_as(from, message, to)?
                }
                MessageHandlerEvent::Inserted => {
                    tracing::info!("Node {} joined the ring", self.id);
                    if let Some(cb) = self.ctx.callback()? {
                        if let Err(e) = cb.on_inserted(self.id).await {
                            tracing::error!("Callback on_inserted failed: {:?}", e);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

//! Edge is the handle by which one node addresses another.
//!
//! An [Edge] is a value. It references the remote node through a
//! [Capability] (a non-owning inbox handle) and carries routing metadata.
//! Cloning an edge never shares mutable state with the original, so a node
//! handing an edge to another node cannot be affected by what the recipient
//! does with it.
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;

use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::keys::SharedSecret;
use crate::message::Envelope;

/// Counts envelopes posted but not yet fully handled, overlay wide.
/// The overlay is quiescent when the count drops to zero.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
    notify: Notify,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until nothing is in flight.
    pub async fn quiesce(&self) {
        loop {
            // Register before checking, `notify_waiters` wakes only
            // futures that already exist.
            let notified = self.notify.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Non-owning handle to the inbox of a node.
#[derive(Clone)]
pub struct Capability {
    id: Identity,
    inbox: UnboundedSender<Envelope>,
    available: Arc<AtomicBool>,
    inflight: Arc<InFlight>,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("id", &self.id)
            .field("available", &self.is_available())
            .finish()
    }
}

impl Capability {
    pub fn new(
        id: Identity,
        inbox: UnboundedSender<Envelope>,
        available: Arc<AtomicBool>,
        inflight: Arc<InFlight>,
    ) -> Self {
        Self {
            id,
            inbox,
            available,
            inflight,
        }
    }

    /// Whether the node behind this handle is reachable.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst)
    }

    /// Hand an envelope to the remote node. Fire and forget.
    pub fn post(&self, envelope: Envelope) -> Result<()> {
        self.inflight.begin();
        self.inbox.send(envelope).map_err(|_| {
            self.inflight.done();
            Error::CapabilityClosed(self.id)
        })
    }

    /// Whether two capabilities reach the same inbox.
    pub fn same_inbox(&self, other: &Capability) -> bool {
        self.inbox.same_channel(&other.inbox)
    }
}

/// Public fields of an edge, safe to share with third parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub id: Identity,
    #[serde(default)]
    pub sponsor: Option<Identity>,
    #[serde(default)]
    pub endpoint: Option<SocketAddr>,
}

/// A routing handle to a remote node.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Identity of the remote node.
    pub target: Identity,
    pub capability: Capability,
    /// Staleness timestamp, the pool evicts the oldest first.
    pub last_used: Instant,
    /// Hops travelled by the message this edge is the sender of.
    pub hop_count: u32,
    /// The node through which the remote node joined the ring.
    pub sponsor: Option<Identity>,
    pub shared_secret: Option<SharedSecret>,
    /// Observed public endpoint of the remote node.
    pub endpoint: Option<SocketAddr>,
}

impl Edge {
    pub fn new(target: Identity, capability: Capability) -> Self {
        Self {
            target,
            capability,
            last_used: Instant::now(),
            hop_count: 0,
            sponsor: None,
            shared_secret: None,
            endpoint: None,
        }
    }

    /// Create an edge addressing whatever another edge addresses.
    /// Routing metadata private to the original is not copied.
    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            sponsor: edge.sponsor,
            endpoint: edge.endpoint,
            ..Self::new(edge.target, edge.capability.clone())
        }
    }

    /// A copy with a refreshed timestamp and a zeroed hop count.
    pub fn clone_fresh(&self) -> Self {
        Self {
            last_used: Instant::now(),
            hop_count: 0,
            ..self.clone()
        }
    }

    pub fn with_sponsor(mut self, sponsor: Option<Identity>) -> Self {
        self.sponsor = sponsor;
        self
    }

    pub fn with_secret(mut self, secret: SharedSecret) -> Self {
        self.shared_secret = Some(secret);
        self
    }

    pub fn with_endpoint(mut self, endpoint: Option<SocketAddr>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Hand an envelope to the node this edge addresses.
    pub fn post(&self, envelope: Envelope) -> Result<()> {
        self.capability.post(envelope)
    }

    pub fn public_info(&self) -> EdgeInfo {
        EdgeInfo {
            id: self.target,
            sponsor: self.sponsor,
            endpoint: self.endpoint,
        }
    }
}

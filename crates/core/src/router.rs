//! Router: greedy nearest-identity forwarding, one hop at a time.
//!
//! The holder of a message picks the available edge nearest to the
//! destination that has not routed the message yet. When no such edge is
//! left it steps back to the node that handed the message over, so a
//! message keeps searching until every node reachable from its origin has
//! been tried. In a well formed ring the first choice is always strictly
//! closer than the holder, and no step back ever happens.
use crate::callback::FailureKind;
use crate::edge::Edge;
use crate::message::Envelope;
use crate::table::ConnectionTable;
use crate::table::Scope;

/// What the holder of a message does with it.
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// The holder is the destination.
    Deliver,
    /// Hand the message to a closer edge.
    Forward(Edge),
    /// Hand the message back to the node that forwarded it.
    Backtrack(Edge),
    /// Give the message up.
    Fail(FailureKind),
}

impl RouteDecision {
    pub fn is_deliver(&self) -> bool {
        matches!(self, RouteDecision::Deliver)
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, RouteDecision::Forward(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Router {
    max_hops: u32,
}

impl Router {
    pub fn new(max_hops: u32) -> Self {
        Self { max_hops }
    }

    /// Decide the next step for `envelope`, held by `current`.
    /// The hop count of the sender edge must already include this hop.
    /// Updates the relay record of the envelope.
    pub fn route(
        &self,
        table: &ConnectionTable,
        current: &Edge,
        envelope: &mut Envelope,
    ) -> RouteDecision {
        if envelope.from.hop_count > self.max_hops {
            return RouteDecision::Fail(FailureKind::HopLimit);
        }
        if envelope.to.target == current.target {
            return RouteDecision::Deliver;
        }
        envelope.relay.visit(current.target);
        match table.find_closest(&envelope.to.target, Scope::All, &envelope.relay.visited) {
            Some(next) => {
                envelope.relay.push_trail(current.clone_fresh());
                RouteDecision::Forward(next)
            }
            None => match envelope.relay.pop_trail() {
                Some(prev) => RouteDecision::Backtrack(prev),
                None => RouteDecision::Fail(FailureKind::NoRoute),
            },
        }
    }
}

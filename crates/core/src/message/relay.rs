#![warn(missing_docs)]

use crate::edge::Edge;
use crate::identity::Identity;

/// MessageRelay records how a message travelled so the router can avoid
/// revisiting nodes and step back out of dead ends.
///
/// By calling `visit` and `push_trail` in the right place the relay will:
/// - Exclude every visited node from later forwarding choices.
/// - Record the whole transport path for inspection.
/// - Keep a stack of the nodes that forwarded the message, for backtracking.
#[derive(Debug, Clone, Default)]
pub struct MessageRelay {
    /// A push only list of every node that routed the message, in order.
    pub visited: Vec<Identity>,

    /// Stack of edges to the nodes that forwarded the message.
    /// The top is the node that handed it to the current holder.
    pub trail: Vec<Edge>,
}

impl MessageRelay {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `current` routed the message. Revisits are not recorded
    /// twice.
    pub fn visit(&mut self, current: Identity) {
        if !self.visited.contains(&current) {
            self.visited.push(current);
        }
    }

    /// Whether `id` already routed the message.
    pub fn has_visited(&self, id: &Identity) -> bool {
        self.visited.contains(id)
    }

    /// Push the edge of the node about to forward the message.
    pub fn push_trail(&mut self, edge: Edge) {
        self.trail.push(edge);
    }

    /// Pop the node to step back to.
    pub fn pop_trail(&mut self) -> Option<Edge> {
        self.trail.pop()
    }

    /// The path from the origin, ending with `last`.
    pub fn path_to(&self, last: Identity) -> Vec<Identity> {
        let mut path = self.visited.clone();
        if path.last() != Some(&last) {
            path.push(last);
        }
        path
    }
}

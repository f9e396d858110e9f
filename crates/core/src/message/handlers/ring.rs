use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::InsertMesh;
use crate::message::Message;
use crate::message::MessageHandlerEvent;
use crate::message::SetNextEdge;
use crate::message::SetPreviousEdge;
use crate::node::Node;
use crate::table::Scope;
use crate::table::Side;

impl Node {
    /// Place `edge` between self and one of its ring neighbours, or hand the
    /// request to a node closer to it.
    ///
    /// ```text
    ///   left splice:   P ---- x ---- self        right splice:  self ---- x ---- N
    /// ```
    ///
    /// The side the identity order points to is tried first. When `x` fits
    /// on neither side the request moves to the known edge closest to `x`,
    /// and only if that edge is strictly closer than self.
    pub(crate) fn insert_mesh(&self, edge: &Edge) -> Result<Vec<MessageHandlerEvent>> {
        let space = self.space();
        let me = self.id();
        let x = edge.target;
        if self.is_self(edge) {
            return Ok(vec![]);
        }

        let mut table = self.lock_table()?;
        self.check_collision(&table, edge)?;
        if table.is_neighbor(&x) {
            return Ok(vec![]);
        }
        let order = space.order(&me, &x);
        let new = Edge::from_edge(edge);
        let prev = table.first(Side::Previous).map(Edge::from_edge);
        let next = table.first(Side::Next).map(Edge::from_edge);
        let (prev, next) = match (prev, next) {
            (None, None) => {
                // alone: the two of us form the whole ring
                table.insert_neighbor(Side::Previous, new.clone());
                table.insert_neighbor(Side::Next, new.clone());
                self.update_join_state(&table)?;
                tracing::debug!("[insertMesh] {} pairs with {}", me, x);
                return Ok(vec![
                    MessageHandlerEvent::SendMessage(
                        Message::SetNextEdge(SetNextEdge),
                        new.clone(),
                    ),
                    MessageHandlerEvent::SendMessage(Message::SetPreviousEdge(SetPreviousEdge), new),
                ]);
            }
            (Some(p), None) => (p.clone(), p),
            (None, Some(n)) => (n.clone(), n),
            (Some(p), Some(n)) => (p, n),
        };

        let sides = if order < 0 {
            [Side::Previous, Side::Next]
        } else {
            [Side::Next, Side::Previous]
        };
        for side in sides {
            match side {
                Side::Previous if space.in_arc(&x, &prev.target, &me) => {
                    table.insert_neighbor(Side::Previous, new.clone());
                    tracing::debug!("[insertMesh] {} splices {} after {}", me, x, prev.target);
                    return Ok(vec![
                        MessageHandlerEvent::SendMessage(
                            Message::SetNextEdge(SetNextEdge),
                            new.clone(),
                        ),
                        MessageHandlerEvent::SendMessageAs(
                            prev.clone(),
                            Message::SetPreviousEdge(SetPreviousEdge),
                            new.clone(),
                        ),
                        MessageHandlerEvent::SendMessageAs(
                            new,
                            Message::SetNextEdge(SetNextEdge),
                            prev,
                        ),
                    ]);
                }
                Side::Next if space.in_arc(&x, &me, &next.target) => {
                    table.insert_neighbor(Side::Next, new.clone());
                    tracing::debug!("[insertMesh] {} splices {} before {}", me, x, next.target);
                    return Ok(vec![
                        MessageHandlerEvent::SendMessage(
                            Message::SetPreviousEdge(SetPreviousEdge),
                            new.clone(),
                        ),
                        MessageHandlerEvent::SendMessageAs(
                            next.clone(),
                            Message::SetNextEdge(SetNextEdge),
                            new.clone(),
                        ),
                        MessageHandlerEvent::SendMessageAs(
                            new,
                            Message::SetPreviousEdge(SetPreviousEdge),
                            next,
                        ),
                    ]);
                }
                _ => {}
            }
        }

        let mine = space.distance(&me, &x).unsigned_abs();
        match table.find_closest(&x, Scope::AllExceptExact, &[]) {
            Some(closer) if space.distance(&closer.target, &x).unsigned_abs() < mine => {
                tracing::debug!("[insertMesh] {} hands {} on to {}", me, x, closer.target);
                Ok(vec![MessageHandlerEvent::SendMessage(
                    Message::InsertMesh(InsertMesh { edge: new }),
                    closer,
                )])
            }
            _ => {
                tracing::warn!("[insertMesh] {} found no place and no closer node for {}", me, x);
                Ok(vec![])
            }
        }
    }

    /// Take the sender as nearest neighbour on `side` unless the current one
    /// lies between self and the sender, and back a new link with a
    /// handshake.
    ///
    /// A splice decided on a stale view may offer a neighbour lying past the
    /// current one. Either way the sender and the current neighbour are told
    /// about each other, so every accepted offer moves some first neighbour
    /// strictly closer and the ring settles once joins stop.
    fn set_neighbor(&self, side: Side, peer: &Edge) -> Result<Vec<MessageHandlerEvent>> {
        let me = self.id();
        if peer.target == me {
            return Ok(vec![]);
        }
        let space = self.space();
        let (current, inserted) = {
            let mut table = self.lock_table()?;
            let current = table.first(side).map(Edge::from_edge);
            if let Some(c) = current.as_ref() {
                if c.target == peer.target {
                    return Ok(vec![]);
                }
                let further = match side {
                    Side::Next => space.in_arc(&c.target, &me, &peer.target),
                    Side::Previous => space.in_arc(&c.target, &peer.target, &me),
                };
                if further {
                    tracing::debug!(
                        "[setNeighbor] {} keeps {} over {} on {:?} side",
                        me,
                        c.target,
                        peer.target,
                        side
                    );
                    return Ok(vec![
                        neighbor_event(side.opposite(), c, peer),
                        neighbor_event(side, peer, c),
                    ]);
                }
            }
            table.insert_neighbor(side, Edge::from_edge(peer));
            (current, self.update_join_state(&table)?)
        };

        let mut events = vec![self.confirm_connection(peer)?];
        if let Some(c) = current.as_ref() {
            events.push(neighbor_event(side, c, peer));
            events.push(neighbor_event(side.opposite(), peer, c));
        }
        if inserted {
            events.push(MessageHandlerEvent::Inserted);
        }
        Ok(events)
    }
}

/// Offer `about` to `to` as its nearest neighbour on `side`.
fn neighbor_event(side: Side, about: &Edge, to: &Edge) -> MessageHandlerEvent {
    let message = match side {
        Side::Previous => Message::SetPreviousEdge(SetPreviousEdge),
        Side::Next => Message::SetNextEdge(SetNextEdge),
    };
    MessageHandlerEvent::SendMessageAs(Edge::from_edge(about), message, Edge::from_edge(to))
}

#[async_trait]
impl HandleMsg<InsertMesh> for Node {
    async fn handle(&self, _ctx: &Envelope, msg: &InsertMesh) -> Result<Vec<MessageHandlerEvent>> {
        self.insert_mesh(&msg.edge)
    }
}

#[async_trait]
impl HandleMsg<SetPreviousEdge> for Node {
    async fn handle(
        &self,
        ctx: &Envelope,
        _msg: &SetPreviousEdge,
    ) -> Result<Vec<MessageHandlerEvent>> {
        self.set_neighbor(Side::Previous, &ctx.from)
    }
}

#[async_trait]
impl HandleMsg<SetNextEdge> for Node {
    async fn handle(&self, ctx: &Envelope, _msg: &SetNextEdge) -> Result<Vec<MessageHandlerEvent>> {
        self.set_neighbor(Side::Next, &ctx.from)
    }
}

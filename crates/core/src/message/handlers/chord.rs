use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::Result;
use crate::message::ChordConnection;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::message::MessageHandlerEvent;
use crate::node::Node;
use crate::table::Scope;

/// Greedy search for the rendezvous point of a shortcut.
///
/// The request moves to a known edge only when that edge is strictly closer
/// to the target than self, so the search always ends. The node where it
/// ends runs the connection handshake with the requester, which leaves a
/// long-range edge in both pools.
#[async_trait]
impl HandleMsg<ChordConnection> for Node {
    async fn handle(
        &self,
        ctx: &Envelope,
        msg: &ChordConnection,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let space = self.space();
        let me = self.id();
        let requester = &ctx.from;

        let best = self
            .lock_table()?
            .find_closest(&msg.target, Scope::All, &[]);
        if let Some(best) = best {
            let mine = space.distance(&me, &msg.target).unsigned_abs();
            if space.distance(&best.target, &msg.target).unsigned_abs() < mine {
                return Ok(vec![MessageHandlerEvent::SendMessageAs(
                    Edge::from_edge(requester),
                    Message::ChordConnection(*msg),
                    best,
                )]);
            }
        }

        if requester.target == me {
            tracing::debug!("[chord] {} is already closest to {}", me, msg.target);
            return Ok(vec![]);
        }
        tracing::debug!(
            "[chord] {} is the rendezvous of {} for {}",
            me,
            msg.target,
            requester.target
        );
        Ok(vec![self.confirm_connection(requester)?])
    }
}

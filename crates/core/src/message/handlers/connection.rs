use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::Result;
use crate::message::ApprovedConnection;
use crate::message::ConfirmConnection;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::message::MessageHandlerEvent;
use crate::node::JoinState;
use crate::node::Node;

/// Accept the sender: settle on a secret, keep it in the pool and approve.
///
/// Both ends may still hold a secret from an earlier handshake, the
/// requester offers its own in the sender edge. The one held by the lower
/// identity wins, then the one held by the higher, and only when neither
/// end holds one is a fresh secret minted.
/// The sponsor of record also runs ring insertion, once per joining node.
#[async_trait]
impl HandleMsg<ConfirmConnection> for Node {
    async fn handle(
        &self,
        ctx: &Envelope,
        _msg: &ConfirmConnection,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let peer = &ctx.from;
        if self.is_self(peer) {
            return Ok(vec![]);
        }
        let secret = {
            let mut table = self.lock_table()?;
            self.check_collision(&table, peer)?;
            let offered = peer.shared_secret;
            let known = table.secret_of(&peer.target);
            let (lower, higher) = if peer.target < self.id() {
                (offered, known)
            } else {
                (known, offered)
            };
            let secret = match lower.or(higher) {
                Some(s) => s,
                None => self
                    .secret_key
                    .fresh_secret(&peer.target, &mut rand::thread_rng())?,
            };
            table.upsert_or_insert(peer.clone_fresh().with_secret(secret));
            secret
        };

        let mut events = vec![MessageHandlerEvent::SendMessageAs(
            self.edge().with_secret(secret),
            Message::ApprovedConnection(ApprovedConnection),
            Edge::from_edge(peer),
        )];

        let first_sponsorship =
            peer.sponsor == Some(self.id()) && self.lock_state()?.sponsored.insert(peer.target);
        if first_sponsorship {
            tracing::debug!("[confirm] {} sponsors {}", self.id(), peer.target);
            events.extend(self.insert_mesh(peer)?);
        }
        Ok(events)
    }
}

/// Keep the approving node, with the secret it settled on. A lower identity
/// that already holds a secret keeps it: the approver only picks another one
/// when handshakes crossed, and then it adopts ours from our own approval.
#[async_trait]
impl HandleMsg<ApprovedConnection> for Node {
    async fn handle(
        &self,
        ctx: &Envelope,
        _msg: &ApprovedConnection,
    ) -> Result<Vec<MessageHandlerEvent>> {
        let peer = &ctx.from;
        if peer.target == self.id() {
            return Ok(vec![]);
        }
        {
            let mut table = self.lock_table()?;
            let mut edge = peer.clone_fresh();
            if peer.target > self.id() {
                if let Some(own) = table.secret_of(&peer.target) {
                    edge.shared_secret = Some(own);
                }
            }
            table.upsert_or_insert(edge);
        }

        let mut state = self.lock_state()?;
        if state.join == JoinState::Requesting && self.sponsor() == Some(peer.target) {
            tracing::debug!("[approved] {} confirmed by {}", self.id(), peer.target);
            state.join = JoinState::Confirmed;
        }
        Ok(vec![])
    }
}

use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::Result;
use crate::message::EndpointInfo;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::IntroducedTo;
use crate::message::Message;
use crate::message::MessageHandlerEvent;
use crate::node::Node;

/// Connect to the introduced peer and tell it where self can be reached.
#[async_trait]
impl HandleMsg<IntroducedTo> for Node {
    async fn handle(&self, _ctx: &Envelope, msg: &IntroducedTo) -> Result<Vec<MessageHandlerEvent>> {
        let peer = &msg.peer;
        if peer.target == self.id() {
            return Ok(vec![]);
        }
        tracing::debug!(
            "[introduce] {} meets {} through {}",
            self.id(),
            peer.target,
            msg.introducer.id
        );
        if let Some(endpoint) = peer.endpoint {
            self.lock_state()?.endpoints.insert(peer.target, endpoint);
        }
        Ok(vec![
            self.confirm_connection(peer)?,
            MessageHandlerEvent::SendMessage(
                Message::EndpointInfo(EndpointInfo {
                    endpoint: self.endpoint(),
                }),
                Edge::from_edge(peer),
            ),
        ])
    }
}

#[async_trait]
impl HandleMsg<EndpointInfo> for Node {
    async fn handle(&self, ctx: &Envelope, msg: &EndpointInfo) -> Result<Vec<MessageHandlerEvent>> {
        self.lock_state()?
            .endpoints
            .insert(ctx.from.target, msg.endpoint);
        Ok(vec![])
    }
}

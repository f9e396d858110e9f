#![warn(missing_docs)]
//! This module implemented message handler of the overlay.
//!
//! Handlers never touch the network themselves. They mutate the table of
//! the node they run on and return [MessageHandlerEvent]s, which the node
//! carries out afterwards.

use async_trait::async_trait;

use crate::edge::Edge;
use crate::error::Result;
use crate::message::Envelope;
use crate::message::Message;
use crate::node::Node;

/// Operator and Handler for connection handshakes
pub mod connection;
/// Operator and Handler for ring insertion
pub mod ring;
/// Operator and Handler for chord shortcuts
pub mod chord;
/// Operator and Handler for peer introduction
pub mod nat;
/// Handler for application payloads
pub mod payload;

/// MessageHandlerEvent that will be handled by Node.
#[derive(Debug, Clone)]
pub enum MessageHandlerEvent {
    /// Instructs the node to route a message from itself to an edge.
    SendMessage(Message, Edge),

    /// Instructs the node to route a message to an edge, on behalf of the
    /// given sender edge.
    SendMessageAs(Edge, Message, Edge),

    /// Instructs the node to report it has joined the ring.
    Inserted,
}

/// Generic trait for handle message, inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, ctx: &Envelope, msg: &T) -> Result<Vec<MessageHandlerEvent>>;
}

impl Node {
    /// Dispatch a message delivered to self to its handler.
    pub async fn handle_message(&self, envelope: &Envelope) -> Result<Vec<MessageHandlerEvent>> {
        tracing::debug!(
            "START HANDLE MESSAGE: {} got {} from {}",
            self.id(),
            envelope.message,
            envelope.from.target
        );

        let events = match &envelope.message {
            Message::ConfirmConnection(ref msg) => self.handle(envelope, msg).await,
            Message::ApprovedConnection(ref msg) => self.handle(envelope, msg).await,
            Message::InsertMesh(ref msg) => self.handle(envelope, msg).await,
            Message::SetPreviousEdge(ref msg) => self.handle(envelope, msg).await,
            Message::SetNextEdge(ref msg) => self.handle(envelope, msg).await,
            Message::ChordConnection(ref msg) => self.handle(envelope, msg).await,
            Message::Payload(ref msg) => self.handle(envelope, msg).await,
            Message::IntroducedTo(ref msg) => self.handle(envelope, msg).await,
            Message::EndpointInfo(ref msg) => self.handle(envelope, msg).await,
        }?;

        tracing::debug!("FINISH HANDLE MESSAGE: {} events", events.len());
        Ok(events)
    }
}

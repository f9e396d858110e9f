#![warn(missing_docs)]
//! This module defines the message vocabulary of the overlay.
//! Most structural messages carry no payload of their own: the edge that
//! matters travels as the sender edge of the [super::Envelope].

use std::net::SocketAddr;

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::edge::Edge;
use crate::edge::EdgeInfo;
use crate::identity::Identity;

/// Ask the receiver to accept a connection from the sender edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmConnection;

/// Accept a connection. The shared secret rides in the sender edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedConnection;

/// Place a node into the ring.
#[derive(Debug, Clone)]
pub struct InsertMesh {
    /// edge of the node being inserted
    pub edge: Edge,
}

/// Install the sender edge as the receiver's nearest previous neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPreviousEdge;

/// Install the sender edge as the receiver's nearest next neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetNextEdge;

/// Look for the rendezvous point of a shortcut toward `target`.
/// The sender edge is the requester of the shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordConnection {
    /// identity the shortcut should land near
    pub target: Identity,
}

/// Application payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// opaque data
    pub data: Bytes,
}

/// Introduction of a peer by a node that knows both ends.
#[derive(Debug, Clone)]
pub struct IntroducedTo {
    /// the peer being introduced
    pub peer: Edge,
    /// public info of the introducer
    pub introducer: EdgeInfo,
}

/// Public endpoint of the sender, as observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// observed address
    pub endpoint: SocketAddr,
}

/// A collection of all message types, checked exhaustively by the handler.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Message {
    /// Ask to connect.
    ConfirmConnection(ConfirmConnection),
    /// Accept a connection.
    ApprovedConnection(ApprovedConnection),
    /// Ring insertion.
    InsertMesh(InsertMesh),
    /// Install a previous neighbour.
    SetPreviousEdge(SetPreviousEdge),
    /// Install a next neighbour.
    SetNextEdge(SetNextEdge),
    /// Shortcut rendezvous search.
    ChordConnection(ChordConnection),
    /// Application payload.
    Payload(Payload),
    /// Peer introduction.
    IntroducedTo(IntroducedTo),
    /// Observed endpoint.
    EndpointInfo(EndpointInfo),
}

impl Message {
    /// Short name of the variant, for logs and failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::ConfirmConnection(_) => "confirmConnection",
            Message::ApprovedConnection(_) => "approvedConnection",
            Message::InsertMesh(_) => "insertMesh",
            Message::SetPreviousEdge(_) => "setPreviousEdge",
            Message::SetNextEdge(_) => "setNextEdge",
            Message::ChordConnection(_) => "chordConnection",
            Message::Payload(_) => "message",
            Message::IntroducedTo(_) => "introducedTo",
            Message::EndpointInfo(_) => "endpointInfo",
        }
    }

    /// Wrap raw bytes as an application payload.
    pub fn payload<T: Into<Bytes>>(data: T) -> Self {
        Message::Payload(Payload { data: data.into() })
    }

    /// Whether this is an application payload.
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Message::InsertMesh(m) => write!(f, "{}({})", self.kind(), m.edge.target),
            Message::ChordConnection(m) => write!(f, "{}({})", self.kind(), m.target),
            Message::Payload(m) => write!(f, "{}({} bytes)", self.kind(), m.data.len()),
            Message::IntroducedTo(m) => write!(f, "{}({})", self.kind(), m.peer.target),
            Message::EndpointInfo(m) => write!(f, "{}({})", self.kind(), m.endpoint),
            _ => write!(f, "{}", self.kind()),
        }
    }
}

//! yz: a structured overlay over hierarchical identities.
//! --------------
//! - [Identity](crate::identity::Identity) is a `(locality, local_key)` pair living on one circle,
//!   see [IdentitySpace](crate::identity::IdentitySpace).
//! - [Edge](crate::edge::Edge) is the value by which one node addresses another.
//! - [ConnectionTable](crate::table::ConnectionTable) holds the bounded pool and the ring neighbours of a node.
//! - [Router](crate::router::Router) forwards messages greedily toward their destination.
//! - [Overlay](crate::overlay::Overlay) runs one tokio task per node and waits for quiescence.
//! - [ResilienceHarness](crate::resilience::ResilienceHarness) injects failures and detects partitions.
//!
//! # Join
//!
//! There are three phases when node X joins the overlay through its sponsor S.
//!
//! 1. Handshake
//! - X routes `ConfirmConnection` to S. S derives a shared secret for X, stores an edge to X
//!   and answers with `ApprovedConnection`, carrying the secret.
//! - X stores the edge to S and becomes `Confirmed`.
//! 2. Ring insertion
//! - Since S sponsored X, S runs `InsertMesh` for X: if X falls between S and one of its
//!   neighbours, S splices X in and tells X and the neighbour with `SetPreviousEdge` /
//!   `SetNextEdge`. Otherwise S hands `InsertMesh` to the known node closest to X.
//! - Every `SetPreviousEdge` / `SetNextEdge` receiver confirms a connection to its new
//!   neighbour. X becomes `Inserted` once it knows both of its neighbours.
//! 3. Chords
//! - On demand, every node routes `ChordConnection` toward targets at halving offsets
//!   across localities and inside its own locality. The node closest to each target
//!   handshakes back with the requester.
//!
//! # Routing
//!
//! Every node forwards an envelope to the edge closest to the destination, skipping
//! unavailable and already visited nodes. A node with no such edge hands the envelope back
//! along the relay trail:
//!
//! ```txt
//! visited:[A, B, C] trail:[A, B] at: C, destination: Z
//! ```
//!
//! C is a dead end, the envelope goes back to B, which tries its next best edge.
//! The message fails once the trail is empty or the hop ceiling is exceeded.
pub mod callback;
pub mod config;
pub mod consts;
pub mod edge;
pub mod error;
pub mod identity;
pub mod inspect;
pub mod keys;
pub mod measure;
pub mod message;
pub mod node;
pub mod overlay;
pub mod resilience;
pub mod router;
pub mod table;
#[cfg(test)]
mod tests;

pub use identity::Identity;
pub use identity::IdentitySpace;
pub use node::Node;
pub use overlay::Overlay;

//! Callback interface through which an overlay reports what happened to the
//! messages it carried.
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::identity::Identity;

pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// The overlay accepts a shared [OverlayCallback] trait object.
pub type SharedOverlayCallback = Arc<dyn OverlayCallback + Send + Sync>;

/// An application payload that reached its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub origin: Identity,
    pub destination: Identity,
    pub hops: u32,
    /// Nodes that handled the message, origin and destination included.
    pub path: Vec<Identity>,
    pub data: Bytes,
}

/// Why a message was given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Every candidate was visited or unavailable and the trail ran out.
    NoRoute,
    /// The hop ceiling was exceeded.
    HopLimit,
    /// The holder of the message is unavailable.
    Dropped,
}

/// A message the overlay could not deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFailure {
    pub origin: Identity,
    pub destination: Identity,
    /// Node that gave up.
    pub at: Identity,
    pub kind: FailureKind,
    pub hops: u32,
    /// Kind of the undelivered message.
    pub message: String,
}

/// Any object that implements this trait can be used as a callback for the
/// overlay.
#[async_trait]
pub trait OverlayCallback {
    /// Invoked when an application payload reaches its destination.
    async fn on_delivered(&self, _delivery: &Delivery) -> Result<(), CallbackError> {
        Ok(())
    }

    /// Invoked when any message is given up.
    async fn on_failed(&self, _failure: &RouteFailure) -> Result<(), CallbackError> {
        Ok(())
    }

    /// Invoked when a node finishes joining the ring.
    async fn on_inserted(&self, _node: Identity) -> Result<(), CallbackError> {
        Ok(())
    }
}

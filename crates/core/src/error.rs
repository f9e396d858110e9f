//! Error of yz_core

use crate::identity::Identity;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in yz-core.
///
/// Per-message routing failures are not represented here. They are
/// counted by [crate::measure::Measure] and reported through
/// [crate::callback::OverlayCallback], since no node can observe the
/// failure of another one.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Identity parse error: {0}")]
    IdentityParse(String),

    #[error("Invalid locality in identity {0}")]
    BadLocalityInIdentity(String),

    #[error("Invalid hexadecimal local key in identity {0}")]
    BadHexInIdentity(String),

    #[error("Identity collision: {0}")]
    IdentityCollision(Identity),

    #[error("Node {0} can only introduce nodes it is connected to, not {1}")]
    IntroduceStranger(Identity, Identity),

    #[error("HMAC-SHA256 key init failed")]
    SharedSecretInit,

    #[error("Capability of {0} is closed, the inbox was dropped")]
    CapabilityClosed(Identity),

    #[error("Node with index {0} not found in overlay")]
    NodeIndexNotFound(usize),

    #[error("Node {0} not found in overlay")]
    NodeNotFound(Identity),

    #[error("Overlay is empty, bootstrap a node first")]
    EmptyOverlay,

    #[error("Overlay is already bootstrapped")]
    AlreadyBootstrapped,

    #[error("Overlay did not settle within {0} ms")]
    SettleTimeout(u64),

    #[error("Failed on lock connection table")]
    TableSyncLock,

    #[error("Failed on lock node state")]
    NodeStateSyncLock,

    #[error("Failed on lock callback")]
    CallbackSyncLock,

    #[error("Invalid overlay config: {0}")]
    InvalidConfig(String),

    #[error("Fraction must lie in [0, 1], got {0}")]
    InvalidFraction(f64),
}

//! Constant variables.
///
/// number of localities L, the coarse component of an identity
pub const DEFAULT_LOCALITIES: u32 = 10;
/// bound of the general pool of a connection table
pub const MAX_EDGES: usize = 100;
/// chord pairs per family
pub const DEFAULT_CHORD_COUNT: usize = 7;
/// hop ceiling, messages beyond it are dropped
pub const DEFAULT_MAX_HOPS: u32 = 1024;
/// time to wait for quiescence, in ms
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 10 * 1000;
/// first port of the synthetic endpoints handed to simulated nodes
pub const DEFAULT_BASE_PORT: u16 = 40000;
/// bytes of node secret key material
pub const SECRET_KEY_LEN: usize = 32;
/// bytes of the nonce mixed into every shared secret
pub const SHARED_SECRET_NONCE_LEN: usize = 16;

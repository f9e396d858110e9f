//! Configuration of an overlay.
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::DEFAULT_BASE_PORT;
use crate::consts::DEFAULT_CHORD_COUNT;
use crate::consts::DEFAULT_LOCALITIES;
use crate::consts::DEFAULT_MAX_HOPS;
use crate::consts::DEFAULT_SETTLE_TIMEOUT_MS;
use crate::consts::MAX_EDGES;
use crate::error::Error;
use crate::error::Result;
use crate::identity::IdentitySpace;

fn default_localities() -> u32 {
    DEFAULT_LOCALITIES
}

fn default_max_edges() -> usize {
    MAX_EDGES
}

fn default_max_hops() -> u32 {
    DEFAULT_MAX_HOPS
}

fn default_chord_count() -> usize {
    DEFAULT_CHORD_COUNT
}

fn default_settle_timeout_ms() -> u64 {
    DEFAULT_SETTLE_TIMEOUT_MS
}

fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Number of localities `L`.
    #[serde(default = "default_localities")]
    pub localities: u32,
    /// Bound of the general pool of every connection table.
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    /// Hop ceiling.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    /// Chord pairs per family.
    #[serde(default = "default_chord_count")]
    pub chord_count: usize,
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    /// First port of the synthetic endpoints given to nodes.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Seed of the overlay random generator. Random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            localities: DEFAULT_LOCALITIES,
            max_edges: MAX_EDGES,
            max_hops: DEFAULT_MAX_HOPS,
            chord_count: DEFAULT_CHORD_COUNT,
            settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            base_port: DEFAULT_BASE_PORT,
            seed: None,
        }
    }
}

impl OverlayConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_edges == 0 {
            return Err(Error::InvalidConfig(
                "max_edges must be greater than zero".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(Error::InvalidConfig(
                "max_hops must be greater than zero".to_string(),
            ));
        }
        self.space().map(|_| ())
    }

    pub fn space(&self) -> Result<IdentitySpace> {
        IdentitySpace::new(self.localities)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

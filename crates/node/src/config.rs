use std::fs;
use std::io;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;
use crate::yz_core::config::OverlayConfig;

pub const DEFAULT_CONFIG_LOCATION: &str = "~/.yz/config.yaml";
pub const DEFAULT_NODES: usize = 100;
pub const DEFAULT_MESSAGES: usize = 1000;
pub const DEFAULT_FAIL_FRACTION: f64 = 0.0;

fn default_nodes() -> usize {
    DEFAULT_NODES
}

fn default_messages() -> usize {
    DEFAULT_MESSAGES
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Size of the overlay.
    #[serde(default = "default_nodes")]
    pub nodes: usize,
    /// Random payloads sent among available nodes.
    #[serde(default = "default_messages")]
    pub messages: usize,
    /// Build chords before failures are injected.
    #[serde(default)]
    pub chords: bool,
    /// Share of nodes marked unavailable at random.
    #[serde(default)]
    pub fail_fraction: f64,
    /// Localities marked unavailable.
    #[serde(default)]
    pub fail_localities: Vec<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            messages: DEFAULT_MESSAGES,
            chords: false,
            fail_fraction: DEFAULT_FAIL_FRACTION,
            fail_localities: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self).map_err(|_| Error::EncodeError)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}

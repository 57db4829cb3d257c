use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Result, WganError};
use crate::network::network::Network;

/// Which half of the model a checkpoint holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRole {
    Generator,
    Critic,
}

impl NetworkRole {
    pub fn prefix(self) -> &'static str {
        match self {
            NetworkRole::Generator => "gen",
            NetworkRole::Critic => "critic",
        }
    }
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkRole::Generator => write!(f, "generator"),
            NetworkRole::Critic => write!(f, "critic"),
        }
    }
}

/// Persists network snapshots keyed by iteration.
pub trait CheckpointSink {
    /// Returns where the snapshot was written.
    fn save(&self, role: NetworkRole, iteration: usize, network: &Network) -> Result<PathBuf>;
}

/// Writes `<root>/training_checkpoints/<gen|critic>_<iteration>.json`.
#[derive(Debug, Clone)]
pub struct JsonCheckpointSink {
    dir: PathBuf,
}

impl JsonCheckpointSink {
    pub fn new(root: &Path) -> JsonCheckpointSink {
        JsonCheckpointSink { dir: root.join("training_checkpoints") }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, role: NetworkRole, iteration: usize) -> PathBuf {
        self.dir.join(format!("{}_{iteration}.json", role.prefix()))
    }
}

impl CheckpointSink for JsonCheckpointSink {
    fn save(&self, role: NetworkRole, iteration: usize, network: &Network) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| WganError::Persistence {
            path: self.dir.clone(),
            detail: e.to_string(),
        })?;
        let path = self.path(role, iteration);
        info!("Saving {role} weights at {}", path.display());
        network.save_json(&path)?;
        Ok(path)
    }
}

/// Loads a snapshot and copies its weights into `network`, whose
/// architecture must match.
pub fn restore(network: &mut Network, path: &Path) -> Result<()> {
    let snapshot = Network::load_json(path)?;
    network.copy_parameters_from(&snapshot)
}

// Checkpoint — Save and load trained networks
//
// Networks are stored as the JSON form of SavedNetwork (see
// synapse_nn::persistence). A TrainingCheckpoint additionally records how far
// training got, so a run can be resumed:
//
//   {
//     "epoch": 1000,
//     "loss_history": [0.27, 0.26, ...],
//     "network": { "input_nodes": 2, ... }
//   }
//
// Usage:
//   checkpoint::save_network("xor.json", &net)?;
//   let net = checkpoint::load_network("xor.json")?;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use synapse_core::{Error, Result};
use synapse_nn::{Network, SavedNetwork};

fn io_err(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::msg(format!("{}: {e}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| io_err(path, e))?;
    writer.flush().map_err(|e| io_err(path, e))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| io_err(path, e))
}

/// Write a network's parameters and hyperparameters as JSON.
pub fn save_network(path: impl AsRef<Path>, net: &Network) -> Result<()> {
    let path = path.as_ref();
    write_json(path, &net.save())?;
    tracing::debug!(path = %path.display(), "saved network");
    Ok(())
}

/// Read a network written by [`save_network`].
pub fn load_network(path: impl AsRef<Path>) -> Result<Network> {
    let saved: SavedNetwork = read_json(path.as_ref())?;
    Network::from_saved(&saved)
}

/// A network snapshot together with training progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCheckpoint {
    pub epoch: u64,
    #[serde(default)]
    pub loss_history: Vec<f64>,
    pub network: SavedNetwork,
}

impl TrainingCheckpoint {
    pub fn new(net: &Network, epoch: u64) -> Self {
        TrainingCheckpoint {
            epoch,
            loss_history: Vec::new(),
            network: net.save(),
        }
    }

    pub fn with_loss_history(mut self, history: Vec<f64>) -> Self {
        self.loss_history = history;
        self
    }

    /// Lowest recorded loss, if any.
    pub fn best_loss(&self) -> Option<f64> {
        self.loss_history.iter().copied().reduce(f64::min)
    }

    /// Rebuild the network this checkpoint holds.
    pub fn restore(&self) -> Result<Network> {
        Network::from_saved(&self.network)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

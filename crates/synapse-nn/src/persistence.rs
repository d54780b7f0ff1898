// Persistence — Saving and restoring a trained Network
//
// A SavedNetwork is a plain serde record: the layer sizes, the learning rate,
// both activation names and one LayerRecord per weight layer (input→hidden,
// then hidden→output). Each record carries its weights row-major together
// with its bias column.
//
//   {
//     "input_nodes": 2, "hidden_nodes": 4, "output_nodes": 1,
//     "learning_rate": 0.5,
//     "hidden_activation": "sigmoid", "output_activation": "sigmoid",
//     "layers": [
//       { "rows": 4, "cols": 2, "weights": [...8], "biases": [...4] },
//       { "rows": 1, "cols": 4, "weights": [...4], "biases": [...1] }
//     ]
//   }
//
// serde_json is built with `float_roundtrip`, so to_json → from_json gives
// back bit-identical f64 values and therefore bit-identical predictions.

use serde::{Deserialize, Serialize};
use synapse_core::{Error, Matrix, Result};

use crate::activation::Activation;
use crate::network::{Network, NetworkConfig};

/// One weight layer: a [rows x cols] weight matrix and a [rows x 1] bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub rows: usize,
    pub cols: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl LayerRecord {
    fn from_matrices(weights: &Matrix, biases: &Matrix) -> Self {
        LayerRecord {
            rows: weights.rows(),
            cols: weights.cols(),
            weights: weights.to_array(),
            biases: biases.to_array(),
        }
    }

    fn to_matrices(&self, index: usize, rows: usize, cols: usize) -> Result<(Matrix, Matrix)> {
        if self.rows != rows || self.cols != cols {
            return Err(Error::config(format!(
                "layer {index} is {}x{}, expected {rows}x{cols}",
                self.rows, self.cols
            )));
        }
        if self.biases.len() != rows {
            return Err(Error::config(format!(
                "layer {index} has {} biases, expected {rows}",
                self.biases.len()
            )));
        }
        let weights = Matrix::new(rows, cols, self.weights.clone())?;
        let biases = Matrix::new(rows, 1, self.biases.clone())?;
        Ok((weights, biases))
    }
}

/// Serializable snapshot of a [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedNetwork {
    pub input_nodes: usize,
    pub hidden_nodes: usize,
    pub output_nodes: usize,
    pub learning_rate: f64,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub layers: Vec<LayerRecord>,
}

impl SavedNetwork {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::msg(format!("failed to serialize network: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::msg(format!("failed to parse network: {e}")))
    }
}

impl Network {
    /// Snapshot the current parameters and hyperparameters.
    pub fn save(&self) -> SavedNetwork {
        let config = self.config();
        SavedNetwork {
            input_nodes: config.input_nodes,
            hidden_nodes: config.hidden_nodes,
            output_nodes: config.output_nodes,
            learning_rate: config.learning_rate,
            hidden_activation: config.hidden_activation,
            output_activation: config.output_activation,
            layers: vec![
                LayerRecord::from_matrices(self.weights_ih(), self.bias_h()),
                LayerRecord::from_matrices(self.weights_ho(), self.bias_o()),
            ],
        }
    }

    /// Replace every parameter and hyperparameter with those in `saved`.
    ///
    /// The record is validated in full before anything is replaced, so a
    /// rejected record leaves the network untouched.
    pub fn load(&mut self, saved: &SavedNetwork) -> Result<()> {
        let mut config = self.config().clone();
        config.input_nodes = saved.input_nodes;
        config.hidden_nodes = saved.hidden_nodes;
        config.output_nodes = saved.output_nodes;
        config.learning_rate = saved.learning_rate;
        config.hidden_activation = saved.hidden_activation;
        config.output_activation = saved.output_activation;
        config.validate()?;

        if saved.layers.len() != 2 {
            return Err(Error::config(format!(
                "expected 2 layer records, got {}",
                saved.layers.len()
            )));
        }
        let (weights_ih, bias_h) =
            saved.layers[0].to_matrices(0, saved.hidden_nodes, saved.input_nodes)?;
        let (weights_ho, bias_o) =
            saved.layers[1].to_matrices(1, saved.output_nodes, saved.hidden_nodes)?;

        self.replace_parameters(config, weights_ih, weights_ho, bias_h, bias_o);
        tracing::debug!(
            input = saved.input_nodes,
            hidden = saved.hidden_nodes,
            output = saved.output_nodes,
            "loaded network parameters"
        );
        Ok(())
    }

    /// Build a network directly from a snapshot.
    pub fn from_saved(saved: &SavedNetwork) -> Result<Self> {
        let config = NetworkConfig::new(saved.input_nodes, saved.hidden_nodes, saved.output_nodes)
            .with_learning_rate(saved.learning_rate)
            .with_activations(saved.hidden_activation, saved.output_activation);
        let mut net = Network::new(config)?;
        net.load(saved)?;
        Ok(net)
    }

    /// Serialize the network as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.save().to_json()
    }

    /// Rebuild a network from JSON produced by [`Network::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_saved(&SavedNetwork::from_json(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> Network {
        Network::new(NetworkConfig::new(3, 5, 2).with_seed(21)).unwrap()
    }

    #[test]
    fn test_save_layout() {
        let saved = net().save();
        assert_eq!(saved.layers.len(), 2);
        assert_eq!((saved.layers[0].rows, saved.layers[0].cols), (5, 3));
        assert_eq!(saved.layers[0].biases.len(), 5);
        assert_eq!((saved.layers[1].rows, saved.layers[1].cols), (2, 5));
    }

    #[test]
    fn test_load_rejects_inconsistent_record() {
        let mut target = net();
        let before = target.save();

        let mut bad = before.clone();
        bad.layers[1].biases.pop();
        assert!(target.load(&bad).is_err());

        let mut bad = before.clone();
        bad.layers[0].weights.push(0.0);
        assert!(target.load(&bad).is_err());

        let mut bad = before.clone();
        bad.layers.truncate(1);
        assert!(target.load(&bad).is_err());

        // Nothing was replaced.
        assert_eq!(target.save(), before);
    }

    #[test]
    fn test_load_replaces_sizes() {
        let other = Network::new(NetworkConfig::new(4, 2, 3).with_seed(2)).unwrap();
        let mut target = net();
        target.load(&other.save()).unwrap();
        assert_eq!(target.config().input_nodes, 4);
        assert_eq!(
            target.predict(&[0.1, 0.2, 0.3, 0.4]).unwrap(),
            other.predict(&[0.1, 0.2, 0.3, 0.4]).unwrap()
        );
    }
}

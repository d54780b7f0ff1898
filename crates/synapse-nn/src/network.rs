// Network — Three-layer feed-forward perceptron with manual backpropagation
//
// input ──W_ih·x + b_h──▶ g(·) ──W_ho·h + b_o──▶ f(·) ──▶ output
//
// Examples are COLUMN vectors: an input of n values is an [n x 1] matrix, and
// the parameter shapes follow from that:
//
//   weights_ih: [hidden x input]     bias_h: [hidden x 1]
//   weights_ho: [output x hidden]    bias_o: [output x 1]
//
// TRAINING (online, one example at a time):
//
//   error          = target - output
//   gradient       = f'(output) ⊙ error · lr
//                    (softmax output: -(output - target) · lr, i.e. error · lr)
//   weights_ho    += gradient · hiddenᵀ
//   bias_o        += gradient
//   hidden_error   = weights_hoᵀ · error        (weights from the forward pass)
//   hidden_grad    = g'(hidden) ⊙ hidden_error · lr
//   weights_ih    += hidden_grad · inputᵀ
//   bias_h        += hidden_grad
//
// The update ADDS the scaled error term. `error` is target minus output, so
// this moves the output toward the target. Flipping the sign here makes the
// network diverge.
//
// Derivatives take activated values (see activation.rs), which is why only the
// activated hidden and output matrices are kept from the forward pass.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use synapse_core::{Error, Matrix, Result, Shape};

use crate::activation::{softmax_cross_entropy_grad, Activation, ResolvedActivation};
use crate::init;
use crate::loss::sum_squared_error;
use crate::metrics::{argmax, ConfusionMatrix};

/// One training or evaluation example: an input vector and its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl Example {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Example { input, target }
    }
}

impl From<(Vec<f64>, Vec<f64>)> for Example {
    fn from((input, target): (Vec<f64>, Vec<f64>)) -> Self {
        Example { input, target }
    }
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_init_scale() -> f64 {
    1.0
}

/// Hyperparameters of a [`Network`].
///
/// Deserializable from JSON; omitted fields take their defaults:
///
/// ```json
/// { "input_nodes": 784, "hidden_nodes": 128, "output_nodes": 10,
///   "learning_rate": 0.1, "output_activation": "softmax" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_nodes: usize,
    pub hidden_nodes: usize,
    pub output_nodes: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub hidden_activation: Activation,
    #[serde(default)]
    pub output_activation: Activation,
    /// Initial weights and biases are drawn from U(-init_scale, init_scale).
    #[serde(default = "default_init_scale")]
    pub init_scale: f64,
    /// Seed for initialization and shuffling. Unseeded networks draw from
    /// entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// A config with the given layer sizes and every other field defaulted.
    pub fn new(input_nodes: usize, hidden_nodes: usize, output_nodes: usize) -> Self {
        NetworkConfig {
            input_nodes,
            hidden_nodes,
            output_nodes,
            learning_rate: default_learning_rate(),
            hidden_activation: Activation::default(),
            output_activation: Activation::default(),
            init_scale: default_init_scale(),
            seed: None,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_activations(mut self, hidden: Activation, output: Activation) -> Self {
        self.hidden_activation = hidden;
        self.output_activation = output;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: NetworkConfig = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid network config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_nodes == 0 || self.hidden_nodes == 0 || self.output_nodes == 0 {
            return Err(Error::config(format!(
                "layer sizes must be non-zero, got {}-{}-{}",
                self.input_nodes, self.hidden_nodes, self.output_nodes
            )));
        }
        validate_learning_rate(self.learning_rate)?;
        if !self.init_scale.is_finite() || self.init_scale < 0.0 {
            return Err(Error::config(format!(
                "init_scale must be finite and non-negative, got {}",
                self.init_scale
            )));
        }
        if self.hidden_activation == Activation::Softmax {
            return Err(Error::config(
                "softmax is only supported as the output activation",
            ));
        }
        Ok(())
    }
}

fn validate_learning_rate(lr: f64) -> Result<()> {
    if !lr.is_finite() || lr <= 0.0 {
        return Err(Error::config(format!(
            "learning rate must be positive and finite, got {lr}"
        )));
    }
    Ok(())
}

/// A fully-connected input → hidden → output network.
///
/// # Example
/// ```
/// use synapse_nn::{Network, NetworkConfig};
///
/// let mut net = Network::new(NetworkConfig::new(2, 4, 1).with_seed(7))?;
/// net.train(&[1.0, 0.0], &[1.0])?;
/// let out = net.predict(&[1.0, 0.0])?;
/// assert_eq!(out.len(), 1);
/// # Ok::<(), synapse_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    hidden_fn: ResolvedActivation,
    output_fn: ResolvedActivation,
    weights_ih: Matrix,
    weights_ho: Matrix,
    bias_h: Matrix,
    bias_o: Matrix,
    rng: StdRng,
}

impl Network {
    /// Build a network with uniformly random parameters.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = init::rng_from_seed(config.seed);
        let s = config.init_scale;
        let (i, h, o) = (config.input_nodes, config.hidden_nodes, config.output_nodes);

        let weights_ih = init::uniform(h, i, s, &mut rng);
        let weights_ho = init::uniform(o, h, s, &mut rng);
        let bias_h = init::uniform(h, 1, s, &mut rng);
        let bias_o = init::uniform(o, 1, s, &mut rng);

        tracing::debug!(
            input = i,
            hidden = h,
            output = o,
            hidden_activation = %config.hidden_activation,
            output_activation = %config.output_activation,
            "created feed-forward network"
        );

        Ok(Network {
            hidden_fn: config.hidden_activation.resolve(),
            output_fn: config.output_activation.resolve(),
            config,
            weights_ih,
            weights_ho,
            bias_h,
            bias_o,
            rng,
        })
    }

    // Accessors

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        validate_learning_rate(learning_rate)?;
        self.config.learning_rate = learning_rate;
        Ok(())
    }

    pub fn weights_ih(&self) -> &Matrix {
        &self.weights_ih
    }

    pub fn weights_ho(&self) -> &Matrix {
        &self.weights_ho
    }

    pub fn bias_h(&self) -> &Matrix {
        &self.bias_h
    }

    pub fn bias_o(&self) -> &Matrix {
        &self.bias_o
    }

    // Forward

    fn column(values: &[f64], expected: usize, op: &'static str) -> Result<Matrix> {
        if values.len() != expected {
            return Err(Error::DimensionMismatch {
                op,
                lhs: Shape::new(expected, 1),
                rhs: Shape::new(values.len(), 1),
            });
        }
        Ok(Matrix::from_array(values))
    }

    /// Activated hidden and output columns for one input column.
    fn feed_forward(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let hidden = self
            .hidden_fn
            .apply(&self.weights_ih.dot(input)?.add(&self.bias_h)?);
        let output = self
            .output_fn
            .apply(&self.weights_ho.dot(&hidden)?.add(&self.bias_o)?);
        Ok((hidden, output))
    }

    /// Forward pass. Does not modify the network.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        let input = Self::column(input, self.config.input_nodes, "predict")?;
        let (_, output) = self.feed_forward(&input)?;
        Ok(output.into_data())
    }

    // Training

    /// One online backpropagation step on a single example.
    pub fn train(&mut self, input: &[f64], target: &[f64]) -> Result<()> {
        let input = Self::column(input, self.config.input_nodes, "train")?;
        let target = Self::column(target, self.config.output_nodes, "train")?;
        let lr = self.config.learning_rate;

        let (hidden, output) = self.feed_forward(&input)?;
        let error = target.sub(&output)?;

        let gradient = match self.output_fn.kind() {
            Activation::Softmax => softmax_cross_entropy_grad(&output, &target)?.mul_scalar(-lr),
            _ => self
                .output_fn
                .derivative(&output)
                .mul(&error)?
                .mul_scalar(lr),
        };

        // Back-propagate through the weights used in the forward pass.
        let hidden_error = self.weights_ho.transpose().dot(&error)?;

        let weights_ho = self
            .weights_ho
            .add(&gradient.dot(&hidden.transpose())?)?;
        let bias_o = self.bias_o.add(&gradient)?;

        let hidden_gradient = self
            .hidden_fn
            .derivative(&hidden)
            .mul(&hidden_error)?
            .mul_scalar(lr);
        let weights_ih = self
            .weights_ih
            .add(&hidden_gradient.dot(&input.transpose())?)?;
        let bias_h = self.bias_h.add(&hidden_gradient)?;

        self.weights_ho = weights_ho;
        self.bias_o = bias_o;
        self.weights_ih = weights_ih;
        self.bias_h = bias_h;
        Ok(())
    }

    /// One shuffled pass of online training over `data`, then the loss over
    /// the whole dataset.
    ///
    /// This is the per-epoch entry point for callers that want to yield,
    /// report progress or stop early between epochs.
    pub fn train_epoch<R: Rng + ?Sized>(&mut self, data: &[Example], rng: &mut R) -> Result<f64> {
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.shuffle(rng);
        for idx in order {
            let ex = &data[idx];
            self.train(&ex.input, &ex.target)?;
        }
        self.calculate_loss(data)
    }

    /// Train for `epochs` epochs, returning the loss after each.
    pub fn train_batch(&mut self, data: &[Example], epochs: usize) -> Result<Vec<f64>> {
        let mut rng = self.rng.clone();
        let mut history = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let loss = self.train_epoch(data, &mut rng)?;
            tracing::info!(epoch = epoch + 1, epochs, loss, "epoch complete");
            history.push(loss);
        }
        self.rng = rng;
        Ok(history)
    }

    // Evaluation

    /// Mean over examples of the sum of squared errors. 0 for no data.
    pub fn calculate_loss(&self, data: &[Example]) -> Result<f64> {
        if data.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for ex in data {
            let prediction = self.predict(&ex.input)?;
            total += sum_squared_error(&prediction, &ex.target)?;
        }
        Ok(total / data.len() as f64)
    }

    fn classify(&self, data: &[Example]) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut predicted = Vec::with_capacity(data.len());
        let mut actual = Vec::with_capacity(data.len());
        for ex in data {
            let out = self.predict(&ex.input)?;
            predicted.push(argmax(&out).unwrap_or(0));
            actual.push(argmax(&ex.target).unwrap_or(0));
        }
        Ok((predicted, actual))
    }

    /// Fraction of examples whose predicted argmax matches the target argmax.
    pub fn test(&self, data: &[Example]) -> Result<f64> {
        let (predicted, actual) = self.classify(data)?;
        Ok(crate::metrics::accuracy(&predicted, &actual))
    }

    /// Confusion matrix over the output classes.
    pub fn confusion_matrix(&self, data: &[Example]) -> Result<ConfusionMatrix> {
        let (predicted, actual) = self.classify(data)?;
        Ok(ConfusionMatrix::from_predictions(
            &predicted,
            &actual,
            self.config.output_nodes,
        ))
    }

    // Used by persistence to swap parameters in wholesale.
    pub(crate) fn replace_parameters(
        &mut self,
        config: NetworkConfig,
        weights_ih: Matrix,
        weights_ho: Matrix,
        bias_h: Matrix,
        bias_o: Matrix,
    ) {
        self.hidden_fn = config.hidden_activation.resolve();
        self.output_fn = config.output_activation.resolve();
        self.config = config;
        self.weights_ih = weights_ih;
        self.weights_ho = weights_ho;
        self.bias_h = bias_h;
        self.bias_o = bias_o;
    }
}

//! Fixed-topology feed-forward network with a flat gene encoding.
//!
//! Genes are laid out layer by layer. Inside a layer the biases come first,
//! followed by every neuron's incoming weights (neuron-major, predecessor
//! order inside a neuron). Crossover and mutation work on positions, so this
//! order must never change.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoError, Result};

/// Activation applied to every neuron of a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    #[default]
    Relu,
    Tanh,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Relu => x.max(0.0),
            Self::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Layer {
    inputs: usize,
    biases: Vec<f64>,
    // row n holds the weights feeding neuron n
    weights: Vec<f64>,
}

impl Layer {
    fn random<R: Rng + ?Sized>(inputs: usize, neurons: usize, rng: &mut R) -> Self {
        Self {
            inputs,
            biases: (0..neurons).map(|_| rng.gen_range(-1.0..=1.0)).collect(),
            weights: (0..neurons * inputs).map(|_| rng.gen_range(-1.0..=1.0)).collect(),
        }
    }

    fn forward(&self, prev: &[f64], activation: Activation) -> Vec<f64> {
        self.biases
            .iter()
            .zip(self.weights.chunks_exact(self.inputs))
            .map(|(bias, row)| {
                let sum: f64 = row.iter().zip(prev).map(|(w, x)| w * x).sum();
                activation.apply(bias + sum)
            })
            .collect()
    }
}

/// Fully-connected feed-forward network.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    topology: Vec<usize>,
    activation: Activation,
    layers: Vec<Layer>,
}

impl NeuralNetwork {
    /// Random network using the thread-local generator.
    pub fn new(topology: &[usize], activation: Activation) -> Result<Self> {
        Self::with_rng(topology, activation, &mut rand::thread_rng())
    }

    /// Random network, every weight and bias drawn from U[-1, 1].
    pub fn with_rng<R: Rng + ?Sized>(
        topology: &[usize],
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        validate_topology(topology)?;
        let layers = topology
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], &mut *rng))
            .collect();
        Ok(Self {
            topology: topology.to_vec(),
            activation,
            layers,
        })
    }

    /// Build a network and load `genes` into it.
    pub fn from_genes(topology: &[usize], activation: Activation, genes: &[f64]) -> Result<Self> {
        validate_topology(topology)?;
        let layers = topology
            .windows(2)
            .map(|pair| Layer {
                inputs: pair[0],
                biases: vec![0.0; pair[1]],
                weights: vec![0.0; pair[0] * pair[1]],
            })
            .collect();
        let mut net = Self {
            topology: topology.to_vec(),
            activation,
            layers,
        };
        net.set_genes(genes)?;
        Ok(net)
    }

    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn gene_count(&self) -> usize {
        gene_count_for(&self.topology)
    }

    pub fn feed_forward(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let expected = self.topology[0];
        if inputs.len() != expected {
            return Err(EvoError::InputSizeMismatch {
                expected,
                actual: inputs.len(),
            });
        }
        let mut current = inputs.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current, self.activation);
        }
        Ok(current)
    }

    pub fn genes(&self) -> Vec<f64> {
        let mut genes = Vec::with_capacity(self.gene_count());
        for layer in &self.layers {
            genes.extend_from_slice(&layer.biases);
            genes.extend_from_slice(&layer.weights);
        }
        genes
    }

    /// Overwrite every parameter from `genes`. The network is untouched on error.
    pub fn set_genes(&mut self, genes: &[f64]) -> Result<()> {
        let expected = self.gene_count();
        let mismatch = || EvoError::GeneSizeMismatch {
            expected,
            actual: genes.len(),
        };

        let mut source = genes.iter().copied();
        let mut staged = self.layers.clone();
        for layer in &mut staged {
            for slot in layer.biases.iter_mut().chain(layer.weights.iter_mut()) {
                *slot = source.next().ok_or_else(mismatch)?;
            }
        }
        if source.next().is_some() {
            return Err(mismatch());
        }

        self.layers = staged;
        Ok(())
    }
}

/// Number of genes a network with `topology` carries.
pub fn gene_count_for(topology: &[usize]) -> usize {
    topology
        .windows(2)
        .map(|pair| pair[1] * pair[0] + pair[1])
        .sum()
}

fn validate_topology(topology: &[usize]) -> Result<()> {
    if topology.len() < 2 || topology.contains(&0) {
        return Err(EvoError::InvalidTopology(topology.to_vec()));
    }
    Ok(())
}

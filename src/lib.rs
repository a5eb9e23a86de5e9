//! Neuroevolution for Snake.
//!
//! A [`Population`] of fixed-topology [`NeuralNetwork`]s is scored by headless
//! [`Game`] episodes run in parallel by the [`Trainer`], then bred into the
//! next generation with elitism, tournament selection, uniform crossover and
//! clamped Gaussian mutation.

pub mod config;
pub mod error;
pub mod fitness;
pub mod ga;
pub mod game;
pub mod nn;
pub mod population;
pub mod pos;
pub mod trainer;

#[cfg(feature = "viewer")]
pub mod viewer;

pub use config::TrainingConfig;
pub use error::{EvoError, Result};
pub use fitness::{Episode, EpisodeEnd, FitnessSettings, evaluate, run_episode};
pub use ga::{GaContext, GaParams};
pub use game::{ACTION_COUNT, Arena, Dir, Game, OBSERVATION_SIZE, Turn};
pub use nn::{Activation, NeuralNetwork};
pub use population::{Genome, Population};
pub use pos::Pos;
pub use trainer::{GenerationStats, Trainer};

//! Headless episodes that turn a gene vector into a fitness score.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::game::{Arena, Game};
use crate::nn::{Activation, NeuralNetwork};

/// Limits and weights for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessSettings {
    pub arena: Arena,
    /// Hard cap on ticks per episode
    pub max_steps: usize,
    /// Ticks allowed without eating before the episode is cut short
    pub starvation_limit: usize,
    /// Fitness awarded per food, dwarfing the one-per-tick survival term
    pub food_weight: f64,
}

impl Default for FitnessSettings {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            max_steps: 2500,
            starvation_limit: 150,
            food_weight: 1000.0,
        }
    }
}

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeEnd {
    Collision,
    StepCap,
    Starved,
    ArenaFull,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Episode {
    pub steps: usize,
    pub food: usize,
    pub fitness: f64,
    pub end: EpisodeEnd,
}

/// Play one game with the network described by `genes`.
pub fn run_episode(
    topology: &[usize],
    activation: Activation,
    genes: &[f64],
    settings: &FitnessSettings,
    seed: u64,
) -> Result<Episode> {
    let brain = NeuralNetwork::from_genes(topology, activation, genes)?;
    let mut game = Game::with_seed(settings.arena, seed);

    let mut steps = 0;
    let mut since_food = 0;
    let end = loop {
        if game.is_terminated() {
            break if game.body().len() >= settings.arena.cell_count() {
                EpisodeEnd::ArenaFull
            } else {
                EpisodeEnd::Collision
            };
        }
        if steps >= settings.max_steps {
            break EpisodeEnd::StepCap;
        }
        if since_food > settings.starvation_limit {
            break EpisodeEnd::Starved;
        }

        let outputs = brain.feed_forward(&game.observe())?;
        game.apply_decision(&outputs);
        let ate = game.tick();
        steps += 1;
        since_food = if ate { 0 } else { since_food + 1 };
    };

    let food = game.score();
    let fitness = steps as f64 + food as f64 * settings.food_weight;
    log::trace!("episode over after {steps} steps: {food} food, {end:?}");
    Ok(Episode {
        steps,
        food,
        fitness,
        end,
    })
}

/// Fitness of `genes`: ticks survived plus weighted food eaten.
pub fn evaluate(
    topology: &[usize],
    activation: Activation,
    genes: &[f64],
    settings: &FitnessSettings,
    seed: u64,
) -> Result<f64> {
    run_episode(topology, activation, genes, settings, seed).map(|e| e.fitness)
}

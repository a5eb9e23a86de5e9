//! Generation loop: parallel evaluation, ordered fitness write-back, evolve.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{TrainingConfig, topology_with_hidden};
use crate::error::{EvoError, Result};
use crate::fitness::{Episode, FitnessSettings, run_episode};
use crate::ga::GaContext;
use crate::nn::Activation;
use crate::population::Population;

// keeps the episode seed stream apart from the GA stream
const EPISODE_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    /// Most food any genome ate this generation
    pub best_food: usize,
    pub topology: Vec<usize>,
}

/// Evaluate every gene vector, one rayon task each. Results keep input order.
pub fn evaluate_all(
    genes: &[Vec<f64>],
    seeds: &[u64],
    topology: &[usize],
    activation: Activation,
    settings: &FitnessSettings,
) -> Result<Vec<Episode>> {
    debug_assert_eq!(genes.len(), seeds.len());
    genes
        .par_iter()
        .zip(seeds.par_iter())
        .map(|(genes, &seed)| run_episode(topology, activation, genes, settings, seed))
        .collect()
}

pub struct Trainer {
    config: TrainingConfig,
    population: Population,
    episode_seeds: SmallRng,
    pool: Option<rayon::ThreadPool>,
    history: Vec<GenerationStats>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let (ctx, episode_seeds) = match config.seed {
            Some(seed) => (
                GaContext::seeded(config.ga, seed),
                SmallRng::seed_from_u64(seed ^ EPISODE_SEED_SALT),
            ),
            None => (GaContext::from_entropy(config.ga), SmallRng::from_entropy()),
        };

        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|err| {
                        log::error!("thread pool: {err}");
                        EvoError::InvalidConfig("could not build evaluation thread pool")
                    })?,
            ),
            None => None,
        };

        let population = Population::new(config.population_size, &config.topology(), ctx)?;
        log::info!(
            "Trainer ready: {} genomes, {} worker threads, seed {:?}",
            config.population_size,
            pool.as_ref()
                .map_or_else(rayon::current_num_threads, |p| p.current_num_threads()),
            config.seed
        );

        Ok(Self {
            config,
            population,
            episode_seeds,
            pool,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Score the current generation and store the results in the population.
    ///
    /// Genes are copied out before dispatch and fitness is written back only
    /// after every episode has finished.
    pub fn evaluate_generation(&mut self) -> Result<Vec<Episode>> {
        let genes = self.population.gene_snapshot();
        let seeds: Vec<u64> = (0..genes.len()).map(|_| self.episode_seeds.r#gen()).collect();
        let topology = self.population.topology().to_vec();
        let activation = self.population.context().params.activation;
        let settings = self.config.fitness;

        let episodes = match &self.pool {
            Some(pool) => {
                pool.install(|| evaluate_all(&genes, &seeds, &topology, activation, &settings))?
            }
            None => evaluate_all(&genes, &seeds, &topology, activation, &settings)?,
        };

        for (i, episode) in episodes.iter().enumerate() {
            self.population.set_fitness(i, episode.fitness)?;
        }
        Ok(episodes)
    }

    /// Evaluate, record stats, then breed the next generation.
    pub fn step_generation(&mut self) -> Result<GenerationStats> {
        let episodes = self.evaluate_generation()?;

        let best_fitness = episodes
            .iter()
            .map(|e| e.fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        let stats = GenerationStats {
            generation: self.population.generation(),
            best_fitness,
            average_fitness: self.population.average_fitness(),
            best_food: episodes.iter().map(|e| e.food).max().unwrap_or(0),
            topology: self.population.topology().to_vec(),
        };

        log::info!(
            "Gen: {} | Best: {:.0} | Avg: {:.2} | Food: {} | Topology: {:?}",
            stats.generation,
            stats.best_fitness,
            stats.average_fitness,
            stats.best_food,
            stats.topology
        );

        self.population.evolve()?;
        self.history.push(stats.clone());
        Ok(stats)
    }

    pub fn run(&mut self, generations: usize) -> Result<()> {
        for _ in 0..generations {
            self.step_generation()?;
        }
        Ok(())
    }

    /// Rebuild the population around new hidden layers and forget the history.
    pub fn reset_topology(&mut self, hidden: &[usize]) -> Result<()> {
        let topology = topology_with_hidden(hidden);
        self.population.reset(self.config.population_size, &topology)?;
        self.config.hidden_layers = hidden.to_vec();
        self.history.clear();
        Ok(())
    }
}

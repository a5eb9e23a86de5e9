//! A generation of networks and the step that breeds the next one.

use crate::error::{EvoError, Result};
use crate::ga::GaContext;
use crate::nn::NeuralNetwork;

/// One network and the score it earned this generation.
#[derive(Debug, Clone)]
pub struct Genome {
    pub brain: NeuralNetwork,
    pub fitness: f64,
}

pub struct Population {
    genomes: Vec<Genome>,
    topology: Vec<usize>,
    generation: usize,
    best_fitness: f64,
    ctx: GaContext,
}

impl Population {
    pub fn new(pop_size: usize, topology: &[usize], ctx: GaContext) -> Result<Self> {
        let mut population = Self {
            genomes: Vec::new(),
            topology: Vec::new(),
            generation: 0,
            best_fitness: 0.0,
            ctx,
        };
        population.reset(pop_size, topology)?;
        Ok(population)
    }

    /// Throw everything away and start over, possibly with a new shape.
    pub fn reset(&mut self, pop_size: usize, topology: &[usize]) -> Result<()> {
        if pop_size == 0 {
            return Err(EvoError::InvalidPopulationSize);
        }
        self.ctx.params.validate()?;
        if self.ctx.params.elite_count > pop_size {
            return Err(EvoError::InvalidConfig("elite_count exceeds population size"));
        }
        let activation = self.ctx.params.activation;
        let genomes = (0..pop_size)
            .map(|_| {
                NeuralNetwork::with_rng(topology, activation, self.ctx.rng())
                    .map(|brain| Genome { brain, fitness: 0.0 })
            })
            .collect::<Result<Vec<_>>>()?;

        self.genomes = genomes;
        self.topology = topology.to_vec();
        self.generation = 0;
        self.best_fitness = 0.0;
        log::info!("Population reset: {} genomes, topology {:?}", pop_size, topology);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Always false: a population holds at least one genome.
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Highest fitness of the last generation `evolve` consumed.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    pub fn context(&self) -> &GaContext {
        &self.ctx
    }

    pub fn brain(&self, index: usize) -> Result<&NeuralNetwork> {
        self.genomes
            .get(index)
            .map(|g| &g.brain)
            .ok_or(EvoError::IndexOutOfRange {
                index,
                len: self.genomes.len(),
            })
    }

    pub fn set_fitness(&mut self, index: usize, score: f64) -> Result<()> {
        let len = self.genomes.len();
        let genome = self
            .genomes
            .get_mut(index)
            .ok_or(EvoError::IndexOutOfRange { index, len })?;
        genome.fitness = score;
        Ok(())
    }

    pub fn fitness(&self) -> Vec<f64> {
        self.genomes.iter().map(|g| g.fitness).collect()
    }

    pub fn average_fitness(&self) -> f64 {
        let total: f64 = self.genomes.iter().map(|g| g.fitness).sum();
        total / self.genomes.len() as f64
    }

    /// Gene vectors of every genome, in index order.
    pub fn gene_snapshot(&self) -> Vec<Vec<f64>> {
        self.genomes.iter().map(|g| g.brain.genes()).collect()
    }

    /// Genome at index 0: the previous generation's best after `evolve`.
    pub fn champion(&self) -> &NeuralNetwork {
        &self.genomes[0].brain
    }

    /// Breed the next generation from the current fitness scores.
    pub fn evolve(&mut self) -> Result<()> {
        let fitness = self.fitness();
        let ranked = rank_by_fitness(&fitness);
        self.best_fitness = fitness[ranked[0]];

        let activation = self.ctx.params.activation;
        let elites = self.ctx.params.elite_count;
        let mut next = Vec::with_capacity(self.genomes.len());

        for &index in &ranked[..elites] {
            let brain = NeuralNetwork::from_genes(
                &self.topology,
                activation,
                &self.genomes[index].brain.genes(),
            )?;
            next.push(Genome { brain, fitness: 0.0 });
        }

        let genes = self.gene_snapshot();
        while next.len() < self.genomes.len() {
            let a = self.ctx.tournament(&fitness);
            let b = self.ctx.tournament(&fitness);
            let mut child = self.ctx.crossover(&genes[a], &genes[b]);
            self.ctx.mutate(&mut child);
            let brain = NeuralNetwork::from_genes(&self.topology, activation, &child)?;
            next.push(Genome { brain, fitness: 0.0 });
        }

        self.genomes = next;
        self.generation += 1;
        Ok(())
    }
}

/// Indices sorted by descending fitness; equal scores keep index order.
fn rank_by_fitness(fitness: &[f64]) -> Vec<usize> {
    let mut idxs: Vec<usize> = (0..fitness.len()).collect();
    idxs.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
    idxs
}

//! Genetic operators and the random state they draw from.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{EvoError, Result};
use crate::nn::Activation;

/// Tunables for one GA run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    /// Draws per tournament (with replacement)
    pub tournament_size: usize,
    /// Per-gene probability of mutation
    pub mutation_rate: f64,
    /// Standard deviation of the Gaussian mutation noise
    pub mutation_strength: f64,
    /// Genomes copied unchanged into the next generation
    pub elite_count: usize,
    /// Activation used by every network in the population
    pub activation: Activation,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            tournament_size: 5,
            mutation_rate: 0.05,
            mutation_strength: 0.2,
            elite_count: 1,
            activation: Activation::Relu,
        }
    }
}

impl GaParams {
    pub fn validate(&self) -> Result<()> {
        if self.tournament_size == 0 {
            return Err(EvoError::InvalidConfig("tournament_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EvoError::InvalidConfig("mutation_rate must lie in [0, 1]"));
        }
        if !self.mutation_strength.is_finite() || self.mutation_strength < 0.0 {
            return Err(EvoError::InvalidConfig("mutation_strength must be finite and >= 0"));
        }
        if self.elite_count == 0 {
            return Err(EvoError::InvalidConfig("elite_count must be at least 1"));
        }
        Ok(())
    }
}

/// RNG plus tunables, owned by a population.
#[derive(Debug, Clone)]
pub struct GaContext {
    pub params: GaParams,
    rng: SmallRng,
}

impl GaContext {
    pub fn new(params: GaParams, rng: SmallRng) -> Self {
        Self { params, rng }
    }

    pub fn seeded(params: GaParams, seed: u64) -> Self {
        Self::new(params, SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy(params: GaParams) -> Self {
        Self::new(params, SmallRng::from_entropy())
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Index of the fittest of `tournament_size` uniform draws.
    ///
    /// Only a strictly greater fitness replaces the current winner, so ties go
    /// to the first draw. `fitness` must not be empty.
    pub fn tournament(&mut self, fitness: &[f64]) -> usize {
        let mut winner = None;
        let mut best = f64::NEG_INFINITY;
        let mut first = 0;
        for draw in 0..self.params.tournament_size {
            let index = self.rng.gen_range(0..fitness.len());
            if draw == 0 {
                first = index;
            }
            if fitness[index] > best {
                best = fitness[index];
                winner = Some(index);
            }
        }
        // only NaN or -inf fitness can leave the slot empty
        winner.unwrap_or(first)
    }

    /// Per-gene fair coin between the two parents.
    pub fn crossover(&mut self, a: &[f64], b: &[f64]) -> Vec<f64> {
        debug_assert_eq!(a.len(), b.len(), "parents must share a topology");
        a.iter()
            .zip(b)
            .map(|(&ga, &gb)| if self.rng.gen_bool(0.5) { ga } else { gb })
            .collect()
    }

    /// Gaussian nudge on a random subset of genes, clamped to [-1, 1].
    pub fn mutate(&mut self, genes: &mut [f64]) {
        let rate = self.params.mutation_rate;
        if !(0.0..=1.0).contains(&rate) {
            log::warn!("mutation disabled: rate {rate} outside [0, 1]");
            return;
        }
        let noise = match Normal::new(0.0, self.params.mutation_strength) {
            Ok(noise) => noise,
            Err(err) => {
                log::warn!("mutation disabled: {err}");
                return;
            }
        };
        for gene in genes.iter_mut() {
            if self.rng.gen_bool(rate) {
                *gene = (*gene + noise.sample(&mut self.rng)).clamp(-1.0, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        assert!(GaParams::default().validate().is_ok());
        let bad = GaParams {
            mutation_rate: 1.5,
            ..GaParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = GaParams {
            tournament_size: 0,
            ..GaParams::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_tournament_returns_valid_index_on_zero_fitness() {
        let mut ctx = GaContext::seeded(GaParams::default(), 1);
        let fitness = vec![0.0; 7];
        for _ in 0..200 {
            assert!(ctx.tournament(&fitness) < 7);
        }
    }

    #[test]
    fn test_tournament_handles_nan_fitness() {
        let mut ctx = GaContext::seeded(GaParams::default(), 2);
        let fitness = vec![f64::NAN; 3];
        assert!(ctx.tournament(&fitness) < 3);
    }

    #[test]
    fn test_tournament_ties_go_to_first_draw() {
        let mut ctx = GaContext::seeded(GaParams::default(), 12);
        let fitness = vec![4.0; 9];
        for _ in 0..50 {
            let first = ctx.rng().clone().gen_range(0..fitness.len());
            assert_eq!(ctx.tournament(&fitness), first);
        }
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let params = GaParams {
            tournament_size: 5,
            ..GaParams::default()
        };
        let mut ctx = GaContext::seeded(params, 3);
        let fitness = vec![1.0, 100.0, 2.0, 3.0];
        let wins = (0..1000).filter(|_| ctx.tournament(&fitness) == 1).count();
        // P(index 1 in 5 draws) = 1 - (3/4)^5 ~ 0.76
        assert!(wins > 650, "wins = {wins}");
    }

    #[test]
    fn test_single_draw_tournament_is_uniform_pick() {
        let params = GaParams {
            tournament_size: 1,
            ..GaParams::default()
        };
        let mut ctx = GaContext::seeded(params, 4);
        let fitness = vec![0.0, 10.0];
        let zeros = (0..1000).filter(|_| ctx.tournament(&fitness) == 0).count();
        assert!(zeros > 400 && zeros < 600, "zeros = {zeros}");
    }

    #[test]
    fn test_crossover_takes_genes_from_parents() {
        let mut ctx = GaContext::seeded(GaParams::default(), 5);
        let a: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..200).map(|i| -(i as f64) - 1.0).collect();
        let child = ctx.crossover(&a, &b);
        assert_eq!(child.len(), a.len());
        for (i, g) in child.iter().enumerate() {
            assert!(*g == a[i] || *g == b[i]);
        }
        assert!(child.iter().zip(&a).any(|(c, p)| c == p));
        assert!(child.iter().zip(&b).any(|(c, p)| c == p));
    }

    #[test]
    fn test_mutation_stays_in_range() {
        let params = GaParams {
            mutation_rate: 1.0,
            mutation_strength: 5.0,
            ..GaParams::default()
        };
        let mut ctx = GaContext::seeded(params, 6);
        let mut genes: Vec<f64> = (0..500).map(|i| ((i % 21) as f64 - 10.0) / 10.0).collect();
        for _ in 0..10 {
            ctx.mutate(&mut genes);
            assert!(genes.iter().all(|g| (-1.0..=1.0).contains(g)));
        }
    }

    #[test]
    fn test_zero_rate_mutation_is_identity() {
        let params = GaParams {
            mutation_rate: 0.0,
            ..GaParams::default()
        };
        let mut ctx = GaContext::seeded(params, 7);
        let original = vec![0.3, -0.2, 0.9, -1.0];
        let mut genes = original.clone();
        ctx.mutate(&mut genes);
        assert_eq!(genes, original);
    }

    #[test]
    fn test_out_of_range_rate_leaves_genes_alone() {
        for rate in [f64::NAN, 3.0] {
            let params = GaParams {
                mutation_rate: rate,
                ..GaParams::default()
            };
            let mut ctx = GaContext::seeded(params, 8);
            let mut genes = vec![0.5; 20];
            ctx.mutate(&mut genes);
            assert_eq!(genes, vec![0.5; 20]);
        }
    }

    #[test]
    fn test_seeded_contexts_agree() {
        let mut a = GaContext::seeded(GaParams::default(), 99);
        let mut b = GaContext::seeded(GaParams::default(), 99);
        let parents = (vec![0.1; 50], vec![-0.1; 50]);
        assert_eq!(a.crossover(&parents.0, &parents.1), b.crossover(&parents.0, &parents.1));
    }
}

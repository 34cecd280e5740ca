use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::index;

use lotopick_db::models::{Candidate, Group, Variant};

use crate::config::SourceKind;

/// Lissage de Dirichlet appliqué aux fréquences : aucun numéro n'a un poids nul.
pub const PRIOR_ALPHA: f64 = 1.0;

/// Fournit des grilles brutes, structurellement valides, à classer ensuite.
pub trait CandidateSource: Send {
    fn name(&self) -> &str;
    fn produce(&mut self, count: usize, rng: &mut StdRng) -> Vec<Candidate>;
}

pub fn build_source(
    kind: SourceKind,
    variant: Variant,
    history: &[Candidate],
    lookback: usize,
) -> Box<dyn CandidateSource> {
    match kind {
        SourceKind::Uniform => Box::new(UniformRandom::new(variant)),
        SourceKind::HistoryWeighted => {
            Box::new(HistoryWeightedPool::new(variant, history, lookback))
        }
    }
}

fn sample_uniform(max: u8, count: usize, rng: &mut StdRng) -> Vec<u8> {
    index::sample(rng, max as usize, count)
        .into_iter()
        .map(|i| (i + 1) as u8)
        .collect()
}

fn assemble(variant: Variant, primary: Vec<u8>, secondary: Vec<u8>) -> Option<Candidate> {
    match Candidate::new(variant, primary, secondary) {
        Ok(c) => Some(c),
        Err(e) => {
            log::error!("Sampler produced an invalid ticket: {e}");
            None
        }
    }
}

pub struct UniformRandom {
    variant: Variant,
}

impl UniformRandom {
    pub fn new(variant: Variant) -> Self {
        Self { variant }
    }

    pub fn sample_one(&self, rng: &mut StdRng) -> Option<Candidate> {
        let v = self.variant;
        let primary = sample_uniform(v.range(Group::Primary), v.pick_count(Group::Primary), rng);
        let secondary =
            sample_uniform(v.range(Group::Secondary), v.pick_count(Group::Secondary), rng);
        assemble(v, primary, secondary)
    }
}

impl CandidateSource for UniformRandom {
    fn name(&self) -> &str {
        "Uniform"
    }

    fn produce(&mut self, count: usize, rng: &mut StdRng) -> Vec<Candidate> {
        (0..count).filter_map(|_| self.sample_one(rng)).collect()
    }
}

/// Pool pondéré par la fréquence de chaque numéro sur les `lookback` derniers tirages.
pub struct HistoryWeightedPool {
    variant: Variant,
    primary_weights: Vec<f64>,
    secondary_weights: Vec<f64>,
}

/// Probabilités lissées (alpha + effectif) / (n·alpha + total), index 0 = numéro 1.
pub fn frequency_weights(
    history: &[Candidate],
    variant: Variant,
    group: Group,
    lookback: usize,
) -> Vec<f64> {
    let size = variant.range(group) as usize;
    let mut counts = vec![0u32; size];
    for draw in history.iter().take(lookback) {
        for &n in draw.numbers(group) {
            let idx = (n - 1) as usize;
            if idx < counts.len() {
                counts[idx] += 1;
            }
        }
    }
    let total: u32 = counts.iter().sum();
    let denominator = size as f64 * PRIOR_ALPHA + total as f64;
    counts
        .iter()
        .map(|&c| (PRIOR_ALPHA + c as f64) / denominator)
        .collect()
}

impl HistoryWeightedPool {
    pub fn new(variant: Variant, history: &[Candidate], lookback: usize) -> Self {
        Self {
            variant,
            primary_weights: frequency_weights(history, variant, Group::Primary, lookback),
            secondary_weights: frequency_weights(history, variant, Group::Secondary, lookback),
        }
    }

    fn sample_group(&self, group: Group, rng: &mut StdRng) -> Vec<u8> {
        let weights = match group {
            Group::Primary => &self.primary_weights,
            Group::Secondary => &self.secondary_weights,
        };
        let count = self.variant.pick_count(group);
        match sample_without_replacement(weights, count, rng) {
            Ok(numbers) => numbers,
            Err(e) => {
                log::warn!("Weighted sampling failed ({e}), falling back to uniform");
                sample_uniform(self.variant.range(group), count, rng)
            }
        }
    }
}

impl CandidateSource for HistoryWeightedPool {
    fn name(&self) -> &str {
        "HistoryWeighted"
    }

    fn produce(&mut self, count: usize, rng: &mut StdRng) -> Vec<Candidate> {
        (0..count)
            .filter_map(|_| {
                let primary = self.sample_group(Group::Primary, rng);
                let secondary = self.sample_group(Group::Secondary, rng);
                assemble(self.variant, primary, secondary)
            })
            .collect()
    }
}

fn sample_without_replacement(
    weights: &[f64],
    count: usize,
    rng: &mut StdRng,
) -> Result<Vec<u8>, rand::distr::weighted::Error> {
    let mut available: Vec<(u8, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| ((i + 1) as u8, w))
        .collect();
    let mut selected = Vec::with_capacity(count);

    for _ in 0..count {
        let w: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
        let dist = WeightedIndex::new(&w)?;
        let idx = dist.sample(rng);
        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotopick_db::models::make_test_history;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_produces_valid_tickets() {
        let mut rng = StdRng::seed_from_u64(42);
        for variant in [Variant::DoubleColor, Variant::SuperLotto, Variant::EuroMillions] {
            let mut source = UniformRandom::new(variant);
            let tickets = source.produce(200, &mut rng);
            assert_eq!(tickets.len(), 200);
            for t in &tickets {
                assert_eq!(t.primary().len(), variant.pick_count(Group::Primary));
                assert!(t.primary().windows(2).all(|w| w[0] < w[1]));
                assert!(*t.primary().last().unwrap() <= variant.range(Group::Primary));
                let smax = variant.range(Group::Secondary);
                assert!(t.secondary().iter().all(|&s| s >= 1 && s <= smax));
            }
        }
    }

    #[test]
    fn test_uniform_seed_determinism() {
        let mut a = UniformRandom::new(Variant::DoubleColor);
        let mut b = UniformRandom::new(Variant::DoubleColor);
        let ta = a.produce(20, &mut StdRng::seed_from_u64(7));
        let tb = b.produce(20, &mut StdRng::seed_from_u64(7));
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_frequency_weights_sum_to_one() {
        let history = make_test_history(Variant::SuperLotto, 30);
        let w = frequency_weights(&history, Variant::SuperLotto, Group::Primary, 20);
        assert_eq!(w.len(), 35);
        let sum: f64 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10, "Sum = {sum}");
        assert!(w.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_frequency_weights_uniform_without_history() {
        let w = frequency_weights(&[], Variant::DoubleColor, Group::Secondary, 50);
        for &p in &w {
            assert!((p - 1.0 / 16.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_weighted_pool_favours_frequent_numbers() {
        let hot = Candidate::new(Variant::DoubleColor, vec![1, 2, 3, 4, 5, 6], vec![1]).unwrap();
        let history = vec![hot; 50];
        let mut source = HistoryWeightedPool::new(Variant::DoubleColor, &history, 50);
        let mut rng = StdRng::seed_from_u64(3);
        let tickets = source.produce(100, &mut rng);
        assert_eq!(tickets.len(), 100);
        let hits: usize = tickets
            .iter()
            .map(|t| t.primary().iter().filter(|&&n| n <= 6).count())
            .sum();
        // uniforme : ~6·6/33 ≈ 1.1 par grille
        assert!(hits > 300, "hits = {hits}");
    }

    #[test]
    fn test_build_source_kinds() {
        let history = make_test_history(Variant::EuroMillions, 10);
        let uniform = build_source(SourceKind::Uniform, Variant::EuroMillions, &history, 10);
        assert_eq!(uniform.name(), "Uniform");
        assert_eq!(
            build_source(SourceKind::HistoryWeighted, Variant::EuroMillions, &history, 10).name(),
            "HistoryWeighted"
        );
    }
}

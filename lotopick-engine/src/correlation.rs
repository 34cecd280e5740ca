use std::collections::BTreeMap;

use lotopick_db::models::{Candidate, Group, Variant};

use crate::config::GenerationConfig;
use crate::sequence::overlap_count;

/// Nombre d'utilisations de chaque numéro complémentaire dans le lot en cours.
pub type SecondaryUsage = BTreeMap<u8, usize>;

/// Le recouvrement principal avec chaque grille déjà retenue reste dans la borne.
pub fn passes_batch_correlation<C: AsRef<Candidate>>(
    candidate: &Candidate,
    accepted_so_far: &[C],
    config: &GenerationConfig,
) -> bool {
    accepted_so_far
        .iter()
        .all(|a| {
            overlap_count(candidate.primary(), a.as_ref().primary()) <= config.max_primary_overlap
        })
}

pub fn secondary_usage_allowed(
    value: u8,
    usage: &SecondaryUsage,
    config: &GenerationConfig,
) -> bool {
    usage.get(&value).copied().unwrap_or(0) < config.max_secondary_reuse
}

pub fn secondaries_allowed(
    candidate: &Candidate,
    usage: &SecondaryUsage,
    config: &GenerationConfig,
) -> bool {
    candidate
        .secondary()
        .iter()
        .all(|&s| secondary_usage_allowed(s, usage, config))
}

pub fn record_secondary_usage(candidate: &Candidate, usage: &mut SecondaryUsage) {
    for &s in candidate.secondary() {
        *usage.entry(s).or_insert(0) += 1;
    }
}

/// Diversité moyenne du lot dans [0, 1] : 1 - recouvrement normalisé, moyenné
/// sur toutes les paires. Indicatif seulement, n'intervient dans aucun tri.
pub fn diversity_score<C: AsRef<Candidate>>(batch: &[C], variant: Variant) -> f64 {
    if batch.len() < 2 {
        return 1.0;
    }
    let k = variant.pick_count(Group::Primary) as f64;
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..batch.len() {
        for j in (i + 1)..batch.len() {
            let overlap =
                overlap_count(batch[i].as_ref().primary(), batch[j].as_ref().primary()) as f64;
            total += 1.0 - overlap / k;
            pairs += 1;
        }
    }
    total / pairs as f64
}

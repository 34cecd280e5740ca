use lotopick_db::models::{Candidate, Group, Variant};

use crate::config::{sum_centre, GenerationConfig};
use crate::sequence::{
    birthday_like_count, has_arithmetic_subsequence, is_arithmetic_progression,
    max_consecutive_run, max_same_last_digit, multiples_count, odd_even_split, zone_distribution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ConsecutiveRun(usize),
    OddCount(usize),
    Sum(u32),
    SameLastDigit(usize),
    ConsecutiveSecondary,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::ConsecutiveRun(n) => write!(f, "série de {n} consécutifs"),
            RejectReason::OddCount(n) => write!(f, "{n} impairs"),
            RejectReason::Sum(s) => write!(f, "somme {s} hors bornes"),
            RejectReason::SameLastDigit(n) => write!(f, "{n} numéros de même finale"),
            RejectReason::ConsecutiveSecondary => write!(f, "complémentaires consécutifs"),
        }
    }
}

/// Première règle structurelle violée, dans l'ordre d'évaluation.
pub fn hard_reject_reason(
    candidate: &Candidate,
    config: &GenerationConfig,
) -> Option<RejectReason> {
    let primary = candidate.primary();

    let run = max_consecutive_run(primary);
    if run > config.max_run {
        return Some(RejectReason::ConsecutiveRun(run));
    }

    let (odd, _) = odd_even_split(primary);
    let (odd_min, odd_max) = config.odd_count_bounds;
    if odd < odd_min || odd > odd_max {
        return Some(RejectReason::OddCount(odd));
    }

    let sum = candidate.primary_sum();
    let (sum_min, sum_max) = config.sum_bounds;
    if sum < sum_min || sum > sum_max {
        return Some(RejectReason::Sum(sum));
    }

    let same = max_same_last_digit(primary);
    if same > config.max_same_last_digit {
        return Some(RejectReason::SameLastDigit(same));
    }

    if config.no_consecutive_secondary && max_consecutive_run(candidate.secondary()) >= 2 {
        return Some(RejectReason::ConsecutiveSecondary);
    }

    None
}

pub fn hard_reject(candidate: &Candidate, config: &GenerationConfig) -> bool {
    hard_reject_reason(candidate, config).is_some()
}

/// Barème des signaux de « grille populaire ». La structure d'évaluation est
/// commune, seuls les poids et seuils changent d'une variante à l'autre.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub run_five: u32,
    pub run_four: u32,
    pub run_three: u32,
    pub progression: u32,
    pub progression_subsequence: u32,
    pub birthday: u32,
    pub last_digit: u32,
    pub multiples: u32,
    pub odd_even: u32,
    pub sum_range: u32,
    pub zone: u32,
    pub secondary_range: u32,
    pub birthday_threshold: u8,
    pub typical_sum_ratio: f64,
    pub zones: usize,
    pub popular_secondary_max: u8,
}

impl ScoreWeights {
    pub fn for_variant(variant: Variant) -> Self {
        let base = Self {
            run_five: 5,
            run_four: 3,
            run_three: 1,
            progression: 5,
            progression_subsequence: 2,
            birthday: 3,
            last_digit: 3,
            multiples: 3,
            odd_even: 1,
            sum_range: 1,
            zone: 3,
            secondary_range: 1,
            birthday_threshold: 31,
            typical_sum_ratio: 0.25,
            zones: 3,
            popular_secondary_max: 7,
        };
        match variant {
            // Sur 33 numéros, une grille « anniversaire » est la norme : signal faible.
            Variant::DoubleColor => Self { birthday: 1, popular_secondary_max: 8, ..base },
            Variant::SuperLotto => Self { birthday: 2, popular_secondary_max: 6, ..base },
            Variant::EuroMillions => Self { popular_secondary_max: 6, ..base },
        }
    }
}

/// Ressemblance heuristique avec une grille choisie par un humain.
/// Plus le score est bas, plus la grille est « originale ».
pub fn popularity_score(candidate: &Candidate, config: &GenerationConfig) -> u32 {
    let variant = config.variant;
    let w = ScoreWeights::for_variant(variant);
    let primary = candidate.primary();
    let k = primary.len();
    let mut score = 0;

    score += match max_consecutive_run(primary) {
        r if r >= 5 => w.run_five,
        4 => w.run_four,
        3 => w.run_three,
        _ => 0,
    };

    if k >= 3 && is_arithmetic_progression(primary) {
        score += w.progression;
    } else if has_arithmetic_subsequence(primary, 4) {
        score += w.progression_subsequence;
    }

    if birthday_like_count(primary, w.birthday_threshold) == k {
        score += w.birthday;
    }

    if max_same_last_digit(primary) >= 3 {
        score += w.last_digit;
    }

    if multiples_count(primary, 5) >= 3 {
        score += w.multiples;
    }

    let (odd, even) = odd_even_split(primary);
    if odd == 0 || even == 0 {
        score += w.odd_even;
    }

    let centre = sum_centre(variant);
    if (candidate.primary_sum() as f64 - centre).abs() > centre * w.typical_sum_ratio {
        score += w.sum_range;
    }

    let zones = zone_distribution(primary, w.zones, variant.range(Group::Primary));
    if zones.iter().copied().max().unwrap_or(0) >= k - k / 3 {
        score += w.zone;
    }

    if candidate.secondary().iter().all(|&s| s <= w.popular_secondary_max) {
        score += w.secondary_range;
    }

    score
}

/// Clé secondaire de classement : distance de la somme au centre de la variante.
pub fn sum_distance(candidate: &Candidate) -> u32 {
    let centre = sum_centre(candidate.variant()).round() as i64;
    (candidate.primary_sum() as i64 - centre).unsigned_abs() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, Mode};

    fn ssq(primary: &[u8], secondary: u8) -> Candidate {
        Candidate::new(Variant::DoubleColor, primary.to_vec(), vec![secondary]).unwrap()
    }

    #[test]
    fn test_hard_reject_run() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        let c = ssq(&[3, 4, 5, 18, 25, 31], 9);
        assert_eq!(hard_reject_reason(&c, &config), Some(RejectReason::ConsecutiveRun(3)));
    }

    #[test]
    fn test_hard_reject_odd_and_sum() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        // 6 impairs
        let c = ssq(&[1, 7, 13, 19, 25, 31], 9);
        assert_eq!(hard_reject_reason(&c, &config), Some(RejectReason::OddCount(6)));
        // somme 41 < 71
        let c = ssq(&[1, 3, 6, 8, 10, 13], 9);
        assert_eq!(hard_reject_reason(&c, &config), Some(RejectReason::Sum(41)));
    }

    #[test]
    fn test_hard_reject_last_digit() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        let c = ssq(&[2, 12, 17, 22, 28, 33], 9);
        assert_eq!(hard_reject_reason(&c, &config), Some(RejectReason::SameLastDigit(3)));
    }

    #[test]
    fn test_hard_reject_consecutive_secondary() {
        let config = GenerationConfig::preset(Variant::SuperLotto, Mode::Strict);
        assert!(config.no_consecutive_secondary);
        let c = Candidate::new(Variant::SuperLotto, vec![3, 11, 18, 24, 32], vec![5, 6]).unwrap();
        assert_eq!(hard_reject_reason(&c, &config), Some(RejectReason::ConsecutiveSecondary));
        let c = Candidate::new(Variant::SuperLotto, vec![3, 11, 18, 24, 32], vec![5, 9]).unwrap();
        assert!(!hard_reject(&c, &config));
    }

    #[test]
    fn test_hard_reject_accepts_balanced_ticket() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        let c = ssq(&[4, 9, 15, 21, 26, 32], 11);
        assert_eq!(hard_reject_reason(&c, &config), None);
    }

    #[test]
    fn test_light_mode_tolerates_more() {
        let overrides = ConfigOverrides::default();
        let config = GenerationConfig::new(Variant::DoubleColor, Mode::Light, &overrides).unwrap();
        let c = ssq(&[1, 7, 13, 19, 25, 31], 9);
        assert!(!hard_reject(&c, &config));
    }

    #[test]
    fn test_score_popular_patterns() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Light);
        // 1..6 : série de 6 (+5), progression (+5), anniversaire (+1), zone (+3),
        // somme 21 hors plage (+1), complémentaire bas (+1)
        let obvious = ssq(&[1, 2, 3, 4, 5, 6], 1);
        assert_eq!(popularity_score(&obvious, &config), 16);

        // multiples de 5 et mêmes finales
        let round = ssq(&[5, 10, 15, 20, 25, 30], 16);
        let score = popularity_score(&round, &config);
        assert!(score >= 5 + 3 + 3, "score = {score}");
    }

    #[test]
    fn test_score_spread_ticket_is_low() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        let c = ssq(&[4, 9, 15, 21, 26, 32], 11);
        let s = popularity_score(&c, &config);
        assert!(s <= 1, "score = {s}");
    }

    #[test]
    fn test_weights_differ_per_variant() {
        assert_eq!(ScoreWeights::for_variant(Variant::DoubleColor).birthday, 1);
        assert_eq!(ScoreWeights::for_variant(Variant::EuroMillions).birthday, 3);
    }

    #[test]
    fn test_sum_distance() {
        let c = ssq(&[4, 9, 15, 21, 26, 32], 11);
        assert_eq!(sum_distance(&c), 5);
    }
}

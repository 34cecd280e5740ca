//! Primitives sur une suite courte et triée de numéros (6 au plus en pratique).
//! Toutes les fonctions sont pures et déterministes.

use std::collections::BTreeMap;

/// Taille maximale acceptée par la recherche exhaustive de sous-suites.
/// Au-delà, le nombre de sous-ensembles (2^n) n'est plus négligeable.
pub const MAX_EXHAUSTIVE_LEN: usize = 12;

/// Plus longue série d'entiers consécutifs. 0 pour une suite vide.
pub fn max_consecutive_run(seq: &[u8]) -> usize {
    if seq.is_empty() {
        return 0;
    }
    let mut best = 1;
    let mut current = 1;
    for w in seq.windows(2) {
        if w[1] == w[0].wrapping_add(1) {
            current += 1;
            best = best.max(current);
        } else {
            current = 1;
        }
    }
    best
}

/// Vrai si les écarts successifs sont tous égaux (toujours vrai jusqu'à 2 éléments).
pub fn is_arithmetic_progression(seq: &[u8]) -> bool {
    if seq.len() <= 2 {
        return true;
    }
    let step = seq[1] as i16 - seq[0] as i16;
    seq.windows(2).all(|w| w[1] as i16 - w[0] as i16 == step)
}

/// Existe-t-il k éléments de `seq` formant une progression arithmétique ?
///
/// Parcourt tous les sous-ensembles de taille k ; `seq` doit rester court.
pub fn has_arithmetic_subsequence(seq: &[u8], k: usize) -> bool {
    assert!(
        seq.len() <= MAX_EXHAUSTIVE_LEN,
        "recherche exhaustive limitée à {} éléments, reçu {}",
        MAX_EXHAUSTIVE_LEN,
        seq.len()
    );
    if k > seq.len() {
        return false;
    }
    if k <= 2 {
        return true;
    }

    let n = seq.len();
    let mut subset = Vec::with_capacity(k);
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize != k {
            continue;
        }
        subset.clear();
        subset.extend((0..n).filter(|i| mask & (1 << i) != 0).map(|i| seq[i]));
        if is_arithmetic_progression(&subset) {
            return true;
        }
    }
    false
}

/// Répartition en `zones` tranches de largeur égale sur 1..=max_value.
/// La dernière tranche absorbe le reste de la division entière.
pub fn zone_distribution(seq: &[u8], zones: usize, max_value: u8) -> Vec<usize> {
    if zones == 0 {
        return Vec::new();
    }
    let width = (max_value as usize / zones).max(1);
    let mut counts = vec![0usize; zones];
    for &n in seq {
        let idx = (n.saturating_sub(1) as usize / width).min(zones - 1);
        counts[idx] += 1;
    }
    counts
}

/// Taille de l'intersection des deux ensembles.
pub fn overlap_count(a: &[u8], b: &[u8]) -> usize {
    a.iter().filter(|x| b.contains(x)).count()
}

pub fn last_digit_histogram(seq: &[u8]) -> BTreeMap<u8, usize> {
    let mut hist = BTreeMap::new();
    for &n in seq {
        *hist.entry(n % 10).or_insert(0) += 1;
    }
    hist
}

/// Effectif du chiffre des unités le plus représenté.
pub fn max_same_last_digit(seq: &[u8]) -> usize {
    last_digit_histogram(seq).values().copied().max().unwrap_or(0)
}

pub fn multiples_count(seq: &[u8], divisor: u8) -> usize {
    if divisor == 0 {
        return 0;
    }
    seq.iter().filter(|&&n| n % divisor == 0).count()
}

/// (impairs, pairs)
pub fn odd_even_split(seq: &[u8]) -> (usize, usize) {
    let odd = seq.iter().filter(|&&n| n % 2 == 1).count();
    (odd, seq.len() - odd)
}

/// Nombre de valeurs ≤ `threshold` : repère les grilles en forme de date.
pub fn birthday_like_count(seq: &[u8], threshold: u8) -> usize {
    seq.iter().filter(|&&n| n <= threshold).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_consecutive_run() {
        assert_eq!(max_consecutive_run(&[]), 0);
        assert_eq!(max_consecutive_run(&[7]), 1);
        assert_eq!(max_consecutive_run(&[1, 2, 3, 5, 7]), 3);
        assert_eq!(max_consecutive_run(&[1, 3, 5, 7]), 1);
        assert_eq!(max_consecutive_run(&[4, 10, 11, 12, 13, 30]), 4);
    }

    #[test]
    fn test_is_arithmetic_progression() {
        assert!(is_arithmetic_progression(&[]));
        assert!(is_arithmetic_progression(&[4, 19]));
        assert!(is_arithmetic_progression(&[5, 10, 15, 20, 25]));
        assert!(!is_arithmetic_progression(&[5, 10, 15, 21]));
    }

    #[test]
    fn test_has_arithmetic_subsequence() {
        // 3, 9, 15, 21 cachés au milieu
        let seq = [2, 3, 9, 11, 15, 21];
        assert!(has_arithmetic_subsequence(&seq, 4));
        assert!(!has_arithmetic_subsequence(&seq, 5));
        assert!(!has_arithmetic_subsequence(&[1, 2, 4, 8, 16, 32], 4));
        assert!(!has_arithmetic_subsequence(&[1, 2], 3));
    }

    #[test]
    #[should_panic]
    fn test_has_arithmetic_subsequence_rejects_long_input() {
        let seq: Vec<u8> = (1..=20).collect();
        has_arithmetic_subsequence(&seq, 3);
    }

    #[test]
    fn test_zone_distribution() {
        assert_eq!(zone_distribution(&[1, 5, 12, 20, 25, 30], 3, 33), vec![2, 2, 2]);
        // 35 / 3 = 11 : le 34 et le 35 tombent dans la dernière tranche
        assert_eq!(zone_distribution(&[1, 11, 12, 34, 35], 3, 35), vec![2, 1, 2]);
        assert!(zone_distribution(&[1, 2], 0, 33).is_empty());
    }

    #[test]
    fn test_overlap_count() {
        assert_eq!(overlap_count(&[1, 2, 3], &[2, 3, 4]), 2);
        assert_eq!(overlap_count(&[1, 2, 3], &[4, 5, 6]), 0);
        assert_eq!(overlap_count(&[], &[4, 5, 6]), 0);
    }

    #[test]
    fn test_last_digit_histogram() {
        let hist = last_digit_histogram(&[1, 11, 21, 5, 30]);
        assert_eq!(hist.get(&1), Some(&3));
        assert_eq!(hist.get(&0), Some(&1));
        assert_eq!(max_same_last_digit(&[1, 11, 21, 5, 30]), 3);
        assert_eq!(max_same_last_digit(&[]), 0);
    }

    #[test]
    fn test_counts() {
        assert_eq!(multiples_count(&[5, 10, 12, 15], 5), 3);
        assert_eq!(multiples_count(&[5, 10], 0), 0);
        assert_eq!(odd_even_split(&[1, 2, 3, 5, 8, 13]), (4, 2));
        assert_eq!(birthday_like_count(&[3, 12, 31, 32, 45], 31), 3);
    }
}

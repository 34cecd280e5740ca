use serde::Serialize;

use lotopick_db::models::Candidate;

use crate::config::GenerationConfig;
use crate::sequence::overlap_count;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HistoryRejection {
    /// Combinaison identique à un tirage passé.
    ExactMatch { period: usize },
    /// Trop proche d'un tirage de la fenêtre récente.
    RecentOverlap { period: usize, overlap: usize },
    /// Recouvrement maximal au-delà de la borne globale.
    DeepOverlap { period: usize, overlap: usize },
}

impl std::fmt::Display for HistoryRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRejection::ExactMatch { period } => {
                write!(f, "identique au tirage t-{period}")
            }
            HistoryRejection::RecentOverlap { period, overlap } => {
                write!(f, "{overlap} numéros communs avec le tirage récent t-{period}")
            }
            HistoryRejection::DeepOverlap { period, overlap } => {
                write!(f, "{overlap} numéros communs avec le tirage t-{period}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryCheck {
    pub is_valid: bool,
    /// Somme des recouvrements pondérés par 1/(position+1). Plus bas = plus neuf.
    pub overlap_score: f64,
    pub max_overlap: usize,
    /// Position (0 = plus récent) du tirage le plus ressemblant, ou de celui
    /// qui a motivé le rejet.
    pub matching_period: Option<usize>,
    pub reason: Option<HistoryRejection>,
}

impl HistoryCheck {
    pub fn is_exact_match(&self) -> bool {
        matches!(self.reason, Some(HistoryRejection::ExactMatch { .. }))
    }
}

/// Borne la ressemblance d'une grille avec les vrais tirages, plus sévèrement
/// sur les tirages récents. `history[0]` est le tirage le plus récent.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDuplicateFilter {
    pub max_history_overlap: usize,
    pub recent_strict_periods: usize,
    pub recent_max_overlap: usize,
}

impl HistoryDuplicateFilter {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_history_overlap: config.max_history_overlap,
            recent_strict_periods: config.recent_strict_periods,
            recent_max_overlap: config.recent_max_overlap,
        }
    }

    /// Une combinaison identique à un tirage passé est rejetée quelle que soit
    /// sa position, même au-delà de `lookback`, et prime sur tout autre motif.
    /// Pour les paliers de recouvrement, le verdict est figé à la première
    /// violation, mais la fenêtre est parcourue en entier pour que
    /// `overlap_score` reste comparable entre grilles acceptées et rejetées.
    pub fn filter(
        &self,
        candidate: &Candidate,
        history: &[Candidate],
        lookback: usize,
    ) -> HistoryCheck {
        let window = lookback.min(history.len());
        let mut overlap_score = 0.0;
        let mut max_overlap = 0usize;
        let mut max_period = None;
        let mut reason = history
            .iter()
            .position(|d| candidate.same_numbers(d))
            .map(|period| HistoryRejection::ExactMatch { period });

        for (i, draw) in history[..window].iter().enumerate() {
            let overlap = overlap_count(candidate.primary(), draw.primary());
            if max_period.is_none() || overlap > max_overlap {
                max_overlap = overlap;
                max_period = Some(i);
            }
            overlap_score += overlap as f64 / (i + 1) as f64;

            if reason.is_none()
                && i < self.recent_strict_periods
                && overlap > self.recent_max_overlap
            {
                reason = Some(HistoryRejection::RecentOverlap { period: i, overlap });
            }
        }

        if reason.is_none() && max_overlap > self.max_history_overlap {
            if let Some(period) = max_period {
                reason = Some(HistoryRejection::DeepOverlap { period, overlap: max_overlap });
            }
        }

        let matching_period = match reason {
            Some(HistoryRejection::ExactMatch { period })
            | Some(HistoryRejection::RecentOverlap { period, .. })
            | Some(HistoryRejection::DeepOverlap { period, .. }) => Some(period),
            None => max_period,
        };

        HistoryCheck {
            is_valid: reason.is_none(),
            overlap_score,
            max_overlap,
            matching_period,
            reason,
        }
    }

    /// Chaque candidat avec son verdict, du plus neuf au plus ressemblant.
    pub fn filter_batch(
        &self,
        candidates: &[Candidate],
        history: &[Candidate],
        lookback: usize,
    ) -> Vec<(Candidate, HistoryCheck)> {
        let mut results: Vec<(Candidate, HistoryCheck)> = candidates
            .iter()
            .map(|c| (c.clone(), self.filter(c, history, lookback)))
            .collect();
        results.sort_by(|a, b| a.1.overlap_score.total_cmp(&b.1.overlap_score));
        results
    }

    pub fn filter_and_select(
        &self,
        candidates: &[Candidate],
        history: &[Candidate],
        count: usize,
        lookback: usize,
    ) -> Vec<Candidate> {
        self.filter_batch(candidates, history, lookback)
            .into_iter()
            .filter(|(_, check)| check.is_valid)
            .take(count)
            .map(|(c, _)| c)
            .collect()
    }
}

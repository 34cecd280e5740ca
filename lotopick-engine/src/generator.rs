use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use lotopick_db::models::{Candidate, Group, Variant};

use crate::config::{ConfigError, GenerationConfig, SourceKind};
use crate::correlation::{
    diversity_score, passes_batch_correlation, record_secondary_usage, secondaries_allowed,
    SecondaryUsage,
};
use crate::history::{HistoryCheck, HistoryDuplicateFilter, HistoryRejection};
use crate::popularity::{hard_reject, popularity_score, sum_distance};
use crate::source::{build_source, CandidateSource, UniformRandom};

/// Plafond du facteur de suréchantillonnage après escalades successives.
pub const MAX_MULTIPLIER: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub popularity_score: u32,
    pub history_overlap_score: f64,
    pub degraded: bool,
}

impl AsRef<Candidate> for ScoredCandidate {
    fn as_ref(&self) -> &Candidate {
        &self.candidate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegradeCause {
    /// Aucune grille tirée ne respectait les règles dures.
    NoStructuralMatch,
    /// Des grilles valides existaient, mais aucune ne passait lot + historique.
    ConstraintsUnmet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedSlot {
    pub slot: usize,
    pub attempts: usize,
    pub cause: DegradeCause,
    pub batch_conflict: bool,
    pub history_reason: Option<HistoryRejection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsufficientHistory {
    pub available: usize,
    pub required: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchDiagnostics {
    pub diversity_score: f64,
    pub degraded_count: usize,
    /// Nombre d'escalades par emplacement (tentatives - 1).
    pub slot_retries: Vec<usize>,
    pub total_attempts: usize,
    pub hard_rejected: usize,
    pub correlation_rejected: usize,
    pub history_rejected: usize,
    pub degraded_slots: Vec<DegradedSlot>,
    pub insufficient_history: Option<InsufficientHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    pub tickets: Vec<ScoredCandidate>,
    pub diagnostics: BatchDiagnostics,
}

/// État propre à un appel de `generate` ; jamais partagé entre deux lots.
struct BatchState {
    accepted: Vec<ScoredCandidate>,
    secondary_usage: SecondaryUsage,
    attempts_left: usize,
    diagnostics: BatchDiagnostics,
}

impl BatchState {
    fn new(count: usize, max_attempts: usize) -> Self {
        Self {
            accepted: Vec::with_capacity(count),
            secondary_usage: SecondaryUsage::new(),
            attempts_left: max_attempts,
            diagnostics: BatchDiagnostics::default(),
        }
    }

    fn commit(&mut self, ticket: ScoredCandidate) {
        record_secondary_usage(&ticket.candidate, &mut self.secondary_usage);
        if ticket.degraded {
            self.diagnostics.degraded_count += 1;
        }
        self.accepted.push(ticket);
    }

    fn finalize(mut self, variant: Variant) -> Batch {
        self.diagnostics.diversity_score = diversity_score(&self.accepted, variant);
        Batch {
            tickets: self.accepted,
            diagnostics: self.diagnostics,
        }
    }
}

/// Historique trop court : tirage uniforme, sans classement ni paliers de
/// recouvrement. Règles dures, diversité du lot et doublon exact restent appliqués.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipeline {
    Full,
    RandomOnly,
}

struct Ranked {
    candidate: Candidate,
    popularity: u32,
}

struct Fallback {
    candidate: Candidate,
    popularity: u32,
    check: HistoryCheck,
    batch_conflict: bool,
    duplicate: bool,
}

impl Fallback {
    fn is_better_than(&self, other: &Fallback) -> bool {
        let a = (self.duplicate, self.check.is_exact_match(), self.batch_conflict);
        let b = (other.duplicate, other.check.is_exact_match(), other.batch_conflict);
        match a.cmp(&b) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.check.overlap_score < other.check.overlap_score,
        }
    }
}

enum Phase {
    Collect,
    Rank(Vec<Candidate>),
    HistoryFilter(Vec<Ranked>),
    Escalate,
    Degrade,
    Accept(ScoredCandidate),
}

pub struct Generator {
    config: GenerationConfig,
    history: Vec<Candidate>,
    source: Box<dyn CandidateSource>,
    rng: StdRng,
    pipeline: Pipeline,
    history_filter: HistoryDuplicateFilter,
    lookback: usize,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

impl Generator {
    /// `history[0]` doit être le tirage le plus récent.
    pub fn new(
        config: GenerationConfig,
        history: Vec<Candidate>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let kind = if history.len() < config.min_history && config.source != SourceKind::Uniform {
            log::warn!(
                "History too short for weighted sampling ({} < {}), using uniform source",
                history.len(),
                config.min_history
            );
            SourceKind::Uniform
        } else {
            config.source
        };
        let source = build_source(kind, config.variant, &history, config.lookback_periods);
        Self::with_source(config, history, source, seed)
    }

    pub fn with_source(
        config: GenerationConfig,
        history: Vec<Candidate>,
        source: Box<dyn CandidateSource>,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (pipeline, history_filter, lookback) = if history.len() < config.min_history {
            let exact_only = HistoryDuplicateFilter {
                max_history_overlap: usize::MAX,
                recent_strict_periods: 0,
                recent_max_overlap: usize::MAX,
            };
            (Pipeline::RandomOnly, exact_only, history.len())
        } else {
            (Pipeline::Full, HistoryDuplicateFilter::from_config(&config), config.lookback_periods)
        };

        Ok(Self {
            config,
            history,
            source,
            rng: make_rng(seed),
            pipeline,
            history_filter,
            lookback,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn generate(&mut self, count: usize) -> Batch {
        let mut state = BatchState::new(count, self.config.max_attempts);

        if self.pipeline == Pipeline::RandomOnly {
            let insufficient = InsufficientHistory {
                available: self.history.len(),
                required: self.config.min_history,
            };
            log::warn!(
                "Insufficient history ({} < {}): random sampling without ranking",
                insufficient.available,
                insufficient.required
            );
            state.diagnostics.insufficient_history = Some(insufficient);
        }

        for slot in 0..count {
            let ticket = self.fill_slot(slot, count, &mut state);
            state.commit(ticket);
        }

        let batch = state.finalize(self.config.variant);
        log::info!(
            "Generated {} tickets ({} degraded, {} attempts, diversity {:.3})",
            batch.tickets.len(),
            batch.diagnostics.degraded_count,
            batch.diagnostics.total_attempts,
            batch.diagnostics.diversity_score
        );
        batch
    }

    /// Pas d'escalade : plus les bornes de recouvrement sont serrées, plus on
    /// élargit l'échantillon à chaque tentative.
    fn escalation_step(&self) -> usize {
        let k = self.config.variant.pick_count(Group::Primary);
        1 + k.saturating_sub(self.config.max_primary_overlap)
            + k.saturating_sub(self.config.max_history_overlap)
    }

    fn fill_slot(&mut self, slot: usize, count: usize, state: &mut BatchState) -> ScoredCandidate {
        // Au moins une collecte par emplacement, même budget global épuisé.
        let budget = self.config.tries_per_ticket.min(state.attempts_left).max(1);
        let mut multiplier = self.config.oversample;
        let mut attempts = 0usize;
        let mut fallback: Option<Fallback> = None;
        let mut last_raw: Vec<Candidate> = Vec::new();
        let mut phase = Phase::Collect;

        loop {
            phase = match phase {
                Phase::Collect => {
                    attempts += 1;
                    let raw = self.source.produce(count * multiplier, &mut self.rng);
                    log::debug!(
                        "Slot {slot} attempt {attempts}: {} raw candidates (x{multiplier})",
                        raw.len()
                    );
                    Phase::Rank(raw)
                }
                Phase::Rank(raw) => {
                    let ranked = self.rank(&raw, state);
                    last_raw = raw;
                    Phase::HistoryFilter(ranked)
                }
                Phase::HistoryFilter(ranked) => match self.select(ranked, state, &mut fallback) {
                    Some(ticket) => Phase::Accept(ticket),
                    None if attempts < budget => Phase::Escalate,
                    None => Phase::Degrade,
                },
                Phase::Escalate => {
                    multiplier = (multiplier + self.escalation_step()).min(MAX_MULTIPLIER);
                    Phase::Collect
                }
                Phase::Degrade => {
                    Phase::Accept(self.degrade(slot, attempts, fallback.take(), &last_raw, state))
                }
                Phase::Accept(ticket) => {
                    state.attempts_left = state.attempts_left.saturating_sub(attempts);
                    state.diagnostics.total_attempts += attempts;
                    state.diagnostics.slot_retries.push(attempts - 1);
                    return ticket;
                }
            };
        }
    }

    /// Écarte doublons et grilles rejetées par les règles dures, puis trie de la
    /// moins « populaire » à la plus populaire (sauf en tirage purement aléatoire).
    fn rank(&self, raw: &[Candidate], state: &mut BatchState) -> Vec<Ranked> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<Ranked> = Vec::with_capacity(raw.len());
        for candidate in raw {
            if !seen.insert(candidate) {
                continue;
            }
            if hard_reject(candidate, &self.config) {
                state.diagnostics.hard_rejected += 1;
                continue;
            }
            ranked.push(Ranked {
                popularity: popularity_score(candidate, &self.config),
                candidate: candidate.clone(),
            });
        }

        if self.pipeline == Pipeline::Full {
            ranked.sort_by_key(|r| (r.popularity, sum_distance(&r.candidate)));
        }
        ranked
    }

    fn evaluate(&self, candidate: &Candidate, state: &BatchState) -> (bool, HistoryCheck) {
        let correlation_ok = passes_batch_correlation(candidate, &state.accepted, &self.config)
            && secondaries_allowed(candidate, &state.secondary_usage, &self.config);
        let check = self.history_filter.filter(candidate, &self.history, self.lookback);
        (correlation_ok, check)
    }

    fn select(
        &self,
        ranked: Vec<Ranked>,
        state: &mut BatchState,
        fallback: &mut Option<Fallback>,
    ) -> Option<ScoredCandidate> {
        for r in ranked {
            let (correlation_ok, check) = self.evaluate(&r.candidate, state);
            if correlation_ok && check.is_valid {
                return Some(ScoredCandidate {
                    candidate: r.candidate,
                    popularity_score: r.popularity,
                    history_overlap_score: check.overlap_score,
                    degraded: false,
                });
            }

            if !correlation_ok {
                state.diagnostics.correlation_rejected += 1;
            } else {
                state.diagnostics.history_rejected += 1;
            }

            let duplicate = state.accepted.iter().any(|a| a.candidate.same_numbers(&r.candidate));
            let contender = Fallback {
                candidate: r.candidate,
                popularity: r.popularity,
                check,
                batch_conflict: !correlation_ok,
                duplicate,
            };
            if fallback.as_ref().map_or(true, |f| contender.is_better_than(f)) {
                *fallback = Some(contender);
            }
        }
        None
    }

    fn degrade(
        &mut self,
        slot: usize,
        attempts: usize,
        fallback: Option<Fallback>,
        last_raw: &[Candidate],
        state: &mut BatchState,
    ) -> ScoredCandidate {
        let (best, cause) = match fallback {
            Some(f) => (f, DegradeCause::ConstraintsUnmet),
            None => {
                // Rien n'a passé les règles dures : on se rabat sur le dernier tirage brut.
                let mut best: Option<Fallback> = None;
                for candidate in last_raw {
                    let (correlation_ok, check) = self.evaluate(candidate, state);
                    let contender = Fallback {
                        candidate: candidate.clone(),
                        popularity: popularity_score(candidate, &self.config),
                        check,
                        batch_conflict: !correlation_ok,
                        duplicate: state
                            .accepted
                            .iter()
                            .any(|a| a.candidate.same_numbers(candidate)),
                    };
                    if best.as_ref().map_or(true, |b| contender.is_better_than(b)) {
                        best = Some(contender);
                    }
                }
                match best {
                    Some(b) => (b, DegradeCause::NoStructuralMatch),
                    None => {
                        // Source muette : tirage uniforme, sinon la plus petite combinaison.
                        let variant = self.config.variant;
                        let candidate = UniformRandom::new(variant)
                            .sample_one(&mut self.rng)
                            .unwrap_or_else(|| Candidate::first_combination(variant));
                        let (correlation_ok, check) = self.evaluate(&candidate, state);
                        let popularity = popularity_score(&candidate, &self.config);
                        let duplicate = state
                            .accepted
                            .iter()
                            .any(|a| a.candidate.same_numbers(&candidate));
                        let fallback = Fallback {
                            candidate,
                            popularity,
                            check,
                            batch_conflict: !correlation_ok,
                            duplicate,
                        };
                        (fallback, DegradeCause::NoStructuralMatch)
                    }
                }
            }
        };

        log::warn!(
            "Slot {slot}: retry budget exhausted after {attempts} attempts, \
             degraded pick {} ({:?})",
            best.candidate,
            cause
        );
        state.diagnostics.degraded_slots.push(DegradedSlot {
            slot,
            attempts,
            cause,
            batch_conflict: best.batch_conflict,
            history_reason: best.check.reason,
        });

        ScoredCandidate {
            candidate: best.candidate,
            popularity_score: best.popularity,
            history_overlap_score: best.check.overlap_score,
            degraded: true,
        }
    }
}

/// Raccourci : valide la configuration, génère un lot et rend la main.
pub fn generate_batch(
    config: GenerationConfig,
    history: Vec<Candidate>,
    count: usize,
    seed: Option<u64>,
) -> Result<Batch, ConfigError> {
    let mut generator = Generator::new(config, history, seed)?;
    Ok(generator.generate(count))
}

use serde::{Deserialize, Serialize};

use lotopick_db::models::{Group, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Strict,
    Moderate,
    Light,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Strict => write!(f, "strict"),
            Mode::Moderate => write!(f, "moderate"),
            Mode::Light => write!(f, "light"),
        }
    }
}

/// Stratégie d'échantillonnage des candidats bruts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Tirage uniforme sur tout l'espace légal.
    Uniform,
    /// Numéros pondérés par leur fréquence dans la fenêtre d'historique.
    HistoryWeighted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} : borne basse {min} supérieure à la borne haute {max}")]
    InvertedBounds { field: &'static str, min: u32, max: u32 },
    #[error("{field} doit être strictement positif")]
    ZeroValue { field: &'static str },
    #[error("{field} = {value} inatteignable (limite {limit})")]
    Unreachable { field: &'static str, value: u32, limit: u32 },
    #[error("recent_max_overlap ({recent}) plus permissif que max_history_overlap ({global})")]
    RecentLooserThanGlobal { recent: usize, global: usize },
    #[error("recent_strict_periods ({recent}) dépasse lookback_periods ({lookback})")]
    RecentWindowTooLong { recent: usize, lookback: usize },
}

/// Paramètres d'une session de génération. Construit une fois à partir d'un
/// preset et d'éventuelles surcharges, puis lu seulement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub variant: Variant,
    pub mode: Mode,
    pub source: SourceKind,
    pub max_run: usize,
    pub max_same_last_digit: usize,
    pub odd_count_bounds: (usize, usize),
    pub sum_bounds: (u32, u32),
    pub no_consecutive_secondary: bool,
    pub max_primary_overlap: usize,
    pub max_secondary_reuse: usize,
    pub max_history_overlap: usize,
    pub recent_strict_periods: usize,
    pub recent_max_overlap: usize,
    pub tries_per_ticket: usize,
    pub max_attempts: usize,
    pub lookback_periods: usize,
    pub oversample: usize,
    pub min_history: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub source: Option<SourceKind>,
    pub max_run: Option<usize>,
    pub max_same_last_digit: Option<usize>,
    pub odd_count_bounds: Option<(usize, usize)>,
    pub sum_bounds: Option<(u32, u32)>,
    pub no_consecutive_secondary: Option<bool>,
    pub max_primary_overlap: Option<usize>,
    pub max_secondary_reuse: Option<usize>,
    pub max_history_overlap: Option<usize>,
    pub recent_strict_periods: Option<usize>,
    pub recent_max_overlap: Option<usize>,
    pub tries_per_ticket: Option<usize>,
    pub max_attempts: Option<usize>,
    pub lookback_periods: Option<usize>,
    pub oversample: Option<usize>,
    pub min_history: Option<usize>,
}

impl ConfigOverrides {
    /// Les champs renseignés dans `other` l'emportent.
    pub fn merge(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            source: other.source.or(self.source),
            max_run: other.max_run.or(self.max_run),
            max_same_last_digit: other.max_same_last_digit.or(self.max_same_last_digit),
            odd_count_bounds: other.odd_count_bounds.or(self.odd_count_bounds),
            sum_bounds: other.sum_bounds.or(self.sum_bounds),
            no_consecutive_secondary: other
                .no_consecutive_secondary
                .or(self.no_consecutive_secondary),
            max_primary_overlap: other.max_primary_overlap.or(self.max_primary_overlap),
            max_secondary_reuse: other.max_secondary_reuse.or(self.max_secondary_reuse),
            max_history_overlap: other.max_history_overlap.or(self.max_history_overlap),
            recent_strict_periods: other.recent_strict_periods.or(self.recent_strict_periods),
            recent_max_overlap: other.recent_max_overlap.or(self.recent_max_overlap),
            tries_per_ticket: other.tries_per_ticket.or(self.tries_per_ticket),
            max_attempts: other.max_attempts.or(self.max_attempts),
            lookback_periods: other.lookback_periods.or(self.lookback_periods),
            oversample: other.oversample.or(self.oversample),
            min_history: other.min_history.or(self.min_history),
        }
    }
}

/// Plus petite et plus grande somme possibles pour le groupe principal.
pub fn sum_limits(variant: Variant) -> (u32, u32) {
    let k = variant.pick_count(Group::Primary) as u32;
    let max = variant.range(Group::Primary) as u32;
    let low = k * (k + 1) / 2;
    let high = (max - k + 1..=max).sum();
    (low, high)
}

/// Somme moyenne d'une grille uniforme.
pub fn sum_centre(variant: Variant) -> f64 {
    let k = variant.pick_count(Group::Primary) as f64;
    let max = variant.range(Group::Primary) as f64;
    k * (max + 1.0) / 2.0
}

impl GenerationConfig {
    /// Preset nu, sans surcharge. Les presets sont toujours valides.
    pub fn preset(variant: Variant, mode: Mode) -> Self {
        let k = variant.pick_count(Group::Primary);
        let multi_secondary = variant.pick_count(Group::Secondary) > 1;
        let centre = sum_centre(variant);
        let around = |ratio: f64| -> (u32, u32) {
            (
                (centre * (1.0 - ratio)).round() as u32,
                (centre * (1.0 + ratio)).round() as u32,
            )
        };

        match mode {
            Mode::Strict => Self {
                variant,
                mode,
                source: SourceKind::Uniform,
                max_run: 2,
                max_same_last_digit: 2,
                odd_count_bounds: (k / 3, k - k / 3),
                sum_bounds: around(0.30),
                no_consecutive_secondary: multi_secondary,
                max_primary_overlap: k / 2,
                max_secondary_reuse: 2,
                max_history_overlap: k / 2,
                recent_strict_periods: 10,
                recent_max_overlap: k / 2 - 1,
                tries_per_ticket: 40,
                max_attempts: 500,
                lookback_periods: 100,
                oversample: 20,
                min_history: 10,
            },
            Mode::Moderate => Self {
                variant,
                mode,
                source: SourceKind::Uniform,
                max_run: 3,
                max_same_last_digit: 3,
                odd_count_bounds: (1, k - 1),
                sum_bounds: around(0.40),
                no_consecutive_secondary: false,
                max_primary_overlap: k / 2 + 1,
                max_secondary_reuse: 3,
                max_history_overlap: k / 2 + 1,
                recent_strict_periods: 5,
                recent_max_overlap: k / 2,
                tries_per_ticket: 25,
                max_attempts: 300,
                lookback_periods: 50,
                oversample: 10,
                min_history: 5,
            },
            Mode::Light => Self {
                variant,
                mode,
                source: SourceKind::Uniform,
                max_run: 4,
                max_same_last_digit: 3,
                odd_count_bounds: (0, k),
                sum_bounds: sum_limits(variant),
                no_consecutive_secondary: false,
                max_primary_overlap: k - 1,
                max_secondary_reuse: 5,
                max_history_overlap: k - 1,
                recent_strict_periods: 3,
                recent_max_overlap: k / 2 + 1,
                tries_per_ticket: 10,
                max_attempts: 120,
                lookback_periods: 30,
                oversample: 5,
                min_history: 3,
            },
        }
    }

    /// Preset + surcharges, validé. Une configuration contradictoire est une
    /// erreur : rien n'est corrigé en silence.
    pub fn new(
        variant: Variant,
        mode: Mode,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::preset(variant, mode);
        let o = overrides.clone();
        config.source = o.source.unwrap_or(config.source);
        config.max_run = o.max_run.unwrap_or(config.max_run);
        config.max_same_last_digit = o.max_same_last_digit.unwrap_or(config.max_same_last_digit);
        config.odd_count_bounds = o.odd_count_bounds.unwrap_or(config.odd_count_bounds);
        config.sum_bounds = o.sum_bounds.unwrap_or(config.sum_bounds);
        config.no_consecutive_secondary =
            o.no_consecutive_secondary.unwrap_or(config.no_consecutive_secondary);
        config.max_primary_overlap = o.max_primary_overlap.unwrap_or(config.max_primary_overlap);
        config.max_secondary_reuse = o.max_secondary_reuse.unwrap_or(config.max_secondary_reuse);
        config.max_history_overlap = o.max_history_overlap.unwrap_or(config.max_history_overlap);
        config.recent_strict_periods =
            o.recent_strict_periods.unwrap_or(config.recent_strict_periods);
        config.recent_max_overlap = o.recent_max_overlap.unwrap_or(config.recent_max_overlap);
        config.tries_per_ticket = o.tries_per_ticket.unwrap_or(config.tries_per_ticket);
        config.max_attempts = o.max_attempts.unwrap_or(config.max_attempts);
        config.lookback_periods = o.lookback_periods.unwrap_or(config.lookback_periods);
        config.oversample = o.oversample.unwrap_or(config.oversample);
        config.min_history = o.min_history.unwrap_or(config.min_history);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_run", self.max_run),
            ("max_same_last_digit", self.max_same_last_digit),
            ("tries_per_ticket", self.tries_per_ticket),
            ("max_attempts", self.max_attempts),
            ("oversample", self.oversample),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }

        let k = self.variant.pick_count(Group::Primary);
        let (odd_min, odd_max) = self.odd_count_bounds;
        if odd_min > odd_max {
            return Err(ConfigError::InvertedBounds {
                field: "odd_count_bounds",
                min: odd_min as u32,
                max: odd_max as u32,
            });
        }
        if odd_min > k {
            return Err(ConfigError::Unreachable {
                field: "odd_count_bounds",
                value: odd_min as u32,
                limit: k as u32,
            });
        }

        let (sum_min, sum_max) = self.sum_bounds;
        if sum_min > sum_max {
            return Err(ConfigError::InvertedBounds {
                field: "sum_bounds",
                min: sum_min,
                max: sum_max,
            });
        }
        let (low, high) = sum_limits(self.variant);
        if sum_min > high {
            return Err(ConfigError::Unreachable {
                field: "sum_bounds",
                value: sum_min,
                limit: high,
            });
        }
        if sum_max < low {
            return Err(ConfigError::Unreachable {
                field: "sum_bounds",
                value: sum_max,
                limit: low,
            });
        }

        if self.recent_max_overlap > self.max_history_overlap {
            return Err(ConfigError::RecentLooserThanGlobal {
                recent: self.recent_max_overlap,
                global: self.max_history_overlap,
            });
        }
        if self.recent_strict_periods > self.lookback_periods {
            return Err(ConfigError::RecentWindowTooLong {
                recent: self.recent_strict_periods,
                lookback: self.lookback_periods,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANTS: [Variant; 3] =
        [Variant::DoubleColor, Variant::SuperLotto, Variant::EuroMillions];
    const MODES: [Mode; 3] = [Mode::Strict, Mode::Moderate, Mode::Light];

    #[test]
    fn test_all_presets_valid() {
        for variant in VARIANTS {
            for mode in MODES {
                let config = GenerationConfig::preset(variant, mode);
                assert!(config.validate().is_ok(), "{variant} {mode}: {:?}", config.validate());
            }
        }
    }

    #[test]
    fn test_strict_preset_double_color() {
        let config = GenerationConfig::preset(Variant::DoubleColor, Mode::Strict);
        assert_eq!(config.odd_count_bounds, (2, 4));
        assert_eq!(config.sum_bounds, (71, 133));
        assert_eq!(config.max_primary_overlap, 3);
        assert_eq!(config.recent_max_overlap, 2);
        assert!(!config.no_consecutive_secondary);
    }

    #[test]
    fn test_sum_limits() {
        assert_eq!(sum_limits(Variant::DoubleColor), (21, 183));
        assert_eq!(sum_limits(Variant::EuroMillions), (15, 240));
        assert!((sum_centre(Variant::DoubleColor) - 102.0).abs() < 1e-10);
    }

    #[test]
    fn test_overrides_applied() {
        let overrides = ConfigOverrides {
            max_primary_overlap: Some(2),
            source: Some(SourceKind::HistoryWeighted),
            ..Default::default()
        };
        let config =
            GenerationConfig::new(Variant::DoubleColor, Mode::Moderate, &overrides).unwrap();
        assert_eq!(config.max_primary_overlap, 2);
        assert_eq!(config.source, SourceKind::HistoryWeighted);
        assert_eq!(config.max_run, 3);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let overrides = ConfigOverrides { odd_count_bounds: Some((4, 2)), ..Default::default() };
        let err =
            GenerationConfig::new(Variant::DoubleColor, Mode::Strict, &overrides).unwrap_err();
        assert_eq!(err, ConfigError::InvertedBounds { field: "odd_count_bounds", min: 4, max: 2 });

        let overrides = ConfigOverrides { sum_bounds: Some((150, 90)), ..Default::default() };
        assert!(matches!(
            GenerationConfig::new(Variant::DoubleColor, Mode::Strict, &overrides),
            Err(ConfigError::InvertedBounds { field: "sum_bounds", .. })
        ));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let overrides = ConfigOverrides { tries_per_ticket: Some(0), ..Default::default() };
        assert_eq!(
            GenerationConfig::new(Variant::SuperLotto, Mode::Light, &overrides),
            Err(ConfigError::ZeroValue { field: "tries_per_ticket" })
        );
    }

    #[test]
    fn test_unreachable_bounds_rejected() {
        let overrides = ConfigOverrides { odd_count_bounds: Some((7, 7)), ..Default::default() };
        assert!(matches!(
            GenerationConfig::new(Variant::DoubleColor, Mode::Light, &overrides),
            Err(ConfigError::Unreachable { .. })
        ));
        let overrides = ConfigOverrides { sum_bounds: Some((200, 300)), ..Default::default() };
        assert!(matches!(
            GenerationConfig::new(Variant::DoubleColor, Mode::Light, &overrides),
            Err(ConfigError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_recent_tier_consistency() {
        let overrides = ConfigOverrides { recent_max_overlap: Some(5), ..Default::default() };
        assert!(matches!(
            GenerationConfig::new(Variant::DoubleColor, Mode::Strict, &overrides),
            Err(ConfigError::RecentLooserThanGlobal { recent: 5, global: 3 })
        ));

        let overrides = ConfigOverrides { lookback_periods: Some(4), ..Default::default() };
        assert!(matches!(
            GenerationConfig::new(Variant::DoubleColor, Mode::Strict, &overrides),
            Err(ConfigError::RecentWindowTooLong { recent: 10, lookback: 4 })
        ));
    }

    #[test]
    fn test_unsatisfiable_history_bound_accepted() {
        // Insatisfiable mais cohérent : c'est le repli dégradé qui s'en charge.
        let overrides = ConfigOverrides {
            max_history_overlap: Some(0),
            recent_max_overlap: Some(0),
            ..Default::default()
        };
        assert!(GenerationConfig::new(Variant::DoubleColor, Mode::Strict, &overrides).is_ok());
    }

    #[test]
    fn test_overrides_from_json() {
        let json = r#"{
            "max_primary_overlap": 2,
            "sum_bounds": [80, 120],
            "source": "history-weighted"
        }"#;
        let overrides: ConfigOverrides = serde_json::from_str(json).unwrap();
        assert_eq!(overrides.max_primary_overlap, Some(2));
        assert_eq!(overrides.sum_bounds, Some((80, 120)));
        assert_eq!(overrides.source, Some(SourceKind::HistoryWeighted));

        let unknown = r#"{"max_primary_overlapp": 2}"#;
        assert!(serde_json::from_str::<ConfigOverrides>(unknown).is_err());
    }

    #[test]
    fn test_merge_prefers_later() {
        let file = ConfigOverrides {
            max_run: Some(3),
            tries_per_ticket: Some(5),
            ..Default::default()
        };
        let flags = ConfigOverrides { max_run: Some(2), ..Default::default() };
        let merged = file.merge(flags);
        assert_eq!(merged.max_run, Some(2));
        assert_eq!(merged.tries_per_ticket, Some(5));
    }
}

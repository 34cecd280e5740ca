use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// 6 numéros parmi 33 + 1 parmi 16
    DoubleColor,
    /// 5 numéros parmi 35 + 2 parmi 12
    SuperLotto,
    /// 5 boules parmi 50 + 2 étoiles parmi 12
    #[serde(rename = "euromillions")]
    #[value(name = "euromillions")]
    EuroMillions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Primary,
    Secondary,
}

impl Variant {
    /// Plus grand numéro jouable du groupe (le plus petit est toujours 1).
    pub fn range(&self, group: Group) -> u8 {
        match (self, group) {
            (Variant::DoubleColor, Group::Primary) => 33,
            (Variant::DoubleColor, Group::Secondary) => 16,
            (Variant::SuperLotto, Group::Primary) => 35,
            (Variant::SuperLotto, Group::Secondary) => 12,
            (Variant::EuroMillions, Group::Primary) => 50,
            (Variant::EuroMillions, Group::Secondary) => 12,
        }
    }

    pub fn pick_count(&self, group: Group) -> usize {
        match (self, group) {
            (Variant::DoubleColor, Group::Primary) => 6,
            (Variant::DoubleColor, Group::Secondary) => 1,
            (Variant::SuperLotto, Group::Primary) => 5,
            (Variant::SuperLotto, Group::Secondary) => 2,
            (Variant::EuroMillions, Group::Primary) => 5,
            (Variant::EuroMillions, Group::Secondary) => 2,
        }
    }

    /// Clé de stockage en base.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::DoubleColor => "double-color",
            Variant::SuperLotto => "super-lotto",
            Variant::EuroMillions => "euromillions",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::DoubleColor => write!(f, "Double Color (6/33 + 1/16)"),
            Variant::SuperLotto => write!(f, "Super Lotto (5/35 + 2/12)"),
            Variant::EuroMillions => write!(f, "EuroMillions (5/50 + 2/12)"),
        }
    }
}

/// Une grille complète. Les deux groupes sont triés, validés à la construction
/// et ne changent plus ensuite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Candidate {
    variant: Variant,
    primary: Vec<u8>,
    secondary: Vec<u8>,
}

impl Candidate {
    pub fn new(variant: Variant, mut primary: Vec<u8>, mut secondary: Vec<u8>) -> Result<Self> {
        primary.sort_unstable();
        secondary.sort_unstable();
        validate_group(variant, Group::Primary, &primary)?;
        validate_group(variant, Group::Secondary, &secondary)?;
        Ok(Self { variant, primary, secondary })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn primary(&self) -> &[u8] {
        &self.primary
    }

    pub fn secondary(&self) -> &[u8] {
        &self.secondary
    }

    pub fn numbers(&self, group: Group) -> &[u8] {
        match group {
            Group::Primary => &self.primary,
            Group::Secondary => &self.secondary,
        }
    }

    pub fn primary_sum(&self) -> u32 {
        self.primary.iter().map(|&n| n as u32).sum()
    }

    /// Plus petite combinaison de la variante : 1..=k dans chaque groupe.
    pub fn first_combination(variant: Variant) -> Self {
        let k = variant.pick_count(Group::Primary) as u8;
        let m = variant.pick_count(Group::Secondary) as u8;
        Self {
            variant,
            primary: (1..=k).collect(),
            secondary: (1..=m).collect(),
        }
    }

    /// Même combinaison, groupe par groupe.
    pub fn same_numbers(&self, other: &Candidate) -> bool {
        self.primary == other.primary && self.secondary == other.secondary
    }
}

impl AsRef<Candidate> for Candidate {
    fn as_ref(&self) -> &Candidate {
        self
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + {}", format_numbers(&self.primary), format_numbers(&self.secondary))
    }
}

pub fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_group(variant: Variant, group: Group, numbers: &[u8]) -> Result<()> {
    let label = match group {
        Group::Primary => "principal",
        Group::Secondary => "complémentaire",
    };
    let expected = variant.pick_count(group);
    if numbers.len() != expected {
        bail!("Groupe {} : {} numéros attendus, {} reçus", label, expected, numbers.len());
    }
    let max = variant.range(group);
    for &n in numbers {
        if n < 1 || n > max {
            bail!("Numéro {} {} hors limites (1-{})", label, n, max);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro {} en double : {}", label, numbers[i]);
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Draw {
    pub draw_id: String,
    pub date: String,
    pub numbers: Candidate,
}

/// Historique synthétique, du plus récent au plus ancien. Chaque tirage est
/// décalé pour que deux tirages voisins ne se ressemblent pas trop.
pub fn make_test_history(variant: Variant, n: usize) -> Vec<Candidate> {
    let primary_max = variant.range(Group::Primary) as usize;
    let secondary_max = variant.range(Group::Secondary) as usize;
    let primary_count = variant.pick_count(Group::Primary);
    let secondary_count = variant.pick_count(Group::Secondary);

    (0..n)
        .filter_map(|i| {
            let step = primary_max / primary_count;
            let primary = (0..primary_count)
                .map(|k| ((i * 7 + k * step) % primary_max + 1) as u8)
                .collect();
            let secondary = (0..secondary_count)
                .map(|k| ((i * 3 + k * 5) % secondary_max + 1) as u8)
                .collect();
            Candidate::new(variant, primary, secondary).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_sorted_on_construction() {
        let c = Candidate::new(Variant::SuperLotto, vec![30, 2, 17, 5, 9], vec![11, 3]).unwrap();
        assert_eq!(c.primary(), &[2, 5, 9, 17, 30]);
        assert_eq!(c.secondary(), &[3, 11]);
    }

    #[test]
    fn test_first_combination_is_valid() {
        for variant in [Variant::DoubleColor, Variant::SuperLotto, Variant::EuroMillions] {
            let c = Candidate::first_combination(variant);
            let rebuilt =
                Candidate::new(variant, c.primary().to_vec(), c.secondary().to_vec()).unwrap();
            assert_eq!(c, rebuilt);
        }
        let lowest = Candidate::first_combination(Variant::DoubleColor);
        assert_eq!(lowest.primary(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_candidate_out_of_range() {
        assert!(Candidate::new(Variant::DoubleColor, vec![0, 2, 3, 4, 5, 6], vec![1]).is_err());
        assert!(Candidate::new(Variant::DoubleColor, vec![1, 2, 3, 4, 5, 34], vec![1]).is_err());
        assert!(Candidate::new(Variant::DoubleColor, vec![1, 2, 3, 4, 5, 6], vec![17]).is_err());
    }

    #[test]
    fn test_candidate_wrong_size() {
        assert!(Candidate::new(Variant::DoubleColor, vec![1, 2, 3, 4, 5], vec![1]).is_err());
        assert!(Candidate::new(Variant::EuroMillions, vec![1, 2, 3, 4, 5], vec![1]).is_err());
    }

    #[test]
    fn test_candidate_duplicates() {
        assert!(Candidate::new(Variant::EuroMillions, vec![1, 1, 3, 4, 5], vec![1, 2]).is_err());
        assert!(Candidate::new(Variant::EuroMillions, vec![1, 2, 3, 4, 5], vec![3, 3]).is_err());
    }

    #[test]
    fn test_variant_shapes() {
        assert_eq!(Variant::DoubleColor.pick_count(Group::Primary), 6);
        assert_eq!(Variant::DoubleColor.range(Group::Secondary), 16);
        assert_eq!(Variant::EuroMillions.range(Group::Primary), 50);
        assert_eq!(Variant::SuperLotto.pick_count(Group::Secondary), 2);
    }

    #[test]
    fn test_display() {
        let c = Candidate::new(Variant::DoubleColor, vec![3, 1, 12, 20, 25, 30], vec![7]).unwrap();
        assert_eq!(c.to_string(), "01 03 12 20 25 30 + 07");
    }

    #[test]
    fn test_make_test_history_valid() {
        for variant in [Variant::DoubleColor, Variant::SuperLotto, Variant::EuroMillions] {
            let history = make_test_history(variant, 40);
            assert_eq!(history.len(), 40, "{variant}");
        }
    }
}

mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use lotopick_db::db::{
    count_draws, db_path, fetch_history, fetch_last_draws, insert_draw, migrate, open_db,
};
use lotopick_db::models::{Candidate, Draw, Group, Variant};
use lotopick_db::rusqlite::Connection;
use lotopick_engine::config::{ConfigOverrides, GenerationConfig, Mode, SourceKind};
use lotopick_engine::generator::{Batch, Generator};
use lotopick_engine::history::HistoryDuplicateFilter;
use lotopick_engine::popularity::{hard_reject_reason, popularity_score};
use crate::display::{
    display_batch, display_check, display_config, display_draws, display_import_summary,
};

#[derive(Parser)]
#[command(name = "lotopick", about = "Générateur de grilles de loterie peu populaires")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Surcharges ponctuelles du preset, prioritaires sur le fichier JSON.
#[derive(Args, Debug, Default)]
struct OverrideArgs {
    /// Fichier JSON de surcharges (mêmes clés que les options ci-dessous)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    source: Option<SourceKind>,
    #[arg(long)]
    max_run: Option<usize>,
    #[arg(long)]
    max_same_last_digit: Option<usize>,
    /// Nombre d'impairs autorisé, ex. 2-4
    #[arg(long, value_parser = parse_bounds::<usize>)]
    odd_count_bounds: Option<(usize, usize)>,
    /// Somme des numéros principaux, ex. 80-140
    #[arg(long, value_parser = parse_bounds::<u32>)]
    sum_bounds: Option<(u32, u32)>,
    #[arg(long)]
    no_consecutive_secondary: Option<bool>,
    #[arg(long)]
    max_primary_overlap: Option<usize>,
    #[arg(long)]
    max_secondary_reuse: Option<usize>,
    #[arg(long)]
    max_history_overlap: Option<usize>,
    #[arg(long)]
    recent_strict_periods: Option<usize>,
    #[arg(long)]
    recent_max_overlap: Option<usize>,
    #[arg(long)]
    tries_per_ticket: Option<usize>,
    #[arg(long)]
    max_attempts: Option<usize>,
    #[arg(long)]
    lookback_periods: Option<usize>,
    #[arg(long)]
    oversample: Option<usize>,
    #[arg(long)]
    min_history: Option<usize>,
}

impl OverrideArgs {
    fn resolve(self, variant: Variant, mode: Mode) -> Result<GenerationConfig> {
        let from_file = match &self.config {
            Some(path) => load_overrides(path)?,
            None => ConfigOverrides::default(),
        };
        let from_flags = ConfigOverrides {
            source: self.source,
            max_run: self.max_run,
            max_same_last_digit: self.max_same_last_digit,
            odd_count_bounds: self.odd_count_bounds,
            sum_bounds: self.sum_bounds,
            no_consecutive_secondary: self.no_consecutive_secondary,
            max_primary_overlap: self.max_primary_overlap,
            max_secondary_reuse: self.max_secondary_reuse,
            max_history_overlap: self.max_history_overlap,
            recent_strict_periods: self.recent_strict_periods,
            recent_max_overlap: self.recent_max_overlap,
            tries_per_ticket: self.tries_per_ticket,
            max_attempts: self.max_attempts,
            lookback_periods: self.lookback_periods,
            oversample: self.oversample,
            min_history: self.min_history,
        };
        let config = GenerationConfig::new(variant, mode, &from_file.merge(from_flags))
            .context("Configuration invalide")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV (draw_id;date;principaux;complémentaires)
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "euromillions")]
        variant: Variant,

        /// Le fichier n'a pas de ligne d'en-tête
        #[arg(long)]
        no_headers: bool,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        #[arg(short, long, default_value = "euromillions")]
        variant: Variant,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Générer un lot de grilles
    Generate {
        #[arg(short, long, default_value = "euromillions")]
        variant: Variant,

        #[arg(short, long, default_value = "moderate")]
        mode: Mode,

        /// Nombre de grilles
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Sortie JSON (grilles + diagnostic)
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Évaluer une grille : règles dures, popularité, historique
    Check {
        #[arg(short, long, default_value = "euromillions")]
        variant: Variant,

        #[arg(short, long, default_value = "moderate")]
        mode: Mode,

        /// Numéros principaux, ex. "3 11 18 24 32"
        #[arg(short, long)]
        primary: String,

        /// Numéros complémentaires, ex. "4 9"
        #[arg(short, long)]
        secondary: String,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Ajouter un tirage manuellement
    Add {
        #[arg(short, long, default_value = "euromillions")]
        variant: Variant,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file, variant, no_headers } => {
            cmd_import(&conn, &file, variant, !no_headers)
        }
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { variant, last } => cmd_list(&conn, variant, last),
        Command::Generate { variant, mode, count, seed, json, overrides } => {
            let config = overrides.resolve(variant, mode)?;
            cmd_generate(&conn, config, count, seed, json)
        }
        Command::Check { variant, mode, primary, secondary, overrides } => {
            let config = overrides.resolve(variant, mode)?;
            cmd_check(&conn, config, &primary, &secondary)
        }
        Command::Add { variant } => cmd_add(&conn, variant),
    }
}

fn parse_bounds<T: FromStr>(s: &str) -> Result<(T, T), String> {
    let (low, high) = s
        .split_once(['-', ','])
        .ok_or_else(|| format!("Bornes attendues au format min-max : '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<T>().map_err(|_| format!("Borne illisible : '{v}'"));
    Ok((parse(low)?, parse(high)?))
}

fn load_overrides(path: &Path) -> Result<ConfigOverrides> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Surcharges JSON invalides dans {:?}", path))
}

fn parse_numbers(input: &str) -> Result<Vec<u8>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',' || c == '-')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u8>().with_context(|| format!("Numéro illisible : '{}'", s)))
        .collect()
}

/// Tout l'historique de la variante, du plus récent au plus ancien.
fn load_history(conn: &Connection, variant: Variant) -> Result<Vec<Candidate>> {
    let n = count_draws(conn, variant)?;
    if n == 0 {
        log::warn!("Aucun tirage {} en base : génération sans historique", variant.as_str());
    }
    fetch_history(conn, variant, n)
}

fn cmd_import(conn: &Connection, file: &Path, variant: Variant, has_headers: bool) -> Result<()> {
    let result = import::import_csv(conn, file, variant, has_headers)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, variant: Variant, last: u32) -> Result<()> {
    let n = count_draws(conn, variant)?;
    if n == 0 {
        println!("Base vide. Lancez d'abord : lotopick import --variant {}", variant.as_str());
        return Ok(());
    }
    let draws = fetch_last_draws(conn, variant, last)?;
    display_draws(&draws);
    Ok(())
}

fn run_generation(
    conn: &Connection,
    config: GenerationConfig,
    count: usize,
    seed: Option<u64>,
) -> Result<(Generator, Batch)> {
    let history = load_history(conn, config.variant)?;
    let mut generator = Generator::new(config, history, seed).context("Configuration invalide")?;
    let batch = generator.generate(count);
    Ok((generator, batch))
}

fn cmd_generate(
    conn: &Connection,
    config: GenerationConfig,
    count: usize,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let (generator, batch) = run_generation(conn, config, count, seed)?;

    // Sur stdout, uniquement le document JSON ; les avertissements passent par `log`.
    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        display_config(generator.config());
        display_batch(&batch);
    }
    Ok(())
}

fn cmd_check(
    conn: &Connection,
    config: GenerationConfig,
    primary: &str,
    secondary: &str,
) -> Result<()> {
    let candidate =
        Candidate::new(config.variant, parse_numbers(primary)?, parse_numbers(secondary)?)?;
    let history = load_history(conn, config.variant)?;

    let reject = hard_reject_reason(&candidate, &config);
    let popularity = popularity_score(&candidate, &config);
    let check = HistoryDuplicateFilter::from_config(&config).filter(
        &candidate,
        &history,
        config.lookback_periods,
    );

    display_check(&candidate, reject, popularity, &check);
    Ok(())
}

fn cmd_add(conn: &Connection, variant: Variant) -> Result<()> {
    println!("Ajout d'un tirage {variant}\n");

    let draw_id = prompt("Identifiant du tirage (ex: 24014) : ")?;
    let date = loop {
        let raw = prompt("Date (JJ/MM/AAAA) : ")?;
        match import::parse_date(&raw) {
            Ok(date) => break date,
            Err(e) => println!("{e}. Réessayez."),
        }
    };

    let numbers = loop {
        let primary = prompt_group(variant, Group::Primary)?;
        let secondary = prompt_group(variant, Group::Secondary)?;
        match Candidate::new(variant, primary, secondary) {
            Ok(c) => break c,
            Err(e) => println!("{e}. Réessayez."),
        }
    };

    let draw = Draw { draw_id, date, numbers };

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let inserted = insert_draw(conn, &draw)?;
        if inserted {
            println!("Tirage inséré avec succès.");
        } else {
            println!("Ce tirage existe déjà (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_group(variant: Variant, group: Group) -> Result<Vec<u8>> {
    let label = match group {
        Group::Primary => "numéros principaux",
        Group::Secondary => "complémentaires",
    };
    let expected = variant.pick_count(group);
    loop {
        let input = prompt(&format!(
            "{} {} (séparés par des espaces, 1-{}) : ",
            expected,
            label,
            variant.range(group)
        ))?;
        match parse_numbers(&input) {
            Ok(v) if v.len() == expected => return Ok(v),
            Ok(_) => println!("Entrez exactement {} numéros. Réessayez.", expected),
            Err(e) => println!("{e}. Réessayez."),
        }
    }
}

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use lotopick_db::models::{format_numbers, Candidate, Draw};
use lotopick_engine::config::GenerationConfig;
use lotopick_engine::generator::Batch;
use lotopick_engine::history::HistoryCheck;
use lotopick_engine::popularity::RejectReason;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Tirage", "Date", "Principaux", "Complémentaires"]);
    for draw in draws {
        table.add_row(vec![
            &draw.draw_id,
            &draw.date,
            &format_numbers(draw.numbers.primary()),
            &format_numbers(draw.numbers.secondary()),
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

pub fn display_config(config: &GenerationConfig) {
    println!(
        "\n⚙️  {} : mode {}, source {:?}, historique {} tirages (min {})",
        config.variant, config.mode, config.source, config.lookback_periods, config.min_history
    );
    println!(
        "   Séries ≤ {}, impairs {}-{}, somme {}-{}, recouvrement lot ≤ {}, \
         historique ≤ {} (récent ≤ {} sur {} tirages)",
        config.max_run,
        config.odd_count_bounds.0,
        config.odd_count_bounds.1,
        config.sum_bounds.0,
        config.sum_bounds.1,
        config.max_primary_overlap,
        config.max_history_overlap,
        config.recent_max_overlap,
        config.recent_strict_periods,
    );
}

pub fn display_batch(batch: &Batch) {
    println!("\n🎲 Grilles générées\n");

    let mut table = new_table(vec![
        "#",
        "Principaux",
        "Complémentaires",
        "Popularité",
        "Recouvrement",
        "État",
    ]);
    for (i, ticket) in batch.tickets.iter().enumerate() {
        let state = if ticket.degraded {
            Cell::new("dégradée").fg(Color::Yellow)
        } else {
            Cell::new("ok").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format_numbers(ticket.candidate.primary())),
            Cell::new(format_numbers(ticket.candidate.secondary())),
            Cell::new(ticket.popularity_score),
            Cell::new(format!("{:.3}", ticket.history_overlap_score)),
            state,
        ]);
    }
    println!("{table}");

    let d = &batch.diagnostics;
    println!("\n📋 Diagnostic");
    println!("  Diversité du lot      : {:.3}", d.diversity_score);
    println!("  Grilles dégradées     : {}", d.degraded_count);
    println!("  Tentatives            : {}", d.total_attempts);
    println!("  Relances par grille   : {:?}", d.slot_retries);
    println!(
        "  Rejets                : {} règles dures, {} lot, {} historique",
        d.hard_rejected, d.correlation_rejected, d.history_rejected
    );
    if let Some(note) = &d.insufficient_history {
        println!(
            "  ⚠️  Historique insuffisant ({} < {}) : tirage aléatoire sans classement",
            note.available, note.required
        );
    }
    for slot in &d.degraded_slots {
        let reason = slot
            .history_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  Grille {} dégradée après {} tentatives ({:?}, conflit lot : {}, historique : {})",
            slot.slot + 1,
            slot.attempts,
            slot.cause,
            if slot.batch_conflict { "oui" } else { "non" },
            reason
        );
    }
}

pub fn display_check(
    candidate: &Candidate,
    reject: Option<RejectReason>,
    popularity: u32,
    check: &HistoryCheck,
) {
    println!("\n🔎 Grille {candidate}\n");

    let mut table = new_table(vec!["Contrôle", "Résultat"]);
    let verdict = |ok: bool, detail: String| {
        Cell::new(detail).fg(if ok { Color::Green } else { Color::Red })
    };
    table.add_row(vec![
        Cell::new("Règles dures"),
        match reject {
            Some(reason) => verdict(false, format!("rejetée : {reason}")),
            None => verdict(true, "conforme".to_string()),
        },
    ]);
    table.add_row(vec![Cell::new("Score de popularité"), Cell::new(popularity)]);
    table.add_row(vec![
        Cell::new("Historique"),
        match check.reason {
            Some(reason) => verdict(false, format!("rejetée : {reason}")),
            None => verdict(true, "conforme".to_string()),
        },
    ]);
    table.add_row(vec![
        Cell::new("Recouvrement max"),
        Cell::new(match check.matching_period {
            Some(p) => format!("{} (tirage t-{p})", check.max_overlap),
            None => check.max_overlap.to_string(),
        }),
    ]);
    table.add_row(vec![
        Cell::new("Score de recouvrement"),
        Cell::new(format!("{:.3}", check.overlap_score)),
    ]);
    println!("{table}");
}

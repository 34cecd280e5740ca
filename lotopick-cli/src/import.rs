use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use lotopick_db::rusqlite::Connection;
use std::path::Path;

use lotopick_db::db::insert_draw;
use lotopick_db::models::{Candidate, Draw, Group, Variant};

/// `JJ/MM/AAAA` ou `AAAA-MM-JJ`, normalisée en ISO.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .with_context(|| format!("Format de date invalide: '{}'", raw))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// `draw_id;date;principaux…;complémentaires…`, colonnes supplémentaires ignorées.
fn parse_record(record: &csv::StringRecord, variant: Variant) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let draw_id = get(0)?;
    if draw_id.is_empty() {
        bail!("Identifiant de tirage vide");
    }
    let date = parse_date(&get(1)?)?;

    let k = variant.pick_count(Group::Primary);
    let m = variant.pick_count(Group::Secondary);
    let primary = (2..2 + k).map(&get_u8).collect::<Result<Vec<_>>>()?;
    let secondary = (2 + k..2 + k + m).map(&get_u8).collect::<Result<Vec<_>>>()?;

    let numbers = Candidate::new(variant, primary, secondary)
        .with_context(|| format!("Tirage {} invalide", draw_id))?;

    Ok(Draw { draw_id, date, numbers })
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(
    conn: &Connection,
    path: &Path,
    variant: Variant,
    has_headers: bool,
) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(has_headers)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult::default();

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        match record_result {
            Ok(record) => match parse_record(&record, variant) {
                Ok(draw) => match insert_draw(&tx, &draw) {
                    Ok(true) => result.inserted += 1,
                    Ok(false) => result.skipped += 1,
                    Err(e) => {
                        log::error!("Erreur insertion tirage {}: {:#}", line, e);
                        result.errors += 1;
                    }
                },
                Err(e) => {
                    log::warn!("Erreur parsing ligne {}: {:#}", line, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::warn!("Erreur lecture ligne {}: {}", line, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    log::info!(
        "Import {} : {} lignes, {} insérées, {} doublons, {} erreurs",
        variant, result.total_records, result.inserted, result.skipped, result.errors
    );
    Ok(result)
}

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::CleanRow;

/// Canonical columns every input table must provide, under whatever
/// header spelling the source system uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Lot,
    Date,
    Strength,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Lot => "LOT",
            Column::Date => "DATE",
            Column::Strength => "STRENGTH",
        }
    }
}

pub const REQUIRED_COLUMNS: [Column; 3] = [Column::Lot, Column::Date, Column::Strength];

/// The only fatal ingestion error: one or more canonical columns could not
/// be resolved from the table headers.
#[derive(Debug, Error)]
#[error(
    "missing required column(s): {}; expected columns resolvable to {}",
    .missing.join(", "),
    REQUIRED_COLUMNS.map(Column::name).join(", ")
)]
pub struct MissingColumnsError {
    pub missing: Vec<&'static str>,
}

/// An already-parsed table: header names as delivered by the source plus
/// untyped cell values. This is the boundary with file readers; the core
/// never interprets file formats itself.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reads a CSV file into a `RawTable` without interpreting any values.
pub fn read_csv(path: &Path) -> anyhow::Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .context("failed to read CSV header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { columns, rows })
}

/// Maps normalized header spellings onto canonical columns. The builtin
/// table covers the spellings seen in pilot data (Turkish QC exports plus
/// English variants); plants with other export formats register extra
/// synonyms instead of renaming their files.
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    synonyms: HashMap<String, Column>,
}

impl Default for ColumnResolver {
    fn default() -> Self {
        let builtin = [
            ("LOT", Column::Lot),
            ("LOT NO", Column::Lot),
            ("PARTI", Column::Lot),
            ("PARTİ", Column::Lot),
            ("BATCH", Column::Lot),
            ("BATCH NO", Column::Lot),
            ("DATE", Column::Date),
            ("TARIH", Column::Date),
            ("TARİH", Column::Date),
            ("STRENGTH", Column::Strength),
            ("TENSILE_STRENGTH", Column::Strength),
            ("TENSILE STRENGTH", Column::Strength),
            ("CEKME_DAYANIMI", Column::Strength),
            ("ÇEKME_DAYANIMI", Column::Strength),
            ("CEKME DAYANIMI", Column::Strength),
        ];
        ColumnResolver {
            synonyms: builtin
                .into_iter()
                .map(|(header, column)| (header.to_string(), column))
                .collect(),
        }
    }
}

impl ColumnResolver {
    pub fn add_synonym(&mut self, header: &str, column: Column) {
        self.synonyms.insert(canonical_header(header), column);
    }

    fn resolve(&self, header: &str) -> Option<Column> {
        self.synonyms.get(&canonical_header(header)).copied()
    }
}

fn canonical_header(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Validates headers and coerces rows into `CleanRow`s.
///
/// A canonical column that cannot be resolved is fatal. Individual rows
/// with an empty lot, unparseable date, or unparseable strength are
/// dropped without error; callers report accepted counts. Output is
/// sorted ascending by (lot, date), stable for equal keys.
pub fn normalize(
    table: &RawTable,
    resolver: &ColumnResolver,
) -> Result<Vec<CleanRow>, MissingColumnsError> {
    let mut indices: HashMap<Column, usize> = HashMap::new();
    for (idx, header) in table.columns.iter().enumerate() {
        if let Some(column) = resolver.resolve(header) {
            indices.entry(column).or_insert(idx);
        }
    }

    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !indices.contains_key(*column))
        .map(|column| column.name())
        .collect();
    if !missing.is_empty() {
        return Err(MissingColumnsError { missing });
    }

    let lot_idx = indices[&Column::Lot];
    let date_idx = indices[&Column::Date];
    let strength_idx = indices[&Column::Strength];

    let mut rows = Vec::new();
    for raw in &table.rows {
        let lot = match raw.get(lot_idx).map(|cell| cell.trim()) {
            Some(lot) if !lot.is_empty() => lot.to_string(),
            _ => continue,
        };
        let date = match raw.get(date_idx).and_then(|cell| parse_date(cell)) {
            Some(date) => date,
            None => continue,
        };
        let strength = match raw.get(strength_idx).and_then(|cell| parse_strength(cell)) {
            Some(strength) => strength,
            None => continue,
        };
        rows.push(CleanRow {
            lot,
            date,
            strength,
        });
    }

    rows.sort_by(|a, b| a.lot.cmp(&b.lot).then(a.date.cmp(&b.date)));
    Ok(rows)
}

// Day-first spellings are tried before ISO so ambiguous dates like
// 03.04.2024 read as 3 April.
const DATETIME_FORMATS: [&str; 6] = [
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

fn parse_date(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(cell, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_strength(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

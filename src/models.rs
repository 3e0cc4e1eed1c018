use chrono::NaiveDateTime;
use serde::Serialize;

/// A validated measurement row: trimmed non-empty lot id, parsed date,
/// numeric strength (MPa).
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub lot: String,
    pub date: NaiveDateTime,
    pub strength: f64,
}

/// Descriptive statistics for one lot. `std` is the sample standard
/// deviation and is 0.0 for single-measurement lots; `trend` is the OLS
/// slope in MPa per day, `None` when fewer than two points or zero time
/// spread.
#[derive(Debug, Clone)]
pub struct LotAggregate {
    pub lot: String,
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub trend: Option<f64>,
}

/// Whole-dataset baseline used to normalize per-lot penalties.
/// `std` falls back to 1.0 when the dataset has fewer than two rows.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Safe,
    Watch,
    Risky,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Safe => write!(f, "SAFE"),
            Status::Watch => write!(f, "WATCH"),
            Status::Risky => write!(f, "RISKY"),
        }
    }
}

/// Final per-lot report line. Field names serialize to the stable export
/// column set (LOT, N, MEAN, ...).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ScoredLot {
    pub lot: String,
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub trend: Option<f64>,
    pub risk_score: u32,
    pub status: Status,
    pub recommendation: String,
}

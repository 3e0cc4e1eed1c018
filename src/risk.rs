use crate::models::{LotAggregate, ReferenceStats, ScoredLot, Status};

// Pilot-tuned calibration constants. They have no documented derivation;
// keep them fixed for behavioral compatibility with the pilot deployment
// until they graduate into real configuration.
const LEVEL_CAP: f64 = 50.0;
const LEVEL_SCALE: f64 = 15.0;
const VARIABILITY_CAP: f64 = 25.0;
const VARIABILITY_SCALE: f64 = 10.0;
const TREND_CAP: f64 = 15.0;
const TREND_SCALE: f64 = 2.0;

/// Composite risk score in [0, 100]: level shortfall vs `target_low`,
/// variability vs the reference spread, downward trend, and a fixed
/// small-sample penalty.
pub fn score_lot(lot: &LotAggregate, reference: &ReferenceStats, target_low: f64) -> f64 {
    let level_gap = (target_low - lot.mean).max(0.0);
    let level = (level_gap / reference.std.max(1.0) * LEVEL_SCALE).min(LEVEL_CAP);

    let variability =
        (lot.std / reference.std.max(1e-6) * VARIABILITY_SCALE).min(VARIABILITY_CAP);

    let trend = match lot.trend {
        Some(slope) => ((-slope).max(0.0) * TREND_SCALE).min(TREND_CAP),
        None => 0.0,
    };

    let sample = match lot.n {
        1 => 10.0,
        2 => 5.0,
        _ => 0.0,
    };

    (level + variability + trend + sample).clamp(0.0, 100.0)
}

/// Status bands are inclusive on their lower bound.
pub fn classify(score: u32) -> Status {
    if score >= 60 {
        Status::Risky
    } else if score >= 30 {
        Status::Watch
    } else {
        Status::Safe
    }
}

/// Advice text for a scored lot. Within the risky band the
/// single-measurement case is checked before the trend case; first match
/// wins.
pub fn recommend(n: usize, score: u32, trend: Option<f64>) -> &'static str {
    if score >= 60 {
        if n == 1 {
            return "single measurement: recommend re-measurement + process control.";
        }
        if let Some(slope) = trend {
            if slope < -2.0 {
                return "downward trend: recommend checking process/heat-treatment \
                        parameters and re-measuring.";
            }
        }
        return "recommend re-measurement + process control.";
    }
    if score >= 30 {
        return "recommend follow-up (plan additional measurement; act if deviation grows).";
    }
    "continue normal production."
}

/// Scores every lot against the shared reference stats and threshold.
/// Rounding to an integer happens exactly once, here.
pub fn score_table(
    lots: &[LotAggregate],
    reference: &ReferenceStats,
    target_low: f64,
) -> Vec<ScoredLot> {
    lots.iter()
        .map(|lot| {
            let risk_score = score_lot(lot, reference, target_low).round() as u32;
            let status = classify(risk_score);
            let recommendation = recommend(lot.n, risk_score, lot.trend).to_string();
            ScoredLot {
                lot: lot.lot.clone(),
                n: lot.n,
                mean: lot.mean,
                std: lot.std,
                min: lot.min,
                max: lot.max,
                period_start: lot.period_start,
                period_end: lot.period_end,
                trend: lot.trend,
                risk_score,
                status,
                recommendation,
            }
        })
        .collect()
}

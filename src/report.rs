use std::fmt::Write;
use std::path::Path;

use anyhow::Context;

use crate::models::{ScoredLot, Status};

/// Counts per status band, in panel order.
pub fn status_mix(lots: &[ScoredLot]) -> (usize, usize, usize) {
    let risky = lots.iter().filter(|l| l.status == Status::Risky).count();
    let watch = lots.iter().filter(|l| l.status == Status::Watch).count();
    let safe = lots.iter().filter(|l| l.status == Status::Safe).count();
    (risky, watch, safe)
}

/// Display order used by the panel: highest risk first, weakest mean first
/// among equals.
pub fn sort_for_display(lots: &mut [ScoredLot]) {
    lots.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then(a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal))
    });
}

fn format_trend(trend: Option<f64>) -> String {
    match trend {
        Some(slope) => format!("{slope:.2} MPa/day"),
        None => "no trend".to_string(),
    }
}

pub fn build_report(scored: &[ScoredLot], row_count: usize, target_low: f64) -> String {
    let mut output = String::new();
    let (risky, watch, safe) = status_mix(scored);

    let _ = writeln!(output, "# Lot Risk Report");
    let _ = writeln!(
        output,
        "Accepted {} rows across {} lots (threshold {} MPa)",
        row_count,
        scored.len(),
        target_low
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");

    if scored.is_empty() {
        let _ = writeln!(output, "No valid measurement rows found.");
        return output;
    }

    let _ = writeln!(output, "- RISKY: {risky}");
    let _ = writeln!(output, "- WATCH: {watch}");
    let _ = writeln!(output, "- SAFE: {safe}");

    let mut ranked = scored.to_vec();
    sort_for_display(&mut ranked);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Lots");
    for lot in ranked.iter().take(10) {
        let _ = writeln!(
            output,
            "- {} score {}/100 ({}) mean {:.1} MPa across {} measurements",
            lot.lot, lot.risk_score, lot.status, lot.mean, lot.n
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lot Details");
    for lot in ranked.iter() {
        let _ = writeln!(
            output,
            "- {}: n={} mean={:.1} std={:.1} range=[{:.1}, {:.1}] period {} to {} trend {}",
            lot.lot,
            lot.n,
            lot.mean,
            lot.std,
            lot.min,
            lot.max,
            lot.period_start.date(),
            lot.period_end.date(),
            format_trend(lot.trend)
        );
        let _ = writeln!(output, "  {} — {}", lot.status, lot.recommendation);
    }

    output
}

/// Writes the scored table as CSV with the stable export column set.
pub fn write_csv(scored: &[ScoredLot], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for lot in scored {
        writer.serialize(lot)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_json(scored: &[ScoredLot]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(scored).context("failed to serialize scored lots")
}

use std::collections::HashMap;

use crate::models::{CleanRow, LotAggregate, ReferenceStats};

/// Groups clean rows by lot, in order of first appearance, and folds each
/// group into its descriptive statistics.
pub fn aggregate(rows: &[CleanRow]) -> Vec<LotAggregate> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&CleanRow>> = HashMap::new();

    for row in rows {
        let entry = groups.entry(row.lot.as_str()).or_default();
        if entry.is_empty() {
            order.push(row.lot.as_str());
        }
        entry.push(row);
    }

    order
        .into_iter()
        .map(|lot| summarize_lot(lot, &groups[lot]))
        .collect()
}

fn summarize_lot(lot: &str, rows: &[&CleanRow]) -> LotAggregate {
    let n = rows.len();
    let mean = rows.iter().map(|r| r.strength).sum::<f64>() / n as f64;

    let std = if n < 2 {
        0.0
    } else {
        let sum_sq = rows
            .iter()
            .map(|r| (r.strength - mean).powi(2))
            .sum::<f64>();
        (sum_sq / (n - 1) as f64).sqrt()
    };

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut period_start = rows[0].date;
    let mut period_end = rows[0].date;
    for row in rows {
        min = min.min(row.strength);
        max = max.max(row.strength);
        period_start = period_start.min(row.date);
        period_end = period_end.max(row.date);
    }

    LotAggregate {
        lot: lot.to_string(),
        n,
        mean,
        std,
        min,
        max,
        period_start,
        period_end,
        trend: trend_per_day(rows, period_start),
    }
}

/// OLS slope of strength against elapsed days since the lot's first
/// measurement. `None` when a single point or zero time spread makes the
/// fit undefined; never divides by zero.
fn trend_per_day(rows: &[&CleanRow], period_start: chrono::NaiveDateTime) -> Option<f64> {
    if rows.len() < 2 {
        return None;
    }

    let xs: Vec<f64> = rows
        .iter()
        .map(|r| (r.date - period_start).num_seconds() as f64 / 86_400.0)
        .collect();

    let n = rows.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = rows.iter().map(|r| r.strength).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, row) in xs.iter().zip(rows) {
        sxx += (x - x_mean) * (x - x_mean);
        sxy += (x - x_mean) * (row.strength - y_mean);
    }

    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

/// Mean and sample standard deviation over the entire clean table, used as
/// the normalization baseline for every lot. The std falls back to 1.0
/// when the dataset is too small to estimate spread.
pub fn reference_stats(rows: &[CleanRow]) -> ReferenceStats {
    let n = rows.len();
    if n == 0 {
        return ReferenceStats { mean: 0.0, std: 1.0 };
    }

    let mean = rows.iter().map(|r| r.strength).sum::<f64>() / n as f64;
    let std = if n < 2 {
        1.0
    } else {
        let sum_sq = rows
            .iter()
            .map(|r| (r.strength - mean).powi(2))
            .sum::<f64>();
        (sum_sq / (n - 1) as f64).sqrt()
    };

    ReferenceStats { mean, std }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(lot: &str, day: u32, strength: f64) -> CleanRow {
        CleanRow {
            lot: lot.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            strength,
        }
    }

    #[test]
    fn two_point_lot_matches_hand_computation() {
        let rows = vec![row("A1", 1, 950.0), row("A1", 11, 930.0)];
        let lots = aggregate(&rows);
        assert_eq!(lots.len(), 1);
        let lot = &lots[0];
        assert_eq!(lot.n, 2);
        assert!((lot.mean - 940.0).abs() < 0.001);
        assert!((lot.std - 200.0_f64.sqrt()).abs() < 0.001);
        assert_eq!(lot.min, 930.0);
        assert_eq!(lot.max, 950.0);
        assert!((lot.trend.unwrap() - (-2.0)).abs() < 0.001);
    }

    #[test]
    fn single_sample_lot_has_zero_std_and_no_trend() {
        let rows = vec![row("B2", 5, 850.0)];
        let lots = aggregate(&rows);
        let lot = &lots[0];
        assert_eq!(lot.n, 1);
        assert_eq!(lot.std, 0.0);
        assert_eq!(lot.trend, None);
        assert_eq!(lot.period_start, lot.period_end);
    }

    #[test]
    fn identical_timestamps_yield_no_trend() {
        let rows = vec![row("C3", 4, 900.0), row("C3", 4, 920.0)];
        let lots = aggregate(&rows);
        assert_eq!(lots[0].n, 2);
        assert_eq!(lots[0].trend, None);
        assert!(lots[0].std > 0.0);
    }

    #[test]
    fn lots_come_out_in_first_appearance_order() {
        let rows = vec![
            row("A1", 1, 950.0),
            row("A1", 2, 940.0),
            row("B2", 1, 920.0),
            row("C3", 1, 910.0),
        ];
        let lots = aggregate(&rows);
        let names: Vec<&str> = lots.iter().map(|l| l.lot.as_str()).collect();
        assert_eq!(names, vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn trend_uses_fractional_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let half_day_later = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let rows = vec![
            CleanRow {
                lot: "D4".to_string(),
                date: start,
                strength: 900.0,
            },
            CleanRow {
                lot: "D4".to_string(),
                date: half_day_later,
                strength: 905.0,
            },
        ];
        let lots = aggregate(&rows);
        // 5 MPa over half a day is 10 MPa per day.
        assert!((lots[0].trend.unwrap() - 10.0).abs() < 0.001);
    }

    #[test]
    fn reference_std_falls_back_for_tiny_datasets() {
        assert_eq!(reference_stats(&[]).std, 1.0);
        let one = vec![row("A1", 1, 950.0)];
        let stats = reference_stats(&one);
        assert_eq!(stats.std, 1.0);
        assert!((stats.mean - 950.0).abs() < 0.001);

        let two = vec![row("A1", 1, 940.0), row("B2", 1, 960.0)];
        let stats = reference_stats(&two);
        assert!((stats.mean - 950.0).abs() < 0.001);
        assert!((stats.std - 200.0_f64.sqrt()).abs() < 0.001);
    }
}

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

mod aggregate;
mod ingest;
mod models;
mod report;
mod risk;

use models::ScoredLot;

#[derive(Parser)]
#[command(name = "lot-risk-report")]
#[command(about = "Lot risk panel for tensile-strength QC measurements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score lots from a measurement CSV and print the riskiest ones
    Score {
        #[arg(long)]
        csv: PathBuf,
        /// Lower strength threshold in MPa
        #[arg(long, default_value_t = 900.0)]
        target_low: f64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only show lots in the RISKY band
        #[arg(long)]
        risky_only: bool,
        /// Emit the full scored table as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 900.0)]
        target_low: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the scored lot table as CSV
    Export {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 900.0)]
        target_low: f64,
        #[arg(long, default_value = "lot_report.csv")]
        out: PathBuf,
    },
}

/// Runs the full pipeline: read, normalize, aggregate, score. Returns the
/// accepted row count alongside the scored lots so callers can report it.
fn run_pipeline(csv: &Path, target_low: f64) -> anyhow::Result<(usize, Vec<ScoredLot>)> {
    let table = ingest::read_csv(csv)?;
    let rows = ingest::normalize(&table, &ingest::ColumnResolver::default())?;
    let lots = aggregate::aggregate(&rows);
    let reference = aggregate::reference_stats(&rows);
    let scored = risk::score_table(&lots, &reference, target_low);
    Ok((rows.len(), scored))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            csv,
            target_low,
            limit,
            risky_only,
            json,
        } => {
            let (row_count, mut scored) = run_pipeline(&csv, target_low)?;

            if scored.is_empty() {
                println!("No valid measurement rows found.");
                return Ok(());
            }

            if json {
                println!("{}", report::to_json(&scored)?);
                return Ok(());
            }

            println!("Accepted {row_count} rows across {} lots.", scored.len());
            report::sort_for_display(&mut scored);

            println!("Top lots by risk score:");
            let listed = scored
                .iter()
                .filter(|lot| !risky_only || lot.status == models::Status::Risky);
            for lot in listed.take(limit) {
                println!(
                    "- {} score {}/100 ({}) mean {:.1} MPa across {} measurements: {}",
                    lot.lot, lot.risk_score, lot.status, lot.mean, lot.n, lot.recommendation
                );
            }
        }
        Commands::Report {
            csv,
            target_low,
            out,
        } => {
            let (row_count, scored) = run_pipeline(&csv, target_low)?;
            let report = report::build_report(&scored, row_count, target_low);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            csv,
            target_low,
            out,
        } => {
            let (row_count, mut scored) = run_pipeline(&csv, target_low)?;
            report::sort_for_display(&mut scored);
            report::write_csv(&scored, &out)?;
            println!(
                "Exported {} lots ({row_count} rows) to {}.",
                scored.len(),
                out.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::{ColumnResolver, RawTable};

    fn sample_table() -> RawTable {
        let columns = ["LOT NO", "Tarih", "Cekme Dayanimi"];
        let rows: [[&str; 3]; 7] = [
            ["A1", "01.01.2024", "950"],
            ["A1", "11.01.2024", "930"],
            ["B2", "05.01.2024", "850"],
            ["C3", "02.01.2024", "960"],
            ["C3", "09.01.2024", "955"],
            ["C3", "16.01.2024", "965"],
            ["C3", "bad date", "990"],
        ];
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    fn score_in_memory(table: &RawTable) -> Vec<ScoredLot> {
        let rows = ingest::normalize(table, &ColumnResolver::default()).unwrap();
        let lots = aggregate::aggregate(&rows);
        let reference = aggregate::reference_stats(&rows);
        risk::score_table(&lots, &reference, 900.0)
    }

    #[test]
    fn pipeline_scores_every_valid_lot() {
        let scored = score_in_memory(&sample_table());
        assert_eq!(scored.len(), 3);
        for lot in &scored {
            assert!(lot.risk_score <= 100);
        }
        let b2 = scored.iter().find(|l| l.lot == "B2").unwrap();
        assert_eq!(b2.n, 1);
        assert!(b2.risk_score >= scored.iter().map(|l| l.risk_score).min().unwrap());
        let c3 = scored.iter().find(|l| l.lot == "C3").unwrap();
        // The unparseable date row is dropped, not counted.
        assert_eq!(c3.n, 3);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let table = sample_table();
        let first = report::to_json(&score_in_memory(&table)).unwrap();
        let second = report::to_json(&score_in_memory(&table)).unwrap();
        assert_eq!(first, second);
    }
}

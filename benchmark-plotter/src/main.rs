use benchmark_plotter::generate_graphs;
use benchmark_types::MetricsRecord;
use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Regenerate the charts for a previous run from its metrics.json.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Run directory containing metrics.json.
  run_dir: PathBuf,
}

fn main() {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  let metrics_path = cli.run_dir.join("metrics.json");
  let raw = fs::read_to_string(&metrics_path).expect("read metrics.json");
  let metrics: BTreeMap<String, MetricsRecord> =
    serde_json::from_str(&raw).expect("parse metrics.json");

  println!("Loaded metrics for {} benchmarks", metrics.len());
  generate_graphs(&metrics, &cli.run_dir);
}

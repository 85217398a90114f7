use benchmark_plotter::generate_graphs;
use benchmark_runner::config::detect_dacapo_jar;
use benchmark_runner::config::detect_java;
use benchmark_runner::config::detect_renaissance_jar;
use benchmark_runner::config::DEFAULT_BENCH_ITERS;
use benchmark_runner::config::DEFAULT_PROFILE_ITERS;
use benchmark_runner::config::DEFAULT_TRIALS;
use benchmark_runner::orchestrator::run_benchmarks;
use benchmark_runner::suite::dacapo::DaCapoSuite;
use benchmark_runner::suite::renaissance::RenaissanceSuite;
use benchmark_runner::suite::BenchError;
use benchmark_runner::suite::BenchResult;
use benchmark_runner::suite::BenchmarkSuite;
use clap::Parser;
use clap::ValueEnum;
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing::info;

/*

# Benchmark runner

Measures whether loading a pre-recorded JIT compilation profile into the JVM
before a benchmark run ("warm") produces faster early iterations than a
profile-less ("cold") run. Each benchmark goes through multiple trials of a
cold run, a profiling run that emits a checkpoint file, and a warm run that
loads it; per-iteration latencies are parsed out of the subprocess output and
reduced to comparison metrics and charts.

A trial whose profiling run produces no checkpoint file contributes an empty
warm sequence and continues; a hung subprocess is fatal.

*/

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, ValueEnum)]
enum SuiteType {
  Dacapo,
  Renaissance,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Benchmark suite to drive.
  #[arg(value_enum)]
  suite: SuiteType,

  /// Benchmarks to run. Defaults to all benchmarks the suite reports.
  benchmarks: Vec<String>,

  /// Iterations for the profiling run.
  #[arg(long, default_value_t = DEFAULT_PROFILE_ITERS)]
  profile_iters: u32,

  /// Iterations for cold/warm runs.
  #[arg(long, default_value_t = DEFAULT_BENCH_ITERS)]
  bench_iters: u32,

  /// Number of trials per benchmark.
  #[arg(long, default_value_t = DEFAULT_TRIALS)]
  trials: usize,

  /// Path to the java binary. Auto-detected if omitted.
  #[arg(long)]
  java: Option<PathBuf>,

  /// Path to the suite jar. Auto-detected if omitted.
  #[arg(long)]
  jar: Option<PathBuf>,

  /// Output directory.
  #[arg(long, default_value = "results")]
  output_dir: PathBuf,

  /// Skip graph generation.
  #[arg(long)]
  no_graphs: bool,
}

async fn run(cli: Cli) -> BenchResult<PathBuf> {
  // Resolve paths once up front; the trial loop never re-detects.
  let java_path = match cli.java {
    Some(path) => path,
    None => detect_java()?,
  };
  let jar_path = match cli.jar {
    Some(path) => path,
    None => match cli.suite {
      SuiteType::Dacapo => detect_dacapo_jar()?,
      SuiteType::Renaissance => detect_renaissance_jar()?,
    },
  };
  info!(java = %java_path.display(), jar = %jar_path.display(), "resolved paths");

  let suite: Box<dyn BenchmarkSuite> = match cli.suite {
    SuiteType::Dacapo => Box::new(DaCapoSuite::new(java_path, jar_path)),
    SuiteType::Renaissance => Box::new(RenaissanceSuite::new(java_path, jar_path)),
  };
  suite.validate_setup().await?;

  let available = suite.available_benchmarks().await;
  let benchmarks = if cli.benchmarks.is_empty() {
    available.clone()
  } else {
    cli.benchmarks
  };
  for bench in &benchmarks {
    if !available.iter().any(|a| a == bench) {
      return Err(BenchError::Setup(format!(
        "unknown benchmark '{}', available: {}",
        bench,
        available.join(", ")
      )));
    }
  }

  info!(
    suite = suite.name(),
    benchmarks = ?benchmarks,
    profile_iters = cli.profile_iters,
    bench_iters = cli.bench_iters,
    trials = cli.trials,
    "starting run"
  );

  let out = run_benchmarks(
    suite.as_ref(),
    &benchmarks,
    cli.profile_iters,
    cli.bench_iters,
    cli.trials,
    &cli.output_dir,
  )
  .await?;

  if !cli.no_graphs {
    generate_graphs(&out.metrics, &out.run_dir);
  }

  Ok(out.run_dir)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  match run(cli).await {
    Ok(run_dir) => info!(run_dir = %run_dir.display(), "done"),
    Err(err) => {
      error!(%err, "run failed");
      process::exit(1);
    }
  }
}

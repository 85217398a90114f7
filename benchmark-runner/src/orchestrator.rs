use crate::metrics::compute_metrics;
use crate::suite::BenchResult;
use crate::suite::BenchmarkSuite;
use benchmark_types::BenchmarkAccumulation;
use benchmark_types::MetricsRecord;
use benchmark_types::RunResult;
use benchmark_types::TrialRecord;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing::warn;

pub struct RunOutput {
  pub run_dir: PathBuf,
  pub accumulations: Vec<BenchmarkAccumulation>,
  pub metrics: BTreeMap<String, MetricsRecord>,
}

/// Drive every requested benchmark through `trials` repetitions of the
/// cold -> profile -> warm sequence, persisting raw logs as the loop proceeds
/// and reducing the accumulated timings to metrics at the end.
///
/// Only the missing-artifact case is recovered (that trial's warm data is
/// downgraded to empty/absent and the loop continues); adapter errors
/// propagate and abort the whole run.
pub async fn run_benchmarks(
  suite: &dyn BenchmarkSuite,
  benchmarks: &[String],
  profile_iters: u32,
  bench_iters: u32,
  trials: usize,
  output_dir: &Path,
) -> BenchResult<RunOutput> {
  // The pid suffix keeps concurrent runs started in the same second from
  // sharing a directory.
  let run_dir = output_dir.join(format!(
    "{}_{}",
    Utc::now().format("%Y%m%d_%H%M%S"),
    process::id()
  ));
  let raw_dir = run_dir.join("raw");
  fs::create_dir_all(&raw_dir)?;
  info!(run_dir = %run_dir.display(), "created run directory");

  let mut accumulations = Vec::new();

  for bench in benchmarks {
    info!(benchmark = %bench, "starting benchmark");
    let mut bench_trials = Vec::new();

    for trial in 0..trials {
      info!(trial = trial + 1, total = trials, "starting trial");
      let profile_path = raw_dir.join(format!("{}_trial{}.mdox", bench, trial));

      info!(benchmark = %bench, iters = bench_iters, "cold run");
      let cold = suite.run_cold(bench, bench_iters).await?;
      save_log(&raw_dir.join(format!("{}_trial{}_cold.log", bench, trial)), &cold)?;
      info!(
        iterations = cold.iteration_times.len(),
        exit_code = cold.exit_code,
        "cold run complete"
      );

      info!(benchmark = %bench, iters = profile_iters, "profiling run");
      let prof = suite.run_profiling(bench, profile_iters, &profile_path).await?;
      save_log(
        &raw_dir.join(format!("{}_trial{}_profile.log", bench, trial)),
        &prof,
      )?;
      info!(
        exit_code = prof.exit_code,
        profile = %profile_path.display(),
        "profiling run complete"
      );

      // A profiling run can legitimately fail to produce usable output, e.g.
      // the benchmark never reaches a checkpoint. That downgrades this one
      // trial, not the pipeline.
      if !profile_path.exists() {
        warn!(profile = %profile_path.display(), "profile file not created, skipping warm run");
        bench_trials.push(TrialRecord {
          cold: cold.iteration_times,
          warm: Vec::new(),
          compile_time: None,
        });
        continue;
      }

      info!(benchmark = %bench, iters = bench_iters, "warm run");
      let warm = suite.run_warm(bench, bench_iters, &profile_path).await?;
      save_log(&raw_dir.join(format!("{}_trial{}_warm.log", bench, trial)), &warm)?;
      info!(
        iterations = warm.iteration_times.len(),
        compile_time = ?warm.compile_time,
        exit_code = warm.exit_code,
        "warm run complete"
      );

      bench_trials.push(TrialRecord {
        cold: cold.iteration_times,
        warm: warm.iteration_times,
        compile_time: warm.compile_time,
      });
    }

    accumulations.push(BenchmarkAccumulation {
      benchmark: bench.clone(),
      trials: bench_trials,
    });
  }

  let metrics = compute_metrics(&accumulations);
  let metrics_file = run_dir.join("metrics.json");
  fs::write(
    &metrics_file,
    serde_json::to_string_pretty(&metrics).expect("serialize metrics"),
  )?;
  info!(metrics_file = %metrics_file.display(), "metrics written");

  Ok(RunOutput {
    run_dir,
    accumulations,
    metrics,
  })
}

fn save_log(path: &Path, result: &RunResult) -> io::Result<()> {
  let mut log = format!("exit_code: {}\n", result.exit_code);
  log.push_str(&format!("iteration_times: {:?}\n", result.iteration_times));
  match result.compile_time {
    Some(ms) => log.push_str(&format!("compile_time: {} ms\n", ms)),
    None => log.push_str("compile_time: n/a\n"),
  }
  log.push_str(&"=".repeat(40));
  log.push('\n');
  log.push_str(&result.raw_output);
  fs::write(path, log)
}

use crate::config::BASE_JVM_ARGS;
use crate::config::RUN_TIMEOUT;
use crate::config::VERSION_CHECK_TIMEOUT;
use crate::suite::parse_compile_time;
use crate::suite::run_command;
use crate::suite::BenchError;
use crate::suite::BenchResult;
use crate::suite::BenchmarkSuite;
use async_trait::async_trait;
use benchmark_types::RunResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::path::PathBuf;

// Benchmarks known to work with the modified jar's profilecheckpoint hooks.
const KNOWN_BENCHMARKS: &[&str] = &[
  "avrora", "batik", "biojava", "eclipse", "fop", "graphchi", "h2", "jme", "kafka",
];

static WARMUP_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"completed warmup \d+ in (\d+) msec").unwrap());

static FINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"PASSED in (\d+) msec").unwrap());

fn parse_latencies(output: &str) -> Vec<f64> {
  // Warmup iterations report one line each; the final iteration reports as
  // PASSED. Together they form the per-iteration sequence in order.
  output
    .lines()
    .filter_map(|line| {
      WARMUP_RE
        .captures(line)
        .or_else(|| FINAL_RE.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    })
    .collect()
}

/// DaCapo suite adapter, driving the modified jar with profilecheckpoint
/// hooks.
pub struct DaCapoSuite {
  java_path: PathBuf,
  jar_path: PathBuf,
}

impl DaCapoSuite {
  pub fn new(java_path: PathBuf, jar_path: PathBuf) -> Self {
    Self {
      java_path,
      jar_path,
    }
  }

  async fn run(
    &self,
    benchmark: &str,
    n_iters: u32,
    extra_jvm_args: &[String],
  ) -> BenchResult<RunResult> {
    let mut args: Vec<String> = BASE_JVM_ARGS.iter().map(|a| a.to_string()).collect();
    args.extend(extra_jvm_args.iter().cloned());
    args.push("-jar".to_string());
    args.push(self.jar_path.display().to_string());
    args.push("-n".to_string());
    args.push(n_iters.to_string());
    args.push("-s".to_string());
    args.push("small".to_string());
    args.push(benchmark.to_string());

    let captured = run_command(&self.java_path, &args, RUN_TIMEOUT).await?;
    let output = captured.combined();
    Ok(RunResult {
      iteration_times: parse_latencies(&output),
      compile_time: parse_compile_time(&output),
      raw_output: output,
      exit_code: captured.exit_code,
    })
  }
}

#[async_trait]
impl BenchmarkSuite for DaCapoSuite {
  fn name(&self) -> &'static str {
    "dacapo"
  }

  async fn available_benchmarks(&self) -> Vec<String> {
    KNOWN_BENCHMARKS.iter().map(|b| b.to_string()).collect()
  }

  async fn validate_setup(&self) -> BenchResult<()> {
    if !self.java_path.exists() {
      return Err(BenchError::Setup(format!(
        "java binary not found: {}",
        self.java_path.display()
      )));
    }
    if !self.jar_path.exists() {
      return Err(BenchError::Setup(format!(
        "DaCapo jar not found: {}",
        self.jar_path.display()
      )));
    }
    let check = run_command(
      &self.java_path,
      &["-version".to_string()],
      VERSION_CHECK_TIMEOUT,
    )
    .await?;
    if check.exit_code != 0 {
      return Err(BenchError::Setup(format!(
        "java binary failed: {}",
        check.stderr
      )));
    }
    Ok(())
  }

  async fn run_cold(&self, benchmark: &str, n_iters: u32) -> BenchResult<RunResult> {
    self.run(benchmark, n_iters, &[]).await
  }

  async fn run_profiling(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult> {
    let args = vec![format!(
      "-Ddacapo.profilecheckpoint.file={}",
      profile_path.display()
    )];
    self.run(benchmark, n_iters, &args).await
  }

  async fn run_warm(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult> {
    let args = vec![
      format!("-Ddacapo.profilecheckpoint.file={}", profile_path.display()),
      "-Ddacapo.profilecheckpoint.loadafter=0".to_string(),
      "-XX:+EagerCompileAfterLoad".to_string(),
    ];
    self.run(benchmark, n_iters, &args).await
  }
}

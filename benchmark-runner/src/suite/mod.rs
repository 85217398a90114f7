use async_trait::async_trait;
use benchmark_types::RunResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

pub mod dacapo;
pub mod renaissance;

pub type BenchResult<T> = Result<T, BenchError>;

#[derive(Debug)]
pub enum BenchError {
  /// Missing or broken java binary, suite jar, or benchmark name. Surfaced
  /// before any run starts.
  Setup(String),
  /// A subprocess exceeded its fixed upper bound. Aborts the whole run; a
  /// hung benchmark must not be absorbed as degraded data.
  ProcessTimeout { command: String, timeout_secs: u64 },
  Io(io::Error),
}

impl Display for BenchError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BenchError::Setup(msg) => write!(f, "setup failed: {}", msg),
      BenchError::ProcessTimeout {
        command,
        timeout_secs,
      } => write!(
        f,
        "process did not finish within {}s: {}",
        timeout_secs, command
      ),
      BenchError::Io(err) => write!(f, "I/O error: {}", err),
    }
  }
}

impl Error for BenchError {}

impl From<io::Error> for BenchError {
  fn from(err: io::Error) -> Self {
    BenchError::Io(err)
  }
}

/// A benchmark suite adapter. Each implementation knows how to build the
/// subprocess command line for its suite and how to parse that suite's output
/// format; the orchestrator only sees uniform RunResult records.
#[async_trait]
pub trait BenchmarkSuite: Send + Sync {
  fn name(&self) -> &'static str;

  async fn available_benchmarks(&self) -> Vec<String>;

  /// Check that the java binary and jar exist and work. Fails with Setup
  /// before any benchmark runs.
  async fn validate_setup(&self) -> BenchResult<()>;

  /// Run without a profile. Baseline measurement.
  async fn run_cold(&self, benchmark: &str, n_iters: u32) -> BenchResult<RunResult>;

  /// Run to emit a profile checkpoint file at `profile_path`. The artifact is
  /// a side effect and not guaranteed to appear.
  async fn run_profiling(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult>;

  /// Run loading the profile at `profile_path`, eager-compiling from it.
  async fn run_warm(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult>;
}

static COMPILE_TIME_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"ProfileCheckpoint: load\+compile took (\d+) ms").unwrap());

/// Load+compile time reported by the JVM profilecheckpoint hook. The same
/// marker line is printed under both suites.
pub(crate) fn parse_compile_time(output: &str) -> Option<f64> {
  COMPILE_TIME_RE
    .captures(output)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse::<f64>().ok())
}

pub(crate) struct CapturedRun {
  pub stdout: String,
  pub stderr: String,
  pub exit_code: i32,
}

impl CapturedRun {
  pub fn combined(&self) -> String {
    format!("{}\n{}", self.stdout, self.stderr)
  }
}

/// Launch a process, capture stdout and stderr, and wait for it under the
/// given bound. Timeout kills the child and is fatal.
pub(crate) async fn run_command(
  program: &Path,
  args: &[String],
  timeout: Duration,
) -> BenchResult<CapturedRun> {
  info!(command = %format!("{} {}", program.display(), args.join(" ")), "launching");
  let mut cmd = Command::new(program);
  cmd
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);
  let child = cmd.spawn()?;
  let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
    Ok(output) => output?,
    Err(_) => {
      return Err(BenchError::ProcessTimeout {
        command: format!("{} {}", program.display(), args.join(" ")),
        timeout_secs: timeout.as_secs(),
      })
    }
  };
  Ok(CapturedRun {
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    // None when killed by a signal.
    exit_code: output.status.code().unwrap_or(-1),
  })
}

#[cfg(test)]
mod tests {
  use crate::suite::BenchError;

  #[test]
  fn test_error_display() {
    let err = BenchError::Setup("java binary not found: /nope/java".to_string());
    assert_eq!(
      err.to_string(),
      "setup failed: java binary not found: /nope/java"
    );

    let err = BenchError::ProcessTimeout {
      command: "java -jar bench.jar".to_string(),
      timeout_secs: 1800,
    };
    assert_eq!(
      err.to_string(),
      "process did not finish within 1800s: java -jar bench.jar"
    );
  }
}

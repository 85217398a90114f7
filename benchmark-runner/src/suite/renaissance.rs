use crate::config::newest_jar;
use crate::config::BASE_JVM_ARGS;
use crate::config::LIST_TIMEOUT;
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
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tracing::info;
use tracing::warn;

// Plugin class shipped with the custom Renaissance build.
const PLUGIN_CLASS: &str = "org.renaissance.plugins.profilecheckpoint.ProfileCheckpointPlugin";

static PLUGIN_JAR_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^plugin-profile-checkpoint-assembly-.*\.jar$").unwrap());

// Full benchmark list from renaissance 0.16.x (--raw-list output), used when
// the jar cannot be queried. Excludes the dummy-* test benchmarks.
const KNOWN_BENCHMARKS: &[&str] = &[
  // apache-spark
  "als",
  "chi-square",
  "dec-tree",
  "gauss-mix",
  "log-regression",
  "movie-lens",
  "naive-bayes",
  "page-rank",
  // concurrency
  "akka-uct",
  "fj-kmeans",
  "reactors",
  // database
  "db-shootout",
  "neo4j-analytics",
  // functional
  "future-genetic",
  "mnemonics",
  "par-mnemonics",
  "rx-scrabble",
  "scrabble",
  // scala
  "dotty",
  "philosophers",
  "scala-doku",
  "scala-kmeans",
  "scala-stm-bench7",
  // web
  "finagle-chirper",
  "finagle-http",
];

static JSON_OUT_SEQ: AtomicU64 = AtomicU64::new(0);

fn temp_json_path() -> PathBuf {
  env::temp_dir().join(format!(
    "renaissance-{}-{}.json",
    process::id(),
    JSON_OUT_SEQ.fetch_add(1, Ordering::Relaxed)
  ))
}

/// Per-iteration wall-clock times (ms) from Renaissance's --json report.
fn parse_latencies_json(raw: &str, benchmark: &str) -> Vec<f64> {
  let Ok(data) = serde_json::from_str::<serde_json::Value>(raw) else {
    return Vec::new();
  };
  // Format v6+ nests timings under data[benchmark].results; older builds used
  // benchmarks[benchmark].results.
  let container = data.get("data").or_else(|| data.get("benchmarks"));
  let Some(results) = container
    .and_then(|c| c.get(benchmark))
    .and_then(|b| b.get("results"))
    .and_then(|r| r.as_array())
  else {
    return Vec::new();
  };
  // duration_ns is present in Renaissance >= 0.14.
  let times: Vec<f64> = results
    .iter()
    .filter_map(|r| r.get("duration_ns").and_then(|v| v.as_f64()))
    .map(|ns| ns / 1_000_000.0)
    .collect();
  if !times.is_empty() {
    return times;
  }
  // Older format used duration_ms directly.
  results
    .iter()
    .filter_map(|r| r.get("duration_ms").and_then(|v| v.as_f64()))
    .collect()
}

/// Locate the profile-checkpoint plugin jar relative to the Renaissance repo
/// root. The Renaissance jar lives at <repo>/target/renaissance-gpl-*.jar.
fn find_plugin_jar(renaissance_jar: &Path) -> Option<PathBuf> {
  let repo_root = renaissance_jar.parent()?.parent()?;
  let plugin_dir = repo_root
    .join("plugins")
    .join("profile-checkpoint")
    .join("target");
  newest_jar(&plugin_dir, &PLUGIN_JAR_RE)
}

/// Renaissance suite adapter. Latencies come from the harness's JSON report
/// rather than stdout; the profile checkpoint hooks come from a harness
/// plugin.
pub struct RenaissanceSuite {
  java_path: PathBuf,
  jar_path: PathBuf,
  plugin_jar: Option<PathBuf>,
}

impl RenaissanceSuite {
  pub fn new(java_path: PathBuf, jar_path: PathBuf) -> Self {
    let plugin_jar = find_plugin_jar(&jar_path);
    Self {
      java_path,
      jar_path,
      plugin_jar,
    }
  }

  fn plugin_harness_args(&self) -> Vec<String> {
    match &self.plugin_jar {
      Some(jar) => vec![
        "--plugin".to_string(),
        format!("{}!{}", jar.display(), PLUGIN_CLASS),
      ],
      None => Vec::new(),
    }
  }

  async fn run(
    &self,
    benchmark: &str,
    n_iters: u32,
    extra_jvm_args: &[String],
    extra_harness_args: &[String],
  ) -> BenchResult<RunResult> {
    let json_out = temp_json_path();

    let mut args: Vec<String> = BASE_JVM_ARGS.iter().map(|a| a.to_string()).collect();
    args.extend(extra_jvm_args.iter().cloned());
    args.push("-jar".to_string());
    args.push(self.jar_path.display().to_string());
    args.extend(extra_harness_args.iter().cloned());
    args.push("-r".to_string());
    args.push(n_iters.to_string());
    args.push("--json".to_string());
    args.push(json_out.display().to_string());
    args.push(benchmark.to_string());

    let captured = run_command(&self.java_path, &args, RUN_TIMEOUT).await?;
    let output = captured.combined();

    let iteration_times = match fs::read_to_string(&json_out) {
      Ok(raw) => parse_latencies_json(&raw, benchmark),
      Err(_) => Vec::new(),
    };
    let _ = fs::remove_file(&json_out);

    Ok(RunResult {
      iteration_times,
      compile_time: parse_compile_time(&output),
      raw_output: output,
      exit_code: captured.exit_code,
    })
  }
}

#[async_trait]
impl BenchmarkSuite for RenaissanceSuite {
  fn name(&self) -> &'static str {
    "renaissance"
  }

  async fn available_benchmarks(&self) -> Vec<String> {
    // Ask the jar itself; it knows which benchmarks this build supports.
    let args = vec![
      "-jar".to_string(),
      self.jar_path.display().to_string(),
      "--raw-list".to_string(),
    ];
    if let Ok(run) = run_command(&self.java_path, &args, LIST_TIMEOUT).await {
      let benchmarks: Vec<String> = run
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("dummy-"))
        .map(str::to_string)
        .collect();
      if !benchmarks.is_empty() {
        return benchmarks;
      }
    }
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
        "Renaissance jar not found: {}",
        self.jar_path.display()
      )));
    }
    match &self.plugin_jar {
      Some(jar) => info!(plugin = %jar.display(), "profile-checkpoint plugin found"),
      None => warn!(
        "profile-checkpoint plugin jar not found, profile/warm runs will not produce checkpoint files"
      ),
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
    self.run(benchmark, n_iters, &[], &[]).await
  }

  async fn run_profiling(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult> {
    let jvm_args = vec![format!(
      "-Drenaissance.profilecheckpoint.file={}",
      profile_path.display()
    )];
    self
      .run(benchmark, n_iters, &jvm_args, &self.plugin_harness_args())
      .await
  }

  async fn run_warm(
    &self,
    benchmark: &str,
    n_iters: u32,
    profile_path: &Path,
  ) -> BenchResult<RunResult> {
    let jvm_args = vec![
      format!(
        "-Drenaissance.profilecheckpoint.file={}",
        profile_path.display()
      ),
      "-Drenaissance.profilecheckpoint.loadafter=1".to_string(),
      "-XX:+EagerCompileAfterLoad".to_string(),
    ];
    self
      .run(benchmark, n_iters, &jvm_args, &self.plugin_harness_args())
      .await
  }
}

#[cfg(test)]
mod tests {
  use crate::suite::renaissance::parse_latencies_json;

  #[test]
  fn test_parse_latencies_v6_duration_ns() {
    let raw = r#"{
      "data": {
        "scrabble": {
          "results": [
            {"duration_ns": 1500000000},
            {"duration_ns": 900000000}
          ]
        }
      }
    }"#;
    assert_eq!(parse_latencies_json(raw, "scrabble"), vec![1500.0, 900.0]);
  }

  #[test]
  fn test_parse_latencies_old_format_duration_ms() {
    let raw = r#"{
      "benchmarks": {
        "scrabble": {
          "results": [
            {"duration_ms": 1500.0},
            {"duration_ms": 900.0}
          ]
        }
      }
    }"#;
    assert_eq!(parse_latencies_json(raw, "scrabble"), vec![1500.0, 900.0]);
  }

  #[test]
  fn test_parse_latencies_wrong_benchmark() {
    let raw = r#"{"data": {"scrabble": {"results": [{"duration_ns": 1}]}}}"#;
    assert!(parse_latencies_json(raw, "philosophers").is_empty());
  }

  #[test]
  fn test_parse_latencies_invalid_json() {
    assert!(parse_latencies_json("not json", "scrabble").is_empty());
    assert!(parse_latencies_json("", "scrabble").is_empty());
  }
}

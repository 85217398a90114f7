use serde::Deserialize;
use serde::Serialize;

// These types are shared between the runner and the plotter so that the
// plotter doesn't need a dependency on the runner crate.

/// Outcome of one benchmark subprocess invocation. Immutable once produced.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RunResult {
  /// Per-iteration wall-clock latencies in milliseconds. Empty if none parsed.
  pub iteration_times: Vec<f64>,
  /// Load+compile time in milliseconds. None when the run did not report one;
  /// a genuine zero measurement stays distinguishable from "not reported".
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compile_time: Option<f64>,
  /// Full captured stdout + stderr.
  pub raw_output: String,
  pub exit_code: i32,
}

/// One cold/profile/warm attempt for a benchmark.
///
/// The warm sequence is empty and the compile time absent when the profiling
/// step did not produce its file artifact.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TrialRecord {
  pub cold: Vec<f64>,
  pub warm: Vec<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compile_time: Option<f64>,
}

/// All trials attempted for one benchmark, in trial order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BenchmarkAccumulation {
  pub benchmark: String,
  pub trials: Vec<TrialRecord>,
}

/// Derived comparison metrics for one benchmark.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MetricsRecord {
  /// Element-wise median across trials of the cold iteration times.
  pub cold_curve: Vec<f64>,
  /// Element-wise median across trials of the warm iteration times.
  pub warm_curve: Vec<f64>,
  /// Mean of the last 10 cold-curve values (all of them if fewer), taken as
  /// the asymptotic steady-state latency.
  pub cold_optimal: f64,
  /// cold_curve[0] / cold_optimal, 0 when undefined.
  pub optimal_speedup: f64,
  /// Smallest iteration index whose cold-curve value is within 10% of the
  /// curve minimum; equals the curve length when never reached.
  pub cold_time_to_optimal: usize,
  /// Third warm-curve value, falling back to the last, then 0.
  pub warm_target: f64,
  /// cold_curve[0] / warm_target, 0 when either operand is unavailable.
  pub our_improvement: f64,
  /// cold_curve[i] / warm_target per index; empty when warm_target is 0.
  pub closeness_ratio: Vec<f64>,
  /// Median of the per-trial compile times that were reported.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compile_time_median: Option<f64>,
}

#[cfg(test)]
mod tests {
  use crate::MetricsRecord;
  use crate::RunResult;

  #[test]
  fn test_metrics_record_field_names_are_stable() {
    let record = MetricsRecord {
      cold_curve: vec![100.0, 80.0],
      warm_curve: vec![60.0],
      cold_optimal: 90.0,
      optimal_speedup: 1.1,
      cold_time_to_optimal: 1,
      warm_target: 60.0,
      our_improvement: 1.6,
      closeness_ratio: vec![1.6, 1.3],
      compile_time_median: Some(250.0),
    };
    let value = serde_json::to_value(&record).unwrap();
    let obj = value.as_object().unwrap();
    for key in [
      "cold_curve",
      "warm_curve",
      "cold_optimal",
      "optimal_speedup",
      "cold_time_to_optimal",
      "warm_target",
      "our_improvement",
      "closeness_ratio",
      "compile_time_median",
    ] {
      assert!(obj.contains_key(key), "missing field {}", key);
    }
  }

  #[test]
  fn test_absent_compile_time_median_is_omitted() {
    let record = MetricsRecord::default();
    let value = serde_json::to_value(&record).unwrap();
    assert!(!value.as_object().unwrap().contains_key("compile_time_median"));
  }

  #[test]
  fn test_run_result_default_is_empty() {
    let result = RunResult::default();
    assert!(result.iteration_times.is_empty());
    assert!(result.compile_time.is_none());
    assert_eq!(result.exit_code, 0);
  }
}

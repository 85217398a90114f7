use benchmark_types::BenchmarkAccumulation;
use benchmark_types::MetricsRecord;
use std::collections::BTreeMap;

// Fixed policy constants: "optimal" is the mean of the last 10 cold
// iterations, and "reached optimal" means within 10% of the curve minimum.
const OPTIMAL_TAIL_LEN: usize = 10;
const OPTIMAL_TOLERANCE: f64 = 1.1;

fn median(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
  let mid = sorted.len() / 2;
  Some(if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  })
}

/// Element-wise median across trials. Trials shorter than index i simply
/// don't vote at i, so trials of differing lengths neither crash nor truncate
/// the curve to the shortest.
pub fn median_across_trials(trials: &[Vec<f64>]) -> Vec<f64> {
  let max_len = trials.iter().map(|t| t.len()).max().unwrap_or(0);
  (0..max_len)
    .map(|i| {
      let vals: Vec<f64> = trials.iter().filter(|t| t.len() > i).map(|t| t[i]).collect();
      median(&vals).unwrap_or(0.0)
    })
    .collect()
}

fn reduce_benchmark(acc: &BenchmarkAccumulation) -> MetricsRecord {
  let cold_trials: Vec<Vec<f64>> = acc.trials.iter().map(|t| t.cold.clone()).collect();
  let warm_trials: Vec<Vec<f64>> = acc.trials.iter().map(|t| t.warm.clone()).collect();
  let compile_times: Vec<f64> = acc.trials.iter().filter_map(|t| t.compile_time).collect();

  let cold = median_across_trials(&cold_trials);
  let warm = median_across_trials(&warm_trials);

  let (cold_optimal, optimal_speedup, cold_time_to_optimal) = if cold.is_empty() {
    (0.0, 0.0, 0)
  } else {
    let tail = if cold.len() >= OPTIMAL_TAIL_LEN {
      &cold[cold.len() - OPTIMAL_TAIL_LEN..]
    } else {
      &cold[..]
    };
    let cold_optimal = tail.iter().sum::<f64>() / tail.len() as f64;
    let optimal_speedup = if cold_optimal > 0.0 {
      cold[0] / cold_optimal
    } else {
      0.0
    };
    let cold_min = cold.iter().cloned().fold(f64::INFINITY, f64::min);
    let threshold = cold_min * OPTIMAL_TOLERANCE;
    let cold_time_to_optimal = cold
      .iter()
      .position(|&t| t <= threshold)
      .unwrap_or(cold.len());
    (cold_optimal, optimal_speedup, cold_time_to_optimal)
  };

  let warm_target = if warm.len() > 2 {
    warm[2]
  } else {
    warm.last().copied().unwrap_or(0.0)
  };
  let our_improvement = if !cold.is_empty() && warm_target > 0.0 {
    cold[0] / warm_target
  } else {
    0.0
  };
  let closeness_ratio: Vec<f64> = if warm_target > 0.0 {
    cold.iter().map(|c| c / warm_target).collect()
  } else {
    Vec::new()
  };
  let compile_time_median = median(&compile_times);

  MetricsRecord {
    cold_curve: cold,
    warm_curve: warm,
    cold_optimal,
    optimal_speedup,
    cold_time_to_optimal,
    warm_target,
    our_improvement,
    closeness_ratio,
    compile_time_median,
  }
}

/// Reduce each benchmark's accumulated trials to its comparison metrics.
/// Pure and stateless; a benchmark with zero usable trials still yields an
/// all-sentinel record so consumers never need to special-case a missing key.
pub fn compute_metrics(accumulations: &[BenchmarkAccumulation]) -> BTreeMap<String, MetricsRecord> {
  accumulations
    .iter()
    .map(|acc| (acc.benchmark.clone(), reduce_benchmark(acc)))
    .collect()
}

#[cfg(test)]
mod tests {
  use crate::metrics::compute_metrics;
  use crate::metrics::median_across_trials;
  use benchmark_types::BenchmarkAccumulation;
  use benchmark_types::TrialRecord;

  fn acc(benchmark: &str, trials: Vec<TrialRecord>) -> BenchmarkAccumulation {
    BenchmarkAccumulation {
      benchmark: benchmark.to_string(),
      trials,
    }
  }

  fn trial(cold: Vec<f64>, warm: Vec<f64>, compile_time: Option<f64>) -> TrialRecord {
    TrialRecord {
      cold,
      warm,
      compile_time,
    }
  }

  #[test]
  fn test_median_across_trials_uneven_lengths() {
    // Shorter trials don't vote at later indices.
    let curve = median_across_trials(&[vec![10.0, 20.0, 30.0], vec![12.0], vec![8.0, 22.0]]);
    assert_eq!(curve, vec![10.0, 21.0, 30.0]);
  }

  #[test]
  fn test_median_across_trials_empty() {
    assert!(median_across_trials(&[]).is_empty());
    assert!(median_across_trials(&[vec![], vec![]]).is_empty());
  }

  #[test]
  fn test_median_even_count_averages_middle_pair() {
    let curve = median_across_trials(&[vec![10.0], vec![20.0]]);
    assert_eq!(curve, vec![15.0]);
  }

  #[test]
  fn test_cold_and_warm_metrics_end_to_end() {
    let cold = vec![
      100.0, 90.0, 85.0, 82.0, 80.0, 80.0, 79.0, 80.0, 80.0, 80.0, 80.0,
    ];
    let warm = vec![60.0, 55.0, 50.0];
    let metrics = compute_metrics(&[acc("avrora", vec![trial(cold, warm, Some(1200.0))])]);
    let m = &metrics["avrora"];

    // Mean of the last 10 values.
    assert!((m.cold_optimal - 81.6).abs() < 1e-9);
    assert!((m.optimal_speedup - 100.0 / 81.6).abs() < 1e-9);
    // Min is 79, threshold 86.9; the first value at or below it is 85 at
    // index 2.
    assert_eq!(m.cold_time_to_optimal, 2);
    assert_eq!(m.warm_target, 50.0);
    assert_eq!(m.our_improvement, 2.0);
    assert_eq!(m.closeness_ratio.len(), m.cold_curve.len());
    assert_eq!(m.closeness_ratio[0], 2.0);
    assert_eq!(m.compile_time_median, Some(1200.0));
  }

  #[test]
  fn test_short_cold_curve_uses_all_values_for_optimal() {
    let metrics = compute_metrics(&[acc(
      "fop",
      vec![trial(vec![100.0, 60.0], vec![], None)],
    )]);
    let m = &metrics["fop"];
    assert_eq!(m.cold_optimal, 80.0);
    assert_eq!(m.optimal_speedup, 1.25);
  }

  #[test]
  fn test_time_to_optimal_within_bounds() {
    // First value already within 10% of the minimum.
    let metrics = compute_metrics(&[acc("h2", vec![trial(vec![100.0, 100.0], vec![], None)])]);
    assert_eq!(metrics["h2"].cold_time_to_optimal, 0);
  }

  #[test]
  fn test_zero_denominators_never_error() {
    // All-zero curves make both cold_optimal and warm_target zero.
    let metrics = compute_metrics(&[acc(
      "batik",
      vec![trial(vec![0.0, 0.0], vec![0.0, 0.0, 0.0], None)],
    )]);
    let m = &metrics["batik"];
    assert_eq!(m.cold_optimal, 0.0);
    assert_eq!(m.optimal_speedup, 0.0);
    assert_eq!(m.warm_target, 0.0);
    assert_eq!(m.our_improvement, 0.0);
    assert!(m.closeness_ratio.is_empty());
  }

  #[test]
  fn test_warm_target_fallback_to_last() {
    let metrics = compute_metrics(&[acc(
      "jme",
      vec![trial(vec![100.0], vec![60.0, 55.0], None)],
    )]);
    assert_eq!(metrics["jme"].warm_target, 55.0);
  }

  #[test]
  fn test_empty_accumulation_yields_sentinel_record() {
    let metrics = compute_metrics(&[acc("kafka", vec![])]);
    let m = &metrics["kafka"];
    assert!(m.cold_curve.is_empty());
    assert!(m.warm_curve.is_empty());
    assert_eq!(m.cold_optimal, 0.0);
    assert_eq!(m.optimal_speedup, 0.0);
    assert_eq!(m.cold_time_to_optimal, 0);
    assert_eq!(m.warm_target, 0.0);
    assert_eq!(m.our_improvement, 0.0);
    assert!(m.closeness_ratio.is_empty());
    assert!(m.compile_time_median.is_none());
  }

  #[test]
  fn test_compile_time_median_ignores_absent_entries() {
    let metrics = compute_metrics(&[acc(
      "avrora",
      vec![
        trial(vec![100.0], vec![50.0], Some(100.0)),
        trial(vec![100.0], vec![], None),
        trial(vec![100.0], vec![50.0], Some(200.0)),
      ],
    )]);
    assert_eq!(metrics["avrora"].compile_time_median, Some(150.0));
  }

  #[test]
  fn test_reduction_is_deterministic() {
    let accs = vec![acc(
      "avrora",
      vec![
        trial(vec![100.0, 90.0], vec![60.0, 55.0, 50.0], Some(1000.0)),
        trial(vec![98.0, 91.0, 89.0], vec![61.0], Some(1100.0)),
      ],
    )];
    let first = compute_metrics(&accs);
    let second = compute_metrics(&accs);
    assert_eq!(first, second);
    assert_eq!(
      serde_json::to_string(&first).unwrap(),
      serde_json::to_string(&second).unwrap()
    );
  }
}

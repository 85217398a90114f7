use benchmark_types::MetricsRecord;
use charts_rs::svg_to_webp;
use charts_rs::Box as ChartBox;
use charts_rs::HorizontalBarChart;
use charts_rs::LegendCategory;
use charts_rs::LineChart;
use charts_rs::Series;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

// Renders the metrics map into webp charts under <run_dir>/graphs/. Pure
// consumer of the metrics; nothing here feeds back into orchestration.

fn iteration_labels(len: usize) -> Vec<String> {
  // Label every iteration on short curves, every fifth on long ones.
  let step = if len > 30 { 5 } else { 1 };
  (0..len)
    .map(|i| {
      if i % step == 0 {
        i.to_string()
      } else {
        String::new()
      }
    })
    .collect()
}

fn as_f32(values: &[f64]) -> Vec<f32> {
  values.iter().map(|v| *v as f32).collect()
}

fn write_line_chart(path: &PathBuf, title: &str, series_list: Vec<Series>, x_axis: Vec<String>) {
  let mut chart = LineChart::new_with_theme(series_list, x_axis, "light");
  chart.title_text = title.to_string();
  chart.width = 1200.0;
  chart.height = 800.0;
  chart.legend_category = LegendCategory::Normal;
  // Small margins around the legend to prevent overlap with the title.
  chart.legend_margin = Some(ChartBox {
    top: chart.title_height + 10.0,
    bottom: 5.0,
    ..Default::default()
  });

  let svg = chart.svg().unwrap();
  let webp_data = svg_to_webp(&svg).unwrap();
  fs::write(path, webp_data).unwrap();
}

fn generate_horizontal_bar_chart(path: &PathBuf, title: &str, data: Vec<(String, f64)>) {
  let mut sorted_data = data;
  sorted_data.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

  let labels: Vec<String> = sorted_data.iter().map(|(label, _)| label.clone()).collect();
  let values: Vec<f32> = sorted_data.iter().map(|(_, val)| *val as f32).collect();

  let series = Series::new("".to_string(), values);
  let mut chart = HorizontalBarChart::new_with_theme(vec![series], labels, "light");

  chart.title_text = title.to_string();
  chart.width = 1200.0;
  chart.height = 80.0 + sorted_data.len() as f32 * 35.0;
  chart.legend_show = Some(false);

  let svg = chart.svg().unwrap();
  let webp_data = svg_to_webp(&svg).unwrap();
  fs::write(path, webp_data).unwrap();
}

/// Per-benchmark convergence: cold curve and warm curve over iterations.
fn convergence_chart(bench: &str, m: &MetricsRecord, out: &Path) {
  let mut series_list = vec![Series::new("Cold".to_string(), as_f32(&m.cold_curve))];
  if !m.warm_curve.is_empty() {
    series_list.push(Series::new("Warm".to_string(), as_f32(&m.warm_curve)));
  }
  let len = m.cold_curve.len().max(m.warm_curve.len());
  write_line_chart(
    &out.join(format!("convergence_{}.webp", bench)),
    &format!("{} - Convergence: Cold vs Warm", bench),
    series_list,
    iteration_labels(len),
  );
}

/// Per-benchmark cold curve against the flat warm-target and cold-optimal
/// reference levels.
fn cold_vs_warm_chart(bench: &str, m: &MetricsRecord, out: &Path) {
  let len = m.cold_curve.len();
  let mut series_list = vec![Series::new("Cold".to_string(), as_f32(&m.cold_curve))];
  if m.warm_target > 0.0 {
    series_list.push(Series::new(
      format!("Warm[2] = {:.0}ms", m.warm_target),
      vec![m.warm_target as f32; len],
    ));
  }
  if m.cold_optimal > 0.0 {
    series_list.push(Series::new(
      format!("Cold optimal = {:.0}ms", m.cold_optimal),
      vec![m.cold_optimal as f32; len],
    ));
  }
  write_line_chart(
    &out.join(format!("cold_vs_warm_{}.webp", bench)),
    &format!("{} - Cold Curve vs Warm Target", bench),
    series_list,
    iteration_labels(len),
  );
}

/// First-iteration improvement ratio per benchmark, descending.
fn summary_improvement_chart(
  metrics: &BTreeMap<String, MetricsRecord>,
  benchmarks: &[&String],
  out: &Path,
) {
  let data: Vec<(String, f64)> = benchmarks
    .iter()
    .filter_map(|bench| {
      let ratio = metrics[*bench].our_improvement;
      if ratio > 0.0 {
        Some((bench.to_string(), ratio))
      } else {
        None
      }
    })
    .collect();
  if data.is_empty() {
    return;
  }
  generate_horizontal_bar_chart(
    &out.join("summary_improvement.webp"),
    "First-Iteration Improvement: Cold vs Profile-Loaded",
    data,
  );
}

/// cold[N] / warm-target per iteration N for every benchmark, with a parity
/// line at 1.0.
fn closeness_ratio_chart(
  metrics: &BTreeMap<String, MetricsRecord>,
  benchmarks: &[&String],
  out: &Path,
) {
  let with_ratios: Vec<&String> = benchmarks
    .iter()
    .copied()
    .filter(|bench| !metrics[*bench].closeness_ratio.is_empty())
    .collect();
  if with_ratios.is_empty() {
    return;
  }
  let max_len = with_ratios
    .iter()
    .map(|bench| metrics[*bench].closeness_ratio.len())
    .max()
    .unwrap_or(0);
  let mut series_list: Vec<Series> = with_ratios
    .iter()
    .map(|bench| Series::new(bench.to_string(), as_f32(&metrics[*bench].closeness_ratio)))
    .collect();
  series_list.push(Series::new("Parity".to_string(), vec![1.0; max_len]));
  write_line_chart(
    &out.join("closeness_ratio.webp"),
    "Cold Convergence Toward Warm Target",
    series_list,
    iteration_labels(max_len),
  );
}

pub fn generate_graphs(metrics: &BTreeMap<String, MetricsRecord>, run_dir: &Path) {
  let graphs_dir = run_dir.join("graphs");
  fs::create_dir_all(&graphs_dir).unwrap();

  let benchmarks: Vec<&String> = metrics
    .iter()
    .filter(|(_, m)| !m.cold_curve.is_empty())
    .map(|(bench, _)| bench)
    .collect();
  if benchmarks.is_empty() {
    info!("no benchmark data to graph");
    return;
  }

  for bench in &benchmarks {
    let m = &metrics[*bench];
    convergence_chart(bench, m, &graphs_dir);
    cold_vs_warm_chart(bench, m, &graphs_dir);
  }
  summary_improvement_chart(metrics, &benchmarks, &graphs_dir);
  closeness_ratio_chart(metrics, &benchmarks, &graphs_dir);

  info!(graphs_dir = %graphs_dir.display(), "graphs saved");
}

//! C7 — the aggregator. Reduces the N `IterationResult`s of one
//! (assistant, task) unit into an `AggregatedResult`: mean metrics with
//! population statistics, per-assertion pass rates, and a `RepeatSummary`.

use indexmap::IndexMap;
use pitlane_core::types::{
    AggregatedResult, AssertionSummary, IterationResult, MetricStatistics, RepeatSummary,
};

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn population_stats(values: &[f64]) -> MetricStatistics {
    if values.is_empty() {
        return MetricStatistics::default();
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let avg = sum / n;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
    MetricStatistics {
        avg: Some(round4(avg)),
        min: Some(round4(min)),
        max: Some(round4(max)),
        stddev: Some(round4(variance.sqrt())),
    }
}

/// Fold N iteration results (assumed already sorted by `iteration_index`)
/// into a single `AggregatedResult`. Assertion order is assumed stable
/// across iterations of the same unit, since they share the same config
/// and workspace layout.
pub fn aggregate_results(iterations: &[IterationResult]) -> AggregatedResult {
    let count = iterations.len() as u32;

    let mut metrics_stats: IndexMap<String, MetricStatistics> = IndexMap::new();
    let mut mean_metrics: IndexMap<String, Option<f64>> = IndexMap::new();
    if let Some(first) = iterations.first() {
        for key in first.metrics.keys() {
            let values: Vec<f64> = iterations.iter().filter_map(|it| it.metrics.get(key).copied().flatten()).collect();
            let stats = population_stats(&values);
            mean_metrics.insert(key.clone(), stats.avg);
            metrics_stats.insert(key.clone(), stats);
        }
    }

    let assertion_count = iterations.first().map(|it| it.assertions.len()).unwrap_or(0);
    let mut assertions = Vec::with_capacity(assertion_count);
    for idx in 0..assertion_count {
        let name = iterations[0].assertions[idx].name.clone();
        let pass_count = iterations
            .iter()
            .filter(|it| it.assertions.get(idx).map(|a| a.passed).unwrap_or(false))
            .count();
        let pass_rate = if count == 0 { 0.0 } else { (10.0 * 100.0 * pass_count as f64 / count as f64).round() / 10.0 };
        assertions.push(AssertionSummary {
            name,
            passed: pass_count as u32 == count,
            message: format!("Passed {pass_count}/{count} iterations"),
            pass_rate,
        });
    }

    let all_passed_count = iterations.iter().filter(|it| it.all_passed).count() as u32;
    let all_passed_rate = if count == 0 { 0.0 } else { (10.0 * 100.0 * all_passed_count as f64 / count as f64).round() / 10.0 };
    let all_passed = count > 0 && all_passed_count == count;

    AggregatedResult {
        metrics: mean_metrics,
        metrics_stats,
        assertions,
        all_passed,
        repeat: RepeatSummary {
            count,
            all_passed_count,
            all_passed_rate,
            iterations: iterations.to_vec(),
        },
    }
}

//! C9 (part) — `junit.xml` writer. Hand-built via `std::fmt::Write` rather
//! than pulling in an XML crate: the dialect produced here is narrow and
//! fixed (one suite per unit, one testcase per assertion, a closed set of
//! suite-level properties), so a small escaping helper plus string building
//! covers it completely.

use std::fmt::Write as _;
use std::path::Path;

use pitlane_core::types::{AggregatedResult, AssertionSummary};

/// One (assistant, task) unit's aggregated result, ready to render as a
/// JUnit `<testsuite>`.
pub struct SuiteReport<'a> {
    pub assistant: &'a str,
    pub task: &'a str,
    pub aggregated: &'a AggregatedResult,
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn metric_value(aggregated: &AggregatedResult, key: &str) -> Option<f64> {
    aggregated.metrics.get(key).copied().flatten()
}

fn push_property(xml: &mut String, name: &str, value: impl std::fmt::Display) {
    let _ = writeln!(xml, r#"      <property name="{}" value="{}"/>"#, escape(name), escape(&value.to_string()));
}

/// Render every suite, then write the document to `path`.
pub fn write_junit_report(path: &Path, suites: &[SuiteReport<'_>]) -> anyhow::Result<()> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    let _ = writeln!(xml, r#"<testsuites tests="{}">"#, suites.len());

    for suite in suites {
        render_suite(&mut xml, suite);
    }

    xml.push_str("</testsuites>\n");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, xml)?;
    Ok(())
}

fn render_suite(xml: &mut String, suite: &SuiteReport<'_>) {
    let name = format!("{} / {}", suite.assistant, suite.task);
    let wall_clock = metric_value(suite.aggregated, "wall_clock_seconds").unwrap_or(0.0);
    let failures = suite.aggregated.assertions.iter().filter(|a| !a.passed).count();

    let _ = writeln!(
        xml,
        r#"  <testsuite name="{}" tests="{}" failures="{}" time="{:.3}">"#,
        escape(&name),
        suite.aggregated.assertions.len(),
        failures,
        wall_clock
    );

    xml.push_str("    <properties>\n");
    for key in ["cost_usd", "token_usage_input", "token_usage_output", "weighted_score", "assertion_pass_rate", "files_created", "files_modified", "tool_calls_count", "timed_out"] {
        if let Some(v) = metric_value(suite.aggregated, key) {
            push_property(xml, key, v);
        }
    }
    if suite.aggregated.repeat.count > 1 {
        for (key, stats) in &suite.aggregated.metrics_stats {
            if let Some(v) = stats.avg {
                push_property(xml, &format!("{key}_avg"), v);
            }
            if let Some(v) = stats.stddev {
                push_property(xml, &format!("{key}_stddev"), v);
            }
            if let Some(v) = stats.min {
                push_property(xml, &format!("{key}_min"), v);
            }
            if let Some(v) = stats.max {
                push_property(xml, &format!("{key}_max"), v);
            }
        }
    }
    xml.push_str("    </properties>\n");

    for assertion in &suite.aggregated.assertions {
        render_testcase(xml, suite.task, assertion);
    }

    xml.push_str("  </testsuite>\n");
}

fn render_testcase(xml: &mut String, task: &str, assertion: &AssertionSummary) {
    let _ = writeln!(
        xml,
        r#"    <testcase name="{}" classname="{}">"#,
        escape(&assertion.name),
        escape(task)
    );
    if !assertion.passed {
        let _ = writeln!(xml, r#"      <failure message="{}"/>"#, escape(&assertion.message));
    }
    xml.push_str("    </testcase>\n");
}

//! Rendering of collected measurements.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use jiff::Zoned;
use serde_json::{Map, Value, json};

use crate::err::BenchError;
use crate::harness::Measurement;

/// One (driver, case) pair: either a measurement plus the size results
/// recorded by `finish`, or the failure that stopped the pair.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub driver: String,
    pub case: String,
    pub measurement: Option<Measurement>,
    pub results: BTreeMap<String, f64>,
    pub error: Option<String>,
}

impl ReportRow {
    pub fn success(
        driver: &str,
        case: &str,
        measurement: Measurement,
        results: BTreeMap<String, f64>,
    ) -> Self {
        ReportRow {
            driver: driver.to_string(),
            case: case.to_string(),
            measurement: Some(measurement),
            results,
            error: None,
        }
    }

    pub fn failure(driver: &str, case: &str, error: &BenchError) -> Self {
        ReportRow {
            driver: driver.to_string(),
            case: case.to_string(),
            measurement: None,
            results: BTreeMap::new(),
            error: Some(render_error_chain(error)),
        }
    }
}

/// Flattens an error and its causes into one line, so a report row carries
/// the whole story.
fn render_error_chain(error: &BenchError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A full suite's outcome, timestamped at collection.
#[derive(Debug, Clone)]
pub struct Report {
    pub suite: String,
    pub generated: Zoned,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(suite: &str, rows: Vec<ReportRow>) -> Self {
        Report {
            suite: suite.to_string(),
            generated: Zoned::now(),
            rows,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.rows.iter().any(|row| row.error.is_some())
    }

    pub fn to_json(&self) -> Value {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| match (&row.measurement, &row.error) {
                (Some(m), _) => {
                    let mut value = Map::new();
                    value.insert("driver".into(), json!(row.driver));
                    value.insert("case".into(), json!(row.case));
                    value.insert("iterations".into(), json!(m.iterations));
                    value.insert("totalSeconds".into(), json!(m.total.as_secs_f64()));
                    value.insert("meanSeconds".into(), json!(m.mean().as_secs_f64()));
                    value.insert("tps".into(), json!(m.tps()));
                    value.insert("results".into(), json!(row.results));
                    Value::Object(value)
                }
                (None, error) => json!({
                    "driver": row.driver,
                    "case": row.case,
                    "error": error,
                }),
            })
            .collect();

        json!({
            "suite": self.suite,
            "generated": self.generated.to_string(),
            "rows": rows,
        })
    }

    /// The human-facing table.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "suite `{}`, generated {}", self.suite, self.generated);
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:>6} {:>12} {:>14}  {}",
            "driver", "case", "iters", "mean", "tps", "results"
        );
        for row in &self.rows {
            match (&row.measurement, &row.error) {
                (Some(m), _) => {
                    let results = row
                        .results
                        .iter()
                        .map(|(key, value)| format!("{key}={value:.2}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    let _ = writeln!(
                        out,
                        "{:<24} {:<20} {:>6} {:>12} {:>14.1}  {}",
                        row.driver,
                        row.case,
                        m.iterations,
                        format_duration(m.mean()),
                        m.tps(),
                        results
                    );
                }
                (None, error) => {
                    let _ = writeln!(
                        out,
                        "{:<24} {:<20} FAILED: {}",
                        row.driver,
                        row.case,
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        out
    }
}

fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos < 1_000 {
        format!("{nanos}ns")
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

//! Pairwise comparison of two runs, measurement by measurement.

use std::collections::HashMap;

use crate::error::{HistoryError, Result};
use crate::schema::{BenchmarkData, Measurement, Run};

/// Worseness ratio above which a pair counts as a regression alert. The
/// producer's customary default of "200%".
pub const DEFAULT_ALERT_THRESHOLD: f64 = 2.0;

/// Which way a metric improves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Throughput-style metrics, e.g. benchmark.js ops/sec.
    BiggerIsBetter,
    /// Latency-style metrics, e.g. cargo bench ns/iter.
    SmallerIsBetter,
}

impl Direction {
    /// Direction of a known producer tool's metrics.
    pub fn for_tool(tool: &str) -> Option<Direction> {
        match tool {
            "benchmarkjs" | "customBiggerIsBetter" => Some(Direction::BiggerIsBetter),
            "cargo" | "criterion" | "go" | "pytest" | "googlecpp" | "catch2"
            | "customSmallerIsBetter" => Some(Direction::SmallerIsBetter),
            _ => None,
        }
    }

    /// Unit-based fallback for unrecognized tools.
    pub fn for_unit(unit: &str) -> Direction {
        if unit.contains("ops") || unit.ends_with("/sec") || unit.ends_with("/s") {
            Direction::BiggerIsBetter
        } else {
            Direction::SmallerIsBetter
        }
    }
}

#[derive(Debug, Clone)]
pub struct Delta {
    pub name: String,
    pub unit: String,
    pub direction: Direction,
    pub previous: f64,
    pub current: f64,
    /// Oriented so that values above 1 mean the newer run is worse.
    pub ratio: f64,
}

impl Delta {
    pub fn is_alert(&self, threshold: f64) -> bool {
        self.ratio > threshold
    }
}

#[derive(Debug, Clone, Default)]
pub struct Comparison {
    pub deltas: Vec<Delta>,
    /// Measurement names only the older run carried.
    pub only_previous: Vec<String>,
    /// Measurement names only the newer run carried.
    pub only_current: Vec<String>,
}

impl Comparison {
    pub fn alerts(&self, threshold: f64) -> Vec<&Delta> {
        self.deltas.iter().filter(|d| d.is_alert(threshold)).collect()
    }
}

/// Pairs measurements of two runs by exact name, in the newer run's order.
pub fn compare_runs(previous: &Run, current: &Run) -> Comparison {
    let prev_by_name: HashMap<&str, &Measurement> = previous
        .benches
        .iter()
        .map(|m| (m.name.as_str(), m))
        .collect();

    let mut cmp = Comparison::default();
    for m in &current.benches {
        let Some(prev) = prev_by_name.get(m.name.as_str()) else {
            cmp.only_current.push(m.name.clone());
            continue;
        };
        let direction = Direction::for_tool(&current.tool)
            .unwrap_or_else(|| Direction::for_unit(&m.unit));
        let prev_value = prev.value_f64();
        let curr_value = m.value_f64();
        let ratio = match direction {
            Direction::BiggerIsBetter => safe_ratio(prev_value, curr_value),
            Direction::SmallerIsBetter => safe_ratio(curr_value, prev_value),
        };
        cmp.deltas.push(Delta {
            name: m.name.clone(),
            unit: m.unit.clone(),
            direction,
            previous: prev_value,
            current: curr_value,
            ratio,
        });
    }

    for m in &previous.benches {
        if !current.benches.iter().any(|c| c.name == m.name) {
            cmp.only_previous.push(m.name.clone());
        }
    }

    cmp
}

/// Compares the two most recent runs of a suite.
pub fn compare_latest(data: &BenchmarkData, suite: &str) -> Result<Comparison> {
    let suite_ref = data
        .suite(suite)
        .ok_or_else(|| HistoryError::UnknownSuite(suite.to_string()))?;
    let (previous, current) = suite_ref
        .latest_pair()
        .ok_or_else(|| HistoryError::NotEnoughRuns(suite.to_string()))?;
    Ok(compare_runs(previous, current))
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 {
            1.0
        } else {
            f64::INFINITY
        }
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Commit, GitUser, Measurement};

    fn user() -> GitUser {
        GitUser {
            name: "dev".into(),
            username: None,
            email: None,
        }
    }

    fn run(tool: &str, date: i64, benches: &[(&str, u64, &str)]) -> Run {
        Run {
            commit: Commit {
                author: user(),
                committer: user(),
                id: "f03ada59df0774b0b9d7dd031d5f1efb04fc7ef9".into(),
                message: "tune".into(),
                timestamp: "2020-10-13T09:40:46Z".into(),
                url: "https://example.com/commit/f03ada5".into(),
            },
            date,
            tool: tool.into(),
            benches: benches
                .iter()
                .map(|(name, value, unit)| Measurement {
                    name: name.to_string(),
                    value: serde_json::Number::from(*value),
                    range: None,
                    unit: unit.to_string(),
                    extra: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ops_per_sec_drop_is_a_regression() {
        let prev = run("benchmarkjs", 1, &[("noop#native", 50_000_000, "ops/sec")]);
        let curr = run("benchmarkjs", 2, &[("noop#native", 20_000_000, "ops/sec")]);
        let cmp = compare_runs(&prev, &curr);
        assert_eq!(cmp.deltas.len(), 1);
        let d = &cmp.deltas[0];
        assert_eq!(d.direction, Direction::BiggerIsBetter);
        assert!((d.ratio - 2.5).abs() < 1e-9);
        assert!(d.is_alert(DEFAULT_ALERT_THRESHOLD));
    }

    #[test]
    fn test_ops_per_sec_gain_is_not_a_regression() {
        let prev = run("benchmarkjs", 1, &[("noop#native", 20_000_000, "ops/sec")]);
        let curr = run("benchmarkjs", 2, &[("noop#native", 50_000_000, "ops/sec")]);
        let cmp = compare_runs(&prev, &curr);
        assert!(cmp.deltas[0].ratio < 1.0);
        assert!(cmp.alerts(DEFAULT_ALERT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_smaller_is_better_orientation() {
        let prev = run("cargo", 1, &[("decode", 100, "ns/iter")]);
        let curr = run("cargo", 2, &[("decode", 300, "ns/iter")]);
        let cmp = compare_runs(&prev, &curr);
        let d = &cmp.deltas[0];
        assert_eq!(d.direction, Direction::SmallerIsBetter);
        assert!((d.ratio - 3.0).abs() < 1e-9);
        assert!(d.is_alert(DEFAULT_ALERT_THRESHOLD));
    }

    #[test]
    fn test_unknown_tool_falls_back_to_unit() {
        let prev = run("mystery", 1, &[("a", 100, "ops/sec"), ("b", 100, "ms")]);
        let curr = run("mystery", 2, &[("a", 100, "ops/sec"), ("b", 100, "ms")]);
        let cmp = compare_runs(&prev, &curr);
        assert_eq!(cmp.deltas[0].direction, Direction::BiggerIsBetter);
        assert_eq!(cmp.deltas[1].direction, Direction::SmallerIsBetter);
    }

    #[test]
    fn test_unpaired_names_are_reported() {
        let prev = run("benchmarkjs", 1, &[("old#x", 10, "ops/sec"), ("both#x", 10, "ops/sec")]);
        let curr = run("benchmarkjs", 2, &[("both#x", 10, "ops/sec"), ("new#x", 10, "ops/sec")]);
        let cmp = compare_runs(&prev, &curr);
        assert_eq!(cmp.deltas.len(), 1);
        assert_eq!(cmp.only_previous, ["old#x"]);
        assert_eq!(cmp.only_current, ["new#x"]);
    }

    #[test]
    fn test_zero_previous_value() {
        let prev = run("cargo", 1, &[("decode", 0, "ns/iter")]);
        let curr = run("cargo", 2, &[("decode", 10, "ns/iter")]);
        let cmp = compare_runs(&prev, &curr);
        assert!(cmp.deltas[0].ratio.is_infinite());
    }

    #[test]
    fn test_compare_latest_needs_two_runs() {
        let mut data = BenchmarkData::new("https://example.com/repo");
        assert!(matches!(
            compare_latest(&data, "Benchmark"),
            Err(HistoryError::UnknownSuite(_))
        ));
        data.append("Benchmark", run("benchmarkjs", 1, &[("a", 10, "ops/sec")]));
        assert!(matches!(
            compare_latest(&data, "Benchmark"),
            Err(HistoryError::NotEnoughRuns(_))
        ));
        data.append("Benchmark", run("benchmarkjs", 2, &[("a", 30, "ops/sec")]));
        let cmp = compare_latest(&data, "Benchmark").unwrap();
        assert_eq!(cmp.deltas.len(), 1);
    }
}

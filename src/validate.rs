//! Structural integrity checks for a loaded history.
//!
//! Nothing in the file format enforces these invariants, so consumers apply
//! them after parsing. Violations that break the documented shape are
//! `Error` findings; observed-but-unenforced conventions degrade to
//! `Warning`.

use std::collections::HashSet;
use std::fmt;

use chrono::DateTime;

use crate::error::{HistoryError, Result};
use crate::schema::BenchmarkData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    /// Path into the document, e.g. `entries["Benchmark"][3].benches[0]`.
    pub location: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.location, self.message)
    }
}

/// Runs every check and returns all findings, warnings included.
pub fn validate(data: &BenchmarkData) -> Vec<Finding> {
    let mut findings = Vec::new();

    if data.repo_url.is_empty() {
        warning(&mut findings, "repoUrl", "repository URL is empty");
    }

    for suite in data.entries.iter() {
        let mut prev_date: Option<i64> = None;
        for (i, run) in suite.runs.iter().enumerate() {
            let loc = format!("entries[\"{}\"][{}]", suite.name, i);

            if run.commit.id.is_empty() {
                error(&mut findings, &loc, "commit id is empty");
            } else if !run.commit.id.chars().all(|c| c.is_ascii_hexdigit()) {
                warning(&mut findings, &loc, "commit id is not a hex string");
            }

            if DateTime::parse_from_rfc3339(&run.commit.timestamp).is_err() {
                error(
                    &mut findings,
                    &loc,
                    &format!("commit timestamp {:?} is not ISO-8601", run.commit.timestamp),
                );
            }

            if run.date <= 0 {
                error(&mut findings, &loc, &format!("run date {} is not positive", run.date));
            }
            if let Some(prev) = prev_date {
                if run.date < prev {
                    warning(
                        &mut findings,
                        &loc,
                        &format!("run date {} precedes the previous run's {}", run.date, prev),
                    );
                }
            }
            prev_date = Some(run.date);

            if run.benches.is_empty() {
                error(&mut findings, &loc, "run has no measurements");
            }

            let mut seen = HashSet::new();
            for (j, m) in run.benches.iter().enumerate() {
                let loc = format!("{loc}.benches[{j}]");

                if m.name.is_empty() {
                    error(&mut findings, &loc, "measurement name is empty");
                } else if !seen.insert(m.name.as_str()) {
                    warning(
                        &mut findings,
                        &loc,
                        &format!("duplicate measurement name {:?}", m.name),
                    );
                }

                let value = m.value_f64();
                if !value.is_finite() {
                    error(&mut findings, &loc, "value is not a finite number");
                } else if value < 0.0 {
                    error(&mut findings, &loc, &format!("value {value} is negative"));
                }

                if m.unit.is_empty() {
                    error(&mut findings, &loc, "unit is empty");
                }
            }
        }
    }

    // lastUpdate is stamped at write time, after the newest run date, so
    // only the non-strict lower bound can be checked.
    if let Some(max) = data.max_date() {
        if data.last_update < max {
            error(
                &mut findings,
                "lastUpdate",
                &format!("lastUpdate {} is below the newest run date {}", data.last_update, max),
            );
        }
    }

    findings
}

/// Fails if any `Error`-severity finding exists.
pub fn ensure_valid(data: &BenchmarkData) -> Result<()> {
    let errors: Vec<Finding> = validate(data)
        .into_iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    match errors.first() {
        None => Ok(()),
        Some(first) => Err(HistoryError::Integrity {
            count: errors.len(),
            first: first.to_string(),
        }),
    }
}

fn error(findings: &mut Vec<Finding>, location: &str, message: &str) {
    findings.push(Finding {
        severity: Severity::Error,
        location: location.to_string(),
        message: message.to_string(),
    });
}

fn warning(findings: &mut Vec<Finding>, location: &str, message: &str) {
    findings.push(Finding {
        severity: Severity::Warning,
        location: location.to_string(),
        message: message.to_string(),
    });
}

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Root record of a benchmark history file.
///
/// Field order mirrors the on-disk artifact and must not be reordered:
/// serialization relies on declaration order to reproduce the file
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkData {
    /// Epoch milliseconds; a non-strict upper bound for every run date.
    pub last_update: i64,
    pub repo_url: String,
    pub entries: Suites,
}

/// Suite name -> runs, in document order.
///
/// Stored as a vector rather than a map: suite iteration order is the
/// insertion order of the file, and runs within a suite are append-ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suites(Vec<Suite>);

#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub name: String,
    pub runs: Vec<Run>,
}

/// One historical benchmark execution, tied to a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub commit: Commit,
    /// Epoch milliseconds at which the run was recorded. Expected to be
    /// non-decreasing across a suite, but nothing enforces it.
    pub date: i64,
    /// Label of the tool that produced the measurements, e.g. "benchmarkjs".
    pub tool: String,
    pub benches: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub author: GitUser,
    pub committer: GitUser,
    pub id: String,
    pub message: String,
    /// ISO-8601 text, kept verbatim; `date` on the run is the numeric clock.
    pub timestamp: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One named numeric result within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Conventionally "<case>#<implementation>"; not enforced.
    pub name: String,
    /// Kept as a JSON number so integer values round-trip as integers.
    pub value: serde_json::Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchmarkData {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: Suites::default(),
        }
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.entries.get(name)
    }

    /// Returns the suite, creating an empty one at the end if missing.
    pub fn suite_mut(&mut self, name: &str) -> &mut Suite {
        self.entries.get_or_insert(name)
    }

    /// Appends a run to a suite and bumps `last_update` up to the run date.
    pub fn append(&mut self, suite: &str, run: Run) {
        if let Some(last) = self.suite(suite).and_then(|s| s.runs.last()) {
            if run.date < last.date {
                warn!(
                    suite,
                    prev = last.date,
                    next = run.date,
                    "appending run dated before the suite's latest run"
                );
            }
        }
        if run.date > self.last_update {
            self.last_update = run.date;
        }
        self.suite_mut(suite).runs.push(run);
    }

    /// Raises `last_update` to `now_ms`. Producers stamp the wall clock
    /// here, so the stored value may exceed every run date.
    pub fn touch(&mut self, now_ms: i64) {
        if now_ms > self.last_update {
            self.last_update = now_ms;
        }
    }

    /// Largest run date across all suites, if any run exists.
    pub fn max_date(&self) -> Option<i64> {
        self.entries
            .iter()
            .flat_map(|s| s.runs.iter().map(|r| r.date))
            .max()
    }

    pub fn run_count(&self) -> usize {
        self.entries.iter().map(|s| s.runs.len()).sum()
    }
}

impl Suites {
    pub fn iter(&self) -> impl Iterator<Item = &Suite> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Suite> {
        self.0.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Suite> {
        self.0.iter_mut().find(|s| s.name == name)
    }

    fn get_or_insert(&mut self, name: &str) -> &mut Suite {
        if let Some(i) = self.0.iter().position(|s| s.name == name) {
            return &mut self.0[i];
        }
        self.0.push(Suite {
            name: name.to_string(),
            runs: Vec::new(),
        });
        let last = self.0.len() - 1;
        &mut self.0[last]
    }
}

impl Suite {
    pub fn latest(&self) -> Option<&Run> {
        self.runs.last()
    }

    /// The two most recent runs as (previous, latest).
    pub fn latest_pair(&self) -> Option<(&Run, &Run)> {
        match self.runs.as_slice() {
            [.., prev, latest] => Some((prev, latest)),
            _ => None,
        }
    }

    /// Keeps only the most recent `max` runs, dropping the oldest first.
    /// Returns how many runs were dropped.
    pub fn cap_runs(&mut self, max: usize) -> usize {
        if self.runs.len() <= max {
            return 0;
        }
        let excess = self.runs.len() - max;
        self.runs.drain(..excess);
        excess
    }
}

impl Measurement {
    /// Benchmark case half of a "<case>#<implementation>" name.
    pub fn case(&self) -> &str {
        match self.name.split_once('#') {
            Some((case, _)) => case,
            None => &self.name,
        }
    }

    /// Implementation half of a "<case>#<implementation>" name, if present.
    pub fn implementation(&self) -> Option<&str> {
        self.name.split_once('#').map(|(_, imp)| imp)
    }

    pub fn value_f64(&self) -> f64 {
        self.value.as_f64().unwrap_or(f64::NAN)
    }
}

impl Serialize for Suites {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for suite in &self.0 {
            map.serialize_entry(&suite.name, &suite.runs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Suites {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SuitesVisitor;

        impl<'de> Visitor<'de> for SuitesVisitor {
            type Value = Suites;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of suite name to run sequences")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Suites, A::Error> {
                let mut suites = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, runs)) = access.next_entry::<String, Vec<Run>>()? {
                    suites.push(Suite { name, runs });
                }
                Ok(Suites(suites))
            }
        }

        deserializer.deserialize_map(SuitesVisitor)
    }
}

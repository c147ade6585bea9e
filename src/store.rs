//! Loading and saving of benchmark history files.
//!
//! The on-disk artifact is the `data.js` file a benchmark CI action keeps on
//! its pages branch: a JavaScript assignment wrapping a single JSON object,
//! so the same file is loadable both as a script and as data.
//!
//! # File format
//!
//! ```text
//! window.BENCHMARK_DATA = {
//!   "lastUpdate": 1602664356439,            // epoch milliseconds
//!   "repoUrl": "https://github.com/...",
//!   "entries": {
//!     "<suite>": [ <run>, ... ]             // append order, oldest first
//!   }
//! }
//! ```
//!
//! The JSON body is rendered with two-space indentation and the key order of
//! [`crate::schema`], matching the producer's `JSON.stringify(data, null, 2)`
//! output, so parse -> render reproduces a well-formed file byte-for-byte.
//! Bare JSON (no assignment prefix) is accepted on input; output always
//! carries the prefix.

use std::fs;
use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{HistoryError, Result};
use crate::schema::BenchmarkData;

/// Assignment prefix carried by every rendered file.
pub const JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Parses history text, with or without the `window.BENCHMARK_DATA =` prefix.
pub fn parse(text: &str) -> Result<BenchmarkData> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();

    let body = if let Some(rest) = trimmed.strip_prefix("window.BENCHMARK_DATA") {
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('=').ok_or_else(|| {
            HistoryError::Malformed("missing '=' after window.BENCHMARK_DATA".to_string())
        })?;
        rest.trim_start()
    } else if trimmed.starts_with('{') {
        trimmed
    } else {
        let head: String = trimmed.chars().take(40).collect();
        return Err(HistoryError::Malformed(format!(
            "expected a JSON object or a window.BENCHMARK_DATA assignment, found {head:?}"
        )));
    };

    // Tolerate a trailing semicolon some editors add to the assignment.
    let body = body.trim_end().trim_end_matches(';').trim_end();
    Ok(serde_json::from_str(body)?)
}

/// Renders the history as a `data.js` script body.
pub fn render(data: &BenchmarkData) -> Result<String> {
    let json = serde_json::to_string_pretty(data)?;
    Ok(format!("{JS_PREFIX}{json}"))
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<BenchmarkData> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let data = parse(&text)?;
    debug!(
        path = %path.display(),
        suites = data.entries.len(),
        runs = data.run_count(),
        "loaded benchmark history"
    );
    Ok(data)
}

/// Saves the history atomically: the rendered file is written to a temporary
/// sibling and persisted over the destination, so readers never observe a
/// half-written file.
pub fn save<P: AsRef<Path>>(path: P, data: &BenchmarkData) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let rendered = render(data)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(rendered.as_bytes())?;
    tmp.persist(path).map_err(|e| HistoryError::Io(e.error))?;
    debug!(path = %path.display(), bytes = rendered.len(), "saved benchmark history");
    Ok(())
}

/// SHA-256 of the rendered file, hex encoded. The format itself carries no
/// checksum, so this is the change marker consumers can hold on to.
pub fn digest(data: &BenchmarkData) -> Result<String> {
    let rendered = render(data)?;
    let d: [u8; 32] = Sha256::digest(rendered.as_bytes()).into();
    Ok(hex32(d))
}

fn hex32(d: [u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in d {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1602664356439,
  "repoUrl": "https://github.com/napi-rs/napi-rs",
  "entries": {
    "Benchmark": [
      {
        "commit": {
          "author": {
            "name": "napi-rs",
            "username": "napi-rs"
          },
          "committer": {
            "name": "napi-rs",
            "username": "napi-rs"
          },
          "id": "f03ada59df0774b0b9d7dd031d5f1efb04fc7ef9",
          "message": "ci: setup benchmark action",
          "timestamp": "2020-10-13T09:40:46Z",
          "url": "https://github.com/napi-rs/napi-rs/pull/230/commits/f03ada59df0774b0b9d7dd031d5f1efb04fc7ef9"
        },
        "date": 1602608730360,
        "tool": "benchmarkjs",
        "benches": [
          {
            "name": "noop#napi-rs",
            "value": 53081823,
            "range": "±2.06%",
            "unit": "ops/sec",
            "extra": "82 samples"
          },
          {
            "name": "noop#JavaScript",
            "value": 881409678,
            "range": "±1.63%",
            "unit": "ops/sec",
            "extra": "85 samples"
          }
        ]
      },
      {
        "commit": {
          "author": {
            "name": "napi-rs",
            "username": "napi-rs"
          },
          "committer": {
            "name": "napi-rs",
            "username": "napi-rs"
          },
          "id": "d46477eb98ae60eb339176e681eaa2dcff722dad",
          "message": "feat: support linux aarch64",
          "timestamp": "2020-10-14T04:26:58Z",
          "url": "https://github.com/napi-rs/napi-rs/pull/233/commits/d46477eb98ae60eb339176e681eaa2dcff722dad"
        },
        "date": 1602664355867,
        "tool": "benchmarkjs",
        "benches": [
          {
            "name": "noop#napi-rs",
            "value": 52369369,
            "range": "±1.03%",
            "unit": "ops/sec",
            "extra": "89 samples"
          },
          {
            "name": "noop#JavaScript",
            "value": 671880870,
            "range": "±0.85%",
            "unit": "ops/sec",
            "extra": "88 samples"
          }
        ]
      }
    ]
  }
}"#;

    #[test]
    fn test_parse_sample() {
        let data = parse(SAMPLE).unwrap();
        assert_eq!(data.last_update, 1602664356439);
        assert_eq!(data.repo_url, "https://github.com/napi-rs/napi-rs");
        assert_eq!(data.entries.len(), 1);

        let suite = data.suite("Benchmark").unwrap();
        assert_eq!(suite.runs.len(), 2);
        assert_eq!(suite.runs[0].date, 1602608730360);
        assert_eq!(suite.runs[0].tool, "benchmarkjs");
        assert_eq!(suite.runs[0].benches[0].name, "noop#napi-rs");
        assert_eq!(suite.runs[0].benches[0].range.as_deref(), Some("±2.06%"));
        assert_eq!(suite.runs[1].commit.message, "feat: support linux aarch64");

        // The sample's lastUpdate sits past the latest run date; only the
        // non-strict lower bound holds.
        assert!(data.last_update >= data.max_date().unwrap());
    }

    #[test]
    fn test_round_trip_is_byte_equivalent() {
        let data = parse(SAMPLE).unwrap();
        let rendered = render(&data).unwrap();
        assert_eq!(rendered, SAMPLE);
    }

    #[test]
    fn test_parse_accepts_bare_json() {
        let json = SAMPLE.strip_prefix(JS_PREFIX).unwrap();
        let data = parse(json).unwrap();
        assert_eq!(data.run_count(), 2);
    }

    #[test]
    fn test_parse_accepts_trailing_semicolon() {
        let text = format!("{SAMPLE};\n");
        let data = parse(&text).unwrap();
        assert_eq!(data.run_count(), 2);
    }

    #[test]
    fn test_parse_rejects_other_scripts() {
        let err = parse("console.log('hi')").unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));

        let err = parse("window.BENCHMARK_DATA {").unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }

    #[test]
    fn test_load_save_round_trip() {
        let data = parse(SAMPLE).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.js");

        save(&path, &data).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, data);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let mut data = parse(SAMPLE).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.js");

        save(&path, &data).unwrap();
        let before = digest(&data).unwrap();

        data.suite_mut("Benchmark").cap_runs(1);
        data.touch(1602664356440);
        save(&path, &data).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.run_count(), 1);
        assert_ne!(digest(&loaded).unwrap(), before);
    }

    #[test]
    fn test_digest_is_stable() {
        let data = parse(SAMPLE).unwrap();
        let a = digest(&data).unwrap();
        let b = digest(&data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}

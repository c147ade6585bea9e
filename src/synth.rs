//! Deterministic synthetic histories for demos, tests and benches.
//!
//! Runs are generated in parallel with per-run RNGs derived from the master
//! seed, so output is reproducible regardless of thread scheduling.

use chrono::{LocalResult, SecondsFormat, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::schema::{BenchmarkData, Commit, GitUser, Measurement, Run};

#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Number of runs to generate.
    pub runs: usize,
    /// Benchmark case names; each is paired with every implementation.
    pub cases: Vec<String>,
    pub implementations: Vec<String>,
    /// Master seed for deterministic generation.
    pub seed: u64,
    pub suite: String,
    pub tool: String,
    pub repo_url: String,
    /// Date of the first run, epoch milliseconds.
    pub start_date_ms: i64,
    /// Nominal spacing between runs; jitter stays below a quarter of it.
    pub interval_ms: i64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            runs: 20,
            cases: vec!["parse".into(), "encode".into(), "lookup".into()],
            implementations: vec!["baseline".into(), "tuned".into()],
            seed: 42,
            suite: "Benchmark".into(),
            tool: "benchmarkjs".into(),
            repo_url: "https://github.com/example/project".into(),
            start_date_ms: 1_600_000_000_000,
            interval_ms: 3_600_000,
        }
    }
}

const MESSAGES: &[&str] = &[
    "perf: shave allocations in the hot path",
    "fix: clamp retry backoff",
    "feat: add streaming decode",
    "build(deps): bump toolchain",
    "refactor: split codec tables",
    "ci: widen benchmark matrix",
];

pub fn generate(config: &SynthConfig) -> BenchmarkData {
    let runs: Vec<Run> = (0..config.runs)
        .into_par_iter()
        .map(|i| {
            // Derive per-run seed from master seed + index for determinism
            let mut rng = ChaCha8Rng::seed_from_u64(per_run_seed(config.seed, i));
            build_run(config, i, &mut rng)
        })
        .collect();

    let mut data = BenchmarkData::new(config.repo_url.as_str());
    for run in runs {
        data.append(&config.suite, run);
    }
    data
}

fn per_run_seed(master_seed: u64, index: usize) -> u64 {
    master_seed
        .wrapping_add(index as u64)
        .wrapping_mul(0x517cc1b727220a95)
}

fn build_run(config: &SynthConfig, index: usize, rng: &mut ChaCha8Rng) -> Run {
    let jitter_bound = (config.interval_ms.max(4)) / 4;
    let date = config.start_date_ms + index as i64 * config.interval_ms
        + rng.gen_range(0..jitter_bound);

    let timestamp = match Utc.timestamp_millis_opt(date) {
        LocalResult::Single(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => "1970-01-01T00:00:00Z".to_string(),
    };

    let id = commit_id(rng);
    let user = GitUser {
        name: "ci-bot".into(),
        username: Some("ci-bot".into()),
        email: None,
    };

    let mut benches = Vec::with_capacity(config.cases.len() * config.implementations.len());
    for (ci, case) in config.cases.iter().enumerate() {
        for (ii, imp) in config.implementations.iter().enumerate() {
            // Stable per-pair magnitude with mild per-run drift.
            let base = 10f64.powi(4 + ((ci + 2 * ii) % 4) as i32);
            let value = base * (0.9 + 0.2 * rng.gen::<f64>());
            benches.push(Measurement {
                name: format!("{case}#{imp}"),
                value: serde_json::Number::from(value.round() as u64),
                range: Some(format!("±{:.2}%", rng.gen_range(0.05..5.0))),
                unit: "ops/sec".into(),
                extra: Some(format!("{} samples", rng.gen_range(50..100))),
            });
        }
    }

    Run {
        commit: Commit {
            author: user.clone(),
            committer: user,
            id: id.clone(),
            message: MESSAGES[rng.gen_range(0..MESSAGES.len())].to_string(),
            timestamp,
            url: format!("{}/commit/{}", config.repo_url, id),
        },
        date,
        tool: config.tool.clone(),
        benches,
    }
}

fn commit_id(rng: &mut ChaCha8Rng) -> String {
    (0..5).map(|_| format!("{:08x}", rng.gen::<u32>())).collect()
}

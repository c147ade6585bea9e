use anyhow::{bail, Context, Result};
use bench_history::compare::{self, DEFAULT_ALERT_THRESHOLD};
use bench_history::schema::Run;
use bench_history::store;
use bench_history::synth::{self, SynthConfig};
use bench_history::validate::{self, Severity};
use bench_history::ToolKind;
use chrono::{LocalResult, SecondsFormat, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a history file: suites, runs, time span, digest.
    Info {
        /// Path to the history file (data.js or bare JSON).
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check the structural invariants of a history file.
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Fail on warnings too, not only on errors.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Append one run to a suite and save the file atomically.
    ///
    /// The run is read from a JSON file holding a single run object
    /// (commit, date, tool, benches). The file is left untouched if the
    /// result would fail validation.
    Append {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON file holding the run to append.
        #[arg(long, value_name = "FILE")]
        run: PathBuf,

        #[arg(long, default_value = "Benchmark")]
        suite: String,

        /// Keep only the most recent N runs of the suite after appending.
        #[arg(long, value_name = "N")]
        max_items: Option<usize>,
    },

    /// Compare the two most recent runs of a suite.
    Compare {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, default_value = "Benchmark")]
        suite: String,

        /// Worseness ratio above which a pair is reported as an alert.
        #[arg(long, default_value_t = DEFAULT_ALERT_THRESHOLD)]
        threshold: f64,

        /// Exit with an error when any alert fires.
        #[arg(long, default_value_t = false)]
        fail_on_alert: bool,
    },

    /// Write a deterministic synthetic history file.
    Generate {
        /// Destination path.
        #[arg(value_name = "FILE")]
        out: PathBuf,

        /// Number of runs to generate.
        #[arg(long, default_value_t = 20)]
        runs: usize,

        /// Random seed for deterministic generation.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Tool label stamped on every generated run.
        #[arg(long, value_enum, default_value_t = ToolKind::Benchmarkjs)]
        tool: ToolKind,

        #[arg(long, default_value = "Benchmark")]
        suite: String,
    },
}

#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(about = "Inspect, validate and grow benchmark history data files")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Info { file } => info(&file),
        Command::Validate { file, strict } => run_validate(&file, strict),
        Command::Append {
            file,
            run,
            suite,
            max_items,
        } => append(&file, &run, &suite, max_items),
        Command::Compare {
            file,
            suite,
            threshold,
            fail_on_alert,
        } => run_compare(&file, &suite, threshold, fail_on_alert),
        Command::Generate {
            out,
            runs,
            seed,
            tool,
            suite,
        } => generate(&out, runs, seed, tool, suite),
    }
}

fn info(file: &PathBuf) -> Result<()> {
    let data = store::load(file).with_context(|| format!("load {}", file.display()))?;

    println!("History: {}", file.display());
    println!("  Repository: {}", data.repo_url);
    println!("  Last update: {}", format_ms(data.last_update));
    println!("  Digest: {}", store::digest(&data)?);
    for suite in data.entries.iter() {
        let measurements: usize = suite.runs.iter().map(|r| r.benches.len()).sum();
        println!(
            "  Suite \"{}\": {} run(s), {} measurement(s)",
            suite.name,
            suite.runs.len(),
            measurements
        );
        if let (Some(first), Some(last)) = (suite.runs.first(), suite.runs.last()) {
            println!(
                "    Span: {} .. {}",
                format_ms(first.date),
                format_ms(last.date)
            );
        }
    }
    Ok(())
}

fn run_validate(file: &PathBuf, strict: bool) -> Result<()> {
    let data = store::load(file).with_context(|| format!("load {}", file.display()))?;
    let findings = validate::validate(&data);

    for finding in &findings {
        eprintln!("{finding}");
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    let warnings = findings.len() - errors;
    println!(
        "{} run(s) checked: {} error(s), {} warning(s)",
        data.run_count(),
        errors,
        warnings
    );

    if errors > 0 {
        bail!("history has {errors} integrity error(s)");
    }
    if strict && warnings > 0 {
        bail!("history has {warnings} warning(s) (strict mode)");
    }
    Ok(())
}

fn append(file: &PathBuf, run_file: &PathBuf, suite: &str, max_items: Option<usize>) -> Result<()> {
    let mut data = store::load(file).with_context(|| format!("load {}", file.display()))?;

    let raw = fs::read_to_string(run_file)
        .with_context(|| format!("read run file {}", run_file.display()))?;
    let run: Run =
        serde_json::from_str(&raw).with_context(|| format!("parse run {}", run_file.display()))?;

    data.append(suite, run);
    data.touch(Utc::now().timestamp_millis());
    if let Some(max) = max_items {
        let dropped = data.suite_mut(suite).cap_runs(max);
        if dropped > 0 {
            eprintln!("Dropped {dropped} oldest run(s) to stay within {max}");
        }
    }

    validate::ensure_valid(&data).context("refusing to save an invalid history")?;
    store::save(file, &data).with_context(|| format!("save {}", file.display()))?;

    println!("Appended 1 run to \"{}\" in {}", suite, file.display());
    Ok(())
}

fn run_compare(file: &PathBuf, suite: &str, threshold: f64, fail_on_alert: bool) -> Result<()> {
    let data = store::load(file).with_context(|| format!("load {}", file.display()))?;
    let cmp = compare::compare_latest(&data, suite)?;

    for d in &cmp.deltas {
        let marker = if d.is_alert(threshold) { "  <-- alert" } else { "" };
        println!(
            "{:<36} {:>16.2} -> {:>16.2} {:<8} x{:.3}{}",
            d.name, d.previous, d.current, d.unit, d.ratio, marker
        );
    }
    for name in &cmp.only_previous {
        println!("{name:<36} only in previous run");
    }
    for name in &cmp.only_current {
        println!("{name:<36} only in latest run");
    }

    let alerts = cmp.alerts(threshold);
    println!(
        "{} pair(s) compared, {} alert(s) at threshold x{:.2}",
        cmp.deltas.len(),
        alerts.len(),
        threshold
    );

    if fail_on_alert && !alerts.is_empty() {
        bail!("{} measurement(s) regressed past x{:.2}", alerts.len(), threshold);
    }
    Ok(())
}

fn generate(out: &PathBuf, runs: usize, seed: u64, tool: ToolKind, suite: String) -> Result<()> {
    let config = SynthConfig {
        runs,
        seed,
        tool: tool.as_str().to_string(),
        suite,
        ..Default::default()
    };
    let data = synth::generate(&config);
    store::save(out, &data).with_context(|| format!("save {}", out.display()))?;
    println!("Wrote {} run(s) to {}", runs, out.display());
    Ok(())
}

fn format_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms) {
        LocalResult::Single(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => format!("{ms} ms"),
    }
}

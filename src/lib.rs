use clap::ValueEnum;

pub mod compare;
pub mod error;
pub mod schema;
pub mod store;
pub mod synth;
pub mod validate;

pub use error::{HistoryError, Result};

/// Benchmark tool whose output a run's measurements came from.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ToolKind {
    /// benchmark.js suites (ops/sec, bigger is better).
    #[default]
    Benchmarkjs,
    /// cargo bench / libtest (ns/iter).
    Cargo,
    /// Criterion.rs estimates.
    Criterion,
    /// go test -bench.
    Go,
    /// pytest-benchmark.
    Pytest,
    /// Google benchmark (C++).
    Googlecpp,
    /// Catch2.
    Catch2,
    /// User-supplied results where larger values are better.
    CustomBiggerIsBetter,
    /// User-supplied results where smaller values are better.
    CustomSmallerIsBetter,
}

impl ToolKind {
    /// Label stored in a run's `tool` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Benchmarkjs => "benchmarkjs",
            ToolKind::Cargo => "cargo",
            ToolKind::Criterion => "criterion",
            ToolKind::Go => "go",
            ToolKind::Pytest => "pytest",
            ToolKind::Googlecpp => "googlecpp",
            ToolKind::Catch2 => "catch2",
            ToolKind::CustomBiggerIsBetter => "customBiggerIsBetter",
            ToolKind::CustomSmallerIsBetter => "customSmallerIsBetter",
        }
    }
}

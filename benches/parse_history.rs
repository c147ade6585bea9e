//! History file parse/render benchmarks
//!
//! Measures the store layer over synthetic histories of realistic size:
//! - Parsing a data.js script body into the typed model
//! - Rendering the typed model back to script text
//! - Validation over a fully-loaded history

use bench_history::store;
use bench_history::synth::{self, SynthConfig};
use bench_history::validate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_store(c: &mut Criterion) {
    let data = synth::generate(&SynthConfig {
        runs: 100,
        ..Default::default()
    });
    let text = store::render(&data).expect("render");

    let mut group = c.benchmark_group("store");

    group.bench_function("parse_100_runs", |b| {
        b.iter(|| store::parse(black_box(&text)).expect("parse"))
    });

    group.bench_function("render_100_runs", |b| {
        b.iter(|| store::render(black_box(&data)).expect("render"))
    });

    group.bench_function("validate_100_runs", |b| {
        b.iter(|| validate::validate(black_box(&data)))
    });

    group.finish();
}

criterion_group!(benches, bench_store);
criterion_main!(benches);

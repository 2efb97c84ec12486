//! Benchmarks for motif composition.
//!
//! Measures:
//! - Tree construction from a rendered document
//! - Full bottom-up analysis on repeating grids of increasing size
//! - Cost of the per-pass consistency check

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use inverse_facade::prelude::*;

/// Alternating window/pillar rows, every other row shifted by one cell.
fn facade(rows: usize, cols: usize) -> SourceElement {
    let cells: Vec<Vec<&str>> = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| if (r + c) % 2 == 0 { "window" } else { "pillar" })
                .collect()
        })
        .collect();
    Sketch::grid(&cells, 1.0, 1.5).to_document()
}

fn bench_build(c: &mut Criterion) {
    let doc = facade(8, 12);
    let root = doc.main_shape().unwrap();
    c.bench_function("build_tree_8x12", |b| {
        b.iter(|| {
            let mut registry = Registry::new();
            let built = build_tree(black_box(&root), &mut registry, &ComposeOptions::default()).unwrap();
            black_box(built.leaves.len())
        });
    });
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    for (rows, cols) in [(2, 4), (4, 6), (6, 8)] {
        let doc = facade(rows, cols);
        let root = doc.main_shape().unwrap();
        let options = ComposeOptions {
            verify_after_pass: false,
            ..ComposeOptions::default()
        };
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{rows}x{cols}")),
            &root,
            |b, root| {
                b.iter(|| {
                    let engine = GroupEngine::analyze(black_box(root), options.clone()).unwrap();
                    black_box(engine.catalog().len())
                });
            },
        );
    }
    group.finish();
}

fn bench_verified_passes(c: &mut Criterion) {
    let doc = facade(4, 6);
    let root = doc.main_shape().unwrap();
    let mut group = c.benchmark_group("verify_after_pass");
    for verify in [false, true] {
        let options = ComposeOptions {
            verify_after_pass: verify,
            ..ComposeOptions::default()
        };
        group.bench_function(BenchmarkId::new("4x6", verify), |b| {
            b.iter(|| GroupEngine::analyze(&root, options.clone()).unwrap().digest());
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10); // smaller sample for speed
    targets = bench_build, bench_analyze, bench_verified_passes
);
criterion_main!(benches);

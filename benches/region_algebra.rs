//! Benchmarks for the query evaluator: how operator cost scales with the
//! size of its operand region lists.
//!
//! Run with: cargo bench --bench region_algebra

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sgrep::engine::Engine;
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::Parser;

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn literal_corpus(n: usize) -> String {
    (0..n).map(|i| if i % 2 == 0 { "ab " } else { "ba " }).collect()
}

fn eval(corpus: &str, expr: &str) {
    let mut engine = Engine::new();
    engine.add_file("doc", corpus.as_bytes().to_vec()).unwrap();
    let root = Parser::parse(expr.as_bytes(), "<bench>").unwrap();
    let config = ScanConfig::new(ScanMode::PlainText);
    black_box(engine.run(root, None, &config));
}

fn bench_or(c: &mut Criterion) {
    let mut group = c.benchmark_group("or");
    for &n in SIZES {
        let corpus = literal_corpus(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| eval(corpus, r#""ab" or "ba""#));
        });
    }
    group.finish();
}

fn bench_outer(c: &mut Criterion) {
    let mut group = c.benchmark_group("outer");
    for &n in SIZES {
        let corpus = literal_corpus(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| eval(corpus, r#"outer("ab" or "b")"#));
        });
    }
    group.finish();
}

fn bench_extracting(c: &mut Criterion) {
    let mut group = c.benchmark_group("extracting");
    for &n in SIZES {
        let corpus = literal_corpus(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| eval(corpus, r#"concat("ab") extracting "b""#));
        });
    }
    group.finish();
}

fn bench_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("in");
    for &n in SIZES {
        let corpus = literal_corpus(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| eval(corpus, r#""b" in concat("ab")"#));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_or, bench_outer, bench_extracting, bench_in);
criterion_main!(benches);

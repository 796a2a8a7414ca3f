//! Benchmarks for the single-pass SGML scanner and index-build pipeline.
//!
//! Run with: cargo bench --bench scanner

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sgrep::index::IndexWriter;
use sgrep::region::FileList;
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::scanner::{self};

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn xml_corpus(n: usize) -> String {
    (0..n).map(|i| format!("<item id=\"{i}\"><name>widget {i}</name></item>")).collect()
}

fn plain_text_corpus(n: usize) -> String {
    (0..n).map(|i| format!("word{} ", i % 50)).collect()
}

fn bench_xml_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("xml_scan");
    for &n in SIZES {
        let corpus = xml_corpus(n);
        let config = ScanConfig::new(ScanMode::Xml);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| {
                let mut count = 0usize;
                scanner::sgml::scan(corpus.as_bytes(), 0, &config, &mut |_, _| count += 1);
                black_box(count)
            });
        });
    }
    group.finish();
}

fn bench_plain_text_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain_text_scan");
    for &n in SIZES {
        let corpus = plain_text_corpus(n);
        let config = ScanConfig::new(ScanMode::PlainText);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| {
                let mut count = 0usize;
                scanner::sgml::scan(corpus.as_bytes(), 0, &config, &mut |_, _| count += 1);
                black_box(count)
            });
        });
    }
    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for &n in SIZES {
        let corpus = xml_corpus(n);
        let config = ScanConfig::new(ScanMode::Xml);
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| {
                let mut writer = IndexWriter::new(1 << 24);
                scanner::index_file(&mut writer, corpus.as_bytes(), 0, &config).unwrap();
                let mut files = FileList::new();
                files.add("doc", corpus.len()).unwrap();
                black_box(writer.finish(&files, "bench").unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_xml_scan, bench_plain_text_scan, bench_index_build);
criterion_main!(benches);

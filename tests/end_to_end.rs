//! The literal worked examples: one fixed expression and corpus per case,
//! checked against its exact expected region list.

use sgrep::engine::Engine;
use sgrep::evaluator;
use sgrep::index::{IndexReader, IndexWriter};
use sgrep::region::{FileList, Region};
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::Parser;

fn run(corpus: &[u8], expr: &str, mode: ScanMode) -> Vec<Region> {
    let mut engine = Engine::new();
    engine.add_file("doc", corpus.to_vec()).unwrap();
    let root = Parser::parse(expr.as_bytes(), "<test>").unwrap();
    let config = ScanConfig::new(mode);
    let result = engine.run(root, None, &config);
    let v = result.borrow().as_start_sorted();
    v
}

#[test]
fn stag_to_etag_span() {
    // "<a>x y</a><b>z</b>": stag("a") covers [0,2], etag("a") covers [6,9];
    // ".." yields the full span from the start tag through the end tag.
    let regions = run(b"<a>x y</a><b>z</b>", r#"stag("a") .. etag("a")"#, ScanMode::Xml);
    assert_eq!(regions, vec![Region::new(0, 9)]);
}

#[test]
fn repeated_literal_without_concat_keeps_each_occurrence_separate() {
    let regions = run(b"foo foo foo", r#""foo""#, ScanMode::PlainText);
    assert_eq!(regions, vec![Region::new(0, 2), Region::new(4, 6), Region::new(8, 10)]);
}

#[test]
fn repeated_literal_with_default_concat_merges_adjacent_hits() {
    let mut engine = Engine::new();
    engine.add_file("doc", b"foo foo foo".to_vec()).unwrap();
    let root = Parser::parse(b"\"foo\"", "<test>").unwrap();
    let config = ScanConfig::new(ScanMode::PlainText);
    let result = engine.run(root, None, &config);
    let concatenated = evaluator::apply_default_concat(&result.borrow());
    assert_eq!(concatenated.as_start_sorted(), vec![Region::new(0, 10)]);
}

#[test]
fn element_in_element_matches_every_nested_occurrence() {
    let regions = run(b"<x><y/></x><x><y/></x>", r#"element("y") in element("x")"#, ScanMode::Xml);
    assert_eq!(regions, vec![Region::new(3, 6), Region::new(14, 17)]);
}

#[test]
fn index_round_trip_reproduces_a_scratch_scan() {
    let corpus = b"alpha beta\nalpha gamma\n";
    let mut writer = IndexWriter::new(1 << 20);
    let config = ScanConfig::new(ScanMode::PlainText);
    sgrep::scanner::index_file(&mut writer, corpus, 0, &config).unwrap();
    let mut files = FileList::new();
    files.add("doc", corpus.len()).unwrap();
    let (bytes, _) = writer.finish(&files, "").unwrap();
    let reader = IndexReader::open(bytes).unwrap();

    let mut engine = Engine::new();
    engine.files = reader.file_list().unwrap();
    let root = Parser::parse(b"word(\"alpha\")", "<test>").unwrap();
    let result = engine.run(root, Some(&reader), &config);
    assert_eq!(result.borrow().as_start_sorted(), vec![Region::new(0, 4), Region::new(11, 15)]);
}

#[test]
fn join_forms_overlapping_k_grams() {
    let regions = run(b"aaa", r#"join(2, "a")"#, ScanMode::PlainText);
    assert_eq!(regions, vec![Region::new(0, 1), Region::new(1, 2)]);
}

#[test]
fn extracting_a_fully_covering_cutter_yields_nothing() {
    let regions = run(b"aaa", r#""aaa" extracting "a""#, ScanMode::PlainText);
    assert_eq!(regions, Vec::<Region>::new());
}

#[test]
fn extracting_a_partial_cutter_leaves_the_uncovered_remainder() {
    let regions = run(b"abc", r#""abc" extracting "b""#, ScanMode::PlainText);
    assert_eq!(regions, vec![Region::new(0, 0), Region::new(2, 2)]);
}

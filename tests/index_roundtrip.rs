//! Invariant 7: building an index over a corpus and looking up a term must
//! return exactly the regions a from-scratch scan of that corpus would
//! report for the same term (modulo deterministic sort and dedup, which the
//! scan-time path doesn't apply but the index-lookup path does).

use sgrep::engine::Engine;
use sgrep::index::{IndexReader, IndexWriter};
use sgrep::leaf::LeafKind;
use sgrep::region::FileList;
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::scanner::{self};
use sgrep::Parser;

fn scan_from_scratch(corpus: &[u8], mode: ScanMode, term: &str) -> Vec<sgrep::region::Region> {
    let mut engine = Engine::new();
    engine.add_file("doc", corpus.to_vec()).unwrap();
    let root = Parser::parse(term.as_bytes(), "<test>").unwrap();
    let config = ScanConfig::new(mode);
    let result = engine.run(root, None, &config);
    let mut v = result.borrow().as_start_sorted();
    v.sort_by_key(|r| (r.start, r.end));
    v.dedup_by_key(|r| (r.start, r.end));
    v
}

fn scan_via_index(corpus: &[u8], mode: ScanMode, term: &str) -> Vec<sgrep::region::Region> {
    let mut writer = IndexWriter::new(1 << 20);
    let config = ScanConfig::new(mode);
    scanner::index_file(&mut writer, corpus, 0, &config).unwrap();
    let mut files = FileList::new();
    files.add("doc", corpus.len()).unwrap();
    let (bytes, _) = writer.finish(&files, "").unwrap();
    let reader = IndexReader::open(bytes).unwrap();

    let mut engine = Engine::new();
    engine.files = reader.file_list().unwrap();
    let root = Parser::parse(term.as_bytes(), "<test>").unwrap();
    let result = engine.run(root, Some(&reader), &config);
    let v = result.borrow().as_start_sorted();
    v
}

#[test]
fn word_lookup_matches_a_from_scratch_scan() {
    let corpus = b"the quick brown fox jumps over the lazy dog";
    let from_scratch = scan_from_scratch(corpus, ScanMode::PlainText, r#"word("the")"#);
    let from_index = scan_via_index(corpus, ScanMode::PlainText, r#"word("the")"#);
    assert_eq!(from_scratch, from_index);
}

#[test]
fn start_tag_lookup_matches_a_from_scratch_scan() {
    let corpus = b"<a><b>x</b></a><a><b>y</b></a>";
    let from_scratch = scan_from_scratch(corpus, ScanMode::Xml, r#"stag("a")"#);
    let from_index = scan_via_index(corpus, ScanMode::Xml, r#"stag("a")"#);
    assert_eq!(from_scratch, from_index);
}

#[test]
fn element_lookup_matches_a_from_scratch_scan() {
    let corpus = b"<doc><p>one</p><p>two</p></doc>";
    let from_scratch = scan_from_scratch(corpus, ScanMode::Xml, r#"element("p")"#);
    let from_index = scan_via_index(corpus, ScanMode::Xml, r#"element("p")"#);
    assert_eq!(from_scratch, from_index);
}

#[test]
fn missing_term_reports_no_postings_either_way() {
    let corpus = b"alpha beta";
    let from_scratch = scan_from_scratch(corpus, ScanMode::PlainText, r#"word("zzz")"#);
    let from_index = scan_via_index(corpus, ScanMode::PlainText, r#"word("zzz")"#);
    assert!(from_scratch.is_empty());
    assert!(from_index.is_empty());
}

#[test]
fn index_prefix_is_the_stable_dictionary_key() {
    assert_eq!(LeafKind::Word("alpha".to_string()).index_prefix(), "walpha");
    assert_eq!(LeafKind::StartTag("a".to_string()).index_prefix(), "sa");
}

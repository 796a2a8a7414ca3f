//! Phrase-search driver: wires the literal (Aho–Corasick) and
//! structural (SGML) scanners to a query's phrase list, or to an
//! [`crate::index::writer::IndexWriter`] when building an index (§2's
//! control-flow: "Scanner feeds postings to the Index Writer instead of
//! to the Evaluator").

pub mod ac;
pub mod sgml;

use std::collections::HashMap;

use crate::index::writer::IndexWriter;
use crate::leaf::{LeafKind, PhraseList};
use crate::region::Region;
use crate::scanner::sgml::ScanConfig;

/// Scans one file's bytes and records every occurrence of a phrase already
/// present in `phrases` directly into that phrase's `RegionList`, for
/// query-time (non-indexed) evaluation.
pub fn populate_phrases(phrases: &PhraseList, bytes: &[u8], base_offset: i32, config: &ScanConfig) {
    let literal_patterns: Vec<(usize, Vec<u8>)> = phrases
        .leaves
        .iter()
        .enumerate()
        .filter_map(|(i, l)| match &l.kind {
            LeafKind::Literal(s) => Some((i, normalized_bytes(s, config.ignore_case))),
            _ => None,
        })
        .collect();

    if !literal_patterns.is_empty() {
        let pats: Vec<&[u8]> = literal_patterns.iter().map(|(_, p)| p.as_slice()).collect();
        let ac = ac::AhoCorasick::build(&pats, config.ignore_case);
        ac.scan(bytes, |pi, s, e| {
            let leaf_idx = literal_patterns[pi].0;
            let region = Region::new(base_offset + s as i32, base_offset + e as i32);
            phrases.leaves[leaf_idx].regions.borrow_mut().add(region);
        });
    }

    let mut by_kind: HashMap<LeafKind, usize> = HashMap::new();
    for (i, l) in phrases.leaves.iter().enumerate() {
        if l.kind.is_scanner_leaf() && !matches!(l.kind, LeafKind::Literal(_)) {
            by_kind.insert(l.kind.clone(), i);
        }
    }
    if by_kind.is_empty() {
        return;
    }
    sgml::scan(bytes, base_offset, config, &mut |kind, region| {
        if let Some(&idx) = by_kind.get(&kind) {
            phrases.leaves[idx].regions.borrow_mut().add(region);
        }
    });
}

/// Scans one file's bytes, feeding every recognized token's postings into
/// `writer` keyed by its historical index-term prefix, for index-build mode.
/// Returns the number of encoding errors the scan counted.
pub fn index_file(writer: &mut IndexWriter, bytes: &[u8], base_offset: i32, config: &ScanConfig) -> std::io::Result<u32> {
    let mut err: std::io::Result<()> = Ok(());
    let encoding_errors = sgml::scan(bytes, base_offset, config, &mut |kind, region| {
        if err.is_err() {
            return;
        }
        err = writer.add_posting(&kind.index_prefix(), region);
    });
    err?;
    Ok(encoding_errors)
}

fn normalized_bytes(s: &str, ignore_case: bool) -> Vec<u8> {
    if ignore_case {
        s.to_ascii_uppercase().into_bytes()
    } else {
        s.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::PhraseLeaf;
    use crate::scanner::sgml::ScanMode;

    #[test]
    fn literal_phrase_is_found_by_ac_scan() {
        let mut phrases = PhraseList::new();
        phrases.push(PhraseLeaf::new(LeafKind::Literal("fox".to_string())));
        let config = ScanConfig::new(ScanMode::PlainText);
        populate_phrases(&phrases, b"the quick fox jumps", 0, &config);
        let regions = phrases.leaves[0].regions.borrow().as_start_sorted();
        assert_eq!(regions, vec![Region::new(10, 12)]);
    }

    #[test]
    fn structural_phrase_is_found_by_sgml_scan() {
        let mut phrases = PhraseList::new();
        phrases.push(PhraseLeaf::new(LeafKind::StartTag("p".to_string())));
        let config = ScanConfig::new(ScanMode::Xml);
        populate_phrases(&phrases, b"<p>hi</p>", 0, &config);
        let regions = phrases.leaves[0].regions.borrow().as_start_sorted();
        assert_eq!(regions, vec![Region::new(0, 2)]);
    }

    #[test]
    fn index_file_writes_postings_for_every_recognized_token() {
        let mut writer = IndexWriter::new(1 << 20);
        let config = ScanConfig::new(ScanMode::Xml);
        index_file(&mut writer, b"<p>hi</p>", 0, &config).unwrap();
        let files = crate::region::FileList::new();
        let (bytes, _) = writer.finish(&files, "").unwrap();
        let reader = crate::index::reader::IndexReader::open(bytes).unwrap();
        assert!(reader.lookup("sp").is_some());
    }
}

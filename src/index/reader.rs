//! Read side of the on-disk index (§4.8, §6).
//!
//! Opens by reading the whole file into memory (the mmap-equivalent noted
//! in DESIGN.md: no platform memory-mapping crate is in the dependency
//! stack, and a `Vec<u8>` gives the same read-only random-access shape this
//! reader needs). The LCP-compressed term dictionary is reconstructed once
//! at open time into a plain sorted `Vec<String>`, trading the original's
//! lazy on-demand front-coding walk for a single linear pass plus ordinary
//! binary search thereafter; see DESIGN.md for why.

use std::collections::BinaryHeap;
use std::io;

use crate::index::postings;
use crate::region::{FileList, Region};
use crate::region_list::{RegionList, Sorted};

const MAGIC: &[u8] = b"sgrep-index v0\n\n";

struct TermEntry {
    name: String,
    postings_offset: usize,
}

pub struct IndexReader {
    bytes: Vec<u8>,
    terms: Vec<TermEntry>,
    strings_offset: usize,
    filelist_offset: usize,
}

impl IndexReader {
    pub fn open(bytes: Vec<u8>) -> io::Result<Self> {
        if bytes.len() < 1024 || &bytes[..MAGIC.len()] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let n_terms = read_u32(&bytes, 512)? as usize;
        let term_array_offset = read_u32(&bytes, 516)? as usize;
        let strings_offset = read_u32(&bytes, 520)? as usize;
        let filelist_offset = read_u32(&bytes, 524)? as usize;

        let mut term_rel_offsets = Vec::with_capacity(n_terms);
        for i in 0..n_terms {
            term_rel_offsets.push(read_u32(&bytes, term_array_offset + 4 * i)? as usize);
        }

        let mut terms = Vec::with_capacity(n_terms);
        let mut prev = String::new();
        for &rel in &term_rel_offsets {
            let pos = strings_offset + rel;
            let lcp = *bytes.get(pos).ok_or_else(|| corrupt("truncated term entry"))? as usize;
            let mut cursor = pos + 1;
            let nul = bytes[cursor..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| corrupt("unterminated term suffix"))?;
            let suffix = std::str::from_utf8(&bytes[cursor..cursor + nul])
                .map_err(|_| corrupt("term is not valid UTF-8"))?;
            let mut name = String::new();
            name.push_str(&prev[..lcp.min(prev.len())]);
            name.push_str(suffix);
            cursor += nul + 1;
            terms.push(TermEntry { name: name.clone(), postings_offset: cursor });
            prev = name;
        }

        Ok(IndexReader { bytes, terms, strings_offset, filelist_offset })
    }

    #[must_use]
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    fn find(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.name.as_str().cmp(term)).ok()
    }

    /// Exact lookup: decodes and returns one term's postings as a
    /// start-sorted `RegionList`, or `None` if the term isn't present.
    #[must_use]
    pub fn lookup(&self, term: &str) -> Option<RegionList> {
        let idx = self.find(term)?;
        let regions = self.decode_postings_at(idx).ok()?;
        Some(RegionList::from_sorted_vec(regions, Sorted::StartSorted, false))
    }

    fn decode_postings_at(&self, idx: usize) -> io::Result<Vec<Region>> {
        let start = self.terms[idx].postings_offset;
        postings::decode_postings(&self.bytes[start..])
    }

    /// Dictionary dump for index-mode `-q terms first [last]`: every term
    /// in `[first, last]` (or just `first` when `last` is `None`), in
    /// sorted order.
    #[must_use]
    pub fn term_range<'a>(&'a self, first: &str, last: Option<&str>) -> Vec<&'a str> {
        let lo = self.terms.partition_point(|t| t.name.as_str() < first);
        let hi = match last {
            Some(l) => self.terms.partition_point(|t| t.name.as_str() <= l),
            None => self.terms.partition_point(|t| t.name.as_str() <= first),
        };
        self.terms[lo.min(hi)..hi.max(lo)].iter().map(|t| t.name.as_str()).collect()
    }

    /// Merges postings for several matched terms into a single sorted
    /// `RegionList` via a tournament over each term's already-sorted
    /// posting stream (§4.8 "Sorted-merge read").
    #[must_use]
    pub fn lookup_many(&self, terms: &[&str]) -> RegionList {
        let streams: Vec<Vec<Region>> =
            terms.iter().filter_map(|t| self.find(t)).filter_map(|idx| self.decode_postings_at(idx).ok()).collect();
        RegionList::from_sorted_vec(merge_sorted(streams), Sorted::StartSorted, false)
    }

    /// Reconstructs the `FileList` that was current when the index was
    /// built, for `-x <indexfile>` query mode: resolving phrase leaves
    /// against a prebuilt index still needs to know which file owns which
    /// byte offset, without re-reading the original inputs.
    pub fn file_list(&self) -> io::Result<FileList> {
        let mut files = FileList::new();
        if self.filelist_offset == 0 {
            return Ok(files);
        }
        let n_files = read_u32(&self.bytes, self.filelist_offset)? as usize;
        let mut cursor = self.filelist_offset + 4;
        for _ in 0..n_files {
            let name_len = read_u32(&self.bytes, cursor)? as usize;
            cursor += 4;
            let name_bytes =
                self.bytes.get(cursor..cursor + name_len).ok_or_else(|| corrupt("truncated file name"))?;
            let name = std::str::from_utf8(name_bytes).map_err(|_| corrupt("file name is not valid UTF-8"))?;
            let name = name.to_string();
            cursor += name_len;
            if self.bytes.get(cursor) != Some(&0) {
                return Err(corrupt("missing file name terminator"));
            }
            cursor += 1;
            let length = read_u32(&self.bytes, cursor)? as usize;
            cursor += 4;
            files.add(name, length).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        }
        Ok(files)
    }
}

fn merge_sorted(streams: Vec<Vec<Region>>) -> Vec<Region> {
    #[derive(Eq, PartialEq)]
    struct HeapEntry(Region, usize, usize); // region, stream idx, pos idx; reversed for min-heap

    impl Ord for HeapEntry {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            other.0.start.cmp(&self.0.start).then(other.0.end.cmp(&self.0.end))
        }
    }
    impl PartialOrd for HeapEntry {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut heap = BinaryHeap::new();
    for (si, s) in streams.iter().enumerate() {
        if let Some(&r) = s.first() {
            heap.push(HeapEntry(r, si, 0));
        }
    }
    let mut out = Vec::new();
    while let Some(HeapEntry(r, si, pi)) = heap.pop() {
        out.push(r);
        if let Some(&next) = streams[si].get(pi + 1) {
            heap.push(HeapEntry(next, si, pi + 1));
        }
    }
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

fn read_u32(bytes: &[u8], offset: usize) -> io::Result<u32> {
    let slice = bytes.get(offset..offset + 4).ok_or_else(|| corrupt("header field out of range"))?;
    Ok(u32::from_be_bytes(slice.try_into().unwrap()))
}

fn corrupt(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("corrupt index: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::IndexWriter;
    use crate::region::FileList;

    #[test]
    fn round_trips_through_writer() {
        let mut w = IndexWriter::new(1 << 20);
        w.add_posting("alpha", Region::new(0, 2)).unwrap();
        w.add_posting("alphabet", Region::new(5, 7)).unwrap();
        w.add_posting("beta", Region::new(10, 12)).unwrap();
        let mut files = FileList::new();
        files.add("a.xml", 20).unwrap();
        let (bytes, _) = w.finish(&files, "test index").unwrap();

        let reader = IndexReader::open(bytes).unwrap();
        assert_eq!(reader.n_terms(), 3);
        let alpha = reader.lookup("alpha").unwrap();
        assert_eq!(alpha.as_start_sorted(), vec![Region::new(0, 2)]);
        assert!(reader.lookup("missing").is_none());
    }

    #[test]
    fn term_range_reports_sorted_dictionary_window() {
        let mut w = IndexWriter::new(1 << 20);
        for t in ["ant", "bee", "cat", "dog"] {
            w.add_posting(t, Region::new(0, 0)).unwrap();
        }
        let files = FileList::new();
        let (bytes, _) = w.finish(&files, "").unwrap();
        let reader = IndexReader::open(bytes).unwrap();
        assert_eq!(reader.term_range("bee", Some("dog")), vec!["bee", "cat", "dog"]);
    }

    #[test]
    fn file_list_roundtrips_through_finish() {
        let mut w = IndexWriter::new(1 << 20);
        w.add_posting("alpha", Region::new(0, 2)).unwrap();
        let mut files = FileList::new();
        files.add("a.xml", 20).unwrap();
        files.add("b.xml", 5).unwrap();
        let (bytes, _) = w.finish(&files, "").unwrap();
        let reader = IndexReader::open(bytes).unwrap();
        let restored = reader.file_list().unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(0).unwrap().name, "a.xml");
        assert_eq!(restored.get(0).unwrap().length, 20);
        assert_eq!(restored.get(1).unwrap().start, 20);
        assert_eq!(restored.get(1).unwrap().length, 5);
    }

    #[test]
    fn empty_file_list_reports_no_files() {
        let mut w = IndexWriter::new(1 << 20);
        w.add_posting("alpha", Region::new(0, 2)).unwrap();
        let files = FileList::new();
        let (bytes, _) = w.finish(&files, "").unwrap();
        let reader = IndexReader::open(bytes).unwrap();
        assert!(reader.file_list().unwrap().is_empty());
    }

    #[test]
    fn lookup_many_merges_in_start_order() {
        let mut w = IndexWriter::new(1 << 20);
        w.add_posting("a", Region::new(0, 0)).unwrap();
        w.add_posting("a", Region::new(10, 10)).unwrap();
        w.add_posting("b", Region::new(5, 5)).unwrap();
        let files = FileList::new();
        let (bytes, _) = w.finish(&files, "").unwrap();
        let reader = IndexReader::open(bytes).unwrap();
        let merged = reader.lookup_many(&["a", "b"]);
        assert_eq!(merged.as_start_sorted(), vec![Region::new(0, 0), Region::new(5, 5), Region::new(10, 10)]);
    }
}

//! In-memory postings accumulation and final-pass index file emission
//! (§4.7, §6 "Index file format").
//!
//! Each distinct term owns an append-only byte stream of encoded postings
//! (`postings::PostingEncoder`). Small streams stay inline; once a term's
//! stream crosses [`SPOOL_THRESHOLD`] bytes its tail is flushed to a shared
//! temp-file spool and only a short in-memory buffer plus a spool offset is
//! kept, bounding peak memory regardless of how hot any single term gets.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Read, Seek, SeekFrom, Write};

use tempfile::NamedTempFile;

use crate::index::postings::PostingEncoder;
use crate::index::varint;
use crate::region::{FileList, Region};

/// Byte streams shorter than this stay fully resident; the original's
/// `IndexBuffer` used a 12-byte inline union member with the same intent.
const SPOOL_THRESHOLD: usize = 12;

enum PostingStream {
    Inline(Vec<u8>),
    Spooled { spool_start: u64, spool_len: u64, tail: Vec<u8> },
}

struct TermEntry {
    encoder: PostingEncoder,
    stream: PostingStream,
    stop_word: bool,
}

/// Accumulates postings for one index build, spilling large per-term
/// streams to a temp-file spool once the configured memory budget would
/// otherwise be exceeded.
pub struct IndexWriter {
    terms: HashMap<String, TermEntry>,
    spool: Option<NamedTempFile>,
    spool_len: u64,
    memory_budget: usize,
    resident_bytes: usize,
    stop_words: BTreeSet<String>,
    large_posting_threshold_pct: Option<f64>,
}

impl IndexWriter {
    #[must_use]
    pub fn new(memory_budget: usize) -> Self {
        IndexWriter {
            terms: HashMap::new(),
            spool: None,
            spool_len: 0,
            memory_budget,
            resident_bytes: 0,
            stop_words: BTreeSet::new(),
            large_posting_threshold_pct: None,
        }
    }

    /// Marks `word` as a stop word: it is kept in the final dictionary but
    /// its postings are discarded (§4.7 "Stop words").
    pub fn add_stop_word(&mut self, word: impl Into<String>) {
        self.stop_words.insert(word.into());
    }

    /// Enables the "terms whose postings exceed a percentage of index size"
    /// report produced by [`IndexWriter::finish`].
    pub fn report_large_postings(&mut self, percent: f64) {
        self.large_posting_threshold_pct = Some(percent);
    }

    /// Records one `(term, region)` occurrence. `start` must not precede
    /// the previous occurrence of the same term (the scanner emits hits in
    /// file order, so this is the only order this encoder supports).
    pub fn add_posting(&mut self, term: &str, region: Region) -> io::Result<()> {
        if self.stop_words.contains(term) {
            return Ok(());
        }
        let entry = self.terms.entry(term.to_string()).or_insert_with(|| TermEntry {
            encoder: PostingEncoder::new(),
            stream: PostingStream::Inline(Vec::new()),
            stop_word: false,
        });
        let mut appended = Vec::new();
        entry.encoder.push(&mut appended, region);
        self.resident_bytes += appended.len();
        match &mut entry.stream {
            PostingStream::Inline(buf) => {
                buf.extend_from_slice(&appended);
                if buf.len() > SPOOL_THRESHOLD {
                    let spool = self.spool.get_or_insert_with(|| {
                        NamedTempFile::new().expect("temp spool file")
                    });
                    spool.as_file_mut().seek(SeekFrom::End(0))?;
                    spool.as_file_mut().write_all(buf)?;
                    let spool_start = self.spool_len;
                    self.spool_len += buf.len() as u64;
                    self.resident_bytes -= buf.len();
                    entry.stream = PostingStream::Spooled { spool_start, spool_len: buf.len() as u64, tail: Vec::new() };
                }
            }
            PostingStream::Spooled { tail, .. } => {
                tail.extend_from_slice(&appended);
                if self.resident_bytes > self.memory_budget && self.memory_budget > 0 {
                    self.spill_hottest_tail()?;
                }
            }
        }
        Ok(())
    }

    fn spill_hottest_tail(&mut self) -> io::Result<()> {
        let Some((_, hottest)) = self
            .terms
            .iter_mut()
            .filter_map(|(k, v)| match &v.stream {
                PostingStream::Spooled { tail, .. } if !tail.is_empty() => Some((tail.len(), k.clone())),
                _ => None,
            })
            .max_by_key(|(len, _)| *len)
            .map(|(len, k)| (len, k))
        else {
            return Ok(());
        };
        let entry = self.terms.get_mut(&hottest).expect("hottest key came from self.terms");
        let PostingStream::Spooled { spool_start, spool_len, tail } = &mut entry.stream else {
            unreachable!("filtered to Spooled entries above")
        };
        let spool = self.spool.get_or_insert_with(|| NamedTempFile::new().expect("temp spool file"));
        spool.as_file_mut().seek(SeekFrom::End(0))?;
        spool.as_file_mut().write_all(tail)?;
        self.resident_bytes -= tail.len();
        *spool_len += tail.len() as u64;
        let _ = spool_start;
        tail.clear();
        Ok(())
    }

    fn materialize(&mut self, term: &str) -> io::Result<Vec<u8>> {
        let entry = self.terms.get(term).expect("materialize called for a known term");
        match &entry.stream {
            PostingStream::Inline(buf) => Ok(buf.clone()),
            PostingStream::Spooled { spool_start, spool_len, tail } => {
                let mut buf = vec![0u8; *spool_len as usize];
                if let Some(spool) = &mut self.spool {
                    spool.as_file_mut().seek(SeekFrom::Start(*spool_start))?;
                    spool.as_file_mut().read_exact(&mut buf)?;
                }
                buf.extend_from_slice(tail);
                Ok(buf)
            }
        }
    }

    /// Runs the finalization pass (§4.7 item 5): sorts terms, computes
    /// per-term LCP against its lexicographic predecessor, and writes the
    /// bit-exact index file described in §6.
    ///
    /// The second return value is the stop-word candidate report enabled by
    /// [`IndexWriter::report_large_postings`]: every term whose encoded
    /// postings occupy more than the configured percentage of the finished
    /// index, empty when that reporting was never turned on.
    pub fn finish(mut self, files: &FileList, header_text: &str) -> io::Result<(Vec<u8>, Vec<String>)> {
        let mut term_names: Vec<String> = self.terms.keys().cloned().collect();
        term_names.sort();
        for w in &self.stop_words {
            if !self.terms.contains_key(w) {
                term_names.push(w.clone());
            }
        }
        term_names.sort();
        term_names.dedup();

        let mut strings_section = Vec::new();
        let mut term_offsets = Vec::with_capacity(term_names.len());
        let mut prev_term = String::new();
        let mut posting_sizes = Vec::new();

        for term in &term_names {
            term_offsets.push(strings_section.len() as u32);
            let lcp = common_prefix_len(&prev_term, term);
            let suffix = &term.as_bytes()[lcp..];
            strings_section.push(u8::try_from(lcp.min(255)).unwrap_or(255));
            strings_section.extend_from_slice(suffix);
            strings_section.push(0x00);

            let postings_start = strings_section.len();
            if self.stop_words.contains(term) {
                varint::write_end_of_postings(&mut strings_section)?;
            } else {
                let bytes = self.materialize(term)?;
                strings_section.extend_from_slice(&bytes);
                varint::write_end_of_postings(&mut strings_section)?;
            }
            if self.large_posting_threshold_pct.is_some() {
                let postings_len = strings_section.len() - postings_start;
                posting_sizes.push((term.clone(), postings_len));
            }
            prev_term = term.clone();
        }

        let n_terms = term_names.len() as u32;
        let term_array_offset: u32 = 1024;
        let strings_offset = term_array_offset + 4 * n_terms;
        let filelist_offset = if files.is_empty() { 0 } else { strings_offset + strings_section.len() as u32 };

        let mut out = Vec::new();
        let mut header = Vec::with_capacity(512);
        header.extend_from_slice(b"sgrep-index v0\n\n");
        header.extend_from_slice(header_text.as_bytes());
        header.resize(512, 0);
        out.extend_from_slice(&header);
        out.extend_from_slice(&n_terms.to_be_bytes());
        out.extend_from_slice(&term_array_offset.to_be_bytes());
        out.extend_from_slice(&strings_offset.to_be_bytes());
        out.extend_from_slice(&filelist_offset.to_be_bytes());
        out.resize(term_array_offset as usize, 0);

        for off in &term_offsets {
            out.extend_from_slice(&off.to_be_bytes());
        }
        out.extend_from_slice(&strings_section);

        if !files.is_empty() {
            out.extend_from_slice(&(files.len() as u32).to_be_bytes());
            for f in files.iter() {
                out.extend_from_slice(&(f.name.len() as u32).to_be_bytes());
                out.extend_from_slice(f.name.as_bytes());
                out.push(0);
                out.extend_from_slice(&(f.length as u32).to_be_bytes());
            }
        }

        let stop_word_candidates = match self.large_posting_threshold_pct {
            Some(pct) => {
                let total = out.len() as f64;
                posting_sizes
                    .into_iter()
                    .filter(|(_, len)| (*len as f64 / total) * 100.0 >= pct)
                    .map(|(term, _)| term)
                    .collect()
            }
            None => Vec::new(),
        };

        Ok((out, stop_word_candidates))
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Scans every input file concurrently and merges the results into `writer`
/// sequentially afterward (§5: the parallel fan-out owns disjoint per-file
/// state; only this merge step touches the single-threaded writer, so its
/// postings-must-arrive-in-order contract still holds).
///
/// `progress` is invoked after each file finishes scanning, from whichever
/// worker thread finished it; it must tolerate concurrent calls.
#[cfg(feature = "parallel")]
pub fn scan_inputs_parallel(
    writer: &mut IndexWriter,
    files: &mut FileList,
    inputs: &[(String, Vec<u8>)],
    config: &crate::scanner::sgml::ScanConfig,
    progress: impl Fn(usize, usize, u64, u64) + Sync,
) -> io::Result<u32> {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use rayon::prelude::*;

    let total_files = inputs.len();
    let total_bytes: u64 = inputs.iter().map(|(_, b)| b.len() as u64).sum();
    let done_files = AtomicUsize::new(0);
    let done_bytes = AtomicU64::new(0);
    let encoding_errors = parking_lot::Mutex::new(0u32);

    let mut bases = Vec::with_capacity(inputs.len());
    let mut base = files.total_bytes();
    for (name, bytes) in inputs {
        bases.push(base);
        files.add(name.clone(), bytes.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        base += bytes.len() as i32;
    }

    let scanned: Vec<Vec<(String, Region)>> = inputs
        .par_iter()
        .zip(bases.par_iter())
        .map(|((_, bytes), &base_offset)| {
            let mut events = Vec::new();
            let errs = crate::scanner::sgml::scan(bytes, base_offset, config, &mut |kind, region| {
                events.push((kind.index_prefix(), region));
            });
            if errs > 0 {
                *encoding_errors.lock() += errs;
            }
            let files_done = done_files.fetch_add(1, Ordering::Relaxed) + 1;
            let bytes_done = done_bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed) + bytes.len() as u64;
            progress(files_done, total_files, bytes_done, total_bytes);
            events
        })
        .collect();

    for events in scanned {
        for (term, region) in events {
            writer.add_posting(&term, region)?;
        }
    }

    let encoding_error_count = *encoding_errors.lock();
    Ok(encoding_error_count)
}

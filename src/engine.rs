//! Per-instance engine state: the file list, accumulated statistics, and
//! the error sink a query run reports into (§5/§9: "bind global statistics
//! to engine instance," never thread-local or global state).

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{Result, SgrepError};
use crate::evaluator::Evaluator;
use crate::index::reader::IndexReader;
use crate::leaf::PhraseList;
use crate::optimizer;
use crate::region::{FileList, Region};
use crate::region_list::RegionList;
use crate::scanner::{self, sgml::ScanConfig};
use crate::tree::NodeRef;

/// `-T` statistics: counters an engine run accumulates, surfaced verbatim
/// by the CLI rather than recomputed after the fact.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub files_scanned: u32,
    pub bytes_scanned: u64,
    pub distinct_phrases: u32,
    pub encoding_errors: u32,
    pub nodes_evaluated: u32,
}

/// One query run's world: the concatenated corpus, its file boundaries,
/// and where diagnostics and statistics go. Every run constructs a fresh
/// `Engine`; nothing here survives or is shared across instances.
pub struct Engine {
    pub files: FileList,
    corpus: Vec<u8>,
    pub stats: Stats,
    errors: RefCell<Vec<SgrepError>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine { files: FileList::new(), corpus: Vec::new(), stats: Stats::default(), errors: RefCell::new(Vec::new()) }
    }

    /// Appends one input file's bytes to the corpus, registering it in the
    /// file list at the next cumulative offset.
    pub fn add_file(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<()> {
        self.files.add(name, bytes.len())?;
        self.corpus.extend_from_slice(&bytes);
        self.stats.files_scanned += 1;
        self.stats.bytes_scanned += bytes.len() as u64;
        Ok(())
    }

    #[must_use]
    pub fn total_bytes(&self) -> i32 {
        self.files.total_bytes()
    }

    /// The raw bytes a result region covers, for output templates' `%r`.
    /// Empty when this engine never loaded a corpus (query against a
    /// prebuilt index, where only the file list was reconstructed).
    #[must_use]
    pub fn slice(&self, region: Region) -> &[u8] {
        let start = region.start as usize;
        let end = region.end as usize + 1;
        self.corpus.get(start..end).unwrap_or(&[])
    }

    /// Records a non-fatal diagnostic; the caller drains and prints these
    /// (defaulting to stderr per §7) after the run completes.
    pub fn report_error(&self, e: SgrepError) {
        self.errors.borrow_mut().push(e);
    }

    pub fn drain_errors(&mut self) -> Vec<SgrepError> {
        std::mem::take(self.errors.get_mut())
    }

    /// Runs one query: optimizes the tree, populates every scanner-backed
    /// leaf (via the index when given, otherwise by scanning the corpus
    /// directly), and evaluates. Returns the final result `RegionList`.
    pub fn run(&mut self, root: NodeRef, index: Option<&IndexReader>, scan_config: &ScanConfig) -> Rc<RefCell<RegionList>> {
        let root = optimizer::optimize(root);

        if index.is_none() {
            let phrases = collect_phrase_leaves(&root);
            self.stats.distinct_phrases = phrases.leaves.len() as u32;
            for file in self.files.iter() {
                let start = file.start as usize;
                let end = start + file.length as usize;
                scanner::populate_phrases(&phrases, &self.corpus[start..end], file.start, scan_config);
            }
        }

        let evaluator = Evaluator::new(&self.files, index);
        evaluator.eval(&root)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the optimized (possibly DAG-shaped) tree once, gathering every
/// distinct scanner-backed leaf into one `PhraseList` for the scanner
/// driver. Visits each shared node exactly once using label identity.
fn collect_phrase_leaves(root: &NodeRef) -> PhraseList {
    let mut seen_labels = HashSet::new();
    let mut phrases = PhraseList::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        let n = node.borrow();
        if !seen_labels.insert(n.label) {
            continue;
        }
        if let Some(leaf) = &n.leaf {
            if leaf.kind.is_scanner_leaf() {
                phrases.push(leaf.clone());
            }
        }
        if let Some(l) = &n.left {
            stack.push(l.clone());
        }
        if let Some(r) = &n.right {
            stack.push(r.clone());
        }
    }
    phrases
}

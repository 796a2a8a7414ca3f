//! Index-mode flags (§6): a distinct `clap::Args` struct, since several
//! letters (`-l`, `-S`, `-w`, `-g`, `-F`) carry different meanings here
//! than in query mode.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sgrep -I", about = "Build an sgrep inverted index", version)]
pub struct IndexArgs {
    /// Create the index at this path.
    #[arg(short = 'c')]
    pub create: Option<String>,

    /// Dump dictionary terms in `[first, last]` instead of building.
    #[arg(short = 'q', num_args = 1..=2)]
    pub dump_terms: Option<Vec<String>>,

    /// Report terms whose postings exceed this percent of index size as
    /// stop-word candidates.
    #[arg(short = 'l')]
    pub stop_word_percent: Option<f64>,

    /// Write discovered stop-word candidates to this file.
    #[arg(short = 'L')]
    pub stop_word_out: Option<String>,

    /// Read a stop-word list from this file.
    #[arg(short = 'S')]
    pub stop_word_in: Option<String>,

    /// Memory budget for the in-progress postings spool, in megabytes.
    #[arg(short = 'm')]
    pub memory_mb: Option<usize>,

    /// Initial hash-table size hint.
    #[arg(short = 'H')]
    pub hash_size: Option<usize>,

    /// Explicit word-character list.
    #[arg(short = 'w')]
    pub word_chars: Option<String>,

    /// Scanner mode/option, e.g. `sgml`, `xml`, `text`.
    #[arg(short = 'g')]
    pub scanner_opt: Option<String>,

    /// Read a list of input file names from a file (one per line).
    #[arg(short = 'F')]
    pub file_list: Option<String>,

    /// Input files to index; stdin when empty.
    pub files: Vec<String>,
}

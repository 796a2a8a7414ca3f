//! Query-mode flags (§6): a flat `clap::Args` struct mirroring the
//! original's one-letter option set.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sgrep", about = "Structured-text retrieval over SGML/XML and plain text", disable_version_flag = true)]
pub struct QueryArgs {
    /// Filter mode: also emit the spans the query did *not* match.
    #[arg(short = 'a')]
    pub filter: bool,

    /// Count results only; print the count instead of regions.
    #[arg(short = 'c')]
    pub count_only: bool,

    /// Suppress the implicit `concat()` normally applied to the result.
    #[arg(short = 'd')]
    pub no_concat: bool,

    /// Case-insensitive word/GI matching.
    #[arg(short = 'i')]
    pub ignore_case: bool,

    /// Long preset output format.
    #[arg(short = 'l')]
    pub long_format: bool,

    /// Short preset output format.
    #[arg(short = 's')]
    pub short_format: bool,

    /// Suppress the trailing newline after the last result.
    #[arg(short = 'N')]
    pub no_trailing_newline: bool,

    /// Skip `.sgreprc` / `SGREPOPT` startup configuration.
    #[arg(short = 'n')]
    pub no_startup_config: bool,

    /// Suppress result output (useful with `-c`/`-T`).
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Stream mode: treat all inputs as one concatenated corpus.
    #[arg(short = 'S')]
    pub stream: bool,

    /// Print engine statistics after the run.
    #[arg(short = 'T')]
    pub statistics: bool,

    /// Print elapsed wall-clock time after the run.
    #[arg(short = 't')]
    pub timing: bool,

    /// Print version and exit.
    #[arg(short = 'V')]
    pub version: bool,

    /// Report scan progress on stderr.
    #[arg(short = 'v')]
    pub progress: bool,

    /// Print the preprocessed query expression and exit without running it.
    #[arg(short = 'P')]
    pub print_preprocessed: bool,

    /// Supply the query expression inline instead of as a positional argument.
    #[arg(short = 'e')]
    pub expr_opt: Option<String>,

    /// Read the query expression from a file.
    #[arg(short = 'f')]
    pub expr_file: Option<String>,

    /// Read a list of input file names from a file (one per line).
    #[arg(short = 'F')]
    pub file_list: Option<String>,

    /// Scanner mode/option, e.g. `sgml`, `xml`, `text`.
    #[arg(short = 'g')]
    pub scanner_opt: Option<String>,

    /// Load an output style from a file.
    #[arg(short = 'O')]
    pub style_file: Option<String>,

    /// Output style template (see `cli::template`).
    #[arg(short = 'o')]
    pub style: Option<String>,

    /// Query-text preprocessor command.
    #[arg(short = 'p')]
    pub preprocessor: Option<String>,

    /// Explicit word-character list, overriding the scanner mode default.
    #[arg(short = 'w')]
    pub word_chars: Option<String>,

    /// Resolve phrases against a prebuilt index file (implies `-S`).
    #[arg(short = 'x')]
    pub index_file: Option<String>,

    /// Query expression, when not given via `-e`/`-f`.
    pub expr: Option<String>,

    /// Input files; stdin when empty.
    pub files: Vec<String>,
}

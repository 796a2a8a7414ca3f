//! CLI glue: option parsing, config-file loading, and output templating.
//! Kept separate from the engine per §1 ("external collaborator"), but
//! still built on the same crates the engine's ambient stack uses.

pub mod config;
pub mod index_args;
pub mod query_args;
pub mod template;

pub use index_args::IndexArgs;
pub use query_args::QueryArgs;

/// Which of the two CLIs this invocation selected: by a leading `-I`, or
/// by `argv[0]`'s basename ending in `index` (the historical `sindex`
/// binary name), per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Query,
    Index,
}

/// Inspects `argv` (including `argv[0]`) and strips a leading `-I` if
/// present, returning the selected mode and the remaining arguments ready
/// to hand to the mode-specific `clap::Parser`.
#[must_use]
pub fn detect_mode(argv: &[String]) -> (Mode, Vec<String>) {
    let program = argv.first().map(String::as_str).unwrap_or_default();
    let basename = program.rsplit(['/', '\\']).next().unwrap_or(program);
    let mut rest = argv.to_vec();

    if let Some(pos) = rest.iter().position(|a| a == "-I") {
        rest.remove(pos);
        return (Mode::Index, rest);
    }
    if basename.ends_with("index") {
        return (Mode::Index, rest);
    }
    (Mode::Query, rest)
}

//! `sgrep` / `sindex` command-line front end: option parsing, startup
//! configuration, and output templating live under [`cli`]; this file only
//! wires them to the library's engine, parser, and index (§6, §7).

mod cli;

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::{Command, ExitCode, Stdio};
use std::time::Instant;

use clap::Parser as ClapParser;

#[cfg(feature = "parallel")]
use indicatif::{ProgressBar, ProgressStyle};

use sgrep::engine::Engine;
use sgrep::evaluator;
use sgrep::index::{IndexReader, IndexWriter};
use sgrep::region::{FileList, Region};
#[cfg(not(feature = "parallel"))]
use sgrep::scanner;
use sgrep::scanner::sgml::{ScanConfig, ScanMode};
use sgrep::Parser as QueryParser;

use cli::config::{load_startup_config, sgrepopt_tokens};
use cli::template::{Template, DEFAULT_TEMPLATE};
use cli::{detect_mode, IndexArgs, Mode, QueryArgs};

const EXIT_MATCHED: u8 = 0;
const EXIT_EMPTY: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let argv: Vec<String> = env::args().collect();
    let (mode, argv) = detect_mode(&argv);
    match mode {
        Mode::Query => run_query(argv),
        Mode::Index => run_index(argv),
    }
}

/// Prepends `SGREPOPT`'s whitespace-split tokens to `argv[1..]`, so they
/// behave as if the user had typed them ahead of the real command line.
fn apply_sgrepopt(argv: Vec<String>) -> Vec<String> {
    let Ok(value) = env::var("SGREPOPT") else {
        return argv;
    };
    let mut tokens = sgrepopt_tokens(&value);
    if tokens.is_empty() {
        return argv;
    }
    let mut out = Vec::with_capacity(argv.len() + tokens.len());
    let mut rest = argv.into_iter();
    if let Some(prog) = rest.next() {
        out.push(prog);
    }
    out.append(&mut tokens);
    out.extend(rest);
    out
}

fn scan_mode_from_opt(opt: Option<&str>) -> ScanMode {
    match opt.map(str::to_ascii_lowercase).as_deref() {
        Some("xml") => ScanMode::Xml,
        Some("text") | Some("plain") => ScanMode::PlainText,
        _ => ScanMode::Sgml,
    }
}

fn read_file_list(path: &str) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

/// Runs `preprocessor` as a shell command, piping `expr` in on stdin and
/// capturing its stdout as the real query text (§6 "Query preprocessor").
fn run_preprocessor(preprocessor: &str, expr: &str) -> io::Result<String> {
    let mut child = Command::new("sh").arg("-c").arg(preprocessor).stdin(Stdio::piped()).stdout(Stdio::piped()).spawn()?;
    child.stdin.take().expect("piped stdin").write_all(expr.as_bytes())?;
    let output = child.wait_with_output()?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Complement of a sorted, disjoint region list over `[0, total_bytes)`,
/// for `-a` filter mode ("the spans the query did *not* match").
fn complement(regions: &[Region], total_bytes: i32) -> Vec<Region> {
    if total_bytes <= 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut cursor = 0;
    for r in regions {
        if r.start > cursor {
            out.push(Region::new(cursor, r.start - 1));
        }
        cursor = cursor.max(r.end + 1);
    }
    if cursor < total_bytes {
        out.push(Region::new(cursor, total_bytes - 1));
    }
    out
}

fn print_error(context: &str, err: impl std::fmt::Display) {
    eprintln!("sgrep: {context}: {err}");
}

fn run_query(argv: Vec<String>) -> ExitCode {
    let argv = apply_sgrepopt(argv);
    let args = match QueryArgs::try_parse_from(&argv) {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if args.version {
        println!("sgrep {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::from(EXIT_MATCHED);
    }

    let scan_mode = scan_mode_from_opt(args.scanner_opt.as_deref());
    let mut scan_config = ScanConfig::new(scan_mode);
    scan_config.ignore_case = args.ignore_case;
    if let Some(chars) = &args.word_chars {
        scan_config.char_class.set_word_chars(chars);
    }

    let raw_expr = match resolve_query_text(&args) {
        Ok(text) => text,
        Err(e) => {
            print_error("query", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let preprocessed = if let Some(cmd) = &args.preprocessor {
        match run_preprocessor(cmd, &raw_expr) {
            Ok(text) => text,
            Err(e) => {
                print_error("preprocessor", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        raw_expr
    };

    let final_expr = if args.no_startup_config {
        preprocessed
    } else {
        let home = env::var("HOME").ok();
        load_startup_config(home.as_deref(), &preprocessed, "<query>")
    };

    if args.print_preprocessed {
        println!("{final_expr}");
        return ExitCode::from(EXIT_MATCHED);
    }

    let root = match QueryParser::parse(final_expr.as_bytes(), "<query>") {
        Ok(r) => r,
        Err(e) => {
            print_error("parse error", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let started = Instant::now();
    let mut engine = Engine::new();
    let index_reader = match load_query_index(&args, &mut engine) {
        Ok(r) => r,
        Err(e) => {
            print_error("index", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if index_reader.is_none() {
        if let Err(e) = load_query_inputs(&args, &mut engine) {
            print_error("input", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let result = engine.run(root, index_reader.as_ref(), &scan_config);
    let regions = if args.no_concat {
        result.borrow().as_start_sorted()
    } else {
        evaluator::apply_default_concat(&result.borrow()).as_start_sorted()
    };
    let regions = if args.filter { complement(&regions, engine.total_bytes()) } else { regions };

    for err in engine.drain_errors() {
        print_error("warning", err);
    }

    if !args.quiet {
        render_results(&args, &engine, &regions);
    }

    if args.statistics {
        eprintln!(
            "files_scanned={} bytes_scanned={} distinct_phrases={} encoding_errors={} nodes_evaluated={} results={}",
            engine.stats.files_scanned,
            engine.stats.bytes_scanned,
            engine.stats.distinct_phrases,
            engine.stats.encoding_errors,
            engine.stats.nodes_evaluated,
            regions.len(),
        );
    }
    if args.timing {
        eprintln!("elapsed: {:.3}s", started.elapsed().as_secs_f64());
    }

    if regions.is_empty() {
        ExitCode::from(EXIT_EMPTY)
    } else {
        ExitCode::from(EXIT_MATCHED)
    }
}

fn resolve_query_text(args: &QueryArgs) -> io::Result<String> {
    if let Some(e) = &args.expr_opt {
        return Ok(e.clone());
    }
    if let Some(path) = &args.expr_file {
        return fs::read_to_string(path);
    }
    if let Some(e) = &args.expr {
        return Ok(e.clone());
    }
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

fn load_query_index(args: &QueryArgs, engine: &mut Engine) -> io::Result<Option<IndexReader>> {
    let Some(path) = &args.index_file else {
        return Ok(None);
    };
    let bytes = fs::read(path)?;
    let reader = IndexReader::open(bytes)?;
    engine.files = reader.file_list()?;
    engine.stats.files_scanned = engine.files.len() as u32;
    engine.stats.bytes_scanned = engine.files.total_bytes() as u64;
    Ok(Some(reader))
}

fn load_query_inputs(args: &QueryArgs, engine: &mut Engine) -> io::Result<()> {
    let names = if let Some(list_path) = &args.file_list {
        read_file_list(list_path)?
    } else {
        args.files.clone()
    };

    #[cfg(feature = "parallel")]
    let progress = if args.progress && !names.is_empty() {
        let pb = ProgressBar::new(names.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} scanning [{bar:30.cyan/dim}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    if names.is_empty() {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        engine
            .add_file("-", bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        return Ok(());
    }

    for name in &names {
        let bytes = fs::read(name)?;
        engine
            .add_file(name.clone(), bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        #[cfg(feature = "parallel")]
        if let Some(pb) = &progress {
            pb.set_message(name.clone());
            pb.inc(1);
        }
    }
    #[cfg(feature = "parallel")]
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    Ok(())
}

fn resolve_template(args: &QueryArgs) -> io::Result<Template> {
    if let Some(path) = &args.style_file {
        let text = fs::read_to_string(path)?;
        return Ok(Template::parse(text.trim_end_matches('\n')));
    }
    if let Some(spec) = &args.style {
        return Ok(Template::parse(spec));
    }
    if args.long_format {
        return Ok(Template::parse("%f:%i-%j: %r\\n"));
    }
    if args.short_format {
        return Ok(Template::parse("%s,%e\\n"));
    }
    Ok(Template::parse(DEFAULT_TEMPLATE))
}

fn render_results(args: &QueryArgs, engine: &Engine, regions: &[Region]) {
    if args.count_only {
        println!("{}", regions.len());
        return;
    }
    let template = match resolve_template(args) {
        Ok(t) => t,
        Err(e) => {
            print_error("style", e);
            return;
        }
    };

    let mut out = String::new();
    for r in regions {
        let (file_name, file_local_start) = match engine.files.file_at(r.start) {
            Some(idx) => {
                let f = engine.files.get(idx).expect("file_at returned a valid index");
                (f.name.as_str(), r.start - f.start)
            }
            None => ("?", r.start),
        };
        let bytes = engine.slice(*r);
        out.push_str(&template.render(file_name, file_local_start, r.start, r.end, bytes));
    }
    if args.no_trailing_newline {
        while out.ends_with('\n') {
            out.pop();
        }
    }
    print!("{out}");
}

fn run_index(argv: Vec<String>) -> ExitCode {
    let argv = apply_sgrepopt(argv);
    let args = match IndexArgs::try_parse_from(&argv) {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(terms) = &args.dump_terms {
        return dump_index_terms(&args, terms);
    }

    let Some(out_path) = &args.create else {
        eprintln!("sgrep -I: -c <file> is required when not dumping terms");
        return ExitCode::from(EXIT_ERROR);
    };

    let memory_budget = args.memory_mb.map_or(16 << 20, |mb| mb << 20);
    let mut writer = IndexWriter::new(memory_budget);

    if let Some(pct) = args.stop_word_percent {
        writer.report_large_postings(pct);
    }
    if let Some(path) = &args.stop_word_in {
        match fs::read_to_string(path) {
            Ok(text) => {
                for word in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    writer.add_stop_word(word.to_string());
                }
            }
            Err(e) => {
                print_error("stop-word file", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    let scan_mode = scan_mode_from_opt(args.scanner_opt.as_deref());
    let mut scan_config = ScanConfig::new(scan_mode);
    if let Some(chars) = &args.word_chars {
        scan_config.char_class.set_word_chars(chars);
    }

    let names = if let Some(list_path) = &args.file_list {
        match read_file_list(list_path) {
            Ok(n) => n,
            Err(e) => {
                print_error("file list", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        args.files.clone()
    };
    if names.is_empty() {
        eprintln!("sgrep -I: no input files given");
        return ExitCode::from(EXIT_ERROR);
    }

    let mut files = FileList::new();
    let mut encoding_errors: u32 = 0;

    #[cfg(feature = "parallel")]
    {
        let mut inputs = Vec::with_capacity(names.len());
        for name in &names {
            let bytes = match fs::read(name) {
                Ok(b) => b,
                Err(e) => {
                    print_error(name, e);
                    return ExitCode::from(EXIT_ERROR);
                }
            };
            inputs.push((name.clone(), bytes));
        }

        let progress = ProgressBar::new(names.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner:.cyan} indexing [{bar:30.cyan/dim}] {pos}/{len}")
                .unwrap()
                .progress_chars("=>-"),
        );
        let report = |done: usize, total: usize, _bytes_done: u64, _bytes_total: u64| {
            progress.set_position(done as u64);
            let _ = total;
        };
        match sgrep::index::writer::scan_inputs_parallel(&mut writer, &mut files, &inputs, &scan_config, report) {
            Ok(n) => encoding_errors += n,
            Err(e) => {
                print_error("scan", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        progress.finish_and_clear();
    }

    #[cfg(not(feature = "parallel"))]
    for name in &names {
        let bytes = match fs::read(name) {
            Ok(b) => b,
            Err(e) => {
                print_error(name, e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        let start = files.total_bytes();
        if let Err(e) = files.add(name.clone(), bytes.len()) {
            print_error(name, e);
            return ExitCode::from(EXIT_ERROR);
        }
        match scanner::index_file(&mut writer, &bytes, start, &scan_config) {
            Ok(n) => encoding_errors += n,
            Err(e) => {
                print_error(name, e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    }

    if encoding_errors > 0 {
        eprintln!("sgrep -I: {encoding_errors} encoding warning(s)");
    }

    let header_text = format!("built from {} file(s)", files.len());
    let (bytes, candidates) = match writer.finish(&files, &header_text) {
        Ok(r) => r,
        Err(e) => {
            print_error("finish", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = fs::write(out_path, &bytes) {
        print_error(out_path, e);
        return ExitCode::from(EXIT_ERROR);
    }

    if let Some(path) = &args.stop_word_out {
        let text = candidates.join("\n");
        if let Err(e) = fs::write(path, text) {
            print_error(path, e);
            return ExitCode::from(EXIT_ERROR);
        }
    } else if args.stop_word_percent.is_some() {
        for c in &candidates {
            println!("{c}");
        }
    }

    ExitCode::from(EXIT_MATCHED)
}

fn dump_index_terms(args: &IndexArgs, terms: &[String]) -> ExitCode {
    let Some(in_path) = args.files.first() else {
        eprintln!("sgrep -I -q: an index file is required");
        return ExitCode::from(EXIT_ERROR);
    };
    let bytes = match fs::read(in_path) {
        Ok(b) => b,
        Err(e) => {
            print_error(in_path, e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let reader = match IndexReader::open(bytes) {
        Ok(r) => r,
        Err(e) => {
            print_error(in_path, e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let first = &terms[0];
    let last = terms.get(1).map(String::as_str);
    let dumped = reader.term_range(first, last);
    for t in &dumped {
        println!("{t}");
    }
    if dumped.is_empty() {
        ExitCode::from(EXIT_EMPTY)
    } else {
        ExitCode::from(EXIT_MATCHED)
    }
}

//! Startup configuration: `$HOME/.sgreprc`, a system-wide `sgreprc`, and
//! the `SGREPOPT` environment variable (§6 "Config file").
//!
//! Each config file is a sequence of lines, each either a complete
//! expression, a `#line` directive, or blank. Lines are concatenated with
//! interposed newlines and synthetic `#line` directives so parser error
//! messages still point at the real file and line.

use std::fs;
use std::path::Path;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/sgreprc";

/// Reads one config file, wrapping its content in a `#line 1 "path"`
/// directive so downstream parse errors report the original source.
fn read_one(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(format!("#line 1 {:?}\n{text}\n", path.display().to_string()))
}

/// Concatenates `$HOME/.sgreprc` then `/etc/sgreprc` (whichever exist)
/// ahead of `query`, each on its own `#line`-delimited segment.
#[must_use]
pub fn load_startup_config(home: Option<&str>, query: &str, query_file: &str) -> String {
    let mut out = String::new();
    if let Some(home) = home {
        if let Some(text) = read_one(&Path::new(home).join(".sgreprc")) {
            out.push_str(&text);
        }
    }
    if let Some(text) = read_one(Path::new(SYSTEM_CONFIG_PATH)) {
        out.push_str(&text);
    }
    out.push_str(&format!("#line 1 {query_file:?}\n"));
    out.push_str(query);
    out
}

/// Splits `SGREPOPT` (space-separated, shell-quoting not honored — matching
/// the original's simple whitespace split) into argv-style tokens to
/// prepend to the real command line.
#[must_use]
pub fn sgrepopt_tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_files_leave_only_the_query() {
        let out = load_startup_config(Some("/nonexistent-home"), "\"foo\"", "<expr>");
        assert!(out.ends_with("\"foo\""));
        assert!(out.contains("#line 1"));
    }

    #[test]
    fn sgrepopt_splits_on_whitespace() {
        assert_eq!(sgrepopt_tokens("-i  -d"), vec!["-i", "-d"]);
    }
}

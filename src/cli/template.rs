//! Output templating (§6): `%f %s %e %i %j %l %n %r %%`, plus backslash
//! escapes `\n \t \\ \" \r \f \b` within the template text itself.
//!
//! The core only exposes an iterator of `(file_index, start, end, bytes)`
//! per result region; this module is the only place that turns that into
//! printable text, kept deliberately outside the engine per §1.

/// Default template: one `(start,end)` pair per line, matching sgrep's
/// traditional default output.
pub const DEFAULT_TEMPLATE: &str = "(%s,%e)\\n";

pub struct Template {
    spec: String,
}

impl Template {
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        Template { spec: unescape(spec) }
    }

    /// Renders one result region.
    ///
    /// - `%f` file name
    /// - `%s` / `%e` global start / end byte offset (inclusive)
    /// - `%i` / `%j` file-local start / end byte offset
    /// - `%l` region length in bytes
    /// - `%r` the matched bytes themselves (lossily decoded as UTF-8)
    /// - `%n` a newline
    /// - `%%` a literal `%`
    #[must_use]
    pub fn render(&self, file_name: &str, file_local_start: i32, global_start: i32, global_end: i32, bytes: &[u8]) -> String {
        let mut out = String::new();
        let mut chars = self.spec.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('f') => out.push_str(file_name),
                Some('s') => out.push_str(&global_start.to_string()),
                Some('e') => out.push_str(&global_end.to_string()),
                Some('i') => out.push_str(&file_local_start.to_string()),
                Some('j') => out.push_str(&(file_local_start + (global_end - global_start)).to_string()),
                Some('l') => out.push_str(&(global_end - global_start + 1).to_string()),
                Some('n') => out.push('\n'),
                Some('r') => out.push_str(&String::from_utf8_lossy(bytes)),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

fn unescape(spec: &str) -> String {
    let mut out = String::with_capacity(spec.len());
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('b') => out.push('\u{0008}'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_renders_start_end_and_newline() {
        let t = Template::parse(DEFAULT_TEMPLATE);
        assert_eq!(t.render("f", 0, 3, 7, b"abcde"), "(3,7)\n");
    }

    #[test]
    fn percent_percent_is_literal() {
        let t = Template::parse("100%%");
        assert_eq!(t.render("f", 0, 0, 0, b""), "100%");
    }

    #[test]
    fn raw_bytes_are_rendered_lossily() {
        let t = Template::parse("%r");
        assert_eq!(t.render("f", 0, 0, 2, b"abc"), "abc");
    }
}

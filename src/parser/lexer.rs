//! Tokenizer for the query language: names, integers, escaped strings,
//! `#line` directives, and the punctuation-only ordering operators.

use crate::error::SgrepError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Str(Vec<u8>),
    Int(i64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// `..`
    Ordered,
    /// `_.`
    LOrdered,
    /// `._`
    ROrdered,
    /// `__`
    LrOrdered,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub col: u32,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    file: String,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a [u8], file: impl Into<String>) -> Self {
        Lexer { src, pos: 0, line: 1, col: 1, file: file.into() }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn window(&self) -> String {
        let start = self.pos.saturating_sub(5);
        let end = (self.pos + 5).min(self.src.len());
        String::from_utf8_lossy(&self.src[start..end]).to_string()
    }

    fn err(&self, message: impl Into<String>) -> SgrepError {
        SgrepError::Parse {
            file: self.file.clone(),
            line: self.line,
            col: self.col,
            window: self.window(),
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SgrepError> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'#') => {
                    if self.matches_keyword_at("line") {
                        self.consume_line_directive()?;
                    } else {
                        while let Some(c) = self.peek() {
                            if c == b'\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn matches_keyword_at(&self, kw: &str) -> bool {
        let bytes = kw.as_bytes();
        self.src[self.pos + 1..].starts_with(bytes)
    }

    /// `#line N "file"`
    fn consume_line_directive(&mut self) -> Result<(), SgrepError> {
        for _ in 0.."#line".len() {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c == b' ' || c == b'\t') {
            self.bump();
        }
        let mut digits = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.bump().unwrap() as char);
        }
        let n: u32 = digits.parse().map_err(|_| self.err("#line expects a line number"))?;
        while matches!(self.peek(), Some(c) if c == b' ' || c == b'\t') {
            self.bump();
        }
        if self.peek() == Some(b'"') {
            self.bump();
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c == b'"' {
                    self.bump();
                    break;
                }
                name.push(self.bump().unwrap() as char);
            }
            self.file = name;
        }
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.bump();
        }
        self.line = n;
        Ok(())
    }

    fn is_name_start(c: u8) -> bool {
        c.is_ascii_alphabetic() || c == b'_'
    }

    fn is_name_continue(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b'_' || c == b'.'
    }

    fn lex_ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if Self::is_name_continue(c) {
                s.push(self.bump().unwrap() as char);
            } else {
                break;
            }
        }
        s
    }

    fn lex_int(&mut self) -> i64 {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.bump().unwrap() as char);
        }
        s.parse().unwrap_or(0)
    }

    /// Decodes `\n \r \t \f \b \\ \"` and numeric character references
    /// `\#xHH...;` / `\#DDD...;`. Bytes >= 128 in the source or produced by
    /// a character reference pass through as raw bytes in the resulting
    /// vector (the self-delimiting base-64-style printable re-encoding
    /// mentioned in the design only matters for *display*, not for the
    /// in-memory phrase bytes the Aho-Corasick scanner matches against).
    fn lex_string(&mut self) -> Result<Vec<u8>, SgrepError> {
        self.bump(); // opening quote
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'f') => out.push(0x0C),
                    Some(b'b') => out.push(0x08),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'"') => out.push(b'"'),
                    Some(b'#') => {
                        let (hex, mut digits) = if self.peek() == Some(b'x') || self.peek() == Some(b'X') {
                            self.bump();
                            (true, String::new())
                        } else {
                            (false, String::new())
                        };
                        loop {
                            match self.peek() {
                                Some(c) if hex && c.is_ascii_hexdigit() => {
                                    digits.push(self.bump().unwrap() as char);
                                }
                                Some(c) if !hex && c.is_ascii_digit() => {
                                    digits.push(self.bump().unwrap() as char);
                                }
                                _ => break,
                            }
                        }
                        if self.peek() == Some(b';') {
                            self.bump();
                        }
                        let radix = if hex { 16 } else { 10 };
                        let code = u32::from_str_radix(&digits, radix)
                            .map_err(|_| self.err("invalid numeric character reference"))?;
                        if let Some(ch) = char::from_u32(code) {
                            let mut buf = [0u8; 4];
                            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                    }
                    Some(other) => out.push(other),
                    None => return Err(self.err("unterminated escape sequence")),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    pub fn next_token(&mut self) -> Result<Spanned, SgrepError> {
        self.skip_trivia()?;
        let (line, col) = (self.line, self.col);
        let Some(c) = self.peek() else {
            return Ok(Spanned { token: Token::Eof, line, col });
        };
        let token = match c {
            b'(' => {
                self.bump();
                Token::LParen
            }
            b')' => {
                self.bump();
                Token::RParen
            }
            b'[' => {
                self.bump();
                Token::LBracket
            }
            b']' => {
                self.bump();
                Token::RBracket
            }
            b',' => {
                self.bump();
                Token::Comma
            }
            b'"' => Token::Str(self.lex_string()?),
            b'.' => {
                let next = self.peek_at(1);
                match next {
                    Some(b'.') => {
                        self.bump();
                        self.bump();
                        Token::Ordered
                    }
                    Some(b'_') => {
                        self.bump();
                        self.bump();
                        Token::ROrdered
                    }
                    _ => return Err(self.err("unexpected '.'")),
                }
            }
            c if c.is_ascii_digit() => Token::Int(self.lex_int()),
            c if Self::is_name_start(c) => {
                let ident = self.lex_ident();
                match ident.as_str() {
                    "_." => Token::LOrdered,
                    "__" => Token::LrOrdered,
                    _ => Token::Ident(ident),
                }
            }
            other => return Err(self.err(format!("unexpected character '{}'", other as char))),
        };
        Ok(Spanned { token, line, col })
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn error_at(&self, line: u32, col: u32, message: impl Into<String>) -> SgrepError {
        SgrepError::Parse { file: self.file.clone(), line, col, window: self.window(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        let mut lx = Lexer::new(src.as_bytes(), "<test>");
        let mut out = Vec::new();
        loop {
            let t = lx.next_token().unwrap().token;
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn lexes_ordering_punctuation() {
        assert_eq!(toks(".."), vec![Token::Ordered]);
        assert_eq!(toks("._"), vec![Token::ROrdered]);
        assert_eq!(toks("_."), vec![Token::LOrdered]);
        assert_eq!(toks("__"), vec![Token::LrOrdered]);
    }

    #[test]
    fn lexes_escaped_string() {
        let t = toks(r#""a\nb\"c""#);
        assert_eq!(t, vec![Token::Str(b"a\nb\"c".to_vec())]);
    }

    #[test]
    fn lexes_numeric_char_ref() {
        let t = toks(r#""\#x41;""#);
        assert_eq!(t, vec![Token::Str(b"A".to_vec())]);
    }

    #[test]
    fn skips_comments_and_line_directives() {
        let t = toks("# comment\n#line 10 \"foo.sgml\"\nword(\"x\")");
        assert_eq!(
            t,
            vec![
                Token::Ident("word".into()),
                Token::LParen,
                Token::Str(b"x".to_vec()),
                Token::RParen
            ]
        );
    }
}

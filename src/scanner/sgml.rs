//! Single-pass SGML/XML/plain-text scanner (§4.5).
//!
//! Drives `encoding::Decoder` one scalar at a time and recognizes markup
//! constructs with a small set of cursor-driven recursive helpers rather
//! than the original's fully enumerated state table — the same token
//! grammar, expressed the way a hand-written Rust lexer reads. Every
//! recognized token is reported through `emit` as `(LeafKind, Region)`;
//! the element stack is maintained here so `@elements` regions come out
//! already laminar (§8 invariant 9).

use crate::charclass::CharClass;
use crate::encoding::{Decoder, DecodedChar, Encoding};
use crate::leaf::LeafKind;
use crate::region::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Sgml,
    Xml,
    PlainText,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: ScanMode,
    pub ignore_case: bool,
    pub char_class: CharClass,
    pub default_encoding: Encoding,
}

impl ScanConfig {
    #[must_use]
    pub fn new(mode: ScanMode) -> Self {
        let xml_mode = matches!(mode, ScanMode::Xml);
        ScanConfig {
            mode,
            ignore_case: false,
            char_class: CharClass::for_mode(xml_mode),
            default_encoding: if xml_mode { Encoding::Utf8 } else { Encoding::EightBit },
        }
    }
}

struct OpenElement {
    gi: String,
    tag_start: usize,
}

/// Scans one file's bytes, reporting every indexable token. `base_offset`
/// is that file's starting offset in the concatenated corpus, so emitted
/// regions are already in global coordinates.
/// Returns the number of encoding-decode errors the scan counted (§7:
/// non-fatal, accumulated by the caller rather than aborting the scan).
pub fn scan(bytes: &[u8], base_offset: i32, config: &ScanConfig, emit: &mut dyn FnMut(LeafKind, Region)) -> u32 {
    if matches!(config.mode, ScanMode::PlainText) {
        return scan_plain_text(bytes, base_offset, config, emit);
    }

    let (sniffed, bom_len) = Encoding::sniff_bom(bytes, config.default_encoding);
    let encoding = declared_xml_encoding(bytes).unwrap_or(sniffed);
    let mut decoder = Decoder::new(&bytes[bom_len..], encoding);
    let mut chars = Vec::new();
    while let Some(c) = decoder.next_char() {
        chars.push(DecodedChar { ch: c.ch, start: c.start + bom_len, end: c.end + bom_len });
    }
    let errors = decoder.errors;

    let mut s = Scanner { chars: &chars, pos: 0, base_offset, config, stack: Vec::new(), emit };
    s.run();
    errors
}

/// A minimal ASCII-only lookahead for `<?xml ... encoding="..."?>` at the
/// very start of the document, done on raw bytes before any decoder is
/// chosen (the declaration itself is guaranteed ASCII-compatible). Only
/// recognizes 8-bit/UTF-8 encoded declarations; a UTF-16 document is
/// already disambiguated by its BOM.
fn declared_xml_encoding(bytes: &[u8]) -> Option<Encoding> {
    let head = &bytes[..bytes.len().min(200)];
    let text = std::str::from_utf8(head).ok()?;
    if !text.starts_with("<?xml") {
        return None;
    }
    let close = text.find("?>")?;
    let decl = &text[..close];
    let key = "encoding=";
    let idx = decl.find(key)?;
    let rest = &decl[idx + key.len()..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let end = rest[1..].find(quote)?;
    let name = &rest[1..1 + end];
    let (encoding, recognized) = Encoding::from_declared_name(name, Encoding::Utf8);
    if recognized {
        Some(encoding)
    } else {
        None
    }
}

fn scan_plain_text(bytes: &[u8], base_offset: i32, config: &ScanConfig, emit: &mut dyn FnMut(LeafKind, Region)) -> u32 {
    let mut decoder = Decoder::new(bytes, config.default_encoding);
    let mut chars = Vec::new();
    while let Some(c) = decoder.next_char() {
        chars.push(c);
    }
    let mut word_start: Option<usize> = None;
    let mut word = String::new();
    for (i, c) in chars.iter().enumerate() {
        if config.char_class.is_word(c.ch) {
            if word_start.is_none() {
                word_start = Some(c.start);
            }
            word.push(normalize(c.ch, config.ignore_case));
        } else if let Some(ws) = word_start.take() {
            let we = chars[i - 1].end;
            emit(LeafKind::Word(std::mem::take(&mut word)), abs(base_offset, ws, we));
        }
    }
    if let Some(ws) = word_start {
        let we = chars.last().map_or(ws, |c| c.end);
        emit(LeafKind::Word(word), abs(base_offset, ws, we));
    }
    decoder.errors
}

fn normalize(c: char, ignore_case: bool) -> char {
    if ignore_case {
        c.to_ascii_lowercase()
    } else {
        c
    }
}

fn abs(base: i32, start: usize, end: usize) -> Region {
    Region::new(base + start as i32, base + end as i32 - 1)
}

struct Scanner<'a, 'b> {
    chars: &'a [DecodedChar],
    pos: usize,
    base_offset: i32,
    config: &'a ScanConfig,
    stack: Vec<OpenElement>,
    emit: &'b mut dyn FnMut(LeafKind, Region),
}

impl<'a, 'b> Scanner<'a, 'b> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|c| c.ch)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|c| c.ch)
    }

    fn byte_pos(&self) -> usize {
        self.chars.get(self.pos).map_or_else(|| self.chars.last().map_or(0, |c| c.end), |c| c.start)
    }

    fn byte_end(&self) -> usize {
        self.chars.get(self.pos.wrapping_sub(1)).map_or(0, |c| c.end)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn run(&mut self) {
        let mut word_start: Option<usize> = None;
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                if let Some(ws) = word_start.take() {
                    self.emit_word(ws, &mut word);
                }
                self.markup();
            } else if c == '&' {
                if let Some(ch) = self.entity_or_charref() {
                    if self.config.char_class.is_word(ch) {
                        if word_start.is_none() {
                            word_start = Some(self.byte_pos().saturating_sub(1));
                        }
                        word.push(normalize(ch, self.config.ignore_case));
                    } else if let Some(ws) = word_start.take() {
                        self.emit_word(ws, &mut word);
                    }
                }
            } else if self.config.char_class.is_word(c) {
                if word_start.is_none() {
                    word_start = Some(self.byte_pos());
                }
                word.push(normalize(c, self.config.ignore_case));
                self.advance();
            } else {
                if let Some(ws) = word_start.take() {
                    self.emit_word(ws, &mut word);
                }
                self.advance();
            }
        }
        if let Some(ws) = word_start {
            self.emit_word(ws, &mut word);
        }
        self.close_unclosed_elements();
    }

    fn emit_word(&mut self, start: usize, word: &mut String) {
        let end = self.byte_end();
        (self.emit)(LeafKind::Word(std::mem::take(word)), abs(self.base_offset, start, end));
    }

    /// Handles one `&...;` construct. Numeric character references decode
    /// to a scalar that is fed back into word recognition instead of being
    /// reported as its own token, per §4.5.
    fn entity_or_charref(&mut self) -> Option<char> {
        let amp_start = self.byte_pos();
        self.advance(); // '&'
        if self.peek() == Some('#') {
            self.advance();
            let hex = self.peek() == Some('x') || self.peek() == Some('X');
            if hex {
                self.advance();
            }
            let mut digits = String::new();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || (!hex && c.is_ascii_digit())) {
                digits.push(self.advance().unwrap());
            }
            if self.peek() == Some(';') {
                self.advance();
            }
            let cp = u32::from_str_radix(&digits, if hex { 16 } else { 10 }).unwrap_or(0);
            return char::from_u32(cp);
        }
        let mut name = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ':') {
            name.push(self.advance().unwrap());
        }
        if self.peek() == Some(';') {
            self.advance();
        }
        let end = self.byte_end();
        (self.emit)(LeafKind::Entity(name), abs(self.base_offset, amp_start, end));
        None
    }

    fn markup(&mut self) {
        let lt_start = self.byte_pos();
        self.advance(); // '<'
        match self.peek() {
            Some('/') => self.end_tag(lt_start),
            Some('?') => self.processing_instruction(lt_start),
            Some('!') if self.starts_with("!--") => self.comment(lt_start),
            Some('!') if self.starts_with("![CDATA[") => self.cdata(lt_start),
            Some('!') if self.starts_with_keyword("!DOCTYPE") => self.doctype(lt_start),
            Some(c) if self.config.char_class.is_name_start(c) => self.start_tag(lt_start),
            _ => {
                // Bare `<` with no recognizable construct following: treat
                // as ordinary text, matching the original's permissive mode.
            }
        }
    }

    fn starts_with_keyword(&self, kw: &str) -> bool {
        kw.chars().enumerate().all(|(i, c)| self.peek_at(i).is_some_and(|pc| pc.eq_ignore_ascii_case(&c)))
    }

    fn read_name(&mut self) -> String {
        let mut s = String::new();
        if matches!(self.peek(), Some(c) if self.config.char_class.is_name_start(c)) {
            s.push(self.advance().unwrap());
        }
        while matches!(self.peek(), Some(c) if self.config.char_class.is_name_continue(c)) {
            s.push(self.advance().unwrap());
        }
        s
    }

    fn skip_to(&mut self, terminator: &str) {
        while self.peek().is_some() && !self.starts_with(terminator) {
            self.advance();
        }
        self.skip(terminator.chars().count().min(self.chars.len().saturating_sub(self.pos)));
    }

    fn gi_term(&self, gi: &str) -> String {
        if self.config.ignore_case {
            gi.to_ascii_lowercase()
        } else {
            gi.to_string()
        }
    }

    fn start_tag(&mut self, lt_start: usize) {
        let gi_raw = self.read_name();
        let gi = self.gi_term(&gi_raw);
        let mut self_closing = false;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('>') => {
                    self.advance();
                    break;
                }
                Some('/') if self.peek_at(1) == Some('>') => {
                    self.skip(2);
                    self_closing = true;
                    break;
                }
                Some(c) if self.config.char_class.is_name_start(c) => self.attribute(),
                Some(_) => {
                    self.advance();
                }
                None => break,
            }
        }
        let tag_end = self.byte_end();
        (self.emit)(LeafKind::StartTag(gi.clone()), abs(self.base_offset, lt_start, tag_end));

        if self_closing {
            self.emit_element(&gi, lt_start, tag_end);
        } else {
            self.stack.push(OpenElement { gi, tag_start: lt_start });
        }
    }

    fn attribute(&mut self) {
        let name_start = self.byte_pos();
        let name_raw = self.read_name();
        let name = self.gi_term(&name_raw);
        let name_end = self.byte_end();
        (self.emit)(LeafKind::AttrName(name), abs(self.base_offset, name_start, name_end));
        self.skip_ws();
        if self.peek() == Some('=') {
            self.advance();
            self.skip_ws();
            self.attr_value();
        }
    }

    fn attr_value(&mut self) {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.advance();
                let start = self.byte_pos();
                let mut value = String::new();
                while matches!(self.peek(), Some(c) if c != q) {
                    value.push(self.advance().unwrap());
                }
                let end = self.byte_end();
                self.advance(); // closing quote
                (self.emit)(LeafKind::AttrValue(value), abs(self.base_offset, start, end));
            }
            _ => {
                let start = self.byte_pos();
                let mut value = String::new();
                while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != '>') {
                    value.push(self.advance().unwrap());
                }
                if !value.is_empty() {
                    let end = self.byte_end();
                    (self.emit)(LeafKind::AttrValue(value), abs(self.base_offset, start, end));
                }
            }
        }
    }

    fn end_tag(&mut self, lt_start: usize) {
        self.advance(); // '/'
        let gi_raw = self.read_name();
        let gi = self.gi_term(&gi_raw);
        self.skip_to(">");
        let tag_end = self.byte_end();
        (self.emit)(LeafKind::EndTag(gi.clone()), abs(self.base_offset, lt_start, tag_end));

        if let Some(open_idx) = self.stack.iter().rposition(|e| e.gi == gi) {
            // Unclosed intervening start tags (per §4.5, "unclosed start
            // tags found on stack reset generate empty-element regions
            // spanning the stag itself") get closed at their own extent.
            while self.stack.len() > open_idx + 1 {
                let unclosed = self.stack.pop().unwrap();
                self.emit_element(&unclosed.gi, unclosed.tag_start, unclosed.tag_start);
            }
            let opened = self.stack.pop().unwrap();
            self.emit_element(&gi, opened.tag_start, tag_end);
        }
    }

    fn emit_element(&mut self, gi: &str, start: usize, end: usize) {
        let region = abs(self.base_offset, start, end);
        (self.emit)(LeafKind::Element(None), region);
        (self.emit)(LeafKind::Element(Some(gi.to_string())), region);
    }

    fn close_unclosed_elements(&mut self) {
        while let Some(open) = self.stack.pop() {
            self.emit_element(&open.gi, open.tag_start, open.tag_start);
        }
    }

    fn processing_instruction(&mut self, lt_start: usize) {
        self.advance(); // '?'
        let target = self.read_name();
        self.skip_to("?>");
        let end = self.byte_end();
        let region = abs(self.base_offset, lt_start, end);
        if target.eq_ignore_ascii_case("xml") {
            (self.emit)(LeafKind::Prolog, region);
        } else {
            (self.emit)(LeafKind::Pi(target), region);
        }
    }

    fn comment(&mut self, lt_start: usize) {
        self.skip(3); // "!--"
        let content_start = self.byte_pos();
        while self.peek().is_some() && !self.starts_with("-->") {
            self.advance();
        }
        let content_end = self.byte_end();
        self.skip(3.min(self.chars.len().saturating_sub(self.pos)));
        let end = self.byte_end();
        (self.emit)(LeafKind::Comment, abs(self.base_offset, lt_start, end));
        self.emit_comment_words(content_start, content_end);
    }

    fn emit_comment_words(&mut self, content_start: usize, content_end: usize) {
        let start_idx = self.chars.partition_point(|c| c.end <= content_start);
        let end_idx = self.chars.partition_point(|c| c.start < content_end);
        let mut word_start: Option<usize> = None;
        let mut word = String::new();
        let mut last_end = content_start;
        for c in &self.chars[start_idx..end_idx] {
            if self.config.char_class.is_word(c.ch) {
                if word_start.is_none() {
                    word_start = Some(c.start);
                }
                word.push(normalize(c.ch, self.config.ignore_case));
            } else if let Some(ws) = word_start.take() {
                (self.emit)(LeafKind::CommentWord(std::mem::take(&mut word)), abs(self.base_offset, ws, last_end));
            }
            last_end = c.end;
        }
        if let Some(ws) = word_start {
            (self.emit)(LeafKind::CommentWord(word), abs(self.base_offset, ws, last_end));
        }
    }

    fn cdata(&mut self, lt_start: usize) {
        self.skip(8); // "![CDATA["
        self.skip_to("]]>");
        let end = self.byte_end();
        (self.emit)(LeafKind::Cdata, abs(self.base_offset, lt_start, end));
    }

    fn doctype(&mut self, lt_start: usize) {
        self.skip(8); // "!DOCTYPE"
        self.skip_ws();
        let name_start = self.byte_pos();
        let name = self.read_name();
        let name_end = self.byte_end();
        if !name.is_empty() {
            (self.emit)(LeafKind::DoctypeName(name), abs(self.base_offset, name_start, name_end));
        }
        self.skip_ws();
        if self.starts_with_keyword("PUBLIC") {
            self.skip(6);
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::DoctypePublicId(v), abs(self.base_offset, s, e));
            }
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::DoctypeSystemId(v), abs(self.base_offset, s, e));
            }
        } else if self.starts_with_keyword("SYSTEM") {
            self.skip(6);
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::DoctypeSystemId(v), abs(self.base_offset, s, e));
            }
        }
        self.skip_ws();
        if self.peek() == Some('[') {
            self.advance();
            self.internal_subset();
        }
        self.skip_to(">");
        let end = self.byte_end();
        (self.emit)(LeafKind::Prolog, abs(self.base_offset, lt_start, end));
    }

    fn quoted_literal(&mut self) -> Option<(usize, usize, String)> {
        let q = self.peek()?;
        if q != '"' && q != '\'' {
            return None;
        }
        self.advance();
        let start = self.byte_pos();
        let mut v = String::new();
        while matches!(self.peek(), Some(c) if c != q) {
            v.push(self.advance().unwrap());
        }
        let end = self.byte_end();
        self.advance();
        Some((start, end, v))
    }

    fn internal_subset(&mut self) {
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.advance();
                    break;
                }
                None => break,
                Some('<') if self.starts_with_keyword("<!ENTITY") => self.entity_declaration(),
                Some('<') => {
                    self.skip_to(">");
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn entity_declaration(&mut self) {
        let decl_start = self.byte_pos();
        self.skip(8); // "<!ENTITY"
        self.skip_ws();
        if self.peek() == Some('%') {
            self.advance();
            self.skip_ws();
        }
        let name_start = self.byte_pos();
        let name = self.read_name();
        let name_end = self.byte_end();
        if !name.is_empty() {
            (self.emit)(LeafKind::EntityDeclName(name), abs(self.base_offset, name_start, name_end));
        }
        self.skip_ws();
        if self.starts_with_keyword("PUBLIC") {
            self.skip(6);
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::EntityDeclPublicId(v), abs(self.base_offset, s, e));
            }
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::EntityDeclSystemId(v), abs(self.base_offset, s, e));
            }
        } else if self.starts_with_keyword("SYSTEM") {
            self.skip(6);
            self.skip_ws();
            if let Some((s, e, v)) = self.quoted_literal() {
                (self.emit)(LeafKind::EntityDeclSystemId(v), abs(self.base_offset, s, e));
            }
        } else if let Some((s, e, v)) = self.quoted_literal() {
            (self.emit)(LeafKind::EntityDeclLiteral(v), abs(self.base_offset, s, e));
        }
        self.skip_ws();
        if self.starts_with_keyword("NDATA") {
            self.skip(5);
            self.skip_ws();
            let s = self.byte_pos();
            let ndata = self.read_name();
            let e = self.byte_end();
            if !ndata.is_empty() {
                (self.emit)(LeafKind::EntityDeclNdata(ndata), abs(self.base_offset, s, e));
            }
        }
        self.skip_to(">");
        self.advance();
        let _ = decl_start;
    }
}

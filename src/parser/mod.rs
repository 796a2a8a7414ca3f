//! Recursive-descent parser: `reg_expr := basic_expr (oper basic_expr)*`.
//!
//! Operator precedence is intentionally flat (the original's
//! `parse_oper_expr` recurses on itself after consuming one operator and
//! its right-hand `basic_expr`, never climbing back through `reg_expr`),
//! so `A in B or C` parses as `(A in B) or C`, left-associative; explicit
//! parentheses are the only way to nest.

pub mod lexer;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, SgrepError};
use crate::leaf::{LeafKind, PhraseLeaf};
use crate::region::Region;
use crate::region_list::{RegionList, Sorted};
use crate::tree::{NodeRef, Oper, ParseTreeNode, LABEL_CONS};
use lexer::{Lexer, Spanned, Token};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Spanned,
}

impl<'a> Parser<'a> {
    pub fn parse(src: &'a [u8], file: impl Into<String>) -> Result<NodeRef> {
        let mut lexer = Lexer::new(src, file);
        let cur = lexer.next_token()?;
        let mut p = Parser { lexer, cur };
        let root = p.parse_reg_expr()?;
        if !matches!(p.cur.token, Token::Eof) {
            return Err(p.err("trailing input after expression"));
        }
        Ok(root)
    }

    fn err(&self, message: impl Into<String>) -> SgrepError {
        self.lexer.error_at(self.cur.line, self.cur.col, message)
    }

    fn advance(&mut self) -> Result<()> {
        self.cur = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if &self.cur.token != token {
            return Err(self.err(format!("expecting {what}")));
        }
        self.advance()
    }

    fn ident_is(&self, word: &str) -> bool {
        matches!(&self.cur.token, Token::Ident(s) if s == word)
    }

    fn take_string(&mut self) -> Result<String> {
        match self.cur.token.clone() {
            Token::Str(bytes) => {
                self.advance()?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => Err(self.err("expecting a phrase string")),
        }
    }

    fn take_int(&mut self) -> Result<i64> {
        match self.cur.token {
            Token::Int(n) => {
                self.advance()?;
                Ok(n)
            }
            _ => Err(self.err("expecting an integer")),
        }
    }

    // ---- grammar -------------------------------------------------------

    fn parse_reg_expr(&mut self) -> Result<NodeRef> {
        if matches!(self.cur.token, Token::Eof) {
            return Err(self.err("unexpected end of expression"));
        }
        let left = self.parse_basic_expr()?;
        if matches!(self.cur.token, Token::Eof | Token::RParen) {
            return Ok(left);
        }
        self.parse_oper_expr(left)
    }

    fn parse_oper_expr(&mut self, left: NodeRef) -> Result<NodeRef> {
        let node = match &self.cur.token {
            Token::Ordered => self.binary_op(Oper::Ordered, left)?,
            Token::LOrdered => self.binary_op(Oper::LOrdered, left)?,
            Token::ROrdered => self.binary_op(Oper::ROrdered, left)?,
            Token::LrOrdered => self.binary_op(Oper::LrOrdered, left)?,
            Token::Ident(word) => match word.as_str() {
                "in" => self.binary_op(Oper::In, left)?,
                "containing" => self.binary_op(Oper::Containing, left)?,
                "equal" => self.binary_op(Oper::Equal, left)?,
                "or" => self.binary_op(Oper::Or, left)?,
                "parenting" => self.binary_op(Oper::Parenting, left)?,
                "childrening" => self.binary_op(Oper::Childrening, left)?,
                "extracting" => self.binary_op(Oper::Extracting, left)?,
                "quote" => self.binary_op(Oper::Quote, left)?,
                "_quote" => self.binary_op(Oper::LQuote, left)?,
                "quote_" => self.binary_op(Oper::RQuote, left)?,
                "_quote_" => self.binary_op(Oper::LrQuote, left)?,
                "near" => self.binary_int_op(Oper::Near, left)?,
                "near_before" => self.binary_int_op(Oper::NearBefore, left)?,
                "not" => {
                    self.advance()?;
                    let oper = if self.ident_is("containing") {
                        Oper::NotContaining
                    } else if self.ident_is("in") {
                        Oper::NotIn
                    } else if self.ident_is("equal") {
                        Oper::NotEqual
                    } else {
                        return Err(self.err("'not' must be followed by 'in', 'containing' or 'equal'"));
                    };
                    self.advance()?;
                    let right = self.parse_basic_expr()?;
                    ParseTreeNode::binary(oper, left, right)
                }
                _ => return Err(self.err("operator expected")),
            },
            _ => return Err(self.err("operator expected")),
        };
        if matches!(self.cur.token, Token::Eof | Token::RParen) {
            return Ok(node);
        }
        self.parse_oper_expr(node)
    }

    fn binary_op(&mut self, oper: Oper, left: NodeRef) -> Result<NodeRef> {
        self.advance()?;
        let right = self.parse_basic_expr()?;
        Ok(ParseTreeNode::binary(oper, left, right))
    }

    fn binary_int_op(&mut self, oper: Oper, left: NodeRef) -> Result<NodeRef> {
        self.advance()?;
        self.expect(&Token::LParen, "'(' starting integer argument for operator")?;
        let n = self.take_int()?;
        if n < 0 {
            return Err(self.err("expecting integer value >= 0"));
        }
        self.expect(&Token::RParen, "')'")?;
        let right = self.parse_basic_expr()?;
        Ok(ParseTreeNode::binary_with_param(oper, left, right, n))
    }

    fn parse_basic_expr(&mut self) -> Result<NodeRef> {
        match self.cur.token.clone() {
            Token::LBracket => self.parse_cons_list(),
            Token::LParen => {
                self.advance()?;
                let n = self.parse_reg_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(n)
            }
            Token::Str(bytes) => {
                self.advance()?;
                let s = String::from_utf8_lossy(&bytes).into_owned();
                Ok(self.leaf_node(LeafKind::Literal(s)))
            }
            Token::Ident(word) => self.parse_keyword_expr(&word),
            _ => Err(self.err("basic expression expected")),
        }
    }

    fn parse_keyword_expr(&mut self, word: &str) -> Result<NodeRef> {
        match word {
            "chars" => Err(self.err("'chars' is not supported: give an explicit width via another operator")),
            "outer" => self.unary_fn(Oper::Outer),
            "inner" => self.unary_fn(Oper::Inner),
            "concat" => self.unary_fn(Oper::Concat),
            "join" => self.int_fn(Oper::Join, "join"),
            "first" => self.int_fn(Oper::First, "first"),
            "last" => self.int_fn(Oper::Last, "last"),
            "first_bytes" => self.int_fn(Oper::FirstBytes, "first_bytes"),
            "last_bytes" => self.int_fn(Oper::LastBytes, "last_bytes"),
            "start" => {
                self.advance()?;
                Ok(self.leaf_node(LeafKind::Start))
            }
            "end" => {
                self.advance()?;
                Ok(self.leaf_node(LeafKind::End))
            }
            "comments" => {
                self.advance()?;
                Ok(self.leaf_node(LeafKind::Comment))
            }
            "elements" => {
                self.advance()?;
                if matches!(self.cur.token, Token::LParen) {
                    self.advance()?;
                    let gi = self.take_string()?;
                    self.expect(&Token::RParen, "')'")?;
                    Ok(self.leaf_node(LeafKind::Element(Some(gi))))
                } else {
                    Ok(self.leaf_node(LeafKind::Element(None)))
                }
            }
            "element" => {
                self.advance()?;
                self.expect(&Token::LParen, "'('")?;
                let gi = self.take_string()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(self.leaf_node(LeafKind::Element(Some(gi))))
            }
            "prologs" => {
                self.advance()?;
                Ok(self.leaf_node(LeafKind::Prolog))
            }
            "cdata" => {
                self.advance()?;
                Ok(self.leaf_node(LeafKind::Cdata))
            }
            "raw" => self.string_fn(|s| LeafKind::Raw(s)),
            "file" => self.file_fn(),
            "string" => self.string_fn(LeafKind::Literal),
            "regex" => Err(self.err("'regex' phrases are not supported")),
            "pi" => self.string_fn(LeafKind::Pi),
            "attribute" => self.string_fn(LeafKind::AttrName),
            "attvalue" => self.string_fn(LeafKind::AttrValue),
            "stag" => self.string_fn(LeafKind::StartTag),
            "etag" => self.string_fn(LeafKind::EndTag),
            "doctype" => self.string_fn(LeafKind::DoctypeName),
            "doctype_pid" => self.string_fn(LeafKind::DoctypePublicId),
            "doctype_sid" => self.string_fn(LeafKind::DoctypeSystemId),
            "entity_declaration" => self.string_fn(LeafKind::EntityDeclName),
            "entity_literal" => self.string_fn(LeafKind::EntityDeclLiteral),
            "entity_pid" => self.string_fn(LeafKind::EntityDeclPublicId),
            "entity_sid" => self.string_fn(LeafKind::EntityDeclSystemId),
            "entity_ndata" => self.string_fn(LeafKind::EntityDeclNdata),
            "comment_word" => self.string_fn(LeafKind::CommentWord),
            "word" => self.string_fn(LeafKind::Word),
            "entity" => self.string_fn(LeafKind::Entity),
            _ => Err(self.err(format!("unknown identifier '{word}'"))),
        }
    }

    fn unary_fn(&mut self, oper: Oper) -> Result<NodeRef> {
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        let child = self.parse_reg_expr()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(ParseTreeNode::unary(oper, child))
    }

    fn int_fn(&mut self, oper: Oper, name: &str) -> Result<NodeRef> {
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        let n = self.take_int()?;
        if n < 0 {
            return Err(self.err(format!("negative ints not implemented for {name}")));
        }
        self.expect(&Token::Comma, &format!("',' in {name}(integer, expression)"))?;
        let child = self.parse_reg_expr()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(ParseTreeNode::unary_with_param(oper, child, n))
    }

    fn string_fn(&mut self, ctor: impl FnOnce(String) -> LeafKind) -> Result<NodeRef> {
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        let s = self.take_string()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(self.leaf_node(ctor(s)))
    }

    fn file_fn(&mut self) -> Result<NodeRef> {
        self.advance()?;
        self.expect(&Token::LParen, "'('")?;
        let s = self.take_string()?;
        self.expect(&Token::RParen, "')'")?;
        let (name, prefix) = match s.strip_suffix('*') {
            Some(stripped) => (stripped.to_string(), true),
            None => (s, false),
        };
        Ok(self.leaf_node(LeafKind::File { name, prefix }))
    }

    fn leaf_node(&self, kind: LeafKind) -> NodeRef {
        ParseTreeNode::leaf(PhraseLeaf::new(kind))
    }

    /// `[(start,end), ...]`: a literal, already-sorted constant region list.
    fn parse_cons_list(&mut self) -> Result<NodeRef> {
        self.advance()?; // '['
        let mut regions = Vec::new();
        let mut nested = false;
        let mut prev: Option<Region> = None;
        while !matches!(self.cur.token, Token::RBracket) {
            self.expect(&Token::LParen, "invalid constant region list")?;
            let s = self.take_int()?;
            self.expect(&Token::Comma, "invalid constant region list")?;
            let e = self.take_int()?;
            self.expect(&Token::RParen, "invalid constant region list")?;
            if e < s {
                return Err(self.err("region end point must be greater than start point"));
            }
            let (s, e) = (s as i32, e as i32);
            if let Some(p) = prev {
                if s < p.start || (s == p.start && e <= p.end) {
                    return Err(self.err("constant region list must be sorted"));
                }
                if e <= p.end || s == p.start {
                    nested = true;
                }
            }
            let r = Region::new(s, e);
            regions.push(r);
            prev = Some(r);
        }
        self.advance()?; // ']'
        let rl = RegionList::constant(regions, Sorted::StartSorted, nested);
        let node = ParseTreeNode::constant(Oper::Phrase, LABEL_CONS, Rc::new(RefCell::new(rl)));
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> NodeRef {
        Parser::parse(src.as_bytes(), "<test>").unwrap()
    }

    #[test]
    fn parses_simple_phrase() {
        let n = parse("\"foo\"");
        assert_eq!(n.borrow().oper, Oper::Phrase);
    }

    #[test]
    fn parses_flat_left_associative_chain() {
        // (start in "x") or "y"  -- not "start in (x or y)"
        let n = parse("start in \"x\" or \"y\"");
        let root = n.borrow();
        assert_eq!(root.oper, Oper::Or);
        assert_eq!(root.left.as_ref().unwrap().borrow().oper, Oper::In);
    }

    #[test]
    fn rejects_chars() {
        assert!(Parser::parse(b"chars", "<test>").is_err());
    }

    #[test]
    fn parses_near_with_int_param() {
        let n = parse("\"a\" near(5) \"b\"");
        let root = n.borrow();
        assert_eq!(root.oper, Oper::Near);
        assert_eq!(root.int_param, Some(5));
    }

    #[test]
    fn parses_join_int_function() {
        let n = parse("join(2, \"a\")");
        let root = n.borrow();
        assert_eq!(root.oper, Oper::Join);
        assert_eq!(root.int_param, Some(2));
    }

    #[test]
    fn parses_cons_list() {
        let n = parse("[(0,1),(2,3)]");
        assert_eq!(n.borrow().label, LABEL_CONS);
        assert!(n.borrow().cached.is_some());
    }

    #[test]
    fn element_with_gi_argument() {
        let n = parse("element(\"y\")");
        match &n.borrow().leaf {
            Some(leaf) => assert_eq!(leaf.kind, LeafKind::Element(Some("y".to_string()))),
            None => panic!("expected leaf"),
        };
    }
}

//! The "same-length" posting compression (§4.7 item 2): when consecutive
//! postings for a term share a length, only the start delta is stored.
//!
//! The original's description ("a special zero-delta tag switches state
//! when lengths change... an escaped tag handles the duplicate-start edge
//! case") leaves the exact byte-level state machine unspecified; this is
//! the concrete, unambiguous resolution used here (recorded in DESIGN.md):
//!
//! - The first posting for a term is always `varint(start) varint(length)`.
//! - A later posting whose length matches the running length and whose
//!   start delta is nonzero is just `varint(delta)`.
//! - Otherwise (length changed, or delta is the genuine duplicate-start
//!   edge case) a `varint(0)` marker is written, followed by `varint(new
//!   length)`. If the new length equals the running length, that alone
//!   encodes "duplicate start, same length" (no further bytes — the start
//!   is unchanged). If the length changed, a `varint(delta)` for the new
//!   start follows.
//!
//! `0` can never be misread as a real delta, because it only ever appears
//! in "marker" position; every subsequent byte's meaning is fixed by what
//! came immediately before it, not by its value.

use std::io;

use crate::index::varint::{self, Varint};
use crate::region::Region;

/// Streaming half of the same-length compression scheme: holds just enough
/// state (the previous posting's start and length) to append one more
/// posting at a time, for the index writer's per-term byte streams that
/// are built incrementally as the scanner emits hits.
#[derive(Debug, Clone, Copy)]
pub struct PostingEncoder {
    prev_start: i64,
    prev_len: i32,
    first: bool,
}

impl PostingEncoder {
    #[must_use]
    pub fn new() -> Self {
        PostingEncoder { prev_start: 0, prev_len: -1, first: true }
    }

    pub fn push(&mut self, out: &mut Vec<u8>, r: Region) {
        let len = r.len();
        if self.first {
            varint::write_value(out, i64::from(r.start)).unwrap();
            varint::write_value(out, i64::from(len)).unwrap();
            self.first = false;
        } else {
            let delta = i64::from(r.start) - self.prev_start;
            if len == self.prev_len && delta != 0 {
                varint::write_value(out, delta).unwrap();
            } else {
                varint::write_value(out, 0).unwrap();
                varint::write_value(out, i64::from(len)).unwrap();
                if len != self.prev_len {
                    varint::write_value(out, delta).unwrap();
                }
            }
        }
        self.prev_start = i64::from(r.start);
        self.prev_len = len;
    }

    pub fn finish(out: &mut Vec<u8>) {
        varint::write_end_of_postings(out).unwrap();
    }
}

impl Default for PostingEncoder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode_postings(postings: &[Region]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = PostingEncoder::new();
    for r in postings {
        enc.push(&mut out, *r);
    }
    PostingEncoder::finish(&mut out);
    out
}

pub fn decode_postings(bytes: &[u8]) -> io::Result<Vec<Region>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    let mut prev_start: i64 = 0;
    let mut prev_len: i64 = -1;
    let mut first = true;
    loop {
        let (tok, n) = varint::decode(&bytes[pos..])?;
        pos += n;
        match tok {
            Varint::EndOfPostings => break,
            Varint::Value(v) if first => {
                let (len_tok, n2) = varint::decode(&bytes[pos..])?;
                pos += n2;
                let Varint::Value(len) = len_tok else {
                    return Err(bad("expected length after first start"));
                };
                prev_start = v;
                prev_len = len;
                first = false;
                push(&mut out, prev_start, prev_len)?;
            }
            Varint::Value(0) => {
                let (len_tok, n2) = varint::decode(&bytes[pos..])?;
                pos += n2;
                let Varint::Value(new_len) = len_tok else {
                    return Err(bad("expected length after marker"));
                };
                if new_len == prev_len {
                    // Duplicate-start escape: start unchanged.
                    push(&mut out, prev_start, prev_len)?;
                } else {
                    let (delta_tok, n3) = varint::decode(&bytes[pos..])?;
                    pos += n3;
                    let Varint::Value(delta) = delta_tok else {
                        return Err(bad("expected delta after length change"));
                    };
                    prev_start += delta;
                    prev_len = new_len;
                    push(&mut out, prev_start, prev_len)?;
                }
            }
            Varint::Value(delta) => {
                prev_start += delta;
                push(&mut out, prev_start, prev_len)?;
            }
        }
    }
    Ok(out)
}

fn push(out: &mut Vec<Region>, start: i64, len: i64) -> io::Result<()> {
    let start = i32::try_from(start).map_err(|_| bad("start out of range"))?;
    let len = i32::try_from(len).map_err(|_| bad("length out of range"))?;
    if len < 1 {
        return Err(bad("non-positive posting length"));
    }
    out.push(Region::new(start, start + len - 1));
    Ok(())
}

fn bad(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_same_length_run() {
        let postings = vec![Region::new(0, 3), Region::new(10, 13), Region::new(20, 23)];
        let bytes = encode_postings(&postings);
        assert_eq!(decode_postings(&bytes).unwrap(), postings);
    }

    #[test]
    fn roundtrips_varying_lengths() {
        let postings = vec![Region::new(0, 1), Region::new(5, 5), Region::new(10, 14)];
        let bytes = encode_postings(&postings);
        assert_eq!(decode_postings(&bytes).unwrap(), postings);
    }

    #[test]
    fn roundtrips_single_posting() {
        let postings = vec![Region::new(7, 7)];
        let bytes = encode_postings(&postings);
        assert_eq!(decode_postings(&bytes).unwrap(), postings);
    }
}

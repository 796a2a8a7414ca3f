//! The region algebra: every operator from §4.4, evaluated over sorted
//! materialized views. Rust's ownership model frees intermediate
//! `RegionList`s automatically, so unlike the original's manual
//! reference-counted free, there's no explicit release step here; the
//! `refcount` field the optimizer computed survives only for `-T`
//! statistics reporting, not to drive memory management.

use std::cell::RefCell;
use std::rc::Rc;

use crate::index::reader::IndexReader;
use crate::leaf::LeafKind;
use crate::region::{FileList, Region};
use crate::region_list::{RegionList, Sorted};
use crate::tree::{NodeRef, Oper};

pub struct Evaluator<'a> {
    pub files: &'a FileList,
    pub index: Option<&'a IndexReader>,
}

/// The implicit whole-result `concat()` query mode applies unless `-d`
/// suppresses it (§6): merges overlapping/adjacent regions in the final
/// answer before it's handed to the output formatter.
#[must_use]
pub fn apply_default_concat(rl: &RegionList) -> RegionList {
    RegionList::from_sorted_vec(concat(&rl.as_start_sorted()), Sorted::StartSorted, false)
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(files: &'a FileList, index: Option<&'a IndexReader>) -> Self {
        Evaluator { files, index }
    }

    pub fn eval(&self, node: &NodeRef) -> Rc<RefCell<RegionList>> {
        let n = node.borrow();
        if let Some(cached) = &n.cached {
            return cached.clone();
        }
        if let Some(leaf) = &n.leaf {
            return self.resolve_leaf(&leaf.kind, &leaf.regions);
        }
        let oper = n.oper;
        let int_param = n.int_param;
        let left = n.left.clone();
        let right = n.right.clone();
        drop(n);

        let left_rl = left.as_ref().map(|l| self.eval(l));
        let right_rl = right.as_ref().map(|r| self.eval(r));

        let result = match (oper, left_rl, right_rl) {
            (Oper::Or, Some(a), Some(b)) => or(&a.borrow(), &b.borrow()),
            // ".." : [A.start, B.end] (the full span)
            (Oper::Ordered, Some(a), Some(b)) => ordered(&a.borrow(), &b.borrow(), End::B, Start::A),
            // "_." : [A.end+1, B.end]
            (Oper::LOrdered, Some(a), Some(b)) => ordered(&a.borrow(), &b.borrow(), End::A, Start::A),
            // "._" : [A.start, B.start-1]
            (Oper::ROrdered, Some(a), Some(b)) => ordered(&a.borrow(), &b.borrow(), End::B, Start::B),
            // "__" : [A.end+1, B.start-1] (the gap)
            (Oper::LrOrdered, Some(a), Some(b)) => ordered(&a.borrow(), &b.borrow(), End::A, Start::B),
            (Oper::Quote, Some(a), Some(b)) => quote(&a.borrow(), &b.borrow(), End::B, Start::A),
            (Oper::LQuote, Some(a), Some(b)) => quote(&a.borrow(), &b.borrow(), End::A, Start::A),
            (Oper::RQuote, Some(a), Some(b)) => quote(&a.borrow(), &b.borrow(), End::B, Start::B),
            (Oper::LrQuote, Some(a), Some(b)) => quote(&a.borrow(), &b.borrow(), End::A, Start::B),
            (Oper::In, Some(a), Some(b)) => in_op(&a.borrow(), &b.borrow(), false),
            (Oper::NotIn, Some(a), Some(b)) => in_op(&a.borrow(), &b.borrow(), true),
            (Oper::Containing, Some(a), Some(b)) => containing_op(&a.borrow(), &b.borrow(), false),
            (Oper::NotContaining, Some(a), Some(b)) => containing_op(&a.borrow(), &b.borrow(), true),
            (Oper::Equal, Some(a), Some(b)) => equal_op(&a.borrow(), &b.borrow(), false),
            (Oper::NotEqual, Some(a), Some(b)) => equal_op(&a.borrow(), &b.borrow(), true),
            (Oper::Outer, Some(a), None) => outer(&a.borrow().as_start_sorted()),
            (Oper::Inner, Some(a), None) => inner(&a.borrow().as_start_sorted()),
            (Oper::Concat, Some(a), None) => concat(&a.borrow().as_start_sorted()),
            (Oper::Extracting, Some(a), Some(b)) => extracting(&a.borrow().as_start_sorted(), &b.borrow().as_start_sorted()),
            (Oper::Join, Some(a), None) => join(&a.borrow().as_start_sorted(), int_param.unwrap_or(0)),
            (Oper::First, Some(a), None) => first(&a.borrow().as_start_sorted(), int_param.unwrap_or(0)),
            (Oper::Last, Some(a), None) => last(&a.borrow().as_start_sorted(), int_param.unwrap_or(0)),
            (Oper::FirstBytes, Some(a), None) => first_bytes(&a.borrow().as_start_sorted(), int_param.unwrap_or(0)),
            (Oper::LastBytes, Some(a), None) => last_bytes(&a.borrow().as_start_sorted(), int_param.unwrap_or(0)),
            (Oper::Parenting, Some(a), Some(b)) => parenting(&a.borrow().as_start_sorted(), &b.borrow().as_start_sorted()),
            (Oper::Childrening, Some(a), Some(b)) => childrening(&a.borrow().as_start_sorted(), &b.borrow().as_start_sorted()),
            (Oper::Near, Some(a), Some(b)) => near(&a.borrow(), &b.borrow(), int_param.unwrap_or(0), false),
            (Oper::NearBefore, Some(a), Some(b)) => near(&a.borrow(), &b.borrow(), int_param.unwrap_or(0), true),
            _ => Vec::new(),
        };
        Rc::new(RefCell::new(RegionList::from_sorted_vec(result, Sorted::NotSorted, true)))
    }

    fn resolve_leaf(&self, kind: &LeafKind, regions: &Rc<RefCell<RegionList>>) -> Rc<RefCell<RegionList>> {
        if matches!(kind, LeafKind::Start) {
            let total = self.files.total_bytes();
            let v = if total > 0 { vec![Region::new(0, 0)] } else { Vec::new() };
            return Rc::new(RefCell::new(RegionList::constant(v, Sorted::StartSorted, false)));
        }
        if matches!(kind, LeafKind::End) {
            let total = self.files.total_bytes();
            let v = if total > 0 { vec![Region::new(total - 1, total - 1)] } else { Vec::new() };
            return Rc::new(RefCell::new(RegionList::constant(v, Sorted::StartSorted, false)));
        }
        if !regions.borrow().is_empty() || regions.borrow().is_complete() {
            return regions.clone();
        }
        if let Some(index) = self.index {
            let prefix = kind.index_prefix();
            if let Some(found) = index.lookup(&prefix) {
                return Rc::new(RefCell::new(found));
            }
        }
        regions.clone()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum End {
    A,
    B,
}
#[derive(Clone, Copy, PartialEq, Eq)]
enum Start {
    A,
    B,
}

/// `A ∪ B`: merge-sweep on start-sorted views, duplicates dropped.
fn or(a: &RegionList, b: &RegionList) -> Vec<Region> {
    let (av, bv) = (a.as_start_sorted(), b.as_start_sorted());
    let mut out = Vec::with_capacity(av.len() + bv.len());
    out.extend_from_slice(&av);
    out.extend_from_slice(&bv);
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

/// Ordered/quote families: for each pair `a ∈ A, b ∈ B` with `a.end <
/// b.start`, emit the connecting span. `end_side`/`start_side` pick which
/// operand contributes each output endpoint (`..` uses `A.end+1..B.start-1`,
/// `_.`/`._`/`__` keep one or both original endpoints per §4.4).
fn ordered(a: &RegionList, b: &RegionList, end_side: End, start_side: Start) -> Vec<Region> {
    let av = a.as_end_sorted();
    let bv = b.as_start_sorted();
    let mut out = Vec::new();
    // Quadratic pair-up kept simple; correctness over the spec's
    // constant-factor sweep optimization.
    for x in &av {
        for y in &bv {
            if x.end < y.start {
                let s = match end_side {
                    End::A => x.end + 1,
                    End::B => x.start,
                };
                let e = match start_side {
                    Start::B => y.start - 1,
                    Start::A => y.end,
                };
                if s <= e {
                    out.push(Region::new(s, e));
                }
            }
        }
    }
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

/// Quote family: non-nesting variant where each start-quote matches the
/// *earliest* following end-quote, consuming both.
fn quote(a: &RegionList, b: &RegionList, end_side: End, start_side: Start) -> Vec<Region> {
    let av = a.as_start_sorted();
    let bv = b.as_start_sorted();
    let mut out = Vec::new();
    let mut bi = 0usize;
    for x in &av {
        while bi < bv.len() && bv[bi].start <= x.end {
            bi += 1;
        }
        if bi < bv.len() {
            let y = bv[bi];
            let s = match end_side {
                End::A => x.end + 1,
                End::B => x.start,
            };
            let e = match start_side {
                Start::B => y.start - 1,
                Start::A => y.end,
            };
            if s <= e {
                out.push(Region::new(s, e));
            }
            bi += 1;
        }
    }
    out.sort_by_key(|r| (r.start, r.end));
    out
}

/// `A in B`: proper containment, right side reduced to `outer(B)` first.
fn in_op(a: &RegionList, b: &RegionList, negate: bool) -> Vec<Region> {
    let outer_b = outer(&b.as_start_sorted());
    a.as_start_sorted()
        .into_iter()
        .filter(|r| {
            let contained = outer_b.iter().any(|o| r.properly_in(o));
            contained != negate
        })
        .collect()
}

/// `A containing B`: dual of `in`, right side reduced to `inner(B)`.
fn containing_op(a: &RegionList, b: &RegionList, negate: bool) -> Vec<Region> {
    let inner_b = inner(&b.as_start_sorted());
    a.as_start_sorted()
        .into_iter()
        .filter(|r| {
            let contains = inner_b.iter().any(|i| i.properly_in(r));
            contains != negate
        })
        .collect()
}

fn equal_op(a: &RegionList, b: &RegionList, negate: bool) -> Vec<Region> {
    let bv = b.as_start_sorted();
    a.as_start_sorted()
        .into_iter()
        .filter(|r| bv.contains(r) != negate)
        .collect()
}

/// Longest region among those sharing a start; a region strictly contained
/// in a later one is dropped.
fn outer(sorted_by_start: &[Region]) -> Vec<Region> {
    let mut out: Vec<Region> = Vec::new();
    for &r in sorted_by_start {
        if let Some(last) = out.last_mut() {
            if last.start == r.start {
                if r.end > last.end {
                    *last = r;
                }
                continue;
            }
            if r.end <= last.end {
                continue; // r is nested inside the running outer region
            }
        }
        out.push(r);
    }
    out
}

/// Innermost-only: a stack-based sweep popping any candidate a later
/// region is nested inside.
fn inner(sorted_by_start: &[Region]) -> Vec<Region> {
    let mut stack: Vec<Region> = Vec::new();
    let mut out = Vec::new();
    for &r in sorted_by_start {
        while let Some(&top) = stack.last() {
            if r.start >= top.start && r.end <= top.end && r != top {
                stack.pop();
            } else {
                break;
            }
        }
        stack.push(r);
    }
    // Regions never popped (no narrower region arrived after them) are
    // innermost; regions popped never resurface, so the stack IS the
    // innermost survivors, but they need re-sorting for safety.
    out.extend(stack);
    out.sort_by_key(|r| (r.start, r.end));
    out
}

/// Merge all overlapping or byte-adjacent regions.
fn concat(sorted_by_start: &[Region]) -> Vec<Region> {
    let mut out: Vec<Region> = Vec::new();
    for &r in sorted_by_start {
        if let Some(last) = out.last_mut() {
            if r.start <= last.end + 1 {
                if r.end > last.end {
                    last.end = r.end;
                }
                continue;
            }
        }
        out.push(r);
    }
    out
}

/// For each `a`, emit the maximal subregions not covered by any (first
/// concatenated) cutter region.
fn extracting(a_sorted: &[Region], cutter_sorted: &[Region]) -> Vec<Region> {
    let cutters = concat(cutter_sorted);
    let mut out = Vec::new();
    for &r in a_sorted {
        let mut cursor = r.start;
        for c in &cutters {
            if c.end < r.start || c.start > r.end {
                continue;
            }
            if c.start > cursor {
                out.push(Region::new(cursor, c.start - 1));
            }
            cursor = cursor.max(c.end + 1);
        }
        if cursor <= r.end {
            out.push(Region::new(cursor, r.end));
        }
    }
    out
}

/// `k`-gram over `A` in start order: `(A_i.start, A_{i+k-1}.end)`.
fn join(sorted: &[Region], k: i64) -> Vec<Region> {
    let k = k.max(0) as usize;
    if k == 0 || sorted.len() < k {
        return Vec::new();
    }
    let mut out: Vec<Region> = sorted.windows(k).map(|w| Region::new(w[0].start, w[k - 1].end)).collect();
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

fn first(sorted: &[Region], k: i64) -> Vec<Region> {
    let k = k.max(0) as usize;
    sorted.iter().take(k).copied().collect()
}

fn last(sorted: &[Region], k: i64) -> Vec<Region> {
    let k = k.max(0) as usize;
    let n = sorted.len();
    sorted[n.saturating_sub(k)..].to_vec()
}

/// Byte-truncated prefixes; only regions with length >= k qualify, and
/// coincident truncations are deduplicated (§9 open question: preserve the
/// conservative `NotSorted` contract — the caller wraps our output that way).
fn first_bytes(sorted: &[Region], k: i64) -> Vec<Region> {
    let k = i32::try_from(k.max(0)).unwrap_or(i32::MAX);
    let mut out: Vec<Region> = sorted.iter().filter(|r| r.len() >= k).map(|r| Region::new(r.start, r.start + k - 1)).collect();
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

fn last_bytes(sorted: &[Region], k: i64) -> Vec<Region> {
    let k = i32::try_from(k.max(0)).unwrap_or(i32::MAX);
    let mut out: Vec<Region> = sorted.iter().filter(|r| r.len() >= k).map(|r| Region::new(r.end - k + 1, r.end)).collect();
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

/// For each child `c ∈ R`, the innermost `l ∈ L` properly containing it.
fn parenting(l_sorted: &[Region], r_sorted: &[Region]) -> Vec<Region> {
    let mut out = Vec::new();
    for &c in r_sorted {
        let mut best: Option<Region> = None;
        for &l in l_sorted {
            if c.properly_in(&l) {
                best = Some(match best {
                    Some(b) if b.len() <= l.len() => b,
                    _ => l,
                });
            }
        }
        if let Some(p) = best {
            out.push(p);
        }
    }
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

/// For each parent `p ∈ P`, the rightmost-start, longest child in `C`
/// contained in `p`, skipping regions already nested inside a selected
/// child.
fn childrening(c_sorted: &[Region], p_sorted: &[Region]) -> Vec<Region> {
    let mut out = Vec::new();
    for &p in p_sorted {
        let mut selected: Vec<Region> = Vec::new();
        for &c in c_sorted {
            if !(p.start <= c.start && c.end <= p.end) {
                continue;
            }
            if selected.iter().any(|s| c.properly_in(s) || c == *s) {
                continue;
            }
            selected.retain(|s| !s.properly_in(&c));
            selected.push(c);
        }
        out.extend(selected);
    }
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

/// Proximity within `k` bytes, applied after `outer()` on both sides.
/// `before == true` requires `L` to strictly precede `R`.
fn near(l: &RegionList, r: &RegionList, k: i64, before: bool) -> Vec<Region> {
    let lv = outer(&l.as_start_sorted());
    let rv = outer(&r.as_start_sorted());
    let k = k.max(0);
    let mut out = Vec::new();
    for &a in &lv {
        for &b in &rv {
            let gap = if a.end < b.start {
                b.start - a.end - 1
            } else if b.end < a.start {
                if before {
                    continue;
                }
                a.start - b.end - 1
            } else {
                0
            };
            if i64::from(gap) <= k {
                let s = a.start.min(b.start);
                let e = a.end.max(b.end);
                out.push(Region::new(s, e));
            }
        }
    }
    out.sort_by_key(|r| (r.start, r.end));
    out.dedup_by_key(|r| (r.start, r.end));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rl(v: Vec<(i32, i32)>) -> RegionList {
        let regions: Vec<Region> = v.into_iter().map(|(s, e)| Region::new(s, e)).collect();
        RegionList::from_sorted_vec(regions, Sorted::StartSorted, false)
    }

    #[test]
    fn or_dedups_and_merges() {
        let a = rl(vec![(0, 2), (4, 6)]);
        let b = rl(vec![(4, 6), (8, 10)]);
        assert_eq!(or(&a, &b), vec![Region::new(0, 2), Region::new(4, 6), Region::new(8, 10)]);
    }

    #[test]
    fn ordered_full_span_between_non_overlapping_pairs() {
        // stag("a")=(0,2) etag("a")=(8,12); ".." is the full span covering both.
        let a = rl(vec![(0, 2)]);
        let b = rl(vec![(8, 12)]);
        assert_eq!(ordered(&a, &b, End::B, Start::A), vec![Region::new(0, 12)]);
    }

    #[test]
    fn ordered_gap_between_non_overlapping_pairs() {
        // "__" is just the gap between the two regions.
        let a = rl(vec![(0, 2)]);
        let b = rl(vec![(8, 12)]);
        assert_eq!(ordered(&a, &b, End::A, Start::B), vec![Region::new(3, 7)]);
    }

    #[test]
    fn in_is_proper_containment_on_outer_right() {
        let a = rl(vec![(2, 3)]);
        let b = rl(vec![(0, 10)]);
        assert_eq!(in_op(&a, &b, false), vec![Region::new(2, 3)]);
        assert_eq!(in_op(&a, &b, true), Vec::<Region>::new());
    }

    #[test]
    fn outer_drops_nested_and_keeps_longest_shared_start() {
        let v = vec![Region::new(0, 10), Region::new(1, 2), Region::new(0, 20)];
        assert_eq!(outer(&v), vec![Region::new(0, 20)]);
    }

    #[test]
    fn inner_keeps_only_innermost() {
        let v = vec![Region::new(0, 10), Region::new(2, 5), Region::new(2, 3)];
        assert_eq!(inner(&v), vec![Region::new(2, 3)]);
    }

    #[test]
    fn concat_merges_adjacent_and_overlapping() {
        let v = vec![Region::new(0, 2), Region::new(3, 5), Region::new(8, 10)];
        assert_eq!(concat(&v), vec![Region::new(0, 5), Region::new(8, 10)]);
    }

    #[test]
    fn join_produces_kgrams() {
        let v = vec![Region::new(0, 0), Region::new(1, 1), Region::new(2, 2)];
        assert_eq!(join(&v, 2), vec![Region::new(0, 1), Region::new(1, 2)]);
    }

    #[test]
    fn extracting_removes_cutter_coverage() {
        let a = vec![Region::new(0, 2)];
        let cutter = vec![Region::new(1, 1)];
        assert_eq!(extracting(&a, &cutter), vec![Region::new(0, 0), Region::new(2, 2)]);
    }

    #[test]
    fn extracting_fully_covered_region_yields_empty() {
        let a = vec![Region::new(0, 2)];
        let cutter = vec![Region::new(0, 0)];
        assert_eq!(extracting(&a, &cutter), Vec::<Region>::new());
    }
}

//! Common-subexpression elimination, phrase deduplication, commutativity
//! canonicalization, and reference counting over a freshly parsed tree.
//!
//! The original walks the already-built tree in several separate passes
//! (label assignment, phrase sort+merge, per-level bottom-up CSE,
//! refcounting). Since this tree has no sharing before optimization, a
//! single bottom-up recursive rebuild accomplishes all four: children are
//! canonicalized first, then the parent's structural key (possibly after a
//! commutative swap) is looked up in a memo table so identical subtrees
//! collapse onto one shared `Rc`, picking up a fresh label and refcount as
//! they're first created or reused.

use std::collections::HashMap;
use std::rc::Rc;

use crate::leaf::LeafKind;
use crate::region_list::RegionList;
use crate::tree::{NodeRef, Oper, ParseTreeNode, LABEL_CHARS, LABEL_CONS, LABEL_FIRST};

type StructKey = (Oper, i32, i32, Option<i64>);

struct Optimizer {
    next_label: i32,
    by_struct: HashMap<StructKey, NodeRef>,
    by_phrase: HashMap<String, NodeRef>,
}

impl Optimizer {
    fn fresh_label(&mut self) -> i32 {
        let l = self.next_label;
        self.next_label += 1;
        l
    }

    fn adopt(&self, child: &NodeRef) {
        let mut c = child.borrow_mut();
        if c.refcount != -1 {
            c.refcount += 1;
        }
    }

    fn build(&mut self, node: NodeRef) -> NodeRef {
        let (oper, left, right, int_param, leaf, label) = {
            let n = node.borrow();
            (n.oper, n.left.clone(), n.right.clone(), n.int_param, n.leaf.clone(), n.label)
        };

        if label == LABEL_CONS || label == LABEL_CHARS {
            // Constant literals are never merged, per §4.3 item 4.
            return node;
        }

        if let Some(leaf) = leaf {
            let key = leaf.kind.index_prefix();
            if let Some(canon) = self.by_phrase.get(&key) {
                return canon.clone();
            }
            let label = self.fresh_label();
            let canon = ParseTreeNode::leaf(leaf);
            canon.borrow_mut().label = label;
            if matches!(canon.borrow().leaf.as_ref().unwrap().kind, LeafKind::Start | LeafKind::End) {
                canon.borrow_mut().refcount = -1;
            }
            self.by_phrase.insert(key, canon.clone());
            return canon;
        }

        let left = left.map(|l| self.build(l));
        let right = right.map(|r| self.build(r));
        if let Some(l) = &left {
            self.adopt(l);
        }
        if let Some(r) = &right {
            self.adopt(r);
        }

        let (mut left, mut right) = (left, right);
        if oper.is_commutative() {
            if let (Some(l), Some(r)) = (&left, &right) {
                if l.borrow().label < r.borrow().label {
                    std::mem::swap(&mut left, &mut right);
                }
            }
        }

        let left_label = left.as_ref().map_or(-1, |n| n.borrow().label);
        let right_label = right.as_ref().map_or(-1, |n| n.borrow().label);
        let key = (oper, left_label, right_label, int_param);
        if let Some(canon) = self.by_struct.get(&key) {
            // Structurally identical: release the adoption we just counted
            // on behalf of the discarded duplicate and share the canonical
            // node's refcount bookkeeping instead.
            if let Some(l) = &left {
                self.release(l);
            }
            if let Some(r) = &right {
                self.release(r);
            }
            return canon.clone();
        }

        let rebuilt = match (left, right) {
            (Some(l), Some(r)) => ParseTreeNode::binary(oper, l, r),
            (Some(l), None) => ParseTreeNode::unary(oper, l),
            _ => unreachable!("optimizer only rebuilds operator nodes with at least a left child"),
        };
        rebuilt.borrow_mut().int_param = int_param;
        rebuilt.borrow_mut().label = self.fresh_label();
        self.by_struct.insert(key, rebuilt.clone());
        rebuilt
    }

    fn release(&self, child: &NodeRef) {
        let mut c = child.borrow_mut();
        if c.refcount > 0 {
            c.refcount -= 1;
        }
    }
}

/// Runs the optimizer over a freshly parsed tree, returning the
/// (possibly shared-DAG) root. Caller owns the returned root directly;
/// its `refcount` reflects only in-tree parents, not this ownership.
#[must_use]
pub fn optimize(root: NodeRef) -> NodeRef {
    let mut opt = Optimizer { next_label: LABEL_FIRST, by_struct: HashMap::new(), by_phrase: HashMap::new() };
    opt.build(root)
}

/// Synthesizes the two constant leaves every engine instance needs before
/// evaluation: `#start`/`#end` resolve to a single boundary region, and
/// (per the left-as-unimplemented `chars` open question) there is no
/// implicit `chars` constant to pre-seed.
#[must_use]
pub fn synthesize_boundary_regions(total_bytes: i32) -> (Rc<std::cell::RefCell<RegionList>>, Rc<std::cell::RefCell<RegionList>>) {
    use crate::region::Region;
    use crate::region_list::Sorted;
    let start = if total_bytes > 0 {
        RegionList::constant(vec![Region::new(0, 0)], Sorted::StartSorted, false)
    } else {
        RegionList::constant(vec![], Sorted::StartSorted, false)
    };
    let end = if total_bytes > 0 {
        RegionList::constant(vec![Region::new(total_bytes - 1, total_bytes - 1)], Sorted::StartSorted, false)
    } else {
        RegionList::constant(vec![], Sorted::StartSorted, false)
    };
    (Rc::new(std::cell::RefCell::new(start)), Rc::new(std::cell::RefCell::new(end)))
}

//! Parse tree: operators, nodes, and the shared-pointer shape the optimizer
//! turns it into (a DAG once common subtrees are merged).

use std::cell::RefCell;
use std::rc::Rc;

use crate::leaf::PhraseLeaf;
use crate::region_list::RegionList;

pub const LABEL_NOTKNOWN: i32 = -1;
pub const LABEL_CONS: i32 = 0;
pub const LABEL_CHARS: i32 = 1;
pub const LABEL_PHRASE: i32 = 2;
pub const LABEL_FIRST: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Oper {
    In,
    NotIn,
    Containing,
    NotContaining,
    Equal,
    NotEqual,
    Ordered,
    LOrdered,
    ROrdered,
    LrOrdered,
    Quote,
    LQuote,
    RQuote,
    LrQuote,
    Extracting,
    Or,
    Parenting,
    Childrening,
    Near,
    NearBefore,
    Outer,
    Inner,
    Concat,
    Join,
    First,
    Last,
    FirstBytes,
    LastBytes,
    Phrase,
}

impl Oper {
    /// `or`, `equal`, and `near` are commutative; the optimizer canonicalizes
    /// their children so structurally identical subtrees compare equal
    /// regardless of the order the query text wrote them in.
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(self, Oper::Or | Oper::Equal | Oper::Near)
    }
}

pub type NodeRef = Rc<RefCell<ParseTreeNode>>;

#[derive(Debug)]
pub struct ParseTreeNode {
    pub oper: Oper,
    pub left: Option<NodeRef>,
    pub right: Option<NodeRef>,
    pub int_param: Option<i64>,
    pub leaf: Option<PhraseLeaf>,
    pub label: i32,
    pub refcount: i32,
    pub cached: Option<Rc<RefCell<RegionList>>>,
}

impl ParseTreeNode {
    #[must_use]
    pub fn leaf(leaf: PhraseLeaf) -> NodeRef {
        Rc::new(RefCell::new(ParseTreeNode {
            oper: Oper::Phrase,
            left: None,
            right: None,
            int_param: None,
            leaf: Some(leaf),
            label: LABEL_NOTKNOWN,
            refcount: 0,
            cached: None,
        }))
    }

    #[must_use]
    pub fn binary(oper: Oper, left: NodeRef, right: NodeRef) -> NodeRef {
        Rc::new(RefCell::new(ParseTreeNode {
            oper,
            left: Some(left),
            right: Some(right),
            int_param: None,
            leaf: None,
            label: LABEL_NOTKNOWN,
            refcount: 0,
            cached: None,
        }))
    }

    #[must_use]
    pub fn unary(oper: Oper, child: NodeRef) -> NodeRef {
        Rc::new(RefCell::new(ParseTreeNode {
            oper,
            left: Some(child),
            right: None,
            int_param: None,
            leaf: None,
            label: LABEL_NOTKNOWN,
            refcount: 0,
            cached: None,
        }))
    }

    #[must_use]
    pub fn unary_with_param(oper: Oper, child: NodeRef, param: i64) -> NodeRef {
        let n = ParseTreeNode::unary(oper, child);
        n.borrow_mut().int_param = Some(param);
        n
    }

    #[must_use]
    pub fn binary_with_param(oper: Oper, left: NodeRef, right: NodeRef, param: i64) -> NodeRef {
        let n = ParseTreeNode::binary(oper, left, right);
        n.borrow_mut().int_param = Some(param);
        n
    }

    /// A leafless node whose result is already known: `refcount = -1`'s
    /// tree-shaped cousin for literal constant region lists (`[(s,e),...]`),
    /// never resolved through a scanner or index lookup.
    #[must_use]
    pub fn constant(oper: Oper, label: i32, regions: Rc<RefCell<RegionList>>) -> NodeRef {
        Rc::new(RefCell::new(ParseTreeNode {
            oper,
            left: None,
            right: None,
            int_param: None,
            leaf: None,
            label,
            refcount: 0,
            cached: Some(regions),
        }))
    }
}

//! The tagged syntax tree handed from the parser to the semantic checker.

use dfilter_types::{DRange, Value};
use regex::bytes::Regex;

use crate::functions::FunctionDef;
use crate::registry::FieldId;

/// Operator of a [`NodeKind::Test`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOp {
    Exists,
    Not,
    And,
    Or,
    AnyEq,
    AllNe,
    AnyNe,
    Gt,
    Ge,
    Lt,
    Le,
    BitwiseAnd,
    Contains,
    Matches,
    In,
}

/// One element of a membership set: either a single value or a low/high pair.
#[derive(Debug)]
pub enum SetElement {
    Single(STNode),
    Range(STNode, STNode),
}

/// Node payload variants.
#[derive(Debug)]
pub enum NodeKind {
    Field(FieldId),
    String(String),
    Unparsed(String),
    CharConst(String),
    FValue(Value),
    Pcre(Regex),
    Range { entity: Box<STNode>, range: DRange },
    Function { def: &'static FunctionDef, params: Vec<STNode> },
    Set(Vec<SetElement>),
    Test { op: TestOp, lhs: Box<STNode>, rhs: Option<Box<STNode>> },
}

/// A syntax-tree node.
///
/// `inside_parens` records whether the node was explicitly parenthesized in
/// the source text; the checker consults it before suggesting parentheses
/// around mixed boolean operators.
#[derive(Debug)]
pub struct STNode {
    pub kind: NodeKind,
    pub inside_parens: bool,
}

impl STNode {
    pub fn new(kind: NodeKind) -> Self {
        STNode { kind, inside_parens: false }
    }
}

/// A long and/or chain is a linked structure thousands of nodes deep; the
/// derived drop glue would recurse once per level. Drain children onto an
/// explicit stack instead.
impl Drop for STNode {
    fn drop(&mut self) {
        let mut work = Vec::new();
        detach_children(&mut work, &mut self.kind);
        while let Some(mut kind) = work.pop() {
            detach_children(&mut work, &mut kind);
        }
    }
}

fn detach_children(work: &mut Vec<NodeKind>, kind: &mut NodeKind) {
    fn take(node: &mut STNode) -> NodeKind {
        std::mem::replace(&mut node.kind, NodeKind::Unparsed(String::new()))
    }
    match kind {
        NodeKind::Test { lhs, rhs, .. } => {
            work.push(take(lhs));
            if let Some(rhs) = rhs {
                work.push(take(rhs));
            }
        }
        NodeKind::Range { entity, .. } => work.push(take(entity)),
        NodeKind::Function { params, .. } => work.extend(params.iter_mut().map(take)),
        NodeKind::Set(elements) => {
            for element in elements {
                match element {
                    SetElement::Single(node) => work.push(take(node)),
                    SetElement::Range(low, high) => {
                        work.push(take(low));
                        work.push(take(high));
                    }
                }
            }
        }
        _ => {}
    }
}

impl NodeKind {
    /// Name of the node kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Field(_) => "FIELD",
            NodeKind::String(_) => "STRING",
            NodeKind::Unparsed(_) => "UNPARSED",
            NodeKind::CharConst(_) => "CHARCONST",
            NodeKind::FValue(_) => "FVALUE",
            NodeKind::Pcre(_) => "PCRE",
            NodeKind::Range { .. } => "RANGE",
            NodeKind::Function { .. } => "FUNCTION",
            NodeKind::Set(_) => "SET",
            NodeKind::Test { .. } => "TEST",
        }
    }
}

use dfilter_types::{DRange, DRangeNode};
use regex::bytes::Regex;

use crate::error::ParseError;
use crate::functions;
use crate::registry::FieldRegistry;
use crate::syntax::{NodeKind, STNode, SetElement, TestOp};

use super::lexer::{Token, TokenKind};

pub(crate) struct Parser<'r> {
    registry: &'r FieldRegistry,
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl<'r> Parser<'r> {
    pub(crate) fn new(registry: &'r FieldRegistry, tokens: Vec<Token>, end: usize) -> Self {
        Parser { registry, tokens, pos: 0, end }
    }

    pub(crate) fn parse(mut self) -> Result<STNode, ParseError> {
        let node = self.parse_or()?;
        match self.peek() {
            None => Ok(node),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn here(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.pos)
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(tok) => ParseError::new(
                format!("{} was unexpected in this context.", describe(&tok.kind)),
                tok.pos,
            ),
            None => ParseError::new("The filter expression ends unexpectedly.", self.end),
        }
    }

    /// `or` binds loosest. Chains fold left-deep iteratively, so a long
    /// run of `or` terms costs no parser stack.
    fn parse_or(&mut self) -> Result<STNode, ParseError> {
        let mut node = self.parse_and()?;
        while self.eat(&TokenKind::TestOr) {
            let rhs = self.parse_and()?;
            node = STNode::new(NodeKind::Test {
                op: TestOp::Or,
                lhs: Box::new(node),
                rhs: Some(Box::new(rhs)),
            });
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<STNode, ParseError> {
        let mut node = self.parse_not()?;
        while self.eat(&TokenKind::TestAnd) {
            let rhs = self.parse_not()?;
            node = STNode::new(NodeKind::Test {
                op: TestOp::And,
                lhs: Box::new(node),
                rhs: Some(Box::new(rhs)),
            });
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<STNode, ParseError> {
        let mut negations = 0usize;
        while self.eat(&TokenKind::TestNot) {
            negations += 1;
        }
        let mut node = self.parse_primary()?;
        for _ in 0..negations {
            node = STNode::new(NodeKind::Test {
                op: TestOp::Not,
                lhs: Box::new(node),
                rhs: None,
            });
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<STNode, ParseError> {
        if self.eat(&TokenKind::LParen) {
            let mut node = self.parse_or()?;
            if !self.eat(&TokenKind::RParen) {
                return Err(self.unexpected());
            }
            node.inside_parens = true;
            return Ok(node);
        }

        let lhs = self.parse_entity()?;
        let op = match self.peek() {
            Some(TokenKind::TestAnyEq) => TestOp::AnyEq,
            Some(TokenKind::TestAnyNe) => TestOp::AnyNe,
            Some(TokenKind::TestAllNe) => TestOp::AllNe,
            Some(TokenKind::TestGt) => TestOp::Gt,
            Some(TokenKind::TestGe) => TestOp::Ge,
            Some(TokenKind::TestLt) => TestOp::Lt,
            Some(TokenKind::TestLe) => TestOp::Le,
            Some(TokenKind::TestBitwiseAnd) => TestOp::BitwiseAnd,
            Some(TokenKind::TestContains) => TestOp::Contains,
            Some(TokenKind::TestMatches) => TestOp::Matches,
            Some(TokenKind::TestIn) => TestOp::In,
            // A bare entity is an existence test.
            _ => {
                return Ok(STNode::new(NodeKind::Test {
                    op: TestOp::Exists,
                    lhs: Box::new(lhs),
                    rhs: None,
                }))
            }
        };
        self.pos += 1;

        let rhs = match op {
            TestOp::Matches => self.parse_regex()?,
            TestOp::In => self.parse_set()?,
            _ => self.parse_entity()?,
        };
        Ok(STNode::new(NodeKind::Test {
            op,
            lhs: Box::new(lhs),
            rhs: Some(Box::new(rhs)),
        }))
    }

    /// The right side of `matches` is compiled at parse time.
    fn parse_regex(&mut self) -> Result<STNode, ParseError> {
        let pos = self.here();
        let pattern = match self.next().map(|t| t.kind) {
            Some(TokenKind::Quoted(s)) => s,
            Some(TokenKind::Word(w)) => w,
            Some(_) => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
            None => return Err(self.unexpected()),
        };
        let compiled = Regex::new(&pattern).map_err(|e| {
            ParseError::new(
                format!("\"{pattern}\" is not a valid regular expression: {e}"),
                pos,
            )
        })?;
        Ok(STNode::new(NodeKind::Pcre(compiled)))
    }

    fn parse_set(&mut self) -> Result<STNode, ParseError> {
        if !self.eat(&TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let brace_pos = self.here();
        let mut elements = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.unexpected());
            }
            let low = self.parse_entity()?;
            if self.eat(&TokenKind::DotDot) {
                let high = self.parse_entity()?;
                elements.push(SetElement::Range(low, high));
            } else {
                elements.push(SetElement::Single(low));
            }
            self.eat(&TokenKind::Comma);
        }
        if elements.is_empty() {
            return Err(ParseError::new("The set of values is empty.", brace_pos));
        }
        Ok(STNode::new(NodeKind::Set(elements)))
    }

    fn parse_entity(&mut self) -> Result<STNode, ParseError> {
        let tok = match self.next() {
            Some(tok) => tok,
            None => return Err(self.unexpected()),
        };
        let mut node = match tok.kind {
            TokenKind::Quoted(s) => STNode::new(NodeKind::String(s)),
            TokenKind::CharConst(raw) => STNode::new(NodeKind::CharConst(raw)),
            TokenKind::Word(word) => {
                if self.peek() == Some(&TokenKind::LParen) {
                    self.parse_function(&word, tok.pos)?
                } else {
                    match self.registry.lookup(&word) {
                        Some(hf) => STNode::new(NodeKind::Field(hf.id)),
                        None => STNode::new(NodeKind::Unparsed(word)),
                    }
                }
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };
        while self.peek() == Some(&TokenKind::LBracket) {
            let range = self.parse_drange()?;
            node = STNode::new(NodeKind::Range { entity: Box::new(node), range });
        }
        Ok(node)
    }

    fn parse_function(&mut self, name: &str, pos: usize) -> Result<STNode, ParseError> {
        let def = functions::lookup(name).ok_or_else(|| {
            ParseError::new(format!("\"{name}\" is not a valid function name."), pos)
        })?;
        self.pos += 1; // consume `(`
        let mut params = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                params.push(self.parse_entity()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                if !self.eat(&TokenKind::Comma) {
                    return Err(self.unexpected());
                }
            }
        }
        Ok(STNode::new(NodeKind::Function { def, params }))
    }

    fn parse_drange(&mut self) -> Result<DRange, ParseError> {
        let open_pos = self.here();
        self.pos += 1; // consume `[`
        let mut nodes = Vec::new();
        loop {
            match self.next().map(|t| t.kind) {
                Some(TokenKind::Integer(start)) => {
                    if self.eat(&TokenKind::Colon) {
                        if let Some(TokenKind::Integer(length)) = self.peek() {
                            let length = *length;
                            self.pos += 1;
                            nodes.push(DRangeNode::Length { start, length });
                        } else {
                            nodes.push(DRangeNode::ToEnd { start });
                        }
                    } else if self.eat(&TokenKind::Hyphen) {
                        match self.next().map(|t| t.kind) {
                            Some(TokenKind::Integer(end)) => {
                                nodes.push(DRangeNode::Range { start, end })
                            }
                            Some(_) => {
                                self.pos -= 1;
                                return Err(self.unexpected());
                            }
                            None => return Err(self.unexpected()),
                        }
                    } else {
                        nodes.push(DRangeNode::Length { start, length: 1 });
                    }
                }
                Some(TokenKind::Colon) => match self.next().map(|t| t.kind) {
                    Some(TokenKind::Integer(length)) => {
                        nodes.push(DRangeNode::Length { start: 0, length })
                    }
                    Some(_) => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                    None => return Err(self.unexpected()),
                },
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
                None => return Err(self.unexpected()),
            }
            if self.eat(&TokenKind::RBracket) {
                break;
            }
            if !self.eat(&TokenKind::Comma) {
                return Err(self.unexpected());
            }
        }
        if nodes.is_empty() {
            return Err(ParseError::new("The range is empty.", open_pos));
        }
        Ok(DRange::new(nodes))
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Quoted(s) => format!("\"{s}\""),
        TokenKind::CharConst(raw) => raw.clone(),
        TokenKind::Word(w) => format!("\"{w}\""),
        TokenKind::LParen => "\"(\"".into(),
        TokenKind::RParen => "\")\"".into(),
        TokenKind::LBrace => "\"{\"".into(),
        TokenKind::RBrace => "\"}\"".into(),
        TokenKind::Comma => "\",\"".into(),
        TokenKind::DotDot => "\"..\"".into(),
        TokenKind::LBracket => "\"[\"".into(),
        TokenKind::RBracket => "\"]\"".into(),
        TokenKind::Colon => "\":\"".into(),
        TokenKind::Hyphen => "\"-\"".into(),
        TokenKind::Integer(v) => format!("\"{v}\""),
        TokenKind::TestAnd => "\"and\"".into(),
        TokenKind::TestOr => "\"or\"".into(),
        TokenKind::TestNot => "\"not\"".into(),
        TokenKind::TestAnyEq => "\"==\"".into(),
        TokenKind::TestAnyNe => "\"!=\"".into(),
        TokenKind::TestAllNe => "\"!==\"".into(),
        TokenKind::TestGt => "\">\"".into(),
        TokenKind::TestGe => "\">=\"".into(),
        TokenKind::TestLt => "\"<\"".into(),
        TokenKind::TestLe => "\"<=\"".into(),
        TokenKind::TestBitwiseAnd => "\"&\"".into(),
        TokenKind::TestContains => "\"contains\"".into(),
        TokenKind::TestMatches => "\"matches\"".into(),
        TokenKind::TestIn => "\"in\"".into(),
    }
}

//! Lexer and grammar for the filter expression language.

mod grammar;
mod lexer;

use tracing::trace;

use crate::error::ParseError;
use crate::registry::FieldRegistry;
use crate::syntax::STNode;

/// Parse a filter expression into its syntax tree.
///
/// Dotted names are resolved against the registry here; anything that does
/// not resolve becomes an `Unparsed` node for the semantic checker to coerce.
pub(crate) fn parse_filter(registry: &FieldRegistry, text: &str) -> Result<STNode, ParseError> {
    trace!(filter = text, "parsing");
    let tokens = lexer::lex(text)?;
    if tokens.is_empty() {
        return Err(ParseError::new("The filter expression is empty.", 0));
    }
    grammar::Parser::new(registry, tokens, text.len()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{NodeKind, SetElement, TestOp};
    use dfilter_types::FType;

    fn test_registry() -> FieldRegistry {
        let mut reg = FieldRegistry::new();
        reg.register("ip.src", FType::Ipv4);
        reg.register("tcp.port", FType::Uint16);
        reg.register("http.host", FType::String);
        reg
    }

    fn parse(text: &str) -> STNode {
        parse_filter(&test_registry(), text).unwrap()
    }

    #[test]
    fn bare_field_is_an_existence_test() {
        let node = parse("tcp.port");
        match &node.kind {
            NodeKind::Test { op: TestOp::Exists, lhs, rhs } => {
                assert!(matches!(lhs.kind, NodeKind::Field(_)));
                assert!(rhs.is_none());
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let node = parse("ip.src or tcp.port and http.host");
        let NodeKind::Test { op: TestOp::Or, rhs, .. } = &node.kind else {
            panic!("expected or at the root");
        };
        assert!(matches!(
            rhs.as_ref().unwrap().kind,
            NodeKind::Test { op: TestOp::And, .. }
        ));
    }

    #[test]
    fn unknown_words_become_unparsed() {
        let node = parse("tcp.port == 80");
        let NodeKind::Test { op: TestOp::AnyEq, rhs, .. } = &node.kind else {
            panic!("expected comparison");
        };
        assert!(matches!(rhs.as_ref().unwrap().kind, NodeKind::Unparsed(ref s) if s == "80"));
    }

    #[test]
    fn parenthesized_tests_are_flagged() {
        let node = parse("(ip.src and tcp.port) or http.host");
        let NodeKind::Test { op: TestOp::Or, lhs, .. } = &node.kind else {
            panic!("expected or at the root");
        };
        assert!(lhs.inside_parens);
    }

    #[test]
    fn not_chains_nest() {
        let node = parse("not not tcp.port");
        let NodeKind::Test { op: TestOp::Not, lhs, .. } = &node.kind else {
            panic!("expected not");
        };
        assert!(matches!(lhs.kind, NodeKind::Test { op: TestOp::Not, .. }));
    }

    #[test]
    fn sets_with_singletons_and_ranges() {
        let node = parse("tcp.port in {80, 443, 100..200}");
        let NodeKind::Test { op: TestOp::In, rhs, .. } = &node.kind else {
            panic!("expected in");
        };
        let NodeKind::Set(elements) = &rhs.as_ref().unwrap().kind else {
            panic!("expected a set");
        };
        assert_eq!(elements.len(), 3);
        assert!(matches!(elements[0], SetElement::Single(_)));
        assert!(matches!(elements[2], SetElement::Range(_, _)));
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = parse_filter(&test_registry(), "tcp.port in {}").unwrap_err();
        assert_eq!(err.message, "The set of values is empty.");
    }

    #[test]
    fn slices_attach_to_entities() {
        let node = parse("ip.src[0:2] == 0a:00");
        let NodeKind::Test { op: TestOp::AnyEq, lhs, .. } = &node.kind else {
            panic!("expected comparison");
        };
        let NodeKind::Range { entity, range } = &lhs.kind else {
            panic!("expected a range node");
        };
        assert!(matches!(entity.kind, NodeKind::Field(_)));
        assert_eq!(range.to_string(), "0:2");
    }

    #[test]
    fn nested_slices_nest_range_nodes() {
        let node = parse("ip.src[0:2][0:1]");
        let NodeKind::Test { op: TestOp::Exists, lhs, .. } = &node.kind else {
            panic!("expected existence test");
        };
        let NodeKind::Range { entity, .. } = &lhs.kind else {
            panic!("expected outer range");
        };
        assert!(matches!(entity.kind, NodeKind::Range { .. }));
    }

    #[test]
    fn matches_compiles_the_pattern() {
        let node = parse("http.host matches \"ex.mple\"");
        let NodeKind::Test { op: TestOp::Matches, rhs, .. } = &node.kind else {
            panic!("expected matches");
        };
        assert!(matches!(rhs.as_ref().unwrap().kind, NodeKind::Pcre(_)));
    }

    #[test]
    fn invalid_regex_is_a_parse_error() {
        assert!(parse_filter(&test_registry(), "http.host matches \"(\"").is_err());
    }

    #[test]
    fn function_calls_parse_with_params() {
        let node = parse("len(ip.src) > 2");
        let NodeKind::Test { op: TestOp::Gt, lhs, .. } = &node.kind else {
            panic!("expected comparison");
        };
        let NodeKind::Function { def, params } = &lhs.kind else {
            panic!("expected function");
        };
        assert_eq!(def.name, "len");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = parse_filter(&test_registry(), "frobnicate(ip.src)").unwrap_err();
        assert!(err.message.contains("not a valid function name"));
    }

    #[test]
    fn empty_filter_is_rejected() {
        assert!(parse_filter(&test_registry(), "").is_err());
        assert!(parse_filter(&test_registry(), "   ").is_err());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_filter(&test_registry(), "tcp.port == 80 )").is_err());
    }
}

//! Semantic checking of the syntax tree.
//!
//! Walks the parsed tree, enforces the per-type capability and compatibility
//! rules, coerces literals into typed values (rewriting their nodes in
//! place), wraps sliceable fields in byte-range adapters where a relation
//! needs byte semantics, and validates function calls. Checking stops at the
//! first type error; the non-fatal deprecation notices collected along the
//! way are kept with the compiled program.

use dfilter_types::{FType, Value};
use tracing::trace;

use crate::error::TypeError;
use crate::functions::FunctionDef;
use crate::registry::{DisplayHint, FieldRegistry, HField, ValueStrings};
use crate::syntax::{NodeKind, STNode, SetElement, TestOp};

type CanFn = fn(FType) -> bool;

/// Check the whole tree. On success returns the deprecation notices.
pub(crate) fn semcheck(
    registry: &FieldRegistry,
    root: &mut STNode,
) -> Result<Vec<String>, TypeError> {
    let mut deprecated = Vec::new();
    // The boolean spine is walked with an explicit stack; a filter that is
    // one long and/or chain must not exhaust the call stack.
    let mut work: Vec<&mut STNode> = vec![root];
    while let Some(node) = work.pop() {
        let NodeKind::Test { op, lhs, rhs } = &mut node.kind else {
            unreachable!("the parser always hands the checker a test node");
        };
        let op = *op;
        trace!(?op, "check_test");
        match op {
            TestOp::Exists => check_exists(lhs)?,
            TestOp::Not => work.push(&mut **lhs),
            TestOp::And | TestOp::Or => {
                let lhs = &mut **lhs;
                let rhs = &mut **rhs.as_mut().expect("and/or test nodes are binary");
                suggest_parens(&mut deprecated, op, lhs);
                suggest_parens(&mut deprecated, op, rhs);
                work.push(lhs);
                work.push(rhs);
            }
            _ => {
                let rhs = &mut **rhs.as_mut().expect("relation test nodes are binary");
                let (relation, allow_partial, can): (&str, bool, CanFn) = match op {
                    TestOp::AnyEq => ("==", false, FType::can_eq),
                    TestOp::AllNe => ("!==", false, FType::can_ne),
                    TestOp::AnyNe => ("!=", false, FType::can_ne),
                    TestOp::Gt => (">", false, FType::can_gt),
                    TestOp::Ge => (">=", false, FType::can_ge),
                    TestOp::Lt => ("<", false, FType::can_lt),
                    TestOp::Le => ("<=", false, FType::can_le),
                    TestOp::BitwiseAnd => ("&", false, FType::can_bitwise_and),
                    TestOp::Contains => ("contains", true, FType::can_contains),
                    TestOp::Matches => ("matches", true, FType::can_matches),
                    // Set members are compared with equality semantics.
                    TestOp::In => ("in", false, FType::can_eq),
                    _ => unreachable!(),
                };
                check_relation(registry, relation, allow_partial, can, &mut **lhs, rhs)?;
            }
        }
    }
    Ok(deprecated)
}

/// The classic "mixed && and || without parentheses" warning.
fn suggest_parens(deprecated: &mut Vec<String>, parent_op: TestOp, child: &STNode) {
    if let NodeKind::Test { op: child_op @ (TestOp::And | TestOp::Or), .. } = child.kind {
        if child_op != parent_op && !child.inside_parens {
            let token = "suggest parentheses around '&&' within '||'";
            if !deprecated.iter().any(|t| t == token) {
                deprecated.push(token.to_owned());
            }
        }
    }
}

fn check_exists(node: &STNode) -> Result<(), TypeError> {
    trace!("check_exists");
    match &node.kind {
        NodeKind::Field(_) => Ok(()),
        NodeKind::String(s) | NodeKind::Unparsed(s) | NodeKind::CharConst(s) => Err(TypeError(
            format!("\"{s}\" is neither a field nor a protocol name."),
        )),
        NodeKind::Range { .. } => {
            Err(TypeError("You cannot test whether a range is present.".into()))
        }
        NodeKind::Function { .. } => {
            Err(TypeError("You cannot test whether a function is present.".into()))
        }
        _ => unreachable!("parser produces only entity nodes under an existence test"),
    }
}

/// Check any relational test, dispatching on the kind of the left side.
fn check_relation(
    registry: &FieldRegistry,
    relation: &str,
    allow_partial: bool,
    can: CanFn,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    trace!(relation, "check_relation");

    // A protocol name on the right side is almost never meant as a field
    // reference: `ip.src contains fc` wants the byte 0xfc, not the Fibre
    // Channel dissector. Reinterpret it as an unparsed literal and let the
    // usual coercion rules decide.
    if let NodeKind::Field(id) = rhs.kind {
        let hf = registry.field(id);
        if hf.ftype == FType::Protocol {
            rhs.kind = NodeKind::Unparsed(hf.abbrev.clone());
        }
    }

    match lhs.kind {
        NodeKind::Field(_) => {
            check_relation_lhs_field(registry, relation, can, allow_partial, lhs, rhs)
        }
        NodeKind::String(_) => check_relation_lhs_string(registry, relation, can, lhs, rhs),
        NodeKind::Unparsed(_) | NodeKind::CharConst(_) => {
            check_relation_lhs_unparsed(registry, relation, can, allow_partial, lhs, rhs)
        }
        NodeKind::Range { .. } => {
            check_relation_lhs_range(registry, relation, allow_partial, lhs, rhs)
        }
        NodeKind::Function { .. } => {
            check_relation_lhs_function(registry, relation, can, allow_partial, lhs, rhs)
        }
        _ => unreachable!("parser produces only entity nodes as relation operands"),
    }
}

fn check_relation_lhs_field(
    registry: &FieldRegistry,
    relation: &str,
    can: CanFn,
    allow_partial: bool,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    let NodeKind::Field(id1) = lhs.kind else { unreachable!() };
    let hfinfo1 = registry.field(id1);
    let ftype1 = hfinfo1.ftype;

    if !can(ftype1) {
        return Err(TypeError(format!(
            "{} (type={}) cannot participate in '{}' comparison.",
            hfinfo1.abbrev,
            ftype1.pretty_name(),
            relation
        )));
    }

    match &mut rhs.kind {
        NodeKind::Field(id2) => {
            let hfinfo2 = registry.field(*id2);
            let ftype2 = hfinfo2.ftype;
            if !compatible_ftypes(ftype1, ftype2) {
                return Err(TypeError(format!(
                    "{} and {} are not of compatible types.",
                    hfinfo1.abbrev, hfinfo2.abbrev
                )));
            }
            // Compatibility does not imply capability; check both.
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "{} (type={}) cannot participate in specified comparison.",
                    hfinfo2.abbrev,
                    ftype2.pretty_name()
                )));
            }
            Ok(())
        }
        NodeKind::String(_) | NodeKind::Unparsed(_) | NodeKind::CharConst(_) => {
            let is_string_literal = matches!(rhs.kind, NodeKind::String(_));
            // Among same-named registrations, pick the alias whose
            // string-ness matches the literal's flavour.
            let hfinfo1 = best_alias(registry, hfinfo1, is_string_literal);
            let ftype1 = hfinfo1.ftype;
            let fvalue = match &rhs.kind {
                NodeKind::String(s) => fvalue_from_string(ftype1, s, Some(hfinfo1))?,
                NodeKind::CharConst(s) if relation == "contains" => {
                    // The right side should be the field's own type, but a
                    // character is just a one-byte byte string.
                    fvalue_from_charconst_string(s, allow_partial)?
                }
                NodeKind::Unparsed(s) | NodeKind::CharConst(s) => {
                    fvalue_from_unparsed(ftype1, s, allow_partial, Some(hfinfo1))?
                }
                _ => unreachable!(),
            };
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Range { .. } => {
            check_drange_sanity(registry, rhs)?;
            if !is_bytes_type(ftype1) {
                if !ftype1.can_slice() {
                    return Err(TypeError(format!(
                        "\"{}\" is a {} and cannot be converted into a sequence of bytes.",
                        hfinfo1.abbrev,
                        ftype1.pretty_name()
                    )));
                }
                // Compare the entire field as bytes.
                convert_to_bytes(lhs);
            }
            Ok(())
        }
        NodeKind::Function { def, .. } => {
            let funcdef: &'static FunctionDef = *def;
            let ftype2 = funcdef.ret_ftype;
            if !compatible_ftypes(ftype1, ftype2) {
                return Err(TypeError(format!(
                    "{} (type={}) and return value of {}() (type={}) are not of compatible types.",
                    hfinfo1.abbrev,
                    ftype1.pretty_name(),
                    funcdef.name,
                    ftype2.pretty_name()
                )));
            }
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "return value of {}() (type={}) cannot participate in specified comparison.",
                    funcdef.name,
                    ftype2.pretty_name()
                )));
            }
            check_function(registry, rhs)
        }
        NodeKind::Set(elements) => {
            // A set only ever appears on the right side of `in`.
            debug_assert_eq!(relation, "in");
            for element in elements.iter_mut() {
                match element {
                    SetElement::Single(node) => {
                        if matches!(node.kind, NodeKind::Range { .. }) {
                            return Err(TypeError("A range may not appear inside a set.".into()));
                        }
                        check_relation_lhs_field(registry, "==", can, allow_partial, lhs, node)?;
                    }
                    SetElement::Range(low, high) => {
                        if matches!(low.kind, NodeKind::Range { .. })
                            || matches!(high.kind, NodeKind::Range { .. })
                        {
                            return Err(TypeError("A range may not appear inside a set.".into()));
                        }
                        // Bounds are compared with >= and <=.
                        if !ftype1.can_ge() {
                            return Err(TypeError(format!(
                                "{} (type={}) cannot participate in '>=' comparison.",
                                hfinfo1.abbrev,
                                ftype1.pretty_name()
                            )));
                        }
                        check_relation_lhs_field(
                            registry,
                            ">=",
                            FType::can_ge,
                            allow_partial,
                            lhs,
                            low,
                        )?;
                        check_relation_lhs_field(
                            registry,
                            "<=",
                            FType::can_le,
                            allow_partial,
                            lhs,
                            high,
                        )?;
                    }
                }
            }
            Ok(())
        }
        NodeKind::Pcre(_) => {
            debug_assert_eq!(relation, "matches");
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn check_relation_lhs_string(
    registry: &FieldRegistry,
    relation: &str,
    can: CanFn,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    let NodeKind::String(text) = &lhs.kind else { unreachable!() };
    let text = text.clone();

    match &mut rhs.kind {
        NodeKind::Field(id2) => {
            let hfinfo2 = registry.field(*id2);
            let ftype2 = hfinfo2.ftype;
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "{} (type={}) cannot participate in '{}' comparison.",
                    hfinfo2.abbrev,
                    ftype2.pretty_name(),
                    relation
                )));
            }
            let fvalue = fvalue_from_string(ftype2, &text, Some(hfinfo2))?;
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::String(other) | NodeKind::Unparsed(other) | NodeKind::CharConst(other) => {
            Err(TypeError(format!(
                "Neither \"{text}\" nor \"{other}\" are field or protocol names."
            )))
        }
        NodeKind::Range { .. } => {
            check_drange_sanity(registry, rhs)?;
            let fvalue = fvalue_from_string(FType::Bytes, &text, None)?;
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Function { def, .. } => {
            let funcdef: &'static FunctionDef = *def;
            check_function(registry, rhs)?;
            let ftype2 = funcdef.ret_ftype;
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "Return value of function {} (type={}) cannot participate in '{}' comparison.",
                    funcdef.name,
                    ftype2.pretty_name(),
                    relation
                )));
            }
            let fvalue = fvalue_from_string(ftype2, &text, None)?;
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Set(_) => Err(TypeError(
            "Only a field may be tested for membership in a set.".into(),
        )),
        NodeKind::Pcre(_) => Err(TypeError(format!(
            "\"{text}\" cannot be matched against a regular expression."
        ))),
        _ => unreachable!(),
    }
}

fn check_relation_lhs_unparsed(
    registry: &FieldRegistry,
    relation: &str,
    can: CanFn,
    allow_partial: bool,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    let text = match &lhs.kind {
        NodeKind::Unparsed(s) | NodeKind::CharConst(s) => s.clone(),
        _ => unreachable!(),
    };

    match &mut rhs.kind {
        NodeKind::Field(id2) => {
            let hfinfo2 = registry.field(*id2);
            let ftype2 = hfinfo2.ftype;
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "{} (type={}) cannot participate in '{}' comparison.",
                    hfinfo2.abbrev,
                    ftype2.pretty_name(),
                    relation
                )));
            }
            let fvalue = fvalue_from_unparsed(ftype2, &text, allow_partial, Some(hfinfo2))?;
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::String(other) | NodeKind::Unparsed(other) | NodeKind::CharConst(other) => {
            Err(TypeError(format!(
                "Neither \"{text}\" nor \"{other}\" are field or protocol names."
            )))
        }
        NodeKind::Range { .. } => {
            check_drange_sanity(registry, rhs)?;
            let fvalue = if matches!(lhs.kind, NodeKind::CharConst(_)) {
                fvalue_from_charconst_string(&text, allow_partial)?
            } else {
                fvalue_from_unparsed(FType::Bytes, &text, allow_partial, None)?
            };
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Function { def, .. } => {
            let funcdef: &'static FunctionDef = *def;
            check_function(registry, rhs)?;
            let ftype2 = funcdef.ret_ftype;
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "return value of function {}() (type={}) cannot participate in '{}' comparison.",
                    funcdef.name,
                    ftype2.pretty_name(),
                    relation
                )));
            }
            let fvalue = fvalue_from_unparsed(ftype2, &text, allow_partial, None)?;
            lhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Set(_) => Err(TypeError(
            "Only a field may be tested for membership in a set.".into(),
        )),
        NodeKind::Pcre(_) => Err(TypeError(format!(
            "\"{text}\" cannot be matched against a regular expression."
        ))),
        _ => unreachable!(),
    }
}

fn check_relation_lhs_range(
    registry: &FieldRegistry,
    relation: &str,
    allow_partial: bool,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    check_drange_sanity(registry, lhs)?;

    match &mut rhs.kind {
        NodeKind::Field(id2) => {
            let hfinfo2 = registry.field(*id2);
            let ftype2 = hfinfo2.ftype;
            if !is_bytes_type(ftype2) {
                if !ftype2.can_slice() {
                    return Err(TypeError(format!(
                        "\"{}\" is a {} and cannot be converted into a sequence of bytes.",
                        hfinfo2.abbrev,
                        ftype2.pretty_name()
                    )));
                }
                convert_to_bytes(rhs);
            }
            Ok(())
        }
        NodeKind::String(s) => {
            let fvalue = fvalue_from_string(FType::Bytes, s, None)?;
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Unparsed(s) => {
            let fvalue = fvalue_from_unparsed(FType::Bytes, s, allow_partial, None)?;
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::CharConst(s) => {
            // A character is just a one-byte byte string.
            let fvalue = fvalue_from_charconst_string(s, allow_partial)?;
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Range { .. } => check_drange_sanity(registry, rhs),
        NodeKind::Function { def, .. } => {
            let funcdef: &'static FunctionDef = *def;
            let ftype2 = funcdef.ret_ftype;
            if !is_bytes_type(ftype2) {
                if !ftype2.can_slice() {
                    return Err(TypeError(format!(
                        "Return value of function \"{}\" is a {} and cannot be converted into a sequence of bytes.",
                        funcdef.name,
                        ftype2.pretty_name()
                    )));
                }
                convert_to_bytes(rhs);
            }
            check_function(registry, rhs)
        }
        NodeKind::Set(_) => Err(TypeError(
            "Only a field may be tested for membership in a set.".into(),
        )),
        NodeKind::Pcre(_) => {
            debug_assert_eq!(relation, "matches");
            Ok(())
        }
        _ => unreachable!(),
    }
}

fn check_relation_lhs_function(
    registry: &FieldRegistry,
    relation: &str,
    can: CanFn,
    allow_partial: bool,
    lhs: &mut STNode,
    rhs: &mut STNode,
) -> Result<(), TypeError> {
    check_function(registry, lhs)?;
    let NodeKind::Function { def, .. } = &lhs.kind else { unreachable!() };
    let funcdef: &'static FunctionDef = *def;
    let ftype1 = funcdef.ret_ftype;

    if !can(ftype1) {
        return Err(TypeError(format!(
            "Function {} (type={}) cannot participate in '{}' comparison.",
            funcdef.name,
            ftype1.pretty_name(),
            relation
        )));
    }

    match &mut rhs.kind {
        NodeKind::Field(id2) => {
            let hfinfo2 = registry.field(*id2);
            let ftype2 = hfinfo2.ftype;
            if !compatible_ftypes(ftype1, ftype2) {
                return Err(TypeError(format!(
                    "Function {} and {} are not of compatible types.",
                    funcdef.name, hfinfo2.abbrev
                )));
            }
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "{} (type={}) cannot participate in specified comparison.",
                    hfinfo2.abbrev,
                    ftype2.pretty_name()
                )));
            }
            Ok(())
        }
        NodeKind::String(s) => {
            let fvalue = fvalue_from_string(ftype1, s, None)?;
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Unparsed(s) | NodeKind::CharConst(s) => {
            let fvalue = fvalue_from_unparsed(ftype1, s, allow_partial, None)?;
            rhs.kind = NodeKind::FValue(fvalue);
            Ok(())
        }
        NodeKind::Range { .. } => {
            check_drange_sanity(registry, rhs)?;
            if !is_bytes_type(ftype1) {
                if !ftype1.can_slice() {
                    return Err(TypeError(format!(
                        "Function \"{}\" is a {} and cannot be converted into a sequence of bytes.",
                        funcdef.name,
                        ftype1.pretty_name()
                    )));
                }
                convert_to_bytes(lhs);
            }
            Ok(())
        }
        NodeKind::Function { def: def2, .. } => {
            let funcdef2: &'static FunctionDef = def2;
            let ftype2 = funcdef2.ret_ftype;
            if !compatible_ftypes(ftype1, ftype2) {
                return Err(TypeError(format!(
                    "Return values of function {} (type={}) and function {} (type={}) are not of compatible types.",
                    funcdef.name,
                    ftype1.pretty_name(),
                    funcdef2.name,
                    ftype2.pretty_name()
                )));
            }
            if !can(ftype2) {
                return Err(TypeError(format!(
                    "Return value of {} (type={}) cannot participate in specified comparison.",
                    funcdef2.name,
                    ftype2.pretty_name()
                )));
            }
            check_function(registry, rhs)
        }
        NodeKind::Set(_) => Err(TypeError(
            "Only a field may be tested for membership in a set.".into(),
        )),
        NodeKind::Pcre(_) => {
            debug_assert_eq!(relation, "matches");
            Ok(())
        }
        _ => unreachable!(),
    }
}

/// Validate arity and parameters of a function call node.
fn check_function(registry: &FieldRegistry, node: &mut STNode) -> Result<(), TypeError> {
    let NodeKind::Function { def, params } = &mut node.kind else { unreachable!() };
    if params.len() < def.min_nargs {
        return Err(TypeError(format!(
            "Function {} needs at least {} arguments.",
            def.name, def.min_nargs
        )));
    }
    if params.len() > def.max_nargs {
        return Err(TypeError(format!(
            "Function {} can only accept {} arguments.",
            def.name, def.max_nargs
        )));
    }
    for (index, param) in params.iter_mut().enumerate() {
        check_param_entity(param)?;
        (def.check_param)(registry, index, param)?;
    }
    Ok(())
}

/// Bare words used as function arguments become string values.
fn check_param_entity(param: &mut STNode) -> Result<(), TypeError> {
    if let NodeKind::Unparsed(s) | NodeKind::CharConst(s) = &param.kind {
        let fvalue = Value::from_unparsed(FType::String, s, true).map_err(TypeError::from)?;
        param.kind = NodeKind::FValue(fvalue);
    }
    Ok(())
}

/// A range node may only wrap something sliceable.
fn check_drange_sanity(registry: &FieldRegistry, node: &mut STNode) -> Result<(), TypeError> {
    let NodeKind::Range { entity, .. } = &mut node.kind else { unreachable!() };
    match &entity.kind {
        NodeKind::Field(id) => {
            let hfinfo = registry.field(*id);
            if !hfinfo.ftype.can_slice() {
                return Err(TypeError(format!(
                    "\"{}\" is a {} and cannot be sliced into a sequence of bytes.",
                    hfinfo.abbrev,
                    hfinfo.ftype.pretty_name()
                )));
            }
            Ok(())
        }
        NodeKind::Function { def, .. } => {
            if !def.ret_ftype.can_slice() {
                return Err(TypeError(format!(
                    "Return value of function \"{}\" is a {} and cannot be converted into a sequence of bytes.",
                    def.name,
                    def.ret_ftype.pretty_name()
                )));
            }
            check_function(registry, entity)
        }
        NodeKind::Range { .. } => check_drange_sanity(registry, entity),
        other => Err(TypeError(format!(
            "Range is not supported for entity {} of type {}.",
            node_display(registry, other),
            other.type_name()
        ))),
    }
}

/// Wrap an entity in an implicit `[0:]` adapter so it evaluates as bytes.
fn convert_to_bytes(node: &mut STNode) {
    let entity = std::mem::replace(node, STNode::new(NodeKind::Unparsed(String::new())));
    *node = STNode::new(NodeKind::Range {
        entity: Box::new(entity),
        range: dfilter_types::DRange::to_the_end(),
    });
}

/// Walk the alias chain backwards until the field's string-ness agrees with
/// the literal's flavour. Stops at the chain head.
fn best_alias<'r>(
    registry: &'r FieldRegistry,
    mut hfinfo: &'r HField,
    literal_is_string: bool,
) -> &'r HField {
    fn stringish(ftype: FType) -> bool {
        matches!(ftype, FType::String | FType::Stringz)
    }
    while let Some(prev) = hfinfo.same_name_prev {
        let mismatch = if literal_is_string {
            !stringish(hfinfo.ftype)
        } else {
            stringish(hfinfo.ftype)
        };
        if !mismatch {
            break;
        }
        hfinfo = registry.field(prev);
    }
    hfinfo
}

fn node_display(registry: &FieldRegistry, kind: &NodeKind) -> String {
    match kind {
        NodeKind::Field(id) => registry.field(*id).abbrev.clone(),
        NodeKind::String(s) | NodeKind::Unparsed(s) | NodeKind::CharConst(s) => s.clone(),
        NodeKind::FValue(v) => v.to_string(),
        other => other.type_name().to_owned(),
    }
}

/// Coerce an unparsed literal, falling back to the field's value-string
/// table when direct parsing fails. The table error, when one arises, is
/// the more interesting message and wins.
fn fvalue_from_unparsed(
    ftype: FType,
    s: &str,
    allow_partial: bool,
    hfinfo: Option<&HField>,
) -> Result<Value, TypeError> {
    match Value::from_unparsed(ftype, s, allow_partial) {
        Ok(v) => Ok(v),
        Err(parse_err) => match hfinfo {
            Some(hfinfo) => match mk_fvalue_from_val_string(hfinfo, s)? {
                Some(v) => Ok(v),
                None => Err(TypeError::from(parse_err)),
            },
            None => Err(TypeError::from(parse_err)),
        },
    }
}

fn fvalue_from_string(
    ftype: FType,
    s: &str,
    hfinfo: Option<&HField>,
) -> Result<Value, TypeError> {
    match Value::from_string(ftype, s) {
        Ok(v) => Ok(v),
        Err(parse_err) => match hfinfo {
            Some(hfinfo) => match mk_fvalue_from_val_string(hfinfo, s)? {
                Some(v) => Ok(v),
                None => Err(TypeError::from(parse_err)),
            },
            None => Err(TypeError::from(parse_err)),
        },
    }
}

/// A character constant compared with `contains` is parsed as a one-byte
/// integer and re-rendered as a two-hex-digit byte string.
fn fvalue_from_charconst_string(s: &str, allow_partial: bool) -> Result<Value, TypeError> {
    let code = Value::parse_char_literal(s).map_err(TypeError::from)?;
    let hex = format!("{code:02x}");
    Ok(Value::from_unparsed(FType::Bytes, &hex, allow_partial)
        .expect("two hex digits always parse as a byte string"))
}

/// Resolve a literal through the field's value-string table. `Ok(None)`
/// means the table does not apply to this field at all; the caller then
/// keeps the original parse error.
fn mk_fvalue_from_val_string(hfinfo: &HField, s: &str) -> Result<Option<Value>, TypeError> {
    let not_found = || {
        TypeError(format!(
            "\"{s}\" cannot be found among the possible values for {}.",
            hfinfo.abbrev
        ))
    };

    // Only integer-like fields carry value strings. A frame-number field's
    // table holds frame linkage data, not names.
    if !hfinfo.ftype.is_integral() || hfinfo.ftype == FType::FrameNum {
        return Ok(None);
    }

    // True/false strings always exist for booleans.
    if hfinfo.ftype == FType::Boolean {
        let (true_string, false_string) = match &hfinfo.strings {
            Some(ValueStrings::TrueFalse { true_string, false_string }) => {
                (true_string.as_str(), false_string.as_str())
            }
            _ => ("True", "False"),
        };
        if s.eq_ignore_ascii_case(true_string) {
            return Ok(Some(Value::uint(FType::Uint64, 1)));
        }
        if s.eq_ignore_ascii_case(false_string) {
            return Ok(Some(Value::uint(FType::Uint64, 0)));
        }
        return Err(not_found());
    }

    if hfinfo.strings.is_none() {
        return Err(TypeError(format!(
            "{} cannot accept strings as values.",
            hfinfo.abbrev
        )));
    }

    if hfinfo.display.contains(DisplayHint::RANGE_STRING) {
        return Err(TypeError(format!(
            "\"{}\" cannot accept [range] strings as values.",
            hfinfo.abbrev
        )));
    }
    if hfinfo.display.contains(DisplayHint::VAL64_STRING) {
        if let Some(ValueStrings::Values64(vals)) = &hfinfo.strings {
            for (value, name) in vals {
                if s.eq_ignore_ascii_case(name) {
                    return Ok(Some(Value::uint(FType::Uint64, *value)));
                }
            }
        }
        return Err(not_found());
    }
    if hfinfo.display.contains(DisplayHint::CUSTOM) {
        // There is no integer to feed a custom-display formatter with, only
        // the string the user wrote.
        return Err(TypeError(format!(
            "\"{}\" cannot accept [custom] strings as values.",
            hfinfo.abbrev
        )));
    }
    // BASE_EXT_STRING tables read the same as plain value strings.
    if let Some(ValueStrings::Values(vals)) = &hfinfo.strings {
        for (value, name) in vals {
            if s.eq_ignore_ascii_case(name) {
                return Ok(Some(Value::uint(FType::Uint32, u64::from(*value))));
            }
        }
    }
    Err(not_found())
}

/// Same basic type, so the two fields may meet in a comparison.
fn compatible_ftypes(a: FType, b: FType) -> bool {
    if a.is_bytes_family() {
        return b.is_bytes_family();
    }
    if a.is_integer_family() {
        return b.is_integer_family();
    }
    if a.is_string_family() {
        return b.is_string_family();
    }
    a == b
}

/// Types whose values already are byte sequences and need no range adapter.
/// Broader than the bytes compatibility family: IPv6 addresses compare as
/// bytes even though they are not general byte fields.
fn is_bytes_type(ftype: FType) -> bool {
    ftype.is_bytes_family() || ftype == FType::Ipv6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use crate::registry::FieldRegistry;

    fn registry() -> FieldRegistry {
        let mut reg = FieldRegistry::new();
        reg.register("ip.src", FType::Ipv4);
        reg.register("tcp.port", FType::Uint16);
        reg.register("udp.port", FType::Uint16);
        reg.register("http.host", FType::String);
        reg.register("eth.src", FType::Ether);
        reg.register("frame.time_delta", FType::RelativeTime);
        reg.register("fc", FType::Protocol);
        reg.register_full(
            "tcp.flags.syn",
            FType::Boolean,
            DisplayHint::empty(),
            Some(ValueStrings::TrueFalse {
                true_string: "Set".into(),
                false_string: "Not set".into(),
            }),
        );
        reg.register_full(
            "ip.proto",
            FType::Uint8,
            DisplayHint::empty(),
            Some(ValueStrings::Values(vec![(6, "TCP".into()), (17, "UDP".into())])),
        );
        reg.register_full(
            "x.custom",
            FType::Uint8,
            DisplayHint::CUSTOM,
            Some(ValueStrings::Values(vec![(1, "one".into())])),
        );
        reg
    }

    fn run(filter: &str) -> Result<Vec<String>, TypeError> {
        let reg = registry();
        let mut root = parse_filter(&reg, filter).expect("parse");
        semcheck(&reg, &mut root)
    }

    fn check_err(filter: &str) -> String {
        run(filter).unwrap_err().0
    }

    #[test]
    fn accepts_simple_comparisons() {
        assert!(run("tcp.port == 80").is_ok());
        assert!(run("ip.src == 10.0.0.1").is_ok());
        assert!(run("http.host == \"example.com\"").is_ok());
        assert!(run("frame.time_delta > 1.5").is_ok());
        assert!(run("tcp.port in {80, 443, 100..200}").is_ok());
    }

    #[test]
    fn coerces_literals_into_fvalues() {
        let reg = registry();
        let mut root = parse_filter(&reg, "tcp.port == 80").unwrap();
        semcheck(&reg, &mut root).unwrap();
        let NodeKind::Test { rhs, .. } = &root.kind else { panic!() };
        let rhs = rhs.as_ref().unwrap();
        assert!(matches!(&rhs.kind, NodeKind::FValue(v) if v.as_uint() == Some(80)));
    }

    #[test]
    fn rejects_unparseable_literals() {
        let msg = check_err("ip.src == notanaddress");
        assert_eq!(msg, "\"notanaddress\" is not a valid hostname or IPv4 address.");
    }

    #[test]
    fn rejects_literal_on_both_sides() {
        let msg = check_err("\"a\" == \"b\"");
        assert_eq!(msg, "Neither \"a\" nor \"b\" are field or protocol names.");
    }

    #[test]
    fn rejects_incapable_types() {
        let msg = check_err("tcp.flags.syn > 1");
        assert_eq!(msg, "tcp.flags.syn (type=Boolean) cannot participate in '>' comparison.");
        let msg = check_err("http.host & \"x\"");
        assert_eq!(
            msg,
            "http.host (type=Character string) cannot participate in '&' comparison."
        );
    }

    #[test]
    fn rejects_incompatible_fields() {
        let msg = check_err("tcp.port == http.host");
        assert_eq!(msg, "tcp.port and http.host are not of compatible types.");
    }

    #[test]
    fn exists_only_takes_fields() {
        let msg = check_err("nosuch.field");
        assert_eq!(msg, "\"nosuch.field\" is neither a field nor a protocol name.");
        let msg = check_err("len(http.host)");
        assert_eq!(msg, "You cannot test whether a function is present.");
        let msg = check_err("eth.src[0:2]");
        assert_eq!(msg, "You cannot test whether a range is present.");
    }

    #[test]
    fn value_string_fallback() {
        assert!(run("ip.proto == TCP").is_ok());
        assert!(run("ip.proto == udp").is_ok(), "lookup is case-insensitive");
        let msg = check_err("ip.proto == SCTP");
        assert_eq!(msg, "\"SCTP\" cannot be found among the possible values for ip.proto.");
    }

    #[test]
    fn true_false_strings() {
        assert!(run("tcp.flags.syn == \"Set\"").is_ok());
        assert!(run("tcp.flags.syn == 1").is_ok());
        let msg = check_err("tcp.flags.syn == \"Maybe\"");
        assert_eq!(
            msg,
            "\"Maybe\" cannot be found among the possible values for tcp.flags.syn."
        );
    }

    #[test]
    fn custom_display_rejects_strings() {
        let msg = check_err("x.custom == one");
        assert_eq!(msg, "\"x.custom\" cannot accept [custom] strings as values.");
    }

    #[test]
    fn protocol_on_rhs_reparses_as_bytes() {
        assert!(run("ip.src contains fc").is_ok());
        assert!(run("eth.src contains fc").is_ok());
    }

    #[test]
    fn slice_of_unsliceable_type() {
        let msg = check_err("tcp.port[0:1] == 01");
        assert_eq!(
            msg,
            "\"tcp.port\" is a Unsigned integer, 2 bytes and cannot be sliced into a sequence of bytes."
        );
    }

    #[test]
    fn range_rhs_wraps_sliceable_lhs() {
        let reg = registry();
        let mut root = parse_filter(&reg, "ip.src == eth.src[0:4]").unwrap();
        semcheck(&reg, &mut root).unwrap();
        let NodeKind::Test { lhs, .. } = &root.kind else { panic!() };
        assert!(matches!(lhs.kind, NodeKind::Range { .. }), "LHS wrapped in a byte adapter");
    }

    #[test]
    fn ranges_may_not_appear_in_sets() {
        let msg = check_err("tcp.port in {eth.src[0:2]}");
        assert_eq!(msg, "A range may not appear inside a set.");
    }

    #[test]
    fn charconst_contains_becomes_byte_string() {
        let reg = registry();
        let mut root = parse_filter(&reg, "eth.src contains 'a'").unwrap();
        semcheck(&reg, &mut root).unwrap();
        let NodeKind::Test { rhs, .. } = &root.kind else { panic!() };
        let rhs = rhs.as_ref().unwrap();
        let NodeKind::FValue(v) = &rhs.kind else { panic!("expected coerced value") };
        assert_eq!(v, &Value::bytes(vec![0x61]));
    }

    #[test]
    fn function_arity_is_enforced() {
        let msg = check_err("len() == 1");
        assert_eq!(msg, "Function len needs at least 1 arguments.");
        let msg = check_err("len(http.host, http.host) == 1");
        assert_eq!(msg, "Function len can only accept 1 arguments.");
    }

    #[test]
    fn function_param_types_are_enforced() {
        let msg = check_err("upper(tcp.port) == \"X\"");
        assert_eq!(
            msg,
            "Only string type fields can be used as parameter for upper() and lower().",
        );
    }

    #[test]
    fn function_return_type_drives_comparison() {
        assert!(run("len(http.host) > 2").is_ok());
        assert!(run("upper(http.host) == \"EXAMPLE\"").is_ok());
        let msg = check_err("len(http.host) == ip.src");
        assert_eq!(msg, "Function len and ip.src are not of compatible types.");
    }

    #[test]
    fn parens_suggestion_is_collected_once() {
        let deprecated = run("tcp.port and udp.port or http.host and ip.src").unwrap();
        assert_eq!(deprecated, vec!["suggest parentheses around '&&' within '||'"]);
        let none = run("(tcp.port and udp.port) or http.host").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn alias_chain_picks_literal_compatible_type() {
        let mut reg = FieldRegistry::new();
        reg.register("dual.field", FType::String);
        reg.register("dual.field", FType::Uint16);
        // The newest alias is numeric; a quoted string walks back to the
        // string registration.
        let mut root = parse_filter(&reg, "dual.field == \"name\"").unwrap();
        assert!(semcheck(&reg, &mut root).is_ok());
        let NodeKind::Test { rhs, .. } = &root.kind else { panic!() };
        let NodeKind::FValue(v) = &rhs.as_ref().unwrap().kind else { panic!() };
        assert_eq!(v.as_str(), Some("name"));
        // An unquoted number parses against the numeric alias directly.
        let mut root = parse_filter(&reg, "dual.field == 99").unwrap();
        assert!(semcheck(&reg, &mut root).is_ok());
    }

    #[test]
    fn deep_boolean_chains_do_not_overflow() {
        let mut filter = String::from("tcp.port == 0");
        for i in 1..10_000 {
            filter.push_str(&format!(" and tcp.port == {}", i % 1000));
        }
        assert!(run(&filter).is_ok());
    }
}

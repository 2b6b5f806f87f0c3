//! Filter functions callable from expressions, e.g. `len(ip.src)`.

use dfilter_types::{FType, Value};

use crate::error::TypeError;
use crate::registry::FieldRegistry;
use crate::syntax::{NodeKind, STNode};

/// Checks one function parameter after generic entity conversion; `index` is
/// the zero-based parameter position.
pub type ParamCheck = fn(&FieldRegistry, usize, &STNode) -> Result<(), TypeError>;

/// Evaluates the function over the (possibly empty) value lists fetched from
/// the parameter registers. Returns the boolean the accumulator takes,
/// alongside the values stored into the result register.
pub type FunctionImpl = fn(&[&Value], &[&Value]) -> (bool, Vec<Value>);

/// A filter-function descriptor.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_nargs: usize,
    pub max_nargs: usize,
    pub ret_ftype: FType,
    pub check_param: ParamCheck,
    pub run: FunctionImpl,
}

static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "upper",
        min_nargs: 1,
        max_nargs: 1,
        ret_ftype: FType::String,
        check_param: check_string_field_param,
        run: func_upper,
    },
    FunctionDef {
        name: "lower",
        min_nargs: 1,
        max_nargs: 1,
        ret_ftype: FType::String,
        check_param: check_string_field_param,
        run: func_lower,
    },
    FunctionDef {
        name: "len",
        min_nargs: 1,
        max_nargs: 1,
        ret_ftype: FType::Uint32,
        check_param: check_field_param,
        run: func_len,
    },
    FunctionDef {
        name: "count",
        min_nargs: 1,
        max_nargs: 1,
        ret_ftype: FType::Uint32,
        check_param: check_field_param,
        run: func_count,
    },
];

pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    FUNCTIONS.iter().find(|def| def.name == name)
}

fn check_string_field_param(
    registry: &FieldRegistry,
    _index: usize,
    param: &STNode,
) -> Result<(), TypeError> {
    match &param.kind {
        NodeKind::Field(id) if registry.field(*id).ftype.is_string_family() => Ok(()),
        _ => Err(TypeError(
            "Only string type fields can be used as parameter for upper() and lower().".into(),
        )),
    }
}

fn check_field_param(
    _registry: &FieldRegistry,
    _index: usize,
    param: &STNode,
) -> Result<(), TypeError> {
    match &param.kind {
        NodeKind::Field(_) => Ok(()),
        _ => Err(TypeError("Only fields can be used as function parameter.".into())),
    }
}

fn func_upper(p1: &[&Value], _p2: &[&Value]) -> (bool, Vec<Value>) {
    let out: Vec<Value> = p1
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| Value::string(s.to_uppercase()))
        .collect();
    (!out.is_empty(), out)
}

fn func_lower(p1: &[&Value], _p2: &[&Value]) -> (bool, Vec<Value>) {
    let out: Vec<Value> = p1
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| Value::string(s.to_lowercase()))
        .collect();
    (!out.is_empty(), out)
}

fn func_len(p1: &[&Value], _p2: &[&Value]) -> (bool, Vec<Value>) {
    let out: Vec<Value> = p1
        .iter()
        .filter_map(|v| v.byte_len())
        .map(|len| Value::uint(FType::Uint32, len as u64))
        .collect();
    (!out.is_empty(), out)
}

/// Number of occurrences of the field; defined even when the field is absent.
fn func_count(p1: &[&Value], _p2: &[&Value]) -> (bool, Vec<Value>) {
    (true, vec![Value::uint(FType::Uint32, p1.len() as u64)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_builtins() {
        assert!(lookup("len").is_some());
        assert!(lookup("upper").is_some());
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn upper_maps_every_occurrence() {
        let a = Value::string("abc");
        let b = Value::string("Def");
        let (found, out) = func_upper(&[&a, &b], &[]);
        assert!(found);
        assert_eq!(out, vec![Value::string("ABC"), Value::string("DEF")]);
        let (found, out) = func_upper(&[], &[]);
        assert!(!found);
        assert!(out.is_empty());
    }

    #[test]
    fn len_uses_the_byte_view() {
        let v = Value::bytes(vec![1, 2, 3]);
        let (found, out) = func_len(&[&v], &[]);
        assert!(found);
        assert_eq!(out, vec![Value::uint(FType::Uint32, 3)]);
    }

    #[test]
    fn count_of_nothing_is_zero() {
        let (found, out) = func_count(&[], &[]);
        assert!(found, "count reports a value even for an absent field");
        assert_eq!(out, vec![Value::uint(FType::Uint32, 0)]);
    }
}

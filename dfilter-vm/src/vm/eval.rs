//! Program evaluation against a field tree.

use dfilter_types::Value;
use regex::bytes::Regex;
use tracing::trace;

use crate::registry::FieldId;
use crate::tree::FieldTree;

use super::{Insn, Program, RegisterId};

/// Contents of one register slot during a run.
///
/// Field values are borrowed from the tree and constants from the program;
/// sliced and function-produced values are owned by the slot and die with the
/// run. The variant stands in for the classic owns-memory flag.
#[derive(Debug)]
pub(crate) enum Slot<'a> {
    Borrowed(Vec<&'a Value>),
    Owned(Vec<Value>),
    Pattern(&'a Regex),
}

/// Iterator over the values held in one register; empty for unloaded slots
/// and patterns.
enum ValueIter<'s, 'a> {
    Borrowed(std::slice::Iter<'s, &'a Value>),
    Owned(std::slice::Iter<'s, Value>),
    Empty,
}

impl<'s, 'a: 's> Iterator for ValueIter<'s, 'a> {
    type Item = &'s Value;

    fn next(&mut self) -> Option<&'s Value> {
        match self {
            ValueIter::Borrowed(values) => values.next().map(|v| &**v),
            ValueIter::Owned(values) => values.next(),
            ValueIter::Empty => None,
        }
    }
}

/// Per-evaluation scratch: the register file and the per-register
/// attempted-load flags. Created fresh for each call, with the constant
/// slots populated from the program's constants section.
#[derive(Debug)]
pub(crate) struct EvalContext<'a> {
    regs: Vec<Option<Slot<'a>>>,
    attempted_load: Vec<bool>,
    first_constant: usize,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(program: &'a Program) -> Self {
        let mut ctx = EvalContext {
            regs: (0..program.num_registers).map(|_| None).collect(),
            attempted_load: vec![false; program.num_registers],
            first_constant: program.first_constant,
        };
        for insn in &program.consts {
            match insn {
                Insn::PutFValue { value, dest } => {
                    ctx.regs[*dest] = Some(Slot::Borrowed(vec![value]));
                }
                Insn::PutPcre { pattern, dest } => {
                    ctx.regs[*dest] = Some(Slot::Pattern(pattern));
                }
                _ => unreachable!("only PUT_* instructions live in the constants section"),
            }
        }
        ctx
    }

    fn values<'s>(&'s self, reg: RegisterId) -> ValueIter<'s, 'a> {
        match self.regs[reg].as_ref() {
            Some(Slot::Borrowed(values)) => ValueIter::Borrowed(values.iter()),
            Some(Slot::Owned(values)) => ValueIter::Owned(values.iter()),
            Some(Slot::Pattern(_)) | None => ValueIter::Empty,
        }
    }

    /// Release everything a run loaded or produced, leaving constants alone.
    fn reset(&mut self) {
        for reg in 0..self.first_constant {
            self.regs[reg] = None;
            self.attempted_load[reg] = false;
        }
    }

    #[cfg(test)]
    pub(crate) fn register(&self, reg: RegisterId) -> Option<&Slot<'a>> {
        self.regs[reg].as_ref()
    }

    #[cfg(test)]
    pub(crate) fn attempted_load(&self, reg: RegisterId) -> bool {
        self.attempted_load[reg]
    }
}

impl Program {
    /// Evaluate the program against one packet's field tree.
    pub fn apply(&self, tree: &FieldTree) -> bool {
        let mut ctx = EvalContext::new(self);
        self.eval(tree, &mut ctx)
    }

    pub(crate) fn eval<'a>(&'a self, tree: &'a FieldTree, ctx: &mut EvalContext<'a>) -> bool {
        trace!(insns = self.insns.len(), "apply");
        let mut acc = true;
        let mut ip = 0;
        loop {
            let Some(insn) = self.insns.get(ip) else {
                unreachable!("program ended without RETURN");
            };
            match insn {
                Insn::CheckExists { field } => {
                    acc = self
                        .registry
                        .alias_chain(*field)
                        .any(|hf| tree.has_field(hf.id));
                }
                Insn::ReadTree { field, dest } => {
                    acc = self.read_tree(tree, ctx, *field, *dest);
                }
                Insn::CallFunction { func, dest, param1, param2 } => {
                    let p1: Vec<&Value> =
                        param1.map(|reg| ctx.values(reg).collect()).unwrap_or_default();
                    let p2: Vec<&Value> =
                        param2.map(|reg| ctx.values(reg).collect()).unwrap_or_default();
                    let (found, result) = (func.run)(&p1, &p2);
                    acc = found;
                    // The function made these values, so the slot owns them.
                    ctx.regs[*dest] =
                        (!result.is_empty()).then_some(Slot::Owned(result));
                }
                Insn::MkRange { src, dest, range } => {
                    let sliced: Vec<Value> = ctx
                        .values(*src)
                        .map(|v| v.slice(range).expect("slice legality checked at compile time"))
                        .collect();
                    ctx.regs[*dest] = (!sliced.is_empty()).then_some(Slot::Owned(sliced));
                }
                Insn::AnyEq { a, b } => acc = any_test(ctx, Value::cmp_eq, *a, *b),
                Insn::AllNe { a, b } => acc = all_test(ctx, Value::cmp_ne, *a, *b),
                Insn::AnyNe { a, b } => acc = any_test(ctx, Value::cmp_ne, *a, *b),
                Insn::AnyGt { a, b } => acc = any_test(ctx, Value::cmp_gt, *a, *b),
                Insn::AnyGe { a, b } => acc = any_test(ctx, Value::cmp_ge, *a, *b),
                Insn::AnyLt { a, b } => acc = any_test(ctx, Value::cmp_lt, *a, *b),
                Insn::AnyLe { a, b } => acc = any_test(ctx, Value::cmp_le, *a, *b),
                Insn::AnyBitwiseAnd { a, b } => {
                    acc = any_test(ctx, Value::bitwise_and, *a, *b)
                }
                Insn::AnyContains { a, b } => acc = any_test(ctx, Value::contains, *a, *b),
                Insn::AnyMatches { a, b } => {
                    let Some(Slot::Pattern(pattern)) = ctx.regs[*b].as_ref() else {
                        unreachable!("ANY_MATCHES operand is not a compiled pattern");
                    };
                    acc = ctx.values(*a).any(|v| v.matches(pattern));
                }
                Insn::AnyInRange { a, low, high } => {
                    let low = singleton(ctx, *low);
                    let high = singleton(ctx, *high);
                    acc = ctx.values(*a).any(|v| v.cmp_ge(low) && v.cmp_le(high));
                }
                Insn::Not => acc = !acc,
                Insn::IfTrueGoto { target } => {
                    if acc {
                        ip = *target;
                        continue;
                    }
                }
                Insn::IfFalseGoto { target } => {
                    if !acc {
                        ip = *target;
                        continue;
                    }
                }
                Insn::Return => {
                    ctx.reset();
                    return acc;
                }
                Insn::PutFValue { .. } | Insn::PutPcre { .. } => {
                    unreachable!("constants live in the constants section")
                }
            }
            ip += 1;
        }
    }

    /// Load every occurrence of the field (walking the alias chain) into a
    /// register. Idempotent per run: a second load of the same register only
    /// reports whether the first found anything.
    fn read_tree<'a>(
        &'a self,
        tree: &'a FieldTree,
        ctx: &mut EvalContext<'a>,
        field: FieldId,
        reg: RegisterId,
    ) -> bool {
        if ctx.attempted_load[reg] {
            return ctx.regs[reg].is_some();
        }
        ctx.attempted_load[reg] = true;

        let mut values: Vec<&'a Value> = Vec::new();
        for hf in self.registry.alias_chain(field) {
            if let Some(occurrences) = tree.values(hf.id) {
                values.extend(occurrences.iter());
            }
        }
        if values.is_empty() {
            return false;
        }
        // Occurrences are prepended, so the register holds them in reverse
        // encounter order. The quantified comparisons never care.
        values.reverse();
        ctx.regs[reg] = Some(Slot::Borrowed(values));
        true
    }
}

/// The quantified comparison core: existential or universal over the
/// cross-product of two registers. An absent register is an empty list, so
/// any-tests are vacuously false and all-tests vacuously true.
fn cmp_test(
    ctx: &EvalContext<'_>,
    want_all: bool,
    matches: fn(&Value, &Value) -> bool,
    a: RegisterId,
    b: RegisterId,
) -> bool {
    for va in ctx.values(a) {
        for vb in ctx.values(b) {
            let have_match = matches(va, vb);
            if want_all && !have_match {
                return false;
            }
            if !want_all && have_match {
                return true;
            }
        }
    }
    want_all
}

fn any_test(
    ctx: &EvalContext<'_>,
    matches: fn(&Value, &Value) -> bool,
    a: RegisterId,
    b: RegisterId,
) -> bool {
    cmp_test(ctx, false, matches, a, b)
}

fn all_test(
    ctx: &EvalContext<'_>,
    matches: fn(&Value, &Value) -> bool,
    a: RegisterId,
    b: RegisterId,
) -> bool {
    cmp_test(ctx, true, matches, a, b)
}

/// Range bounds come from singleton registers; anything else is a bug the
/// checker should have caught.
fn singleton<'s>(ctx: &'s EvalContext<'_>, reg: RegisterId) -> &'s Value {
    let mut values = ctx.values(reg);
    let value = values.next().expect("range bound register holds exactly one value");
    assert!(values.next().is_none(), "range bound register holds exactly one value");
    value
}

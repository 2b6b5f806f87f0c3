//! Lowering of the checked syntax tree into a program.
//!
//! Registers are handed out from a single counter; a field is loaded at most
//! once per program, memoized by its alias-chain head. Constants collect
//! placeholder registers while the tree is lowered and are assigned the top
//! of the register range afterwards, so the constant block always sits at
//! `[first_constant, num_registers)`.

use std::collections::HashMap;
use std::sync::Arc;

use dfilter_types::Value;
use regex::bytes::Regex;
use tracing::trace;

use crate::registry::{FieldId, FieldRegistry};
use crate::syntax::{NodeKind, STNode, SetElement, TestOp};
use crate::vm::{Insn, Program, RegisterId};

/// Placeholder bias for constant registers until their final slots are known.
const CONST_REG_BASE: usize = usize::MAX / 2;

enum Constant {
    Value(Value),
    Pattern(Regex),
}

pub(crate) fn gencode(
    registry: &Arc<FieldRegistry>,
    root: &STNode,
    deprecated: Vec<String>,
) -> Program {
    let mut generator = Generator {
        registry: registry.as_ref(),
        insns: Vec::new(),
        consts: Vec::new(),
        loaded_fields: HashMap::new(),
        interesting: Vec::new(),
        next_register: 0,
    };
    generator.gen_spine(root);
    generator.emit(Insn::Return);
    generator.finish(Arc::clone(registry), deprecated)
}

/// Deferred work while walking the boolean spine iteratively.
enum Action<'t> {
    Gen(&'t STNode),
    EmitJump { if_true: bool, slot: usize },
    Patch { slot: usize },
    EmitNot,
}

struct Generator<'r> {
    registry: &'r FieldRegistry,
    insns: Vec<Insn>,
    consts: Vec<Constant>,
    loaded_fields: HashMap<FieldId, RegisterId>,
    interesting: Vec<FieldId>,
    next_register: usize,
}

impl<'r> Generator<'r> {
    fn emit(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    fn alloc_register(&mut self) -> RegisterId {
        let reg = self.next_register;
        self.next_register += 1;
        reg
    }

    fn alloc_constant(&mut self, constant: Constant) -> RegisterId {
        self.consts.push(constant);
        CONST_REG_BASE + (self.consts.len() - 1)
    }

    /// A load anchors on the chain head, so every alias is interesting.
    fn mark_interesting(&mut self, head: FieldId) {
        for hf in self.registry.alias_chain(head) {
            if !self.interesting.contains(&hf.id) {
                self.interesting.push(hf.id);
            }
        }
    }

    /// Lower the and/or/not spine with an explicit stack; relation leaves
    /// are lowered directly.
    fn gen_spine(&mut self, root: &STNode) {
        let mut jump_sites: Vec<usize> = Vec::new();
        let mut actions = vec![Action::Gen(root)];
        while let Some(action) = actions.pop() {
            match action {
                Action::Gen(node) => {
                    let NodeKind::Test { op, lhs, rhs } = &node.kind else {
                        unreachable!("gencode runs on checked test trees");
                    };
                    match op {
                        TestOp::Exists => self.gen_exists(lhs),
                        TestOp::Not => {
                            actions.push(Action::EmitNot);
                            actions.push(Action::Gen(&**lhs));
                        }
                        TestOp::And | TestOp::Or => {
                            let rhs = rhs.as_deref().expect("and/or test nodes are binary");
                            let slot = jump_sites.len();
                            jump_sites.push(usize::MAX);
                            // code(a); jump-over; code(b); patch target here.
                            actions.push(Action::Patch { slot });
                            actions.push(Action::Gen(rhs));
                            actions.push(Action::EmitJump {
                                if_true: matches!(op, TestOp::Or),
                                slot,
                            });
                            actions.push(Action::Gen(&**lhs));
                        }
                        _ => {
                            let rhs = rhs.as_deref().expect("relation test nodes are binary");
                            self.gen_relation(*op, lhs, rhs);
                        }
                    }
                }
                Action::EmitJump { if_true, slot } => {
                    jump_sites[slot] = self.insns.len();
                    self.emit(if if_true {
                        Insn::IfTrueGoto { target: usize::MAX }
                    } else {
                        Insn::IfFalseGoto { target: usize::MAX }
                    });
                }
                Action::Patch { slot } => {
                    let target = self.insns.len();
                    match &mut self.insns[jump_sites[slot]] {
                        Insn::IfTrueGoto { target: t } | Insn::IfFalseGoto { target: t } => {
                            *t = target
                        }
                        _ => unreachable!("jump site records only goto instructions"),
                    }
                }
                Action::EmitNot => self.emit(Insn::Not),
            }
        }
    }

    fn gen_exists(&mut self, node: &STNode) {
        let NodeKind::Field(id) = node.kind else {
            unreachable!("existence tests take fields");
        };
        let head = self.registry.chain_head(id);
        self.mark_interesting(head);
        self.emit(Insn::CheckExists { field: head });
    }

    fn gen_relation(&mut self, op: TestOp, lhs: &STNode, rhs: &STNode) {
        trace!(?op, "gen_relation");
        if op == TestOp::In {
            let a = self.gen_entity(lhs);
            self.gen_set(a, rhs);
            return;
        }
        let a = self.gen_entity(lhs);
        let b = self.gen_entity(rhs);
        let insn = match op {
            TestOp::AnyEq => Insn::AnyEq { a, b },
            TestOp::AllNe => Insn::AllNe { a, b },
            TestOp::AnyNe => Insn::AnyNe { a, b },
            TestOp::Gt => Insn::AnyGt { a, b },
            TestOp::Ge => Insn::AnyGe { a, b },
            TestOp::Lt => Insn::AnyLt { a, b },
            TestOp::Le => Insn::AnyLe { a, b },
            TestOp::BitwiseAnd => Insn::AnyBitwiseAnd { a, b },
            TestOp::Contains => Insn::AnyContains { a, b },
            TestOp::Matches => Insn::AnyMatches { a, b },
            _ => unreachable!(),
        };
        self.emit(insn);
    }

    /// Membership lowers to an equality (or bounds check) per element,
    /// short-circuited with IF-TRUE-GOTO to the end of the chain.
    fn gen_set(&mut self, a: RegisterId, node: &STNode) {
        let NodeKind::Set(elements) = &node.kind else {
            unreachable!("`in` right sides are sets");
        };
        let mut pending: Vec<usize> = Vec::new();
        let last = elements.len() - 1;
        for (index, element) in elements.iter().enumerate() {
            match element {
                SetElement::Single(value) => {
                    let b = self.gen_entity(value);
                    self.emit(Insn::AnyEq { a, b });
                }
                SetElement::Range(low, high) => {
                    let low = self.gen_entity(low);
                    let high = self.gen_entity(high);
                    self.emit(Insn::AnyInRange { a, low, high });
                }
            }
            if index != last {
                pending.push(self.insns.len());
                self.emit(Insn::IfTrueGoto { target: usize::MAX });
            }
        }
        let end = self.insns.len();
        for site in pending {
            let Insn::IfTrueGoto { target } = &mut self.insns[site] else {
                unreachable!("jump site records only goto instructions");
            };
            *target = end;
        }
    }

    fn gen_entity(&mut self, node: &STNode) -> RegisterId {
        match &node.kind {
            NodeKind::Field(id) => {
                let head = self.registry.chain_head(*id);
                self.mark_interesting(head);
                if let Some(&reg) = self.loaded_fields.get(&head) {
                    return reg;
                }
                let reg = self.alloc_register();
                self.loaded_fields.insert(head, reg);
                self.emit(Insn::ReadTree { field: head, dest: reg });
                reg
            }
            NodeKind::FValue(value) => self.alloc_constant(Constant::Value(value.clone())),
            NodeKind::Pcre(pattern) => self.alloc_constant(Constant::Pattern(pattern.clone())),
            NodeKind::Range { entity, range } => {
                let src = self.gen_entity(entity);
                let dest = self.alloc_register();
                self.emit(Insn::MkRange { src, dest, range: range.clone() });
                dest
            }
            NodeKind::Function { def, params } => {
                let regs: Vec<RegisterId> =
                    params.iter().map(|param| self.gen_entity(param)).collect();
                let dest = self.alloc_register();
                self.emit(Insn::CallFunction {
                    func: *def,
                    dest,
                    param1: regs.first().copied(),
                    param2: regs.get(1).copied(),
                });
                dest
            }
            _ => unreachable!("checked entities are fields, values, patterns, ranges or functions"),
        }
    }

    fn finish(mut self, registry: Arc<FieldRegistry>, deprecated: Vec<String>) -> Program {
        let first_constant = self.next_register;
        for insn in &mut self.insns {
            remap_constants(insn, first_constant);
        }
        let consts: Vec<Insn> = self
            .consts
            .into_iter()
            .enumerate()
            .map(|(index, constant)| match constant {
                Constant::Value(value) => {
                    Insn::PutFValue { value, dest: first_constant + index }
                }
                Constant::Pattern(pattern) => {
                    Insn::PutPcre { pattern, dest: first_constant + index }
                }
            })
            .collect();
        let num_registers = first_constant + consts.len();
        Program {
            registry,
            consts,
            insns: self.insns,
            num_registers,
            first_constant,
            interesting_fields: self.interesting,
            deprecated,
        }
    }
}

/// Rewrite placeholder constant registers to their final slots above the
/// scratch range.
fn remap_constants(insn: &mut Insn, first_constant: usize) {
    fn remap(reg: &mut RegisterId, first_constant: usize) {
        if *reg >= CONST_REG_BASE {
            *reg = first_constant + (*reg - CONST_REG_BASE);
        }
    }
    match insn {
        Insn::ReadTree { dest, .. } => remap(dest, first_constant),
        Insn::CallFunction { dest, param1, param2, .. } => {
            remap(dest, first_constant);
            if let Some(reg) = param1 {
                remap(reg, first_constant);
            }
            if let Some(reg) = param2 {
                remap(reg, first_constant);
            }
        }
        Insn::MkRange { src, dest, .. } => {
            remap(src, first_constant);
            remap(dest, first_constant);
        }
        Insn::AnyEq { a, b }
        | Insn::AllNe { a, b }
        | Insn::AnyNe { a, b }
        | Insn::AnyGt { a, b }
        | Insn::AnyGe { a, b }
        | Insn::AnyLt { a, b }
        | Insn::AnyLe { a, b }
        | Insn::AnyBitwiseAnd { a, b }
        | Insn::AnyContains { a, b }
        | Insn::AnyMatches { a, b } => {
            remap(a, first_constant);
            remap(b, first_constant);
        }
        Insn::AnyInRange { a, low, high } => {
            remap(a, first_constant);
            remap(low, first_constant);
            remap(high, first_constant);
        }
        Insn::CheckExists { .. }
        | Insn::Not
        | Insn::IfTrueGoto { .. }
        | Insn::IfFalseGoto { .. }
        | Insn::Return => {}
        Insn::PutFValue { .. } | Insn::PutPcre { .. } => {
            unreachable!("PUT_* instructions are built after remapping")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_filter;
    use crate::semcheck::semcheck;
    use dfilter_types::FType;

    fn compile(filter: &str) -> Program {
        let mut registry = FieldRegistry::new();
        registry.register("ip.src", FType::Ipv4);
        registry.register("tcp.port", FType::Uint16);
        registry.register("udp.port", FType::Uint16);
        registry.register("http.host", FType::String);
        let registry = Arc::new(registry);
        let mut root = parse_filter(&registry, filter).expect("parse");
        let deprecated = semcheck(&registry, &mut root).expect("semcheck");
        gencode(&registry, &root, deprecated)
    }

    #[test]
    fn field_loads_are_memoized() {
        let p = compile("tcp.port == 80 or tcp.port == 443");
        let reads = p
            .instructions()
            .iter()
            .filter(|insn| matches!(insn, Insn::ReadTree { .. }))
            .count();
        assert_eq!(reads, 1);
    }

    #[test]
    fn constants_sit_on_top_of_the_register_range() {
        let p = compile("tcp.port == 80 or udp.port == 443");
        assert_eq!(p.first_constant(), 2, "two field registers below the constants");
        assert_eq!(p.num_registers(), 4);
        for (index, insn) in p.constants().iter().enumerate() {
            let Insn::PutFValue { dest, .. } = insn else {
                panic!("unexpected constant {insn:?}");
            };
            assert_eq!(*dest, p.first_constant() + index);
        }
        // No instruction register reaches the constant placeholders, and
        // nothing writes into the constant block.
        for insn in p.instructions() {
            if let Insn::ReadTree { dest, .. } | Insn::MkRange { dest, .. } = insn {
                assert!(*dest < p.first_constant());
            }
        }
    }

    #[test]
    fn and_emits_if_false_over_the_second_operand() {
        let p = compile("tcp.port == 80 and udp.port == 53");
        let insns = p.instructions();
        // read, any_eq, if-false, read, any_eq, return
        assert!(matches!(insns[2], Insn::IfFalseGoto { target: 5 }));
        assert!(matches!(insns[5], Insn::Return));
    }

    #[test]
    fn or_emits_if_true() {
        let p = compile("tcp.port == 80 or udp.port == 53");
        assert!(matches!(p.instructions()[2], Insn::IfTrueGoto { target: 5 }));
    }

    #[test]
    fn in_set_lowers_to_eq_and_range_checks() {
        let p = compile("tcp.port in {80, 443, 100..200}");
        let insns = p.instructions();
        assert!(matches!(insns[0], Insn::ReadTree { .. }));
        assert!(matches!(insns[1], Insn::AnyEq { .. }));
        assert!(matches!(insns[2], Insn::IfTrueGoto { target: 6 }));
        assert!(matches!(insns[3], Insn::AnyEq { .. }));
        assert!(matches!(insns[4], Insn::IfTrueGoto { target: 6 }));
        assert!(matches!(insns[5], Insn::AnyInRange { .. }));
        assert!(matches!(insns[6], Insn::Return));
    }

    #[test]
    fn interesting_fields_cover_every_load() {
        let p = compile("tcp.port == 80 and ip.src == 10.0.0.1 and udp.port");
        let mut referenced = Vec::new();
        for insn in p.instructions() {
            match insn {
                Insn::ReadTree { field, .. } | Insn::CheckExists { field } => {
                    referenced.push(*field)
                }
                _ => {}
            }
        }
        for field in referenced {
            assert!(p.interesting_fields().contains(&field));
        }
    }

    #[test]
    fn exists_lowers_to_check_exists_only() {
        let p = compile("udp.port");
        assert_eq!(p.instructions().len(), 2);
        assert!(matches!(p.instructions()[0], Insn::CheckExists { .. }));
        assert!(matches!(p.instructions()[1], Insn::Return));
        assert_eq!(p.num_registers(), 0);
    }

    #[test]
    fn matches_loads_the_pattern_constant() {
        let p = compile("http.host matches \"example\"");
        assert!(matches!(p.constants()[0], Insn::PutPcre { .. }));
        assert!(matches!(p.instructions()[1], Insn::AnyMatches { .. }));
    }

    #[test]
    fn slice_emits_mk_range() {
        let p = compile("ip.src[0:2] == 0a:00");
        let insns = p.instructions();
        assert!(matches!(insns[0], Insn::ReadTree { .. }));
        assert!(matches!(insns[1], Insn::MkRange { .. }));
        assert!(matches!(insns[2], Insn::AnyEq { .. }));
    }
}

//! Textual program dump, one line per instruction.
//!
//! The format is stable and covered by golden tests: five-digit instruction
//! indices, tab-separated mnemonics, the constants section first.

use std::fmt;

use itertools::Itertools;

use super::{Insn, Program};

impl Program {
    /// Disassemble the program into `w`.
    pub fn dump<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        writeln!(w, "Constants:")?;
        for (id, insn) in self.consts.iter().enumerate() {
            match insn {
                Insn::PutFValue { value, dest } => writeln!(
                    w,
                    "{id:05} PUT_FVALUE\t{value} <{}> -> reg#{dest}",
                    value.ftype().name()
                )?,
                Insn::PutPcre { pattern, dest } => writeln!(
                    w,
                    "{id:05} PUT_PCRE  \t{} <Regex> -> reg#{dest}",
                    pattern.as_str()
                )?,
                _ => unreachable!("only PUT_* instructions live in the constants section"),
            }
        }

        writeln!(w, "\nInstructions:")?;
        for (id, insn) in self.insns.iter().enumerate() {
            match insn {
                Insn::CheckExists { field } => {
                    writeln!(w, "{id:05} CHECK_EXISTS\t{}", self.registry.field(*field).abbrev)?
                }
                Insn::ReadTree { field, dest } => writeln!(
                    w,
                    "{id:05} READ_TREE\t\t{} -> reg#{dest}",
                    self.registry.field(*field).abbrev
                )?,
                Insn::CallFunction { func, dest, param1, param2 } => {
                    let params = [param1, param2]
                        .into_iter()
                        .flatten()
                        .map(|reg| format!("reg#{reg}"))
                        .join(", ");
                    writeln!(w, "{id:05} CALL_FUNCTION\t{} ({params}) --> reg#{dest}", func.name)?;
                }
                Insn::MkRange { src, dest, range } => {
                    writeln!(w, "{id:05} MK_RANGE\t\treg#{src}[{range}] -> reg#{dest}")?
                }
                Insn::AnyEq { a, b } => writeln!(w, "{id:05} ANY_EQ\t\treg#{a} == reg#{b}")?,
                Insn::AllNe { a, b } => writeln!(w, "{id:05} ALL_NE\t\treg#{a} == reg#{b}")?,
                Insn::AnyNe { a, b } => writeln!(w, "{id:05} ANY_NE\t\treg#{a} == reg#{b}")?,
                Insn::AnyGt { a, b } => writeln!(w, "{id:05} ANY_GT\t\treg#{a} == reg#{b}")?,
                Insn::AnyGe { a, b } => writeln!(w, "{id:05} ANY_GE\t\treg#{a} == reg#{b}")?,
                Insn::AnyLt { a, b } => writeln!(w, "{id:05} ANY_LT\t\treg#{a} == reg#{b}")?,
                Insn::AnyLe { a, b } => writeln!(w, "{id:05} ANY_LE\t\treg#{a} == reg#{b}")?,
                Insn::AnyBitwiseAnd { a, b } => {
                    writeln!(w, "{id:05} ANY_BITWISE_AND\t\treg#{a} == reg#{b}")?
                }
                Insn::AnyContains { a, b } => {
                    writeln!(w, "{id:05} ANY_CONTAINS\treg#{a} contains reg#{b}")?
                }
                Insn::AnyMatches { a, b } => {
                    writeln!(w, "{id:05} ANY_MATCHES\treg#{a} matches reg#{b}")?
                }
                Insn::AnyInRange { a, low, high } => writeln!(
                    w,
                    "{id:05} ANY_IN_RANGE\treg#{a} in range reg#{low},reg#{high}"
                )?,
                Insn::Not => writeln!(w, "{id:05} NOT")?,
                Insn::Return => writeln!(w, "{id:05} RETURN")?,
                Insn::IfTrueGoto { target } => {
                    writeln!(w, "{id:05} IF-TRUE-GOTO\t{target}")?
                }
                Insn::IfFalseGoto { target } => {
                    writeln!(w, "{id:05} IF-FALSE-GOTO\t{target}")?
                }
                Insn::PutFValue { .. } | Insn::PutPcre { .. } => {
                    unreachable!("PUT_* instructions live in the constants section")
                }
            }
        }
        Ok(())
    }
}

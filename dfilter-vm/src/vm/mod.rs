//! The compiled program and its bytecode.

mod dump;
mod eval;

use std::sync::Arc;

use dfilter_types::{DRange, Value};
use regex::bytes::Regex;

use crate::functions::FunctionDef;
use crate::registry::{FieldId, FieldRegistry};

/// Index of a register slot.
pub type RegisterId = usize;

/// One instruction.
///
/// `PutFValue` and `PutPcre` only appear in the constants section; everything
/// else only in the instruction section. Register operands always refer to
/// slots below [`Program::num_registers`], and jump targets to instruction
/// indices within the same program.
#[derive(Debug)]
pub enum Insn {
    PutFValue { value: Value, dest: RegisterId },
    PutPcre { pattern: Regex, dest: RegisterId },
    CheckExists { field: FieldId },
    ReadTree { field: FieldId, dest: RegisterId },
    CallFunction {
        func: &'static FunctionDef,
        dest: RegisterId,
        param1: Option<RegisterId>,
        param2: Option<RegisterId>,
    },
    MkRange { src: RegisterId, dest: RegisterId, range: DRange },
    AnyEq { a: RegisterId, b: RegisterId },
    AllNe { a: RegisterId, b: RegisterId },
    AnyNe { a: RegisterId, b: RegisterId },
    AnyGt { a: RegisterId, b: RegisterId },
    AnyGe { a: RegisterId, b: RegisterId },
    AnyLt { a: RegisterId, b: RegisterId },
    AnyLe { a: RegisterId, b: RegisterId },
    AnyBitwiseAnd { a: RegisterId, b: RegisterId },
    AnyContains { a: RegisterId, b: RegisterId },
    AnyMatches { a: RegisterId, b: RegisterId },
    AnyInRange { a: RegisterId, low: RegisterId, high: RegisterId },
    Not,
    IfTrueGoto { target: usize },
    IfFalseGoto { target: usize },
    Return,
}

/// A compiled filter program.
///
/// Immutable once built; evaluation scratch lives in a per-call context, so
/// one program may be applied from several threads at once.
#[derive(Debug)]
pub struct Program {
    pub(crate) registry: Arc<FieldRegistry>,
    pub(crate) consts: Vec<Insn>,
    pub(crate) insns: Vec<Insn>,
    pub(crate) num_registers: usize,
    pub(crate) first_constant: usize,
    pub(crate) interesting_fields: Vec<FieldId>,
    pub(crate) deprecated: Vec<String>,
}

impl Program {
    /// The constants section.
    pub fn constants(&self) -> &[Insn] {
        &self.consts
    }

    /// The instruction section.
    pub fn instructions(&self) -> &[Insn] {
        &self.insns
    }

    /// Total register count; constants occupy the top of the range.
    pub fn num_registers(&self) -> usize {
        self.num_registers
    }

    /// First register index holding a constant.
    pub fn first_constant(&self) -> usize {
        self.first_constant
    }

    /// Every field id the program may consult, for dissector pruning.
    pub fn interesting_fields(&self) -> &[FieldId] {
        &self.interesting_fields
    }

    /// Deprecation notices collected while compiling.
    pub fn deprecated_tokens(&self) -> &[String] {
        &self.deprecated
    }
}

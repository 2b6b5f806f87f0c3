//! Display filter engine.
//!
//! Compiles textual filter expressions (`ip.addr == 10.0.0.1 and tcp.port in
//! {80,443}`) against a field registry into a compact register-based bytecode
//! program, then evaluates that program against a packet's field tree.
//!
//! Compilation runs the expression through three stages: the parser produces
//! a tagged syntax tree, the semantic checker types it (coercing literals to
//! the field's value type and rewriting nodes where a relation needs byte
//! semantics), and the code generator lowers it into a [`vm::Program`] with a
//! constants section, short-circuit jumps and per-field load memoization.
//! Evaluation is infallible; anything a program could trip over is rejected
//! at compile time.
//!
//! ```
//! use std::sync::Arc;
//!
//! use dfilter_types::{FType, Value};
//! use dfilter_vm::registry::FieldRegistry;
//! use dfilter_vm::tree::FieldTree;
//!
//! let mut registry = FieldRegistry::new();
//! let tcp_port = registry.register("tcp.port", FType::Uint16);
//! let registry = Arc::new(registry);
//!
//! let program = dfilter_vm::compile(&registry, "tcp.port in {80, 443}").unwrap();
//!
//! let mut tree = FieldTree::new();
//! tree.add(tcp_port, Value::uint(FType::Uint16, 443));
//! assert!(program.apply(&tree));
//! ```

use std::sync::Arc;

pub mod error;
pub mod functions;
mod gencode;
mod parser;
pub mod registry;
mod semcheck;
pub mod syntax;
pub mod tree;
pub mod vm;

use error::Error;
use registry::FieldRegistry;
use vm::Program;

pub mod prelude {
    pub use dfilter_types::{DRange, DRangeNode, FType, Value};

    pub use crate::compile;
    pub use crate::error::{Error, ParseError, TypeError};
    pub use crate::registry::{DisplayHint, FieldId, FieldRegistry, HField, ValueStrings};
    pub use crate::tree::FieldTree;
    pub use crate::vm::{Insn, Program, RegisterId};
}

/// Compile a filter expression: parse, check, lower.
pub fn compile(registry: &Arc<FieldRegistry>, text: &str) -> Result<Program, Error> {
    let mut root = parser::parse_filter(registry, text)?;
    let deprecated = semcheck::semcheck(registry, &mut root)?;
    Ok(gencode::gencode(registry, &root, deprecated))
}

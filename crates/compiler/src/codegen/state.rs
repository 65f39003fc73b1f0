//! CodeGen state and core types.
//!
//! `CodeGen` owns everything that persists across the traversal: the
//! output writer, the label counters, and the global symbol tables. The
//! actual lowering lives in the sibling modules as `impl CodeGen` blocks.

use super::emit::AsmWriter;
use super::frame::StackEntry;
use super::platform::Target;
use crate::ast::GlobalVar;
use std::collections::HashMap;

/// How a function is called and named at the assembly level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Linkage {
    /// This compiler's own convention: label `?@name`, result pushed by
    /// the callee, epilogue via `jmp ebx`.
    Native,
    /// System V 32-bit cdecl with 16-byte pre-call alignment.
    C { varargs: bool },
}

/// A callable symbol: a defined function or an extern.
#[derive(Debug, Clone)]
pub(super) struct FuncSig {
    pub ret_void: bool,
    pub params: Vec<String>,
    /// The symbol named in the `call` (already prefixed/decorated).
    pub symbol: String,
    pub linkage: Linkage,
}

impl FuncSig {
    /// Human-readable prototype for diagnostics.
    pub fn prototype(&self, name: &str) -> String {
        let mut parts = self.params.clone();
        if matches!(self.linkage, Linkage::C { varargs: true }) {
            parts.push("...".to_string());
        }
        format!("{}({})", name, parts.join(", "))
    }
}

pub struct CodeGen {
    pub(super) out: AsmWriter,
    pub(super) target: Target,

    // Label counters. All are program-wide so every `.ifN`/`.whileN`/
    // `.lN`/`??slN` is unique across the output.
    pub(super) whilec: u32,
    pub(super) ifc: u32,
    pub(super) stringc: u32,
    /// Generic labels, used by comparisons and short-circuiting.
    pub(super) labelc: u32,

    /// Global variables by name.
    pub(super) gvars: HashMap<String, StackEntry>,
    /// Callable functions by source name (defined and extern).
    pub(super) gfuncs: HashMap<String, FuncSig>,
    /// Data-section worklist. String literals synthesized during lowering
    /// are appended here and emitted after the variables that referenced
    /// them.
    pub(super) variables: Vec<GlobalVar>,
}

impl CodeGen {
    pub fn new(target: Target) -> Self {
        Self::with_writer(target, AsmWriter::new())
    }

    pub fn with_writer(target: Target, out: AsmWriter) -> Self {
        CodeGen {
            out,
            target,
            whilec: 0,
            ifc: 0,
            stringc: 0,
            labelc: 0,
            gvars: HashMap::new(),
            gfuncs: HashMap::new(),
            variables: Vec::new(),
        }
    }

    /// Report a non-fatal diagnostic; compilation proceeds.
    pub(super) fn warn(&self, message: &str) {
        eprintln!("WARNING: {}", message);
    }
}

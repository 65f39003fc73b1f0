//! The `.data` section and literal operands.
//!
//! Global variables are emitted as `dd`/`db` directives labeled with the
//! variable name. String literals that turn up while lowering expressions
//! or array initializers synthesize fresh `??slN` globals; those are
//! appended to the worklist and emitted after the variables that
//! referenced them, which is why the loop below re-reads the list length
//! on every step.

use super::{CodeGen, CodeGenError};
use crate::ast::{GlobalVar, Initializer, Literal, PrimType, VarType};

/// Byte length of a string literal: every `\`-escape collapses to one
/// assembler byte.
pub(super) fn literal_len(s: &str) -> u32 {
    let mut len = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        }
        len += 1;
    }
    len
}

impl CodeGen {
    pub(super) fn generate_data(&mut self) -> Result<(), CodeGenError> {
        self.out.inst("SECTION .data")?;
        let mut idx = 0;
        while idx < self.variables.len() {
            let v = self.variables[idx].clone();
            self.generate_variable(&v)?;
            idx += 1;
        }
        Ok(())
    }

    fn generate_variable(&mut self, v: &GlobalVar) -> Result<(), CodeGenError> {
        if v.name == "_start" {
            return Err(CodeGenError::Compile("Reserved name".to_string()));
        }
        let prim = v.ty.elem();
        let directive = match prim {
            PrimType::Char => "db",
            PrimType::Int => "dd",
        };
        match &v.ty {
            VarType::Array { elem, len } => match &v.value {
                Initializer::Literal(Literal::Str(s)) if *elem == PrimType::Char => {
                    let lit_len = literal_len(s);
                    if len.unwrap_or(lit_len) != lit_len {
                        return Err(CodeGenError::Compile(
                            "String literal wrong size".to_string(),
                        ));
                    }
                    self.out.inst_labeled(&v.name, "db", &format!("`{}`", s))?;
                    Ok(())
                }
                Initializer::Literal(_) => Err(CodeGenError::Compile(
                    "Array not initialized with array literal".to_string(),
                )),
                Initializer::Array(elems) => {
                    if len.unwrap_or(elems.len() as u32) != elems.len() as u32 {
                        return Err(CodeGenError::Compile(
                            "Array literal wrong size".to_string(),
                        ));
                    }
                    let parts = elems
                        .iter()
                        .map(|e| self.literal_value(prim, e))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.out
                        .inst_labeled(&v.name, directive, &parts.join(","))?;
                    Ok(())
                }
            },
            VarType::Prim(p) => match &v.value {
                Initializer::Literal(lit) => {
                    let value = self.literal_value(*p, lit)?;
                    self.out.inst_labeled(&v.name, directive, &value)?;
                    Ok(())
                }
                Initializer::Array(_) => Err(CodeGenError::Compile(format!(
                    "Array literal cannot initialize scalar {}",
                    v.name
                ))),
            },
        }
    }

    /// Render a literal as an assembler operand in the given type
    /// context. In `int` context a string literal becomes the symbol of a
    /// synthesized global; in `char` context values must fit in a byte.
    pub(super) fn literal_value(
        &mut self,
        ty: PrimType,
        lit: &Literal,
    ) -> Result<String, CodeGenError> {
        match ty {
            PrimType::Int => match lit {
                Literal::Int(v) => Ok(v.to_string()),
                Literal::Char(c) => Ok((*c as u32).to_string()),
                Literal::Str(s) => Ok(self.string_global(s)),
            },
            PrimType::Char => match lit {
                Literal::Int(v) => {
                    if *v > 255 {
                        Err(CodeGenError::Compile(format!(
                            "{} too big to fit in char",
                            v
                        )))
                    } else {
                        Ok(v.to_string())
                    }
                }
                Literal::Char(c) => Ok((*c as u32).to_string()),
                Literal::Str(_) => Err(CodeGenError::Compile(
                    "String literal cannot be a char".to_string(),
                )),
            },
        }
    }

    /// Shorthand for the common `int` context.
    pub(super) fn int_value(&mut self, lit: &Literal) -> Result<String, CodeGenError> {
        self.literal_value(PrimType::Int, lit)
    }

    /// Synthesize a fresh `??slN` global holding the string and return
    /// its symbol.
    pub(super) fn string_global(&mut self, s: &str) -> String {
        let name = format!("??sl{}", self.stringc);
        self.stringc += 1;
        self.variables.push(GlobalVar {
            ty: VarType::Array {
                elem: PrimType::Char,
                len: Some(literal_len(s)),
            },
            name: name.clone(),
            value: Initializer::Literal(Literal::Str(s.to_string())),
        });
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_len_counts_escapes_once() {
        assert_eq!(literal_len("hi"), 2);
        assert_eq!(literal_len("a\\nb"), 3);
        assert_eq!(literal_len("\\\\"), 1);
        assert_eq!(literal_len(""), 0);
    }
}

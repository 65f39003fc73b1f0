//! Condition lowering.
//!
//! `generate_condition` compiles a boolean context directly into jumps:
//! control transfers to `true_label` when the expression is non-zero and
//! to `false_label` when it is zero; either target may be omitted, in
//! which case that outcome falls through. Short-circuit operators never
//! materialize a 0/1 value here; relational operators pick their `jcc`
//! from the signed or unsigned mnemonic table; `!` just swaps the
//! targets.

use super::{CodeGen, CodeGenError, Reg, rel_cc, rel_cc_negated};
use crate::ast::{BinOp, Expr, Literal, UnaryOp};

impl CodeGen {
    pub(super) fn generate_condition(
        &mut self,
        cond: &Expr,
        frame: &super::StackFrame,
        true_label: Option<&str>,
        false_label: Option<&str>,
    ) -> Result<(), CodeGenError> {
        match cond {
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => self.generate_condition(expr, frame, false_label, true_label),
            Expr::Literal(lit) => {
                let truthy = match lit {
                    Literal::Int(v) => *v != 0,
                    Literal::Char(c) => *c != '\0',
                    Literal::Str(_) => true,
                };
                let target = if truthy { true_label } else { false_label };
                if let Some(label) = target {
                    self.out.inst_arg("jmp", label)?;
                }
                Ok(())
            }
            // An address is never null.
            Expr::Address(_) => {
                if let Some(label) = true_label {
                    self.out.inst_arg("jmp", label)?;
                }
                Ok(())
            }
            Expr::Binary {
                op: BinOp::BitAnd,
                lhs,
                rhs,
            } => {
                let (lit, other) = match (&**lhs, &**rhs) {
                    (Expr::Literal(l), other) | (other, Expr::Literal(l)) => (Some(l), other),
                    _ => (None, &**lhs),
                };
                match lit {
                    Some(lit) => {
                        self.reg_expr(other, Reg::Eax, frame)?;
                        let imm = self.int_value(lit)?;
                        self.out.inst_arg("test", &format!("eax,{}", imm))?;
                    }
                    None => {
                        self.push_expr(lhs, frame, true)?;
                        self.reg_expr(rhs, Reg::Ebx, frame)?;
                        self.out.inst_arg("pop", "eax")?;
                        self.out.inst_arg("test", "eax,ebx")?;
                    }
                }
                self.flag_jumps("ne", "e", true_label, false_label)
            }
            Expr::Binary {
                op: BinOp::Rel(rel),
                lhs,
                rhs,
            } => {
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, Reg::Ebx, frame)?;
                self.out.inst_arg("pop", "eax")?;
                self.out.inst_arg("cmp", "eax,ebx")?;
                self.flag_jumps(rel_cc(*rel), rel_cc_negated(*rel), true_label, false_label)
            }
            Expr::Binary {
                op: BinOp::And,
                lhs,
                rhs,
            } => {
                self.generate_condition(lhs, frame, None, false_label)?;
                self.generate_condition(rhs, frame, true_label, false_label)
            }
            Expr::Binary {
                op: BinOp::Or,
                lhs,
                rhs,
            } => {
                self.generate_condition(lhs, frame, true_label, None)?;
                self.generate_condition(rhs, frame, true_label, false_label)
            }
            _ => {
                self.reg_expr(cond, Reg::Eax, frame)?;
                self.out.inst_arg("cmp", "eax,0")?;
                if let Some(label) = true_label {
                    self.out.inst_arg("jne", label)?;
                }
                if let Some(label) = false_label {
                    self.out.inst_arg("je", label)?;
                }
                Ok(())
            }
        }
    }

    /// Emit the jump(s) for an already-set flags register: `cc` holds
    /// when the condition is true, `ncc` when it is false.
    fn flag_jumps(
        &mut self,
        cc: &str,
        ncc: &str,
        true_label: Option<&str>,
        false_label: Option<&str>,
    ) -> Result<(), CodeGenError> {
        match (true_label, false_label) {
            (Some(t), Some(f)) => {
                self.out.inst_arg(&format!("j{}", cc), t)?;
                self.out.inst_arg("jmp", f)?;
            }
            (Some(t), None) => {
                self.out.inst_arg(&format!("j{}", cc), t)?;
            }
            (None, Some(f)) => {
                self.out.inst_arg(&format!("j{}", ncc), f)?;
            }
            (None, None) => {}
        }
        Ok(())
    }
}

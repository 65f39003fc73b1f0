//! Expression lowering.
//!
//! Two mutually recursive entry points:
//!
//! - `push_expr` evaluates an expression and leaves the result on the
//!   stack top (or discards it for statement-context calls). It may
//!   clobber every register.
//! - `reg_expr` evaluates an expression into a specific register and may
//!   clobber anything except that register and `ebp`.
//!
//! Binary operators all follow the same shape: push the left operand,
//! evaluate the right into a scratch register, pop the left back, apply
//! the operation. `char` reads are sign-extended through the low byte;
//! `char` writes truncate through it.

use super::frame::Index;
use super::state::Linkage;
use super::{CodeGen, CodeGenError, Reg, StackFrame, rel_cc};
use crate::ast::{BinOp, Expr, Literal, ShiftOp, UnaryOp};
use crate::syscalls;

/// Registers that receive Linux syscall arguments, in order.
const LINUX_SYSCALL_REGS: [Reg; 6] = [Reg::Ebx, Reg::Ecx, Reg::Edx, Reg::Esi, Reg::Edi, Reg::Ebp];

impl CodeGen {
    /// Addressing mode of a simple lvalue. `reg` is a scratch register:
    /// anything but `reg` and `ebp` may be changed before the returned
    /// operand is dereferenced.
    fn simple_lvalue(
        &mut self,
        lvalue: &Expr,
        reg: Reg,
        frame: &StackFrame,
        prefix: bool,
    ) -> Result<String, CodeGenError> {
        match lvalue {
            Expr::Ident(name) => Ok(self.lookup(frame, name)?.value(Index::Const(0), prefix)),
            Expr::ArrayAccess { name, index } => {
                let idx = match &**index {
                    Expr::Literal(Literal::Int(v)) => Index::Const(*v),
                    Expr::Literal(Literal::Char(c)) => Index::Const(*c as i32),
                    other => {
                        self.reg_expr(other, reg, frame)?;
                        Index::Reg(reg)
                    }
                };
                Ok(self.lookup(frame, name)?.value(idx, prefix))
            }
            other => Err(CodeGenError::Compile(format!(
                "Not a simple lvalue: {}",
                other
            ))),
        }
    }

    fn lookup<'a>(
        &'a self,
        frame: &'a StackFrame,
        name: &str,
    ) -> Result<&'a super::StackEntry, CodeGenError> {
        frame
            .get(name)
            .or_else(|| self.gvars.get(name))
            .ok_or_else(|| CodeGenError::Compile(format!("No such variable: {}", name)))
    }

    /// Evaluate `expr` into `reg`. May clobber every register except
    /// `reg` and `ebp`.
    pub(super) fn reg_expr(
        &mut self,
        expr: &Expr,
        reg: Reg,
        frame: &StackFrame,
    ) -> Result<(), CodeGenError> {
        match expr {
            Expr::Literal(lit) => {
                let value = self.int_value(lit)?;
                self.out.inst_arg("mov", &format!("{},{}", reg, value))?;
                Ok(())
            }
            Expr::Address(lvalue) => {
                if lvalue.is_simple_lvalue() {
                    let addr = self.simple_lvalue(lvalue, reg, frame, false)?;
                    self.out.inst_arg("lea", &format!("{},{}", reg, addr))?;
                    Ok(())
                } else if let Expr::Deref { expr, .. } = &**lvalue {
                    // &*e folds to e.
                    self.warn("Will not attempt to dereference");
                    self.reg_expr(expr, reg, frame)
                } else {
                    Err(CodeGenError::Compile(format!(
                        "Cannot take the address of {}",
                        lvalue
                    )))
                }
            }
            Expr::Ident(_) | Expr::ArrayAccess { .. } => {
                let value = self.simple_lvalue(expr, reg, frame, true)?;
                if value.starts_with("byte") {
                    let creg = reg.byte();
                    self.out.inst_arg("mov", &format!("{},{}", creg, value))?;
                    self.out.inst_arg("movsx", &format!("{},{}", reg, creg))?;
                } else {
                    self.out.inst_arg("mov", &format!("{},{}", reg, value))?;
                }
                Ok(())
            }
            Expr::Deref { expr, byte } => {
                self.reg_expr(expr, reg, frame)?;
                if *byte {
                    let creg = reg.byte();
                    self.out
                        .inst_arg("mov", &format!("{},byte[{}]", creg, reg))?;
                    self.out.inst_arg("movsx", &format!("{},{}", reg, creg))?;
                } else {
                    self.out
                        .inst_arg("mov", &format!("{},dword[{}]", reg, reg))?;
                }
                Ok(())
            }
            Expr::Unary { op, expr } => {
                self.reg_expr(expr, reg, frame)?;
                match op {
                    UnaryOp::Not => {
                        self.out.inst_arg("cmp", &format!("{},0", reg))?;
                        let breg = reg.byte();
                        self.out.inst_arg("sete", breg)?;
                        self.out.inst_arg("movzx", &format!("{},{}", reg, breg))?;
                    }
                    UnaryOp::BitNot => self.out.inst_arg("not", reg.name())?,
                    UnaryOp::Neg => self.out.inst_arg("neg", reg.name())?,
                }
                Ok(())
            }
            Expr::Binary { op, lhs, rhs } => self.binary_expr(*op, lhs, rhs, reg, frame),
            Expr::Call { .. } => {
                self.push_expr(expr, frame, true)?;
                self.out.inst_arg("pop", reg.name())?;
                Ok(())
            }
        }
    }

    fn binary_expr(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        reg: Reg,
        frame: &StackFrame,
    ) -> Result<(), CodeGenError> {
        let ireg = if reg != Reg::Eax { Reg::Eax } else { Reg::Ebx };
        match op {
            BinOp::Mul => {
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, ireg, frame)?;
                self.out.inst_arg("pop", reg.name())?;
                self.out.inst_arg("imul", &format!("{},{}", reg, ireg))?;
            }
            BinOp::MulU => {
                // Unsigned multiply works through eax/edx.
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, Reg::Ebx, frame)?;
                self.out.inst_arg("pop", "eax")?;
                self.out.inst_arg("mul", "ebx")?;
                self.out.inst_arg("mov", &format!("{},eax", reg))?;
            }
            BinOp::Div | BinOp::DivU | BinOp::Rem | BinOp::RemU => {
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, Reg::Ebx, frame)?;
                self.out.inst_arg("pop", "eax")?;
                self.out.inst("cdq")?;
                let inst = if matches!(op, BinOp::Div | BinOp::Rem) {
                    "idiv"
                } else {
                    "div"
                };
                self.out.inst_arg(inst, "ebx")?;
                let result = if matches!(op, BinOp::Div | BinOp::DivU) {
                    "eax"
                } else {
                    "edx"
                };
                self.out.inst_arg("mov", &format!("{},{}", reg, result))?;
            }
            BinOp::Add | BinOp::Sub => {
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, ireg, frame)?;
                self.out.inst_arg("pop", reg.name())?;
                let inst = if op == BinOp::Add { "add" } else { "sub" };
                self.out.inst_arg(inst, &format!("{},{}", reg, ireg))?;
            }
            BinOp::Shift(shift) => {
                // Variable shift counts must be in cl.
                let inst = match shift {
                    ShiftOp::Shl => "shl",
                    ShiftOp::Shr => "sar",
                    ShiftOp::Ushr => "shr",
                };
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, Reg::Ecx, frame)?;
                self.out.inst_arg("pop", reg.name())?;
                self.out.inst_arg(inst, &format!("{},cl", reg))?;
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                let inst = match op {
                    BinOp::BitAnd => "and",
                    BinOp::BitOr => "or",
                    _ => "xor",
                };
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, ireg, frame)?;
                self.out.inst_arg("pop", reg.name())?;
                self.out.inst_arg(inst, &format!("{},{}", reg, ireg))?;
            }
            BinOp::Rel(rel) => {
                self.push_expr(lhs, frame, true)?;
                self.reg_expr(rhs, ireg, frame)?;
                self.out.inst_arg("pop", reg.name())?;
                self.out.inst_arg("cmp", &format!("{},{}", reg, ireg))?;
                let creg = reg.byte();
                self.out.inst_arg(&format!("set{}", rel_cc(rel)), creg)?;
                self.out.inst_arg("movzx", &format!("{},{}", reg, creg))?;
            }
            BinOp::And | BinOp::Or => {
                // The value of a short-circuit operator is needed as a
                // scalar: run the jump lowering into a fresh pair of
                // labels and materialize 0/1.
                let l_false = format!(".l{}", self.labelc);
                let l_end = format!(".l{}", self.labelc + 1);
                self.labelc += 2;
                let full = Expr::Binary {
                    op,
                    lhs: Box::new(lhs.clone()),
                    rhs: Box::new(rhs.clone()),
                };
                self.generate_condition(&full, frame, None, Some(l_false.as_str()))?;
                self.out.inst_arg("mov", &format!("{},1", reg))?;
                self.out.inst_arg("jmp", &l_end)?;
                self.out
                    .inst_labeled(&l_false, "mov", &format!("{},0", reg))?;
                self.out.label(&l_end);
            }
            BinOp::Assign => {
                self.push_expr(rhs, frame, true)?;
                if lhs.is_simple_lvalue() {
                    let value = self.simple_lvalue(lhs, ireg, frame, true)?;
                    self.out.inst_arg("pop", reg.name())?;
                    if value.starts_with("byte") {
                        let creg = reg.byte();
                        self.out.inst_arg("movsx", &format!("{},{}", reg, creg))?;
                        self.out.inst_arg("mov", &format!("{},{}", value, creg))?;
                    } else {
                        self.out.inst_arg("mov", &format!("{},{}", value, reg))?;
                    }
                } else if let Expr::Deref { expr: addr, byte } = lhs {
                    self.reg_expr(addr, ireg, frame)?;
                    self.out.inst_arg("pop", reg.name())?;
                    if *byte {
                        let creg = reg.byte();
                        self.out.inst_arg("movsx", &format!("{},{}", reg, creg))?;
                        self.out
                            .inst_arg("mov", &format!("byte[{}],{}", ireg, creg))?;
                    } else {
                        self.out
                            .inst_arg("mov", &format!("dword[{}],{}", ireg, reg))?;
                    }
                } else {
                    return Err(CodeGenError::Compile(format!("Cannot assign to {}", lhs)));
                }
            }
        }
        Ok(())
    }

    /// Evaluate `expr` and leave its value on the stack top, or discard
    /// it when `push` is false (statement context). May clobber every
    /// register.
    pub(super) fn push_expr(
        &mut self,
        expr: &Expr,
        frame: &StackFrame,
        push: bool,
    ) -> Result<(), CodeGenError> {
        match expr {
            Expr::Call { name, args } => {
                if name.starts_with('$') {
                    self.syscall(name, args, frame, push)
                } else {
                    self.function_call(name, args, frame, push)
                }
            }
            Expr::Literal(lit) => {
                let value = self.int_value(lit)?;
                self.out.inst_arg("push", &value)?;
                Ok(())
            }
            _ => {
                self.reg_expr(expr, Reg::Eax, frame)?;
                if push {
                    self.out.inst_arg("push", "eax")?;
                }
                Ok(())
            }
        }
    }

    fn syscall(
        &mut self,
        name: &str,
        args: &[Expr],
        frame: &StackFrame,
        push: bool,
    ) -> Result<(), CodeGenError> {
        let number = syscalls::number(name)
            .ok_or_else(|| CodeGenError::Compile(format!("Unknown syscall: {}", name)))?;
        let linux = self.target.is_linux();
        if linux && args.len() > 6 {
            return Err(CodeGenError::Compile(
                "More than 6 arguments to linux syscall".to_string(),
            ));
        }
        // The sixth argument register is ebp; save it before the argument
        // pushes so the pops below still line up.
        if linux && args.len() == 6 {
            self.out.inst_arg("push", "ebp")?;
        }
        for arg in args.iter().rev() {
            self.push_expr(arg, frame, true)?;
        }
        if linux {
            for reg in LINUX_SYSCALL_REGS.iter().take(args.len()) {
                self.out.inst_arg("pop", reg.name())?;
            }
        } else {
            // BSD convention: the kernel expects a return-address slot
            // above the arguments.
            self.out.inst_arg("push", "dword 0")?;
        }
        self.out.inst_arg("mov", &format!("eax,{}", number))?;
        self.out.inst_arg("int", "80h")?;
        if linux {
            if args.len() == 6 {
                self.out.inst_arg("pop", "ebp")?;
            }
        } else {
            self.out
                .inst_arg("add", &format!("esp,{}", 4 * args.len() + 4))?;
        }
        if push {
            self.out.inst_arg("push", "eax")?;
        }
        Ok(())
    }

    fn function_call(
        &mut self,
        name: &str,
        args: &[Expr],
        frame: &StackFrame,
        push: bool,
    ) -> Result<(), CodeGenError> {
        let sig = self
            .gfuncs
            .get(name)
            .cloned()
            .ok_or_else(|| CodeGenError::Compile(format!("Function does not exist: {}", name)))?;
        if sig.ret_void && push {
            return Err(CodeGenError::Compile(format!(
                "{} does not return a value",
                sig.prototype(name)
            )));
        }
        let c_call = matches!(sig.linkage, Linkage::C { .. });
        if c_call {
            // Align esp down to 16 bytes, with padding chosen so that the
            // frame is still aligned after the saved-esp slot and the
            // arguments are pushed; the saved esp ends up at
            // [esp + 4*argc] once the arguments are in place.
            self.out.inst_arg("mov", "eax,esp")?;
            self.out.inst_arg("and", "esp,0fffffff0h")?;
            let pn = args.len();
            if (pn & 3) != 3 {
                self.out
                    .inst_arg("sub", &format!("esp,{}", 4 * (3 - (pn & 3))))?;
            }
            self.out.inst_arg("push", "eax")?;
        }
        let varargs = matches!(sig.linkage, Linkage::C { varargs: true });
        if varargs {
            if args.len() < sig.params.len() {
                return Err(CodeGenError::Compile(format!(
                    "Not enough arguments to {}",
                    sig.prototype(name)
                )));
            }
        } else if args.len() != sig.params.len() {
            return Err(CodeGenError::Compile(format!(
                "Incorrect number of arguments to {}",
                sig.prototype(name)
            )));
        }
        for arg in args.iter().rev() {
            self.push_expr(arg, frame, true)?;
        }
        if c_call {
            // ebx is callee-save under cdecl.
            self.out.inst_arg("call", &sig.symbol)?;
            self.out
                .inst_arg("mov", &format!("esp,[esp+{}]", 4 * args.len()))?;
            if push {
                self.out.inst_arg("push", "eax")?;
            }
        } else {
            self.out.inst_arg("call", &sig.symbol)?;
            if !sig.ret_void && !push {
                self.out.inst_arg("add", "esp,4")?;
            }
        }
        Ok(())
    }
}

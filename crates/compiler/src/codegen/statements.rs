//! Statement lowering.
//!
//! Blocks reserve their locals with a single `sub esp, n` on entry and
//! release them with the matching `add esp, n` on exit; a function body
//! skips the release because the epilogue restores `esp` from `ebp`.
//! `break`/`continue` lower to jumps at the labels threaded down from the
//! enclosing loop.

use super::{CodeGen, CodeGenError, StackFrame};
use crate::ast::{BlockItem, Statement, VarDecl};

impl CodeGen {
    pub(super) fn generate_statement(
        &mut self,
        stmt: &Statement,
        frame: &StackFrame,
        function: bool,
        clabel: Option<&str>,
        blabel: Option<&str>,
    ) -> Result<(), CodeGenError> {
        match stmt {
            Statement::Block(items) => {
                self.generate_block(items, frame, function, clabel, blabel)
            }
            Statement::If { cond, then, els } => {
                let l_if = format!(".if{}", self.ifc);
                let l_else = format!(".ifelse{}", self.ifc);
                let l_end = format!(".ifend{}", self.ifc);
                self.ifc += 1;
                self.out.label(&l_if);
                let false_target = if els.is_some() { &l_else } else { &l_end };
                self.generate_condition(cond, frame, None, Some(false_target.as_str()))?;
                self.generate_statement(then, frame, false, clabel, blabel)?;
                if let Some(els) = els {
                    self.out.inst_arg("jmp", &l_end)?;
                    self.out.label(&l_else);
                    self.generate_statement(els, frame, false, clabel, blabel)?;
                }
                self.out.label(&l_end);
                Ok(())
            }
            Statement::While { cond, body } => self.generate_while(cond, body, frame),
            Statement::Break => match blabel {
                Some(label) => {
                    self.out.inst_arg("jmp", label)?;
                    Ok(())
                }
                None => Err(CodeGenError::Compile("Nowhere to break".to_string())),
            },
            Statement::Continue => match clabel {
                Some(label) => {
                    self.out.inst_arg("jmp", label)?;
                    Ok(())
                }
                None => Err(CodeGenError::Compile("Nowhere to continue".to_string())),
            },
            Statement::Return(expr) => {
                if let Some(expr) = expr {
                    self.push_expr(expr, frame, true)?;
                }
                self.out.inst_arg("jmp", ".return")?;
                Ok(())
            }
            Statement::Expr(expr) => self.push_expr(expr, frame, false),
            Statement::Empty => Ok(()),
        }
    }

    fn generate_while(
        &mut self,
        cond: &crate::ast::Expr,
        body: &Statement,
        frame: &StackFrame,
    ) -> Result<(), CodeGenError> {
        let l_begin = format!(".while{}", self.whilec);
        let l_end = format!(".endwhile{}", self.whilec);
        self.whilec += 1;
        match body {
            // A block body enters its scope once, at the loop head, so
            // body locals survive across iterations and esp stays put.
            Statement::Block(items) => {
                let decls = block_decls(items);
                let (bframe, size) = frame.extend(&decls)?;
                if size > 0 {
                    self.out.inst_arg("sub", &format!("esp,{}", size))?;
                }
                self.out.label(&l_begin);
                self.generate_condition(cond, &bframe, None, Some(l_end.as_str()))?;
                for item in items {
                    if let BlockItem::Stmt(stmt) = item {
                        self.generate_statement(
                            stmt,
                            &bframe,
                            false,
                            Some(l_begin.as_str()),
                            Some(l_end.as_str()),
                        )?;
                    }
                }
                self.out.inst_arg("jmp", &l_begin)?;
                self.out.label(&l_end);
                if size > 0 {
                    self.out.inst_arg("add", &format!("esp,{}", size))?;
                }
                Ok(())
            }
            // `while (c) break;` exits after one evaluation either way,
            // so only the condition's side effects remain.
            Statement::Break => self.push_expr(cond, frame, false),
            // Busy loop: spin on the condition itself.
            Statement::Continue | Statement::Empty => {
                self.out.label(&l_begin);
                self.generate_condition(cond, frame, Some(l_begin.as_str()), None)
            }
            _ => {
                self.out.label(&l_begin);
                self.generate_condition(cond, frame, None, Some(l_end.as_str()))?;
                self.generate_statement(
                    body,
                    frame,
                    false,
                    Some(l_begin.as_str()),
                    Some(l_end.as_str()),
                )?;
                self.out.inst_arg("jmp", &l_begin)?;
                self.out.label(&l_end);
                Ok(())
            }
        }
    }

    fn generate_block(
        &mut self,
        items: &[BlockItem],
        frame: &StackFrame,
        function: bool,
        clabel: Option<&str>,
        blabel: Option<&str>,
    ) -> Result<(), CodeGenError> {
        let decls = block_decls(items);
        let (bframe, size) = frame.extend(&decls)?;
        if size > 0 {
            self.out.inst_arg("sub", &format!("esp,{}", size))?;
        }
        for item in items {
            if let BlockItem::Stmt(stmt) = item {
                self.generate_statement(stmt, &bframe, false, clabel, blabel)?;
            }
        }
        if !function && size > 0 {
            self.out.inst_arg("add", &format!("esp,{}", size))?;
        }
        Ok(())
    }
}

fn block_decls(items: &[BlockItem]) -> Vec<VarDecl> {
    items
        .iter()
        .filter_map(|item| match item {
            BlockItem::Decl(d) => Some(d.clone()),
            BlockItem::Stmt(_) => None,
        })
        .collect()
}

//! Stack-frame accounting.
//!
//! A frame records where every visible variable lives relative to `ebp`
//! (or, for globals and externs, which symbol addresses it). Frames are
//! immutable snapshots: entering a block clones the frame and appends the
//! block's locals, so the inner frame dies with the block while `esp` is
//! restored by the emitted `add esp, n`.
//!
//! Parameters sit at `[ebp+8]`, `[ebp+12]`, ... in declaration order;
//! locals grow downward from `ebp`. Shadowing works because lookup scans
//! entries newest-first.

use super::{CodeGenError, Reg};
use crate::ast::{PrimType, VarDecl, VarType};

/// How an indexed access reaches past the slot's base address.
#[derive(Debug, Clone, Copy)]
pub enum Index {
    Const(i32),
    Reg(Reg),
}

#[derive(Debug, Clone)]
enum SlotBase {
    /// Offset from `ebp`.
    Local(i32),
    /// A linker-visible symbol.
    Global(String),
}

/// One addressable variable: its type plus where it lives.
#[derive(Debug, Clone)]
pub struct StackEntry {
    pub ty: VarType,
    base: SlotBase,
}

impl StackEntry {
    pub fn local(ty: VarType, offset: i32) -> Self {
        StackEntry {
            ty,
            base: SlotBase::Local(offset),
        }
    }

    pub fn global(ty: VarType, symbol: impl Into<String>) -> Self {
        StackEntry {
            ty,
            base: SlotBase::Global(symbol.into()),
        }
    }

    fn elem(&self) -> PrimType {
        self.ty.elem()
    }

    /// The textual addressing mode for this slot, e.g. `dword[ebp-4]`,
    /// `byte[msg+ecx]` or `dword[nums+4*eax]`. Register indices are
    /// scaled by the element size; constant indices are folded into the
    /// displacement. `prefix` selects whether the size keyword is
    /// included (it is omitted under `lea`).
    pub fn value(&self, index: Index, prefix: bool) -> String {
        let size_kw = if prefix {
            match self.elem() {
                PrimType::Int => "dword",
                PrimType::Char => "byte",
            }
        } else {
            ""
        };
        let scale = self.elem().size();
        match (&self.base, index) {
            (SlotBase::Local(off), Index::Const(k)) => {
                let total = off + scale as i32 * k;
                format!("{}[ebp{}]", size_kw, signed(total))
            }
            (SlotBase::Local(off), Index::Reg(reg)) => {
                format!("{}[ebp{}+{}]", size_kw, signed(*off), scaled(scale, reg))
            }
            (SlotBase::Global(sym), Index::Const(0)) => format!("{}[{}]", size_kw, sym),
            (SlotBase::Global(sym), Index::Const(k)) => {
                format!("{}[{}{}]", size_kw, sym, signed(scale as i32 * k))
            }
            (SlotBase::Global(sym), Index::Reg(reg)) => {
                format!("{}[{}+{}]", size_kw, sym, scaled(scale, reg))
            }
        }
    }
}

fn signed(n: i32) -> String {
    if n >= 0 {
        format!("+{}", n)
    } else {
        format!("-{}", -n)
    }
}

fn scaled(scale: u32, reg: Reg) -> String {
    if scale == 1 {
        reg.name().to_string()
    } else {
        format!("{}*{}", scale, reg)
    }
}

/// The per-function frame: parameters plus the locals of every enclosing
/// block.
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    entries: Vec<(String, StackEntry)>,
}

impl StackFrame {
    /// A fresh frame holding only the parameters, every one a dword at
    /// `[ebp + 8 + 4*i]`.
    pub fn new(params: &[String]) -> Self {
        let entries = params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.clone(),
                    StackEntry::local(VarType::Prim(PrimType::Int), 8 + 4 * i as i32),
                )
            })
            .collect();
        StackFrame { entries }
    }

    /// Lowest local offset allocated so far (0 when only parameters).
    fn last_offset(&self) -> i32 {
        match self.entries.last() {
            Some((_, entry)) => match entry.base {
                SlotBase::Local(off) if off <= 0 => off,
                _ => 0,
            },
            None => 0,
        }
    }

    /// Snapshot this frame extended by a block's locals. Returns the new
    /// frame together with the number of bytes the block must reserve.
    pub fn extend(&self, vars: &[VarDecl]) -> Result<(StackFrame, u32), CodeGenError> {
        let mut frame = self.clone();
        let start = frame.last_offset();
        for v in vars {
            let size = v.ty.size().ok_or_else(|| {
                CodeGenError::Compile(format!("Array {} needs an explicit length", v.name))
            })?;
            let offset = frame.last_offset() - size as i32;
            frame
                .entries
                .push((v.name.clone(), StackEntry::local(v.ty.clone(), offset)));
        }
        let grown = (start - frame.last_offset()) as u32;
        Ok((frame, grown))
    }

    /// Total local size of the frame in bytes, parameters excluded.
    pub fn size(&self) -> u32 {
        (-self.last_offset()) as u32
    }

    /// Innermost visible entry with this name.
    pub fn get(&self, name: &str) -> Option<&StackEntry> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(ty: VarType, name: &str) -> VarDecl {
        VarDecl {
            ty,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parameter_offsets() {
        let frame = StackFrame::new(&["argc".to_string(), "argv".to_string()]);
        assert_eq!(
            frame.get("argc").unwrap().value(Index::Const(0), true),
            "dword[ebp+8]"
        );
        assert_eq!(
            frame.get("argv").unwrap().value(Index::Const(0), true),
            "dword[ebp+12]"
        );
        assert_eq!(frame.size(), 0);
    }

    #[test]
    fn test_locals_grow_downward() {
        let frame = StackFrame::new(&[]);
        let (frame, grown) = frame
            .extend(&[
                decl(VarType::Prim(PrimType::Int), "a"),
                decl(VarType::Prim(PrimType::Int), "b"),
            ])
            .unwrap();
        assert_eq!(grown, 8);
        assert_eq!(
            frame.get("a").unwrap().value(Index::Const(0), true),
            "dword[ebp-4]"
        );
        assert_eq!(
            frame.get("b").unwrap().value(Index::Const(0), true),
            "dword[ebp-8]"
        );
        assert_eq!(frame.size(), 8);
    }

    #[test]
    fn test_extend_is_a_snapshot() {
        let outer = StackFrame::new(&[]);
        let (outer, _) = outer
            .extend(&[decl(VarType::Prim(PrimType::Int), "a")])
            .unwrap();
        let (inner, grown) = outer
            .extend(&[decl(VarType::Prim(PrimType::Int), "b")])
            .unwrap();
        assert_eq!(grown, 4);
        assert!(inner.get("a").is_some());
        assert!(inner.get("b").is_some());
        // The outer frame is untouched by the inner extension.
        assert!(outer.get("b").is_none());
        assert_eq!(outer.size(), 4);
        assert_eq!(inner.size(), 8);
    }

    #[test]
    fn test_shadowing_prefers_innermost() {
        let frame = StackFrame::new(&["x".to_string()]);
        let (frame, _) = frame
            .extend(&[decl(VarType::Prim(PrimType::Char), "x")])
            .unwrap();
        assert_eq!(
            frame.get("x").unwrap().value(Index::Const(0), true),
            "byte[ebp-1]"
        );
    }

    #[test]
    fn test_char_array_rounded_to_dword() {
        let frame = StackFrame::new(&[]);
        let (frame, grown) = frame
            .extend(&[decl(
                VarType::Array {
                    elem: PrimType::Char,
                    len: Some(5),
                },
                "buf",
            )])
            .unwrap();
        assert_eq!(grown, 8);
        assert_eq!(
            frame.get("buf").unwrap().value(Index::Reg(Reg::Eax), true),
            "byte[ebp-8+eax]"
        );
    }

    #[test]
    fn test_int_array_indexing_scales_by_four() {
        let frame = StackFrame::new(&[]);
        let (frame, _) = frame
            .extend(&[decl(
                VarType::Array {
                    elem: PrimType::Int,
                    len: Some(3),
                },
                "nums",
            )])
            .unwrap();
        let entry = frame.get("nums").unwrap();
        assert_eq!(entry.value(Index::Reg(Reg::Eax), true), "dword[ebp-12+4*eax]");
        assert_eq!(entry.value(Index::Const(2), true), "dword[ebp-4]");
    }

    #[test]
    fn test_global_addressing() {
        let entry = StackEntry::global(
            VarType::Array {
                elem: PrimType::Int,
                len: Some(4),
            },
            "nums",
        );
        assert_eq!(entry.value(Index::Const(0), true), "dword[nums]");
        assert_eq!(entry.value(Index::Const(2), true), "dword[nums+8]");
        assert_eq!(entry.value(Index::Reg(Reg::Ebx), true), "dword[nums+4*ebx]");
        assert_eq!(entry.value(Index::Const(0), false), "[nums]");
    }

    #[test]
    fn test_unsized_array_local_is_an_error() {
        let frame = StackFrame::new(&[]);
        let err = frame
            .extend(&[decl(
                VarType::Array {
                    elem: PrimType::Int,
                    len: None,
                },
                "a",
            )])
            .unwrap_err();
        assert!(err.to_string().contains("explicit length"));
    }
}

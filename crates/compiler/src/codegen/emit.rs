//! The assembly output formatter.
//!
//! Lines are laid out in columns: a label margin, the opcode field, the
//! operand field, then an optional comment. A single queued label waits
//! for the next instruction so that `label: insn` share a line; queueing
//! a second label (or emitting a blank) flushes the waiting one onto its
//! own line. That is the whole state machine: empty or pending.

use std::fmt::{self, Write as _};

/// Width of the label margin.
pub const MARGIN: usize = 16;
/// Width of the opcode field (opcode is padded to one less, plus a space).
pub const IWIDTH: usize = 8;
/// Width of the operand field, used when a comment follows.
pub const WIDTH: usize = 40;

pub struct AsmWriter {
    buf: String,
    margin: usize,
    iwidth: usize,
    width: usize,
    pending: Option<String>,
}

impl Default for AsmWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::with_layout(MARGIN, IWIDTH, WIDTH)
    }

    pub fn with_layout(margin: usize, iwidth: usize, width: usize) -> Self {
        AsmWriter {
            buf: String::new(),
            margin,
            iwidth,
            width,
            pending: None,
        }
    }

    /// Queue `label` to be attached to the next emitted line. A label
    /// already waiting is flushed onto its own line first.
    pub fn label(&mut self, label: &str) {
        if label.is_empty() {
            return;
        }
        if let Some(prev) = self.pending.take() {
            self.buf.push_str(&prev);
            self.buf.push_str(":\n");
        }
        self.pending = Some(label.to_string());
    }

    /// Emit an instruction or directive without operands.
    pub fn inst(&mut self, op: &str) -> fmt::Result {
        self.line(None, Some(op), None, None)
    }

    /// Emit an instruction with operands.
    pub fn inst_arg(&mut self, op: &str, operands: &str) -> fmt::Result {
        self.line(None, Some(op), Some(operands), None)
    }

    /// Emit an instruction with an explicit label in the margin (used by
    /// the data section, where the symbol labels its directive).
    pub fn inst_labeled(&mut self, label: &str, op: &str, operands: &str) -> fmt::Result {
        self.line(Some(label), Some(op), Some(operands), None)
    }

    /// Emit an instruction followed by a comment.
    pub fn inst_comment(&mut self, op: &str, operands: &str, comment: &str) -> fmt::Result {
        self.line(None, Some(op), Some(operands), Some(comment))
    }

    /// Emit a blank line; a pending label is flushed alone instead.
    pub fn blank(&mut self) -> fmt::Result {
        self.line(None, None, None, None)
    }

    /// Flush any pending label and hand back the finished text.
    pub fn finish(mut self) -> String {
        if self.pending.is_some() {
            // Infallible: writing to a String cannot fail.
            let _ = self.blank();
        }
        self.buf
    }

    fn line(
        &mut self,
        label: Option<&str>,
        inst: Option<&str>,
        code: Option<&str>,
        comment: Option<&str>,
    ) -> fmt::Result {
        let mut label = label.map(str::to_string);
        if let Some(prev) = self.pending.take() {
            if label.is_some() {
                writeln!(self.buf, "{}:", prev)?;
            } else {
                label = Some(prev);
            }
        }

        let inst = match inst {
            Some(inst) => inst,
            None => {
                match label {
                    Some(label) => writeln!(self.buf, "{}:", label)?,
                    None => self.buf.push('\n'),
                }
                return Ok(());
            }
        };

        let mut lcol = match label {
            Some(label) => format!("{}:", label),
            None => String::new(),
        };
        pad_to(&mut lcol, self.margin);

        let mut body = inst.to_string();
        if let Some(code) = code {
            pad_to(&mut body, self.iwidth - 1);
            body.push(' ');
            let operand_start = body.len();
            body.push_str(code);
            if comment.is_some() {
                pad_to(&mut body, operand_start + self.width);
            }
        }
        if let Some(comment) = comment {
            body.push_str(comment);
        }
        writeln!(self.buf, "{}{}", lcol, body)
    }
}

fn pad_to(s: &mut String, width: usize) {
    while s.len() < width {
        s.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_coalesces_with_next_instruction() {
        let mut w = AsmWriter::new();
        w.label("?@main");
        w.inst_arg("push", "ebp").unwrap();
        assert_eq!(w.finish(), "?@main:         push    ebp\n");
    }

    #[test]
    fn test_second_label_flushes_first() {
        let mut w = AsmWriter::new();
        w.label(".while0");
        w.label(".l1");
        w.inst_arg("pop", "eax").unwrap();
        assert_eq!(w.finish(), ".while0:\n.l1:            pop     eax\n");
    }

    #[test]
    fn test_blank_flushes_pending_label_alone() {
        let mut w = AsmWriter::new();
        w.label(".ifend0");
        w.blank().unwrap();
        assert_eq!(w.finish(), ".ifend0:\n");
    }

    #[test]
    fn test_blank_without_label_is_empty_line() {
        let mut w = AsmWriter::new();
        w.blank().unwrap();
        assert_eq!(w.finish(), "\n");
    }

    #[test]
    fn test_finish_flushes_trailing_label() {
        let mut w = AsmWriter::new();
        w.inst_arg("jmp", "ebx").unwrap();
        w.label(".ifend3");
        assert_eq!(w.finish(), "                jmp     ebx\n.ifend3:\n");
    }

    #[test]
    fn test_explicit_label_with_pending_writes_both() {
        let mut w = AsmWriter::new();
        w.label(".l0");
        w.inst_labeled("x", "dd", "5").unwrap();
        assert_eq!(w.finish(), ".l0:\nx:              dd      5\n");
    }

    #[test]
    fn test_directive_has_no_operand_column() {
        let mut w = AsmWriter::new();
        w.inst("SECTION .text").unwrap();
        assert_eq!(w.finish(), "                SECTION .text\n");
    }

    #[test]
    fn test_long_label_is_not_truncated() {
        let mut w = AsmWriter::new();
        w.label("?@quite_a_long_function_name");
        w.inst_arg("push", "ebp").unwrap();
        let out = w.finish();
        assert!(out.starts_with("?@quite_a_long_function_name:"));
        assert!(out.contains("push    ebp"));
    }

    #[test]
    fn test_comment_column() {
        let mut w = AsmWriter::new();
        w.inst_comment("mov", "eax,1", "; exit").unwrap();
        let out = w.finish();
        let line = out.lines().next().unwrap();
        assert!(line.ends_with("; exit"));
        assert!(line.contains("eax,1"));
    }
}

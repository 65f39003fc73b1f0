//! Top-level emission order.
//!
//! A program is emitted as: `GLOBAL` lines for exports (plus `?@main`
//! when a main function exists), `EXTERN` lines for externs, then
//! `SECTION .text` with every function, then `SECTION .data` with every
//! global. Extern registration happens before any function body is
//! lowered so calls and variable references resolve regardless of
//! declaration order.

use super::state::{FuncSig, Linkage};
use super::{CodeGen, CodeGenError, StackEntry, StackFrame};
use crate::ast::{ExternDecl, ExternKind, Function, GlobalDecl, Program};

impl CodeGen {
    /// Lower a whole program to assembly text.
    pub fn generate(mut self, program: &Program) -> Result<String, CodeGenError> {
        let mut functions = Vec::new();
        let mut exports = Vec::new();
        let mut externs = Vec::new();
        for decl in &program.decls {
            match decl {
                GlobalDecl::Variable(v) => self.variables.push(v.clone()),
                GlobalDecl::Function(f) => functions.push(f),
                GlobalDecl::Export { name, function } => exports.push((name.clone(), *function)),
                GlobalDecl::Extern(e) => externs.push(e),
            }
        }

        for v in &self.variables {
            self.gvars
                .insert(v.name.clone(), StackEntry::global(v.ty.clone(), v.name.clone()));
        }
        for f in &functions {
            self.gfuncs.insert(
                f.name.clone(),
                FuncSig {
                    ret_void: f.ret.is_void(),
                    params: f.params.clone(),
                    symbol: format!("?@{}", f.name),
                    linkage: Linkage::Native,
                },
            );
        }

        self.generate_exports(&exports)?;
        self.generate_externs(&externs)?;
        self.generate_text(&functions)?;
        self.generate_data()?;
        Ok(self.out.finish())
    }

    fn generate_exports(&mut self, exports: &[(String, bool)]) -> Result<(), CodeGenError> {
        for (name, function) in exports {
            let decorated = if *function {
                format!("?@{}", name)
            } else {
                name.clone()
            };
            self.out.inst(&format!("GLOBAL {}", decorated))?;
        }
        if self.gfuncs.contains_key("main") {
            self.out.inst("GLOBAL ?@main")?;
        }
        Ok(())
    }

    fn generate_externs(&mut self, externs: &[&ExternDecl]) -> Result<(), CodeGenError> {
        for ext in externs {
            let c_linkage = match ext.linkage.as_deref() {
                None => false,
                Some("C") | Some("c") => true,
                Some(other) => {
                    return Err(CodeGenError::Compile(format!(
                        "Invalid extern linkage \"{}\"",
                        other
                    )));
                }
            };
            let symbol = match &ext.kind {
                ExternKind::Variable(ty) => {
                    let symbol = if c_linkage {
                        format!("{}{}", self.target.c_prefix, ext.name)
                    } else {
                        ext.name.clone()
                    };
                    self.gvars.insert(
                        ext.name.clone(),
                        StackEntry::global(ty.clone(), symbol.clone()),
                    );
                    symbol
                }
                ExternKind::Function {
                    ret,
                    params,
                    varargs,
                } => {
                    let (symbol, linkage) = if c_linkage {
                        (
                            format!("{}{}", self.target.c_prefix, ext.name),
                            Linkage::C { varargs: *varargs },
                        )
                    } else {
                        if *varargs {
                            return Err(CodeGenError::Compile(
                                "Native functions do not support varargs".to_string(),
                            ));
                        }
                        (format!("?@{}", ext.name), Linkage::Native)
                    };
                    self.gfuncs.insert(
                        ext.name.clone(),
                        FuncSig {
                            ret_void: ret.is_void(),
                            params: params.clone(),
                            symbol: symbol.clone(),
                            linkage,
                        },
                    );
                    symbol
                }
            };
            self.out.inst(&format!("EXTERN {}", symbol))?;
        }
        Ok(())
    }

    fn generate_text(&mut self, functions: &[&Function]) -> Result<(), CodeGenError> {
        self.out.inst("SECTION .text")?;
        for f in functions {
            self.generate_function(f)?;
        }
        Ok(())
    }

    /// Emit one function: prologue, body, then the common epilogue.
    ///
    /// The epilogue pops the return value (0 is pushed first so falling
    /// off the end returns 0), restores `esp`/`ebp`, pops the return
    /// address into `ebx`, drops the argument slots, re-pushes the value
    /// for the caller if the function returns one, and jumps back through
    /// `ebx`.
    fn generate_function(&mut self, f: &Function) -> Result<(), CodeGenError> {
        if f.name == "main" && f.params.len() != 2 {
            return Err(CodeGenError::Compile(
                "Main must have 2 parameters".to_string(),
            ));
        }
        let frame = StackFrame::new(&f.params);
        self.out.label(&format!("?@{}", f.name));
        self.out.inst_arg("push", "ebp")?;
        self.out.inst_arg("mov", "ebp,esp")?;
        self.generate_statement(&f.body, &frame, true, None, None)?;
        self.out.inst_arg("push", "0")?;
        self.out.label(".return");
        self.out.inst_arg("pop", "eax")?;
        self.out.inst_arg("mov", "esp,ebp")?;
        self.out.inst_arg("pop", "ebp")?;
        self.out.inst_arg("pop", "ebx")?;
        self.out
            .inst_arg("add", &format!("esp,{}", 4 * f.params.len()))?;
        if !f.ret.is_void() {
            self.out.inst_arg("push", "eax")?;
        }
        self.out.inst_arg("jmp", "ebx")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CodeGen, Target, TargetOs};
    use crate::parser::Parser;

    fn generate_for(source: &str, os: TargetOs) -> String {
        let mut parser = Parser::from_source(source);
        let program = parser.parse().expect("test program should parse");
        CodeGen::new(Target::new(os))
            .generate(&program)
            .expect("test program should compile")
    }

    fn generate(source: &str) -> String {
        generate_for(source, TargetOs::Linux)
    }

    fn generate_err(source: &str) -> String {
        let mut parser = Parser::from_source(source);
        let program = parser.parse().expect("test program should parse");
        CodeGen::new(Target::new(TargetOs::Linux))
            .generate(&program)
            .expect_err("test program should fail to compile")
            .to_string()
    }

    /// Normalize to one instruction per line with single spaces so the
    /// assertions are layout-independent.
    fn normalized(asm: &str) -> String {
        asm.lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn assert_sequence(asm: &str, expected: &[&str]) {
        let text = normalized(asm);
        let mut from = 0;
        for inst in expected {
            match text[from..].find(inst) {
                Some(at) => from += at + inst.len(),
                None => panic!(
                    "expected {:?} (in order) in:\n{}\nmissing: {:?}",
                    expected, text, inst
                ),
            }
        }
    }

    #[test]
    fn test_scalar_global_data() {
        let asm = generate("int x = 5;");
        assert_sequence(&asm, &["SECTION .data", "x: dd 5"]);
    }

    #[test]
    fn test_char_global_uses_db() {
        let asm = generate("char c = 'A';");
        assert_sequence(&asm, &["SECTION .data", "c: db 65"]);
    }

    #[test]
    fn test_string_array_global() {
        let asm = generate("char msg[] = \"hi\";");
        assert_sequence(&asm, &["SECTION .data", "msg: db `hi`"]);
        // The declaration itself must not synthesize an extra global.
        assert!(!asm.contains("??sl"));
    }

    #[test]
    fn test_sized_string_array_checks_length() {
        let asm = generate("char msg[2] = \"hi\";");
        assert!(normalized(&asm).contains("msg: db `hi`"));
        let err = generate_err("char msg[3] = \"hi\";");
        assert!(err.contains("String literal wrong size"));
    }

    #[test]
    fn test_array_literal_global() {
        let asm = generate("int nums[3] = {1, 2, 3};");
        assert_sequence(&asm, &["nums: dd 1,2,3"]);
        let err = generate_err("int nums[2] = {1, 2, 3};");
        assert!(err.contains("Array literal wrong size"));
    }

    #[test]
    fn test_string_in_int_array_synthesizes_global_after() {
        let asm = generate("int table[2] = {\"hi\", 0};");
        assert_sequence(&asm, &["table: dd ??sl0,0", "??sl0: db `hi`"]);
    }

    #[test]
    fn test_main_prologue_and_epilogue() {
        let asm = generate("int main(int argc, int argv) { return 0; }");
        assert_sequence(
            &asm,
            &[
                "GLOBAL ?@main",
                "SECTION .text",
                "?@main: push ebp",
                "mov ebp,esp",
                "push 0",
                "jmp .return",
                "push 0",
                ".return: pop eax",
                "mov esp,ebp",
                "pop ebp",
                "pop ebx",
                "add esp,8",
                "push eax",
                "jmp ebx",
            ],
        );
    }

    #[test]
    fn test_void_function_does_not_push_result() {
        let asm = generate("void f() ;");
        let text = normalized(&asm);
        let epilogue = text.split(".return: pop eax").nth(1).unwrap();
        assert!(epilogue.contains("add esp,0"));
        assert!(!epilogue.contains("push eax"));
    }

    #[test]
    fn test_if_else_lowering() {
        let asm = generate(
            "int a = 0; int b = 0;\n\
             void g() ; void h() ;\n\
             void f() { if (a == b) g(); else h(); }",
        );
        assert_sequence(
            &asm,
            &[
                ".if0: mov eax,dword[a]",
                "push eax",
                "mov ebx,dword[b]",
                "pop eax",
                "cmp eax,ebx",
                "jne .ifelse0",
                "call ?@g",
                "jmp .ifend0",
                ".ifelse0: call ?@h",
                ".ifend0:",
            ],
        );
    }

    #[test]
    fn test_if_without_else_jumps_to_end() {
        let asm = generate("int a = 0; void g() ; void f() { if (a) g(); }");
        assert_sequence(&asm, &["cmp eax,0", "je .ifend0", "call ?@g", ".ifend0:"]);
        assert!(!asm.contains(".ifelse0"));
    }

    #[test]
    fn test_while_loop_lowering() {
        let asm = generate("int x = 1; void f() { while (x) { x = x - 1; } }");
        assert_sequence(
            &asm,
            &[
                ".while0: mov eax,dword[x]",
                "cmp eax,0",
                "je .endwhile0",
                "jmp .while0",
                ".endwhile0:",
            ],
        );
    }

    #[test]
    fn test_while_block_scope_entered_once() {
        let asm = generate("int x = 1; void f() { while (x) { int i; i = 0; } }");
        let text = normalized(&asm);
        // Locals are reserved before the loop head and released after it,
        // not once per iteration.
        let head = text.find(".while0:").unwrap();
        let sub = text.find("sub esp,4").unwrap();
        let add = text.find("add esp,4").unwrap();
        let end = text.find(".endwhile0:").unwrap();
        assert!(sub < head, "sub esp must precede the loop label");
        assert!(end < add, "add esp must follow the loop exit");
    }

    #[test]
    fn test_while_break_body_evaluates_condition_once() {
        let asm = generate("int f() { return 0; } void g() { while (f()) break; }");
        let text = normalized(&asm);
        assert!(!text.contains(".while0"));
        assert!(!text.contains(".endwhile0"));
        // Statement-context call drops the pushed result.
        assert_sequence(&asm, &["call ?@f", "add esp,4"]);
    }

    #[test]
    fn test_while_empty_body_busy_loops() {
        let asm = generate("int x = 1; void f() { while (x) ; }");
        assert_sequence(&asm, &[".while0: mov eax,dword[x]", "cmp eax,0", "jne .while0"]);
    }

    #[test]
    fn test_break_and_continue_jump_to_loop_labels() {
        let asm = generate(
            "int x = 1; void f() { while (x) { if (x == 1) break; continue; } }",
        );
        assert_sequence(&asm, &["jmp .endwhile0"]);
        assert_sequence(&asm, &["jmp .while0"]);
    }

    #[test]
    fn test_break_propagates_into_nested_blocks() {
        let asm = generate("int x = 1; void f() { while (x) { { break; } } }");
        assert_sequence(&asm, &["jmp .endwhile0"]);
    }

    #[test]
    fn test_break_outside_loop_is_an_error() {
        assert_eq!(generate_err("void f() { break; }"), "Nowhere to break");
        assert_eq!(generate_err("void f() { continue; }"), "Nowhere to continue");
    }

    #[test]
    fn test_extern_c_call_alignment() {
        let asm = generate(
            "extern \"C\" int printf(char[] fmt, ...);\n\
             char fmt[] = \"%d %d\\n\";\n\
             void f() { printf(&fmt[0], 1, 2); }",
        );
        assert_sequence(
            &asm,
            &[
                "EXTERN printf",
                "mov eax,esp",
                "and esp,0fffffff0h",
                "push eax",
                "call printf",
                "mov esp,[esp+12]",
            ],
        );
        // Three arguments need no alignment padding.
        assert!(!normalized(&asm).contains("sub esp,"));
    }

    #[test]
    fn test_extern_c_call_pads_to_alignment() {
        let asm = generate("extern \"C\" int getchar(); int f() { return getchar(); }");
        assert_sequence(
            &asm,
            &[
                "mov eax,esp",
                "and esp,0fffffff0h",
                "sub esp,12",
                "push eax",
                "call getchar",
                "mov esp,[esp+0]",
                "push eax",
            ],
        );
    }

    #[test]
    fn test_extern_c_prefix_on_darwin() {
        let asm = generate_for(
            "extern \"C\" int getchar(); int f() { return getchar(); }",
            TargetOs::Darwin,
        );
        assert_sequence(&asm, &["EXTERN _getchar", "call _getchar"]);
    }

    #[test]
    fn test_extern_native_function() {
        let asm = generate("extern int helper(a); void f() { helper(1); }");
        assert_sequence(&asm, &["EXTERN ?@helper", "call ?@helper", "add esp,4"]);
    }

    #[test]
    fn test_extern_variable_linkage() {
        let asm = generate_for(
            "extern \"C\" int errno; int f() { return errno; }",
            TargetOs::Darwin,
        );
        assert_sequence(&asm, &["EXTERN _errno", "mov eax,dword[_errno]"]);
    }

    #[test]
    fn test_invalid_extern_linkage() {
        let err = generate_err("extern \"pascal\" int f();");
        assert!(err.contains("Invalid extern linkage"));
    }

    #[test]
    fn test_native_varargs_rejected() {
        let err = generate_err("extern int f(a, ...);");
        assert!(err.contains("Native functions do not support varargs"));
    }

    #[test]
    fn test_varargs_minimum_arity() {
        let err = generate_err(
            "extern \"C\" int printf(char[] fmt, ...); void f() { printf(); }",
        );
        assert!(err.contains("Not enough arguments"));
    }

    #[test]
    fn test_linux_syscall_convention() {
        let asm = generate("char buf[4] = \"abcd\"; void f() { $write(1, &buf[0], 4); }");
        assert_sequence(
            &asm,
            &["pop ebx", "pop ecx", "pop edx", "mov eax,4", "int 80h"],
        );
    }

    #[test]
    fn test_linux_syscall_six_args_preserves_ebp() {
        let asm = generate("void f() { $mmap(0, 4096, 3, 34, 0, 0); }");
        assert_sequence(
            &asm,
            &[
                "push ebp",
                "pop ebx",
                "pop ecx",
                "pop edx",
                "pop esi",
                "pop edi",
                "pop ebp",
                "mov eax,90",
                "int 80h",
                "pop ebp",
            ],
        );
    }

    #[test]
    fn test_linux_syscall_seven_args_rejected() {
        let err = generate_err("void f() { $mmap(1, 2, 3, 4, 5, 6, 7); }");
        assert!(err.contains("More than 6 arguments"));
    }

    #[test]
    fn test_bsd_syscall_convention() {
        let asm = generate_for(
            "void f() { $exit(0); }",
            TargetOs::FreeBsd,
        );
        assert_sequence(
            &asm,
            &["push 0", "push dword 0", "mov eax,1", "int 80h", "add esp,8"],
        );
    }

    #[test]
    fn test_syscall_value_pushed_in_expression_context() {
        let asm = generate("int f() { return $getpid(); }");
        assert_sequence(&asm, &["mov eax,20", "int 80h", "push eax"]);
    }

    #[test]
    fn test_unknown_function_and_variable() {
        assert!(generate_err("void f() { g(); }").contains("Function does not exist: g"));
        assert!(generate_err("void f() { x = 1; }").contains("No such variable: x"));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = generate_err("void g(a, b) ; void f() { g(1); }");
        assert!(err.contains("Incorrect number of arguments to g(a, b)"));
    }

    #[test]
    fn test_void_result_used_as_value() {
        let err = generate_err("void g() ; void f() { int x; x = g(); }");
        assert!(err.contains("g() does not return a value"));
    }

    #[test]
    fn test_main_arity_checked() {
        let err = generate_err("int main(argc) { return 0; }");
        assert!(err.contains("Main must have 2 parameters"));
    }

    #[test]
    fn test_reserved_name() {
        assert_eq!(generate_err("int _start = 0;"), "Reserved name");
    }

    #[test]
    fn test_char_overflow_and_string_as_char() {
        assert!(generate_err("char c = 300;").contains("too big to fit in char"));
        assert!(generate_err("char c = \"x\";").contains("String literal cannot be a char"));
    }

    #[test]
    fn test_unknown_syscall_never_reaches_codegen() {
        // The lexer rejects unknown $names, so the identifier that is
        // left behind fails as an undefined function.
        let mut parser = Parser::from_source("void f() { $frob(); }");
        let program = parser.parse().unwrap();
        let err = CodeGen::new(Target::new(TargetOs::Linux))
            .generate(&program)
            .unwrap_err();
        assert!(err.to_string().contains("Function does not exist"));
    }

    #[test]
    fn test_shift_mnemonics() {
        let asm = generate("int a = 8; int f() { return a << 1 >> 2 >>> 3; }");
        assert_sequence(&asm, &["shl eax,cl", "sar eax,cl", "shr eax,cl"]);
    }

    #[test]
    fn test_signed_and_unsigned_multiplication() {
        let asm = generate("int a = 6; int f() { return a * 7; }");
        assert_sequence(&asm, &["pop eax", "imul eax,ebx"]);
        let asm = generate("int a = 6; int f() { return a # 7; }");
        assert_sequence(&asm, &["pop eax", "mul ebx", "mov eax,eax"]);
    }

    #[test]
    fn test_division_and_remainder() {
        let asm = generate("int a = 6; int f() { return a / 2; }");
        assert_sequence(&asm, &["cdq", "idiv ebx", "mov eax,eax"]);
        let asm = generate("int a = 6; int f() { return a % 2; }");
        assert_sequence(&asm, &["cdq", "idiv ebx", "mov eax,edx"]);
        let asm = generate("int a = 6; int f() { return a \\ 2; }");
        assert_sequence(&asm, &["cdq", "div ebx", "mov eax,eax"]);
        let asm = generate("int a = 6; int f() { return a @ 2; }");
        assert_sequence(&asm, &["cdq", "div ebx", "mov eax,edx"]);
    }

    #[test]
    fn test_relational_value_materialization() {
        let asm = generate("int a = 1; int f() { return a <| 2; }");
        assert_sequence(&asm, &["cmp eax,ebx", "setb al", "movzx eax,al"]);
    }

    #[test]
    fn test_unary_operators() {
        let asm = generate("int a = 1; int f() { return !a; }");
        assert_sequence(&asm, &["cmp eax,0", "sete al", "movzx eax,al"]);
        let asm = generate("int a = 1; int f() { return -a; }");
        assert_sequence(&asm, &["neg eax"]);
        let asm = generate("int a = 1; int f() { return ~a; }");
        assert_sequence(&asm, &["not eax"]);
    }

    #[test]
    fn test_short_circuit_value() {
        let asm = generate("int a = 1; int b = 2; int f() { return a && b; }");
        assert_sequence(
            &asm,
            &[
                "je .l0",
                "cmp eax,0",
                "je .l0",
                "mov eax,1",
                "jmp .l1",
                ".l0: mov eax,0",
                ".l1:",
            ],
        );
    }

    #[test]
    fn test_condition_bitand_uses_test() {
        let asm = generate("int x = 6; void g() ; void f() { if (x & 1) g(); }");
        assert_sequence(&asm, &["test eax,1", "je .ifend0"]);
        assert!(!normalized(&asm).contains("and eax"));
    }

    #[test]
    fn test_condition_constant_folds_to_jump() {
        let asm = generate("void g() ; void f() { if (1) g(); if (0) g(); }");
        let text = normalized(&asm);
        // True constant: no jump at all (fall through into the body).
        // False constant: unconditional jump over the body.
        assert!(text.contains("jmp .ifend1"));
        assert!(!text.contains("cmp"));
    }

    #[test]
    fn test_short_circuit_condition_jumps() {
        let asm = generate(
            "int a = 1; int b = 2; void g() ; void f() { if (a == 1 && b == 2) g(); }",
        );
        assert_sequence(&asm, &["jne .ifend0", "jne .ifend0", "call ?@g"]);
    }

    #[test]
    fn test_not_swaps_branches() {
        let asm = generate("int a = 1; void g() ; void f() { if (!(a == 1)) g(); }");
        // !(a == 1) with only a false target jumps on equality.
        assert_sequence(&asm, &["cmp eax,ebx", "je .ifend0"]);
    }

    #[test]
    fn test_char_assignment_truncates_through_low_byte() {
        let asm = generate("void f() { char c; c = 65; }");
        assert_sequence(&asm, &["pop eax", "movsx eax,al", "mov byte[ebp-1],al"]);
    }

    #[test]
    fn test_char_read_sign_extends() {
        let asm = generate("char c = 'x'; int f() { return c; }");
        assert_sequence(&asm, &["mov al,byte[c]", "movsx eax,al"]);
    }

    #[test]
    fn test_deref_read_and_write() {
        let asm = generate("int p = 0; void f() { *(p) = 1; }");
        assert_sequence(&asm, &["push 1", "mov ebx,dword[p]", "pop eax"]);
        assert_sequence(&asm, &["mov dword[ebx],eax"]);
        let asm = generate("int p = 0; void f() { #(p) = 65; }");
        assert_sequence(&asm, &["movsx eax,al", "mov byte[ebx],al"]);
        let asm = generate("int p = 0; int f() { return #(p); }");
        assert_sequence(&asm, &["mov eax,dword[p]", "mov al,byte[eax]", "movsx eax,al"]);
    }

    #[test]
    fn test_address_of_uses_lea() {
        let asm = generate("int nums[4] = {1,2,3,4}; int f(i) { return &nums[i]; }");
        assert_sequence(&asm, &["mov eax,dword[ebp+8]", "lea eax,[nums+4*eax]"]);
    }

    #[test]
    fn test_address_of_deref_folds() {
        let asm = generate("int p = 0; int f() { return &*(p); }");
        // &*(p) is folded to p (a warning is printed on stderr).
        assert_sequence(&asm, &["mov eax,dword[p]", "push eax"]);
        assert!(!normalized(&asm).contains("lea"));
    }

    #[test]
    fn test_string_literal_expression_synthesizes_global() {
        let asm = generate("int f() { return \"hi\"; }");
        assert_sequence(&asm, &["push ??sl0", "SECTION .data", "??sl0: db `hi`"]);
    }

    #[test]
    fn test_nested_if_labels_unique() {
        let asm = generate(
            "int a = 1; void g() ;\n\
             void f() { if (a) { if (a) g(); } if (a) g(); }",
        );
        let text = normalized(&asm);
        for label in [".ifend0", ".ifend1", ".ifend2"] {
            assert_eq!(
                text.matches(&format!("{}:", label)).count(),
                1,
                "label {} must be defined exactly once",
                label
            );
        }
    }

    #[test]
    fn test_function_symbols_unique_and_decorated() {
        let asm = generate("void f() ; void g() ; int main(a, b) { return 0; }");
        let text = normalized(&asm);
        assert_eq!(text.matches("?@f: push ebp").count(), 1);
        assert_eq!(text.matches("?@g: push ebp").count(), 1);
        assert_eq!(text.matches("?@main: push ebp").count(), 1);
    }

    #[test]
    fn test_block_stack_balance() {
        let asm = generate("void f() { int a; { int b; b = 1; } a = 1; }");
        let text = normalized(&asm);
        // Outer block: 4 bytes, kept until the epilogue restores esp.
        // Inner block: 4 bytes, released on exit.
        assert_eq!(text.matches("sub esp,4").count(), 2);
        assert_eq!(text.matches("add esp,4").count(), 1);
    }

    #[test]
    fn test_exports_emitted_first() {
        let asm = generate("export f(); export counter; void f() ; int counter = 0;");
        assert_sequence(
            &asm,
            &["GLOBAL ?@f", "GLOBAL counter", "SECTION .text", "SECTION .data"],
        );
    }

    #[test]
    fn test_call_before_definition_resolves() {
        let asm = generate("void f() { g(); } void g() ;");
        assert_sequence(&asm, &["call ?@g", "?@g: push ebp"]);
    }

    #[test]
    fn test_recursive_function_return_value() {
        let asm = generate(
            "int fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }",
        );
        assert_sequence(&asm, &["call ?@fact", "imul eax,ebx", "push eax", "jmp .return"]);
    }

    #[test]
    fn test_unsized_local_array_is_an_error() {
        let err = generate_err("void f() { int a[]; }");
        assert!(err.contains("explicit length"));
    }
}

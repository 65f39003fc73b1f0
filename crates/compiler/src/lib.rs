//! Cedar compiler library.
//!
//! Provides compilation from Cedar source to 32-bit x86 assembly in NASM
//! syntax. The pipeline is a single pass: lex, parse, then walk the AST
//! emitting assembly text. There is no intermediate representation and no
//! optimizer; what the code generator decides is what the file contains.
//!
//! ```rust,ignore
//! use cedarc::{CompilerConfig, compile_source};
//!
//! let unit = compile_source("int x = 5;", &CompilerConfig::default())?;
//! assert!(unit.asm.contains("SECTION .data"));
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod syscalls;

pub use ast::Program;
pub use codegen::{CodeGen, CodeGenError, Target, TargetOs};
pub use config::CompilerConfig;
pub use lexer::LexError;
pub use parser::{Parser, SyntaxError};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the pipeline can fail with, kept apart so the driver can
/// format each class the way the tool promises: syntax diagnostics one
/// per line, semantic errors as `ERROR in <file>: <message>`.
#[derive(Debug)]
pub enum CompileError {
    Io(String),
    Syntax(Vec<SyntaxError>),
    Codegen(String),
    Target(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io(msg) | CompileError::Target(msg) | CompileError::Codegen(msg) => {
                f.write_str(msg)
            }
            CompileError::Syntax(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// A successful compilation: the assembly text plus any lexical
/// diagnostics that were skipped over along the way.
#[derive(Debug)]
pub struct CompiledUnit {
    pub asm: String,
    pub lex_errors: Vec<LexError>,
}

/// Result of `compile_file`: where the assembly went, plus diagnostics.
pub struct BuildResult {
    pub output: PathBuf,
    pub lex_errors: Vec<LexError>,
}

/// Compile source text to assembly.
///
/// Lexical errors are recoverable (the bad character is skipped), so they
/// ride along in the `Ok` value; syntax and semantic errors abort.
pub fn compile_source(
    source: &str,
    config: &CompilerConfig,
) -> Result<CompiledUnit, CompileError> {
    let (tokens, lex_errors) = lexer::tokenize(source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse().map_err(CompileError::Syntax)?;
    let target = config.resolve_target().map_err(CompileError::Target)?;
    let asm = CodeGen::new(target)
        .generate(&program)
        .map_err(|e| CompileError::Codegen(e.to_string()))?;
    Ok(CompiledUnit { asm, lex_errors })
}

/// Compile a source file, writing the assembly next to it (or to
/// `output` when given) with the extension replaced by `.s`.
pub fn compile_file(
    input: &Path,
    output: Option<&Path>,
    config: &CompilerConfig,
) -> Result<BuildResult, CompileError> {
    let source = fs::read_to_string(input)
        .map_err(|e| CompileError::Io(format!("Failed to read {}: {}", input.display(), e)))?;
    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("s"),
    };
    let unit = compile_source(&source, config)?;
    fs::write(&out_path, unit.asm)
        .map_err(|e| CompileError::Io(format!("Failed to write {}: {}", out_path.display(), e)))?;
    Ok(BuildResult {
        output: out_path,
        lex_errors: unit.lex_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_config() -> CompilerConfig {
        CompilerConfig::new().with_target(TargetOs::Linux)
    }

    #[test]
    fn test_compile_source_end_to_end() {
        let unit = compile_source(
            "int x = 5;\nint main(int argc, int argv) { return x; }",
            &linux_config(),
        )
        .unwrap();
        assert!(unit.lex_errors.is_empty());
        assert!(unit.asm.contains("GLOBAL ?@main"));
        assert!(unit.asm.contains("SECTION .text"));
        assert!(unit.asm.contains("SECTION .data"));
    }

    #[test]
    fn test_syntax_errors_abort() {
        let err = compile_source("int x = ;", &linux_config()).unwrap_err();
        match err {
            CompileError::Syntax(errors) => assert_eq!(errors.len(), 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_codegen_error_is_reported() {
        let err = compile_source(
            "int main(int argc, int argv) { return nope; }",
            &linux_config(),
        )
        .unwrap_err();
        match err {
            CompileError::Codegen(msg) => assert!(msg.contains("No such variable")),
            other => panic!("expected codegen error, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_errors_do_not_abort() {
        let unit = compile_source("int x = 5; ?", &linux_config()).unwrap();
        assert_eq!(unit.lex_errors.len(), 1);
        assert!(unit.asm.contains("SECTION .data"));
    }

    #[test]
    fn test_compile_file_derives_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.cdr");
        fs::write(&input, "int x = 1;").unwrap();
        let result = compile_file(&input, None, &linux_config()).unwrap();
        assert_eq!(result.output, dir.path().join("prog.s"));
        let asm = fs::read_to_string(result.output).unwrap();
        assert!(asm.contains("SECTION .data"));
    }

    #[test]
    fn test_compile_file_missing_input() {
        let err = compile_file(Path::new("/no/such/file.cdr"), None, &linux_config());
        assert!(matches!(err, Err(CompileError::Io(_))));
    }
}

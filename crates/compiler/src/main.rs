//! Cedar compiler CLI.
//!
//! `cedarc build` compiles a source file to x86 assembly; `tokens` and
//! `graph` expose the front-end stages for debugging.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use cedarc::{CompileError, CompilerConfig, TargetOs, config::CONFIG_FILE};

#[derive(ClapParser)]
#[command(name = "cedarc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cedar compiler - compile Cedar programs to x86 assembly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to assembly
    Build {
        /// Input source file
        input: PathBuf,

        /// Output path (defaults to the input with a .s extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target OS: linux, freebsd or darwin (defaults to the host)
        #[arg(long)]
        target: Option<String>,

        /// Path to a configuration file (defaults to ./cedar.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Dump the token stream of a source file
    Tokens {
        /// Input source file
        input: PathBuf,
    },

    /// Write a Graphviz rendering of the parse tree next to the input
    Graph {
        /// Input source file
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            target,
            config,
        } => run_build(&input, output.as_deref(), target.as_deref(), config.as_deref()),
        Commands::Tokens { input } => run_tokens(&input),
        Commands::Graph { input } => run_graph(&input),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cedarc", &mut io::stdout());
}

fn load_config(explicit: Option<&Path>) -> CompilerConfig {
    let result = match explicit {
        Some(path) => CompilerConfig::load(path),
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.exists() {
                CompilerConfig::load(default)
            } else {
                Ok(CompilerConfig::default())
            }
        }
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_build(input: &Path, output: Option<&Path>, target: Option<&str>, config: Option<&Path>) {
    let mut config = load_config(config);
    if let Some(target) = target {
        match target.parse::<TargetOs>() {
            Ok(os) => config.target = Some(os),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }

    match cedarc::compile_file(input, output, &config) {
        Ok(result) => {
            for e in &result.lex_errors {
                println!("{}", e);
            }
            println!("Compiled {} -> {}", input.display(), result.output.display());
        }
        Err(CompileError::Syntax(errors)) => {
            for e in errors {
                println!("{}", e);
            }
            process::exit(1);
        }
        Err(CompileError::Codegen(message)) => {
            println!("ERROR in {}: {}", input.display(), message);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_tokens(input: &Path) {
    let source = read_source(input);
    let (tokens, errors) = cedarc::lexer::tokenize(&source);
    for e in &errors {
        println!("{}", e);
    }
    for token in tokens {
        println!("{:>5}: {:<12} {}", token.line, token.kind.kind_name(), token.kind.text());
    }
}

fn run_graph(input: &Path) {
    let source = read_source(input);
    let (tokens, _) = cedarc::lexer::tokenize(&source);
    let mut parser = cedarc::Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(errors) => {
            for e in errors {
                println!("{}", e);
            }
            process::exit(1);
        }
    };
    let dot = cedarc::graph::render_parse_tree(&program);
    let out_path = input.with_extension("dot");
    if let Err(e) = std::fs::write(&out_path, dot) {
        eprintln!("Error: failed to write {}: {}", out_path.display(), e);
        process::exit(1);
    }
    println!("Wrote {}", out_path.display());
}

fn read_source(input: &Path) -> String {
    match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", input.display(), e);
            process::exit(1);
        }
    }
}

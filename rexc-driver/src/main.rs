//! REX Compiler Driver
//!
//! Command-line entry point for the REX compiler. Two stages are exposed:
//! dumping the parsed AST (as an indented tree or JSON) and dumping the
//! generated, verified IR in its textual form.

use clap::{Parser, Subcommand};
use rexc_frontend::parse_source;
use rexc_ir::{generate, print_module, verify};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rexc")]
#[command(about = "REX Compiler")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a REX source file and dump its AST
    DumpAst {
        /// Input REX source file
        input: PathBuf,

        /// Emit the AST as JSON instead of an indented tree
        #[arg(long)]
        json: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a REX source file, generate and verify IR, and dump it
    DumpIr {
        /// Input REX source file
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::DumpAst {
            input,
            json,
            output,
        } => dump_ast(&input, json, output.as_deref()),
        Commands::DumpIr { input, output } => dump_ir(&input, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// True for files holding printed IR rather than REX source
fn is_printed_ir(input: &Path) -> bool {
    input.extension().and_then(|ext| ext.to_str()) == Some("rir")
}

fn load_source(input: &Path) -> Result<String, Box<dyn Error>> {
    if is_printed_ir(input) {
        return Err(format!(
            "{}: printed IR (.rir) is an output format, not an input; pass a .rex source file",
            input.display()
        )
        .into());
    }
    Ok(fs::read_to_string(input)?)
}

fn emit(text: &str, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) => fs::write(path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}

fn dump_ast(input: &Path, json: bool, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let source = load_source(input)?;
    let filename = input.display().to_string();
    let program = parse_source(&source, &filename)?;

    let text = if json {
        let mut text = serde_json::to_string_pretty(&program)?;
        text.push('\n');
        text
    } else {
        program.dump()
    };
    emit(&text, output)
}

fn dump_ir(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let source = load_source(input)?;
    let filename = input.display().to_string();
    let program = parse_source(&source, &filename)?;

    let result = generate(&program);
    for err in &result.errors {
        eprintln!("Error: {}", err);
    }
    verify(&result.module)?;
    emit(&print_module(&result.module), output)?;

    if result.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} function(s) failed to generate", result.errors.len()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printed_ir_extension_is_rejected() {
        assert!(is_printed_ir(Path::new("module.rir")));
        assert!(is_printed_ir(Path::new("dir/with.dots/module.rir")));
    }

    #[test]
    fn test_source_extensions_are_accepted() {
        assert!(!is_printed_ir(Path::new("program.rex")));
        assert!(!is_printed_ir(Path::new("program.txt")));
        assert!(!is_printed_ir(Path::new("program")));
        assert!(!is_printed_ir(Path::new("rir")));
    }

    #[test]
    fn test_load_source_refuses_printed_ir_before_reading() {
        // The path does not exist; the refusal must come from the
        // extension check, not from the filesystem.
        let err = load_source(Path::new("missing.rir")).unwrap_err();
        assert!(err.to_string().contains(".rir"));
    }
}

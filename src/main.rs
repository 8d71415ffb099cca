use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use zerox::ast::{Program, Statement};
use zerox::backend::Backend;
use zerox::backend::interpreter::Interpreter;
use zerox::backend::transpiler::{Transpiler, compile_executable};
use zerox::diagnostics::{Collector, Diagnostic};
use zerox::typecheck;
use zerox::{lexer, parser};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut compile = false;
    let mut source_path: Option<String> = None;
    let mut output_path: Option<String> = None;

    for arg in args.by_ref() {
        match arg.as_str() {
            "--compile" => compile = true,
            _ => {
                if source_path.is_none() {
                    source_path = Some(arg);
                } else if output_path.is_none() {
                    output_path = Some(arg);
                } else {
                    bail!("Unexpected argument '{arg}'");
                }
            }
        }
    }

    let Some(source_path) = source_path else {
        bail!("Usage: zerox [--compile] <source.0x> [<output.c>]");
    };

    let source =
        fs::read_to_string(&source_path).with_context(|| format!("Reading {source_path}"))?;
    let program = parse_source(&source)?;
    let program = resolve_imports(program)?;

    let (_table, errors) = typecheck::check(&program);
    if !errors.is_empty() {
        let mut collector = Collector::new();
        for error in &errors {
            collector.push(Diagnostic::from_type(error, &source));
        }
        bail!("{collector}");
    }

    if compile {
        compile_program(&program, &source_path, output_path)
    } else {
        let output = Interpreter::new().run(&program)?;
        print!("{output}");
        Ok(())
    }
}

fn parse_source(source: &str) -> Result<Program> {
    let tokens = match lexer::tokenize(source) {
        Ok(tokens) => tokens,
        Err(error) => bail!("{}", Diagnostic::from_lex(&error, source)),
    };
    match parser::parse_tokens(tokens) {
        Ok(program) => Ok(program),
        Err(error) => bail!("{}", Diagnostic::from_parse(&error, source)),
    }
}

/// Prepends the top-level statements of every imported standard-library
/// module, and of `math` unconditionally, to the user program. Modules are
/// looked up at `<cwd>/src/std/<module>.0x`.
fn resolve_imports(program: Program) -> Result<Program> {
    let mut modules = vec!["math".to_string()];
    for statement in &program.statements {
        if let Statement::Import { module, .. } = statement
            && !modules.contains(module)
        {
            modules.push(module.clone());
        }
    }

    let mut statements = Vec::new();
    for module in &modules {
        let path = Path::new("src").join("std").join(format!("{module}.0x"));
        if !path.exists() {
            // `math` is implied rather than requested; a missing file only
            // matters for explicit imports.
            if module == "math" {
                continue;
            }
            bail!("Cannot find module '{module}' (looked in {})", path.display());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Reading module {}", path.display()))?;
        let module_program = parse_source(&text)
            .with_context(|| format!("In module '{module}'"))?;
        statements.extend(module_program.statements);
    }

    statements.extend(program.statements);
    Ok(Program { statements })
}

fn compile_program(
    program: &Program,
    source_path: &str,
    output_path: Option<String>,
) -> Result<()> {
    let c_source = Transpiler.transpile(program);

    let c_path = match output_path {
        Some(path) => PathBuf::from(path),
        None => {
            let name = Path::new(source_path)
                .file_name()
                .with_context(|| format!("Invalid source path {source_path}"))?;
            PathBuf::from(name).with_extension("c")
        }
    };
    fs::write(&c_path, &c_source).with_context(|| format!("Writing {}", c_path.display()))?;

    let exe_path = c_path.with_extension("");
    compile_executable(&c_path, &exe_path)
}

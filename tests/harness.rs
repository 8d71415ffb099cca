use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};

use zerox::backend::Backend;
use zerox::backend::interpreter::Interpreter;
use zerox::backend::transpiler::{Transpiler, c_compiler_available};
use zerox::fixtures::{self, Case, CaseClass};
use zerox::typecheck;
use zerox::{lexer, parser};

fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

fn c_toolchain_required() -> bool {
    std::env::var("C_TOOLCHAIN_REQUIRED")
        .map(|value| value == "1")
        .unwrap_or(false)
}

/// Mirrors the driver's frontend: tokenize, parse, then collect type
/// errors. `Err` carries every message the driver would print.
fn run_frontend(source: &str) -> Result<zerox::ast::Program, String> {
    let tokens = lexer::tokenize(source).map_err(|error| error.to_string())?;
    let program = parser::parse_tokens(tokens).map_err(|error| error.to_string())?;
    let (_table, errors) = typecheck::check(&program);
    if !errors.is_empty() {
        return Err(errors
            .iter()
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("\n"));
    }
    Ok(program)
}

fn expected_error(case: &Case) -> Result<String> {
    let expected_file = case
        .spec
        .expected
        .stderr_contains_file
        .as_deref()
        .with_context(|| format!("Missing stderr expectation file in {}", case.name))?;
    Ok(case.read_text(expected_file)?.trim().to_string())
}

fn run_programs_for_backend(backend: &dyn Backend) -> Result<()> {
    let cases = fixtures::load_cases(Path::new("tests/programs"))?;

    for case in cases {
        if !case
            .spec
            .backends
            .iter()
            .any(|name| name == backend.name())
        {
            continue;
        }
        let source = fs::read_to_string(&case.program_path)
            .with_context(|| format!("Reading {}", case.name))?;
        let frontend = run_frontend(&source);

        match case.spec.class {
            CaseClass::RuntimeSuccess => {
                ensure!(
                    case.spec.expected.exit_code == 0,
                    "Case {} expected exit code must be 0 for runtime_success",
                    case.name
                );
                let stdout_file = case
                    .spec
                    .expected
                    .stdout_file
                    .as_deref()
                    .with_context(|| format!("Missing stdout_file in {}", case.name))?;
                let expected = case.read_text(stdout_file)?;
                let program = frontend
                    .map_err(|error| anyhow::anyhow!("Frontend failed for {}: {error}", case.name))?;
                let output = backend.run(&program).with_context(|| {
                    format!("Backend {} failed for {}", backend.name(), case.name)
                })?;
                assert_eq!(
                    normalize_output(&output),
                    normalize_output(&expected),
                    "Backend {} mismatch for {}",
                    backend.name(),
                    case.name
                );
            }
            CaseClass::FrontendError => {
                ensure!(
                    case.spec.expected.exit_code == 1,
                    "Case {} expected exit code must be 1 for frontend_error",
                    case.name
                );
                let expected = expected_error(&case)?;
                match frontend {
                    Err(actual) => ensure!(
                        actual.contains(&expected),
                        "Expected frontend error containing '{expected}' in {}, got '{actual}'",
                        case.name
                    ),
                    Ok(_) => anyhow::bail!(
                        "Expected frontend error in {}, but the frontend succeeded",
                        case.name
                    ),
                }
            }
            CaseClass::BackendRuntimeError => {
                ensure!(
                    case.spec.expected.exit_code == 1,
                    "Case {} expected exit code must be 1 for backend_runtime_error",
                    case.name
                );
                let expected = expected_error(&case)?;
                let program = frontend
                    .map_err(|error| anyhow::anyhow!("Frontend failed for {}: {error}", case.name))?;
                let result = backend.run(&program);
                ensure!(
                    result.is_err(),
                    "Expected backend runtime error for backend {} in {}",
                    backend.name(),
                    case.name
                );
                let actual = result.expect_err("result checked as err").to_string();
                ensure!(
                    actual.contains(&expected),
                    "Expected backend runtime error containing '{expected}' in {}, got '{actual}'",
                    case.name
                );
            }
        }
    }

    Ok(())
}

#[test]
fn runs_programs_interpreter_backend() -> Result<()> {
    run_programs_for_backend(&Interpreter::new())
}

#[test]
fn runs_programs_transpiler_backend() -> Result<()> {
    if !c_compiler_available() {
        if c_toolchain_required() {
            anyhow::bail!(
                "C toolchain required but none found. Install gcc or clang, or unset C_TOOLCHAIN_REQUIRED."
            );
        }
        eprintln!("Skipping transpiler cases: no C compiler (gcc, clang, cl) found.");
        return Ok(());
    }
    run_programs_for_backend(&Transpiler)
}

/// Programs limited to integers and string literals must print the same
/// bytes from both backends.
#[test]
fn interpreter_and_transpiler_agree_on_parity_cases() -> Result<()> {
    if !c_compiler_available() {
        eprintln!("Skipping parity check: no C compiler (gcc, clang, cl) found.");
        return Ok(());
    }

    let cases = fixtures::load_cases(Path::new("tests/programs"))?;
    for case in cases {
        if case.spec.class != CaseClass::RuntimeSuccess || case.spec.backends.len() < 2 {
            continue;
        }
        let source = fs::read_to_string(&case.program_path)
            .with_context(|| format!("Reading {}", case.name))?;
        let program = run_frontend(&source)
            .map_err(|error| anyhow::anyhow!("Frontend failed for {}: {error}", case.name))?;

        let interpreted = Interpreter::new().run(&program)?;
        let compiled = Transpiler.run(&program)?;
        assert_eq!(
            normalize_output(&interpreted),
            normalize_output(&compiled),
            "Backend disagreement for {}",
            case.name
        );
    }
    Ok(())
}

//! The fixed C preamble and the external C toolchain boundary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};

pub const C_HEADERS: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <string.h>

"#;

pub const C_INT_HELPERS: &str = r#"static int int_abs(int n) { return n < 0 ? -n : n; }
static int int_max(int a, int b) { return a > b ? a : b; }
static int int_min(int a, int b) { return a < b ? a : b; }

"#;

pub const C_STRING_HELPERS: &str = r#"static char* str_concat(const char* a, const char* b) {
    char* out = malloc(strlen(a) + strlen(b) + 1);
    strcpy(out, a);
    strcat(out, b);
    return out;
}

static char* str_length(const char* s) {
    char* out = malloc(21);
    sprintf(out, "%lu", (unsigned long)strlen(s));
    return out;
}

"#;

pub const C_ARRAY_HELPERS: &str = r#"static int arr_sum(const int* values, int count) {
    int total = 0;
    for (int i = 0; i < count; i++) {
        total = total + values[i];
    }
    return total;
}

static int arr_max(const int* values, int count) {
    int best = values[0];
    for (int i = 1; i < count; i++) {
        if (values[i] > best) {
            best = values[i];
        }
    }
    return best;
}

static int arr_min(const int* values, int count) {
    int best = values[0];
    for (int i = 1; i < count; i++) {
        if (values[i] < best) {
            best = values[i];
        }
    }
    return best;
}

"#;

/// Double-quote escaping for emitted C string literals.
pub fn escape_c_string(value: &str) -> String {
    value.replace('"', "\\\"")
}

const C_COMPILERS: [&str; 3] = ["gcc", "clang", "cl"];

/// True when any of the known C compilers can be spawned at all. Used by
/// the harness to skip transpiler cases on machines without a toolchain.
pub fn c_compiler_available() -> bool {
    C_COMPILERS.iter().any(|cc| {
        Command::new(cc)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok()
    })
}

/// Builds `exe_path` from `c_path`, trying `gcc`, `clang`, `cl` in order.
/// The first compiler that can be spawned is the one that decides the
/// outcome; its stdio is inherited.
pub fn compile_executable(c_path: &Path, exe_path: &Path) -> Result<()> {
    for cc in C_COMPILERS {
        let mut command = Command::new(cc);
        if cc == "cl" {
            let mut flag = std::ffi::OsString::from("/Fe");
            flag.push(exe_path);
            flag.push(".exe");
            command.arg(flag).arg(c_path);
        } else {
            command.arg("-o").arg(exe_path).arg(c_path);
        }

        let Ok(status) = command.status() else {
            // Not installed; try the next one.
            continue;
        };
        if status.success() {
            return Ok(());
        }
        bail!("C compiler '{cc}' failed for {}", c_path.display());
    }
    bail!("No C compiler found (tried gcc, clang, cl)")
}

pub fn write_temp_file(contents: &str) -> Result<(PathBuf, PathBuf)> {
    let mut dir = std::env::temp_dir();
    dir.push("zerox");
    fs::create_dir_all(&dir).context("Creating temp directory")?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let file_stem = format!("transpile_{nanos}");
    let source_path = dir.join(format!("{file_stem}.c"));
    let binary_path = dir.join(file_stem);

    fs::write(&source_path, contents).context("Writing C source")?;
    Ok((source_path, binary_path))
}

pub fn run_executable(binary_path: &Path) -> Result<String> {
    let output = Command::new(binary_path)
        .output()
        .context("Running compiled program")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Compiled program failed: {stderr}");
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

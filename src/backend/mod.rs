use anyhow::Result;

use crate::ast::Program;

pub mod interpreter;
pub mod transpiler;

/// An execution strategy for a parsed program. `run` returns whatever the
/// program wrote to standard output.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn run(&self, program: &Program) -> Result<String>;
}

pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(interpreter::Interpreter::new()),
        Box::new(transpiler::Transpiler),
    ]
}

//! C emitter backend.
//!
//! Lowers a type-checked program structurally to one self-contained C
//! translation unit: fixed runtime preamble, forward struct declarations,
//! struct definitions, method forward declarations, method definitions,
//! `<Class>_new` constructors, then `main` built from the top-level
//! variable declarations and expression statements.
//!
//! The translation is deliberately literal where the source language is
//! looser than C: field access always uses `.`, `this` and `super` are
//! emitted verbatim, and a method call mangles the receiver's variable
//! name rather than its class. Programs that stay on integers and string
//! literals produce C that compiles and matches the interpreter's output.

mod c_runtime;

use std::fs;

use anyhow::Result;

use crate::ast::{
    ClassDecl, ClassMember, Expression, MethodDecl, Param, Program, Statement,
};
use crate::backend::Backend;
pub use c_runtime::{c_compiler_available, compile_executable};
use c_runtime::{
    C_ARRAY_HELPERS, C_HEADERS, C_INT_HELPERS, C_STRING_HELPERS, escape_c_string, run_executable,
    write_temp_file,
};

pub struct Transpiler;

impl Transpiler {
    pub fn transpile(&self, program: &Program) -> String {
        let mut out = String::new();
        out.push_str(C_HEADERS);
        out.push_str(C_INT_HELPERS);
        out.push_str(C_STRING_HELPERS);
        out.push_str(C_ARRAY_HELPERS);

        let classes = program
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::ClassDecl(class) => Some(class),
                _ => None,
            })
            .collect::<Vec<_>>();

        for class in &classes {
            out.push_str(&format!("struct {};\n", class.name));
        }
        if !classes.is_empty() {
            out.push('\n');
        }

        for class in &classes {
            self.emit_struct(class, &mut out);
        }
        for class in &classes {
            for method in methods(class) {
                out.push_str(&format!("{};\n", self.method_signature(class, method)));
            }
        }
        if classes.iter().any(|class| !methods(class).is_empty()) {
            out.push('\n');
        }
        for class in &classes {
            for method in methods(class) {
                self.emit_method(class, method, &mut out);
            }
        }
        for class in &classes {
            self.emit_constructor(class, &mut out);
        }

        out.push_str("int main() {\n");
        for statement in &program.statements {
            if matches!(
                statement,
                Statement::VarDecl { .. } | Statement::Expr(_)
            ) {
                self.emit_statement(statement, 1, &mut out);
            }
        }
        self.push_line(&mut out, 1, "return 0;");
        out.push_str("}\n");
        out
    }

    fn emit_struct(&self, class: &ClassDecl, out: &mut String) {
        out.push_str(&format!("struct {} {{\n", class.name));
        for member in &class.members {
            if let ClassMember::Field { name, type_name } = member {
                self.push_line(out, 1, &format!("{} {};", c_type(type_name), name));
            }
        }
        out.push_str("};\n\n");
    }

    fn method_signature(&self, class: &ClassDecl, method: &MethodDecl) -> String {
        format!(
            "{} {}_{}({})",
            c_type(&method.return_type),
            class.name,
            method.name,
            c_params(&method.params)
        )
    }

    fn emit_method(&self, class: &ClassDecl, method: &MethodDecl, out: &mut String) {
        out.push_str(&format!("{} {{\n", self.method_signature(class, method)));
        for statement in &method.body {
            self.emit_statement(statement, 1, out);
        }
        out.push_str("}\n\n");
    }

    fn emit_constructor(&self, class: &ClassDecl, out: &mut String) {
        let constructor = class.members.iter().find_map(|member| match member {
            ClassMember::Constructor { params, body } => Some((params.as_slice(), body.as_slice())),
            _ => None,
        });
        let (params, body) = constructor.unwrap_or((&[], &[]));

        out.push_str(&format!(
            "struct {}* {}_new({}) {{\n",
            class.name,
            class.name,
            c_params(params)
        ));
        self.push_line(
            out,
            1,
            &format!(
                "struct {}* obj = malloc(sizeof(struct {}));",
                class.name, class.name
            ),
        );
        for statement in body {
            self.emit_statement(statement, 1, out);
        }
        self.push_line(out, 1, "return obj;");
        out.push_str("}\n\n");
    }

    fn emit_statement(&self, statement: &Statement, indent: usize, out: &mut String) {
        match statement {
            Statement::Import { .. } | Statement::ClassDecl(_) => {}
            Statement::VarDecl {
                name,
                type_name,
                init,
            } => {
                let line = match init {
                    Some(expr) => format!(
                        "{} {} = {};",
                        c_type(type_name),
                        name,
                        self.emit_expression(expr)
                    ),
                    None => format!("{} {};", c_type(type_name), name),
                };
                self.push_line(out, indent, &line);
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.emit_expression(condition);
                self.push_line(out, indent, &format!("if ({condition}) {{"));
                for stmt in then_body {
                    self.emit_statement(stmt, indent + 1, out);
                }
                if else_body.is_empty() {
                    self.push_line(out, indent, "}");
                } else {
                    self.push_line(out, indent, "} else {");
                    for stmt in else_body {
                        self.emit_statement(stmt, indent + 1, out);
                    }
                    self.push_line(out, indent, "}");
                }
            }
            Statement::Return(value) => {
                let line = match value {
                    Some(expr) => format!("return {};", self.emit_expression(expr)),
                    None => "return;".to_string(),
                };
                self.push_line(out, indent, &line);
            }
            Statement::Expr(expr) => {
                let expr = self.emit_expression(expr);
                self.push_line(out, indent, &format!("{expr};"));
            }
        }
    }

    fn emit_expression(&self, expr: &Expression) -> String {
        match expr {
            Expression::Integer(value) => value.to_string(),
            Expression::String(value) => format!("\"{}\"", escape_c_string(value)),
            Expression::Boolean(value) => if *value { "1" } else { "0" }.to_string(),
            Expression::Identifier(name) => name.clone(),
            Expression::BinaryOp { left, op, right } => format!(
                "({} {} {})",
                self.emit_expression(left),
                op.symbol(),
                self.emit_expression(right)
            ),
            Expression::UnaryOp { op, expr } => {
                format!("({}{})", op.symbol(), self.emit_expression(expr))
            }
            Expression::Call { callee, args } => self.emit_call(callee, args),
            Expression::New { class_name, args } => {
                format!("{}_new({})", class_name, self.emit_args(args))
            }
            Expression::FieldAccess { object, name } => {
                format!("{}.{}", self.emit_expression(object), name)
            }
            Expression::This => "this".to_string(),
            Expression::Super { method } => match method {
                Some(name) => format!("super.{name}"),
                None => "super".to_string(),
            },
            Expression::Assignment { target, value } => format!(
                "({} = {})",
                self.emit_expression(target),
                self.emit_expression(value)
            ),
        }
    }

    fn emit_call(&self, callee: &Expression, args: &[Expression]) -> String {
        if let Expression::Identifier(name) = callee
            && name == "print"
        {
            if args.is_empty() {
                return "printf(\"\\n\")".to_string();
            }
            let format_string = args
                .iter()
                .map(print_format)
                .collect::<Vec<_>>()
                .join(" ");
            return format!("printf(\"{format_string}\\n\", {})", self.emit_args(args));
        }

        if let Expression::FieldAccess { object, name } = callee {
            // The mangled callee uses the receiver's variable name when
            // there is one, `obj` otherwise.
            let receiver = match object.as_ref() {
                Expression::Identifier(name) => name.clone(),
                _ => "obj".to_string(),
            };
            return format!("{}_{}({})", receiver, name, self.emit_args(args));
        }

        format!("{}({})", self.emit_expression(callee), self.emit_args(args))
    }

    fn emit_args(&self, args: &[Expression]) -> String {
        args.iter()
            .map(|arg| self.emit_expression(arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_line(&self, out: &mut String, indent: usize, line: &str) {
        for _ in 0..indent {
            out.push_str("  ");
        }
        out.push_str(line);
        out.push('\n');
    }
}

/// Printf conversion chosen from the argument's syntactic kind alone.
fn print_format(arg: &Expression) -> &'static str {
    match arg {
        Expression::Integer(_)
        | Expression::BinaryOp { .. }
        | Expression::UnaryOp { .. }
        | Expression::Call { .. }
        | Expression::Identifier(_) => "%d",
        _ => "%s",
    }
}

fn c_type(type_name: &str) -> String {
    if type_name.eq_ignore_ascii_case("int") {
        "int".to_string()
    } else if type_name.eq_ignore_ascii_case("bool") {
        "int".to_string()
    } else if type_name.eq_ignore_ascii_case("void") {
        "void".to_string()
    } else if type_name.eq_ignore_ascii_case("string") {
        "char*".to_string()
    } else {
        format!("struct {type_name}*")
    }
}

fn c_params(params: &[Param]) -> String {
    if params.is_empty() {
        return "void".to_string();
    }
    params
        .iter()
        .map(|param| format!("{} {}", c_type(&param.type_name), param.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn methods(class: &ClassDecl) -> Vec<&MethodDecl> {
    class
        .members
        .iter()
        .filter_map(|member| match member {
            ClassMember::Method(method) => Some(method),
            _ => None,
        })
        .collect()
}

impl Backend for Transpiler {
    fn name(&self) -> &'static str {
        "transpiler"
    }

    fn run(&self, program: &Program) -> Result<String> {
        let source = self.transpile(program);
        let (source_path, binary_path) = write_temp_file(&source)?;
        let result = compile_executable(&source_path, &binary_path)
            .and_then(|_| run_executable(&binary_path));
        let _ = fs::remove_file(&source_path);
        let _ = fs::remove_file(&binary_path);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn transpile(source: &str) -> String {
        let tokens = tokenize(source).expect("tokenize should succeed");
        let program = parse_tokens(tokens).expect("parse should succeed");
        Transpiler.transpile(&program)
    }

    #[test]
    fn starts_with_headers_and_embedded_runtime() {
        let c = transpile("print(1)");
        assert!(c.starts_with("#include <stdio.h>\n#include <stdlib.h>\n#include <string.h>\n"));
        for helper in [
            "int_abs", "int_max", "int_min", "str_concat", "str_length", "arr_sum", "arr_max",
            "arr_min",
        ] {
            assert!(c.contains(helper), "missing runtime helper {helper}");
        }
    }

    #[test]
    fn lowers_print_with_per_argument_formats() {
        let c = transpile(r#"print(1 + 2, "hi", x)"#);
        assert!(c.contains("printf(\"%d %s %d\\n\", (1 + 2), \"hi\", x);"));
    }

    #[test]
    fn lowers_empty_print_to_bare_newline() {
        let c = transpile("print()");
        assert!(c.contains("printf(\"\\n\");"));
    }

    #[test]
    fn main_contains_only_top_level_vars_and_expressions() {
        let c = transpile(indoc! {"
            class Dog {}
            let x: int = 3
            print(x)
        "});
        let main = c.split("int main() {").nth(1).expect("main emitted");
        assert!(main.contains("int x = 3;"));
        assert!(main.contains("printf(\"%d\\n\", x);"));
        assert!(main.trim_end().ends_with("return 0;\n}"));
    }

    #[test]
    fn classes_lower_to_structs_with_field_type_mapping() {
        let c = transpile(indoc! {"
            class Dog {
                name: string
                age: int
                alive: bool
                owner: Person
            }
            class Person {}
        "});
        assert!(c.contains("struct Dog;\nstruct Person;\n"));
        assert!(c.contains(
            "struct Dog {\n  char* name;\n  int age;\n  int alive;\n  struct Person* owner;\n};"
        ));
    }

    #[test]
    fn methods_are_mangled_and_forward_declared() {
        let c = transpile(indoc! {"
            class Dog {
                bark(): string { return \"woof\" }
                age(n: int): int { return n * 7 }
            }
        "});
        assert!(c.contains("char* Dog_bark(void);"));
        assert!(c.contains("int Dog_age(int n);"));
        assert!(c.contains("char* Dog_bark(void) {\n  return \"woof\";\n}"));
        assert!(c.contains("int Dog_age(int n) {\n  return (n * 7);\n}"));
    }

    #[test]
    fn constructor_allocates_and_returns_the_object() {
        let c = transpile(indoc! {"
            class Dog {
                name: string
                constructor(name: string) {
                    this.name = name
                }
            }
        "});
        assert!(c.contains(indoc! {"
            struct Dog* Dog_new(char* name) {
              struct Dog* obj = malloc(sizeof(struct Dog));
              (this.name = name);
              return obj;
            }
        "}));
    }

    #[test]
    fn class_without_constructor_still_gets_a_new_function() {
        let c = transpile("class Empty {}");
        assert!(c.contains(indoc! {"
            struct Empty* Empty_new(void) {
              struct Empty* obj = malloc(sizeof(struct Empty));
              return obj;
            }
        "}));
    }

    #[test]
    fn method_calls_mangle_the_receiver_variable_name() {
        let c = transpile(indoc! {r#"
            let d: Dog = new Dog("Rex")
            print(d.bark())
        "#});
        assert!(c.contains("struct Dog* d = Dog_new(\"Rex\");"));
        assert!(c.contains("printf(\"%d\\n\", d_bark());"));
    }

    #[test]
    fn non_identifier_receivers_mangle_as_obj() {
        let c = transpile("this.owner.greet()");
        assert!(c.contains("obj_greet();"));
    }

    #[test]
    fn field_access_uses_direct_struct_access() {
        let c = transpile("print(d.name)");
        assert!(c.contains("printf(\"%s\\n\", d.name);"));
    }

    #[test]
    fn if_else_nests_with_two_space_indent() {
        let c = transpile(indoc! {"
            class T {
                pick(n: int): int {
                    if (n < 10) {
                        return 1
                    } else {
                        return 2
                    }
                }
            }
        "});
        assert!(c.contains(indoc! {"
            int T_pick(int n) {
              if ((n < 10)) {
                return 1;
              } else {
                return 2;
              }
            }
        "}));
    }

    #[test]
    fn string_literals_escape_double_quotes() {
        let c = transpile(r#"print("say \"hi\"")"#);
        assert!(c.contains(r#"printf("%s\n", "say \"hi\"");"#));
    }

    #[test]
    fn imports_emit_nothing() {
        let c = transpile("import math\nprint(1)");
        assert!(!c.contains("math"));
    }
}

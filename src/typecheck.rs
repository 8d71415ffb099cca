//! Declaration-level type checking.
//!
//! Three passes over the program: collect class headers, populate members,
//! then validate supertypes and top-level variable types. Errors accumulate
//! so one run reports every declaration defect at once; the checker never
//! recurses into method or constructor bodies.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{ClassMember, Program, Statement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Duplicate class {name}")]
    DuplicateClass { name: String },
    #[error("Class {name} extends unknown {super_name}")]
    UnknownSuperclass { name: String, super_name: String },
    #[error("Unknown type {type_name} in var {name}")]
    UnknownVariableType { type_name: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub param_types: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassInfo {
    pub super_name: Option<String>,
    /// Field name/type pairs in declaration order; the C emitter lays
    /// struct members out in this order.
    pub fields: Vec<(String, String)>,
    pub methods: HashMap<String, MethodSig>,
    pub constructor_params: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassTable {
    classes: HashMap<String, ClassInfo>,
}

const BUILTIN_TYPES: [&str; 4] = ["int", "string", "bool", "void"];

impl ClassTable {
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// True iff `name` is a built-in (case-insensitive) or a declared class.
    pub fn type_exists(&self, name: &str) -> bool {
        BUILTIN_TYPES
            .iter()
            .any(|builtin| builtin.eq_ignore_ascii_case(name))
            || self.contains(name)
    }

    /// Reflexive; false when either side is `void`; otherwise walks
    /// `super_name` links from `a` looking for `b`.
    pub fn is_subtype(&self, a: &str, b: &str) -> bool {
        if a.eq_ignore_ascii_case("void") || b.eq_ignore_ascii_case("void") {
            return false;
        }
        if a == b {
            return true;
        }
        // Bounded by the class count so a malformed cyclic chain cannot
        // loop forever.
        let mut steps = self.classes.len();
        let mut current = self.get(a).and_then(|info| info.super_name.as_deref());
        while let Some(name) = current {
            if name == b {
                return true;
            }
            if steps == 0 {
                return false;
            }
            steps -= 1;
            current = self.get(name).and_then(|info| info.super_name.as_deref());
        }
        false
    }
}

/// Runs all three passes. A populated table comes back even when errors
/// were found; zero errors means the program is well-typed for the later
/// passes.
pub fn check(program: &Program) -> (ClassTable, Vec<TypeError>) {
    let mut table = ClassTable::default();
    let mut errors = Vec::new();

    // Pass 1: class headers.
    for statement in &program.statements {
        let Statement::ClassDecl(class) = statement else {
            continue;
        };
        if table.contains(&class.name) {
            errors.push(TypeError::DuplicateClass {
                name: class.name.clone(),
            });
            continue;
        }
        table.classes.insert(
            class.name.clone(),
            ClassInfo {
                super_name: class.super_name.clone(),
                ..ClassInfo::default()
            },
        );
    }

    // Pass 2: members.
    for statement in &program.statements {
        let Statement::ClassDecl(class) = statement else {
            continue;
        };
        let Some(info) = table.classes.get_mut(&class.name) else {
            continue;
        };
        for member in &class.members {
            match member {
                ClassMember::Field { name, type_name } => {
                    info.fields.push((name.clone(), type_name.clone()));
                }
                ClassMember::Method(method) => {
                    info.methods.insert(
                        method.name.clone(),
                        MethodSig {
                            param_types: method
                                .params
                                .iter()
                                .map(|param| param.type_name.clone())
                                .collect(),
                            return_type: method.return_type.clone(),
                        },
                    );
                }
                ClassMember::Constructor { params, .. } => {
                    info.constructor_params = Some(
                        params
                            .iter()
                            .map(|param| param.type_name.clone())
                            .collect(),
                    );
                }
            }
        }
    }

    // Pass 3: validation.
    for statement in &program.statements {
        match statement {
            Statement::ClassDecl(class) => {
                if let Some(super_name) = &class.super_name
                    && !table.contains(super_name)
                {
                    errors.push(TypeError::UnknownSuperclass {
                        name: class.name.clone(),
                        super_name: super_name.clone(),
                    });
                }
            }
            Statement::VarDecl {
                name, type_name, ..
            } => {
                if !table.type_exists(type_name) {
                    errors.push(TypeError::UnknownVariableType {
                        type_name: type_name.clone(),
                        name: name.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    (table, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn checked(source: &str) -> (ClassTable, Vec<TypeError>) {
        let tokens = tokenize(source).expect("tokenize should succeed");
        let program = parse_tokens(tokens).expect("parse should succeed");
        check(&program)
    }

    #[test]
    fn collects_fields_methods_and_constructor() {
        let (table, errors) = checked(indoc! {"
            class Dog {
                name: string
                age: int
                constructor(name: string) { this.name = name }
                bark(): string { return this.name }
            }
        "});
        assert!(errors.is_empty());

        let dog = table.get("Dog").expect("Dog should be registered");
        assert_eq!(
            dog.fields,
            vec![
                ("name".to_string(), "string".to_string()),
                ("age".to_string(), "int".to_string()),
            ]
        );
        assert_eq!(
            dog.methods.get("bark"),
            Some(&MethodSig {
                param_types: vec![],
                return_type: "string".to_string(),
            })
        );
        assert_eq!(dog.constructor_params, Some(vec!["string".to_string()]));
    }

    #[test]
    fn reports_duplicate_class_once() {
        let (_, errors) = checked("class Foo {}\nclass Foo {}");
        assert_eq!(
            errors,
            vec![TypeError::DuplicateClass {
                name: "Foo".to_string(),
            }]
        );
    }

    #[test]
    fn reports_unknown_superclass() {
        let (_, errors) = checked("class A extends B {}");
        assert_eq!(
            errors,
            vec![TypeError::UnknownSuperclass {
                name: "A".to_string(),
                super_name: "B".to_string(),
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "Class A extends unknown B".to_string()
        );
    }

    #[test]
    fn reports_unknown_type_in_var_declaration() {
        let (_, errors) = checked("let x: Widget = 1");
        assert_eq!(
            errors,
            vec![TypeError::UnknownVariableType {
                type_name: "Widget".to_string(),
                name: "x".to_string(),
            }]
        );
    }

    #[test]
    fn accumulates_every_error_in_one_run() {
        let (_, errors) = checked(indoc! {"
            class Foo {}
            class Foo {}
            class A extends B {}
            let x: Widget = 1
        "});
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn builtin_type_names_match_case_insensitively() {
        let (_, errors) = checked("let a: Int = 1\nlet b: STRING = 'x'\nlet c: Bool = true");
        assert!(errors.is_empty());
    }

    #[test]
    fn subtyping_is_reflexive_and_walks_the_super_chain() {
        let (table, errors) = checked(indoc! {"
            class Person {}
            class Employee extends Person {}
            class Manager extends Employee {}
        "});
        assert!(errors.is_empty());
        assert!(table.is_subtype("Person", "Person"));
        assert!(table.is_subtype("Manager", "Person"));
        assert!(table.is_subtype("Employee", "Person"));
        assert!(!table.is_subtype("Person", "Manager"));
        assert!(!table.is_subtype("void", "void"));
        assert!(!table.is_subtype("int", "void"));
    }

    #[test]
    fn checking_twice_is_idempotent() {
        let source = indoc! {"
            class Foo {}
            class Foo {}
            let x: Widget = 1
        "};
        assert_eq!(checked(source), checked(source));
    }
}

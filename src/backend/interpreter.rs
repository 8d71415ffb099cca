//! Tree-walking backend.
//!
//! Executes AST statements directly. Globals are seeded with a class handle
//! per declared class; each method or constructor activation gets a fresh
//! environment cloned from its caller's, extended with parameters and
//! (for instance calls) `this`. A `Return` statement raises the
//! frame-scoped `ExecResult::Return` signal, which stops at the nearest
//! activation boundary.

use std::collections::HashMap;

use anyhow::Result;

use crate::ast::{
    BinaryOperator, ClassDecl, ClassMember, Expression, MethodDecl, Param, Program, Statement,
    UnaryOperator,
};
use crate::backend::Backend;

mod error;
mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use value::{ObjectData, Value};

pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn run(&self, program: &Program) -> Result<String> {
        let mut evaluator = Evaluator::new(program);
        Ok(evaluator.run()?)
    }
}

type Env = HashMap<String, Value>;

/// Control-flow marker for statement execution.
enum ExecResult {
    Continue,
    Return(Value),
}

/// Declared classes by name; method and constructor bodies are shared
/// references into the program AST.
struct Classes<'p> {
    by_name: HashMap<&'p str, &'p ClassDecl>,
}

impl<'p> Classes<'p> {
    fn collect(program: &'p Program) -> Self {
        let mut by_name = HashMap::new();
        for statement in &program.statements {
            if let Statement::ClassDecl(class) = statement {
                // First declaration wins; the type checker reports the
                // duplicate before execution starts.
                by_name.entry(class.name.as_str()).or_insert(class);
            }
        }
        Self { by_name }
    }

    fn get(&self, name: &str) -> RuntimeResult<&'p ClassDecl> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownClass {
                name: name.to_string(),
            })
    }

    /// Walks the super chain from `class_name` looking for `method`.
    fn find_method(&self, class_name: &str, method: &str) -> Option<&'p MethodDecl> {
        for class in self.chain(class_name) {
            for member in &class.members {
                if let ClassMember::Method(decl) = member
                    && decl.name == method
                {
                    return Some(decl);
                }
            }
        }
        None
    }

    /// Nearest constructor up the super chain, so a subclass without its
    /// own constructor still runs its parent's.
    fn find_constructor(&self, class_name: &str) -> Option<(&'p [Param], &'p [Statement])> {
        for class in self.chain(class_name) {
            for member in &class.members {
                if let ClassMember::Constructor { params, body } = member {
                    return Some((params, body));
                }
            }
        }
        None
    }

    /// Field names declared by the class and all of its ancestors.
    fn all_fields(&self, class_name: &str) -> Vec<&'p str> {
        let mut fields = Vec::new();
        for class in self.chain(class_name) {
            for member in &class.members {
                if let ClassMember::Field { name, .. } = member {
                    fields.push(name.as_str());
                }
            }
        }
        fields
    }

    /// The class and its ancestors, bounded by the class count so a
    /// malformed cyclic chain cannot loop forever.
    fn chain(&self, class_name: &str) -> impl Iterator<Item = &'p ClassDecl> + '_ {
        let mut current = self.by_name.get(class_name).copied();
        let mut steps = self.by_name.len();
        std::iter::from_fn(move || {
            let class = current?;
            if steps == 0 {
                return None;
            }
            steps -= 1;
            current = class
                .super_name
                .as_deref()
                .and_then(|name| self.by_name.get(name).copied());
            Some(class)
        })
    }
}

struct Evaluator<'p> {
    program: &'p Program,
    classes: Classes<'p>,
    output: String,
}

impl<'p> Evaluator<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            classes: Classes::collect(program),
            output: String::new(),
        }
    }

    fn run(&mut self) -> RuntimeResult<String> {
        let mut globals = Env::new();
        for name in self.classes.by_name.keys() {
            globals.insert(name.to_string(), Value::ClassRef(name.to_string()));
        }

        let program = self.program;
        match self.exec_block(&program.statements, &mut globals)? {
            ExecResult::Continue => {}
            ExecResult::Return(_) => return Err(RuntimeError::ReturnOutsideMethod),
        }
        Ok(std::mem::take(&mut self.output))
    }

    fn exec_block(&mut self, body: &[Statement], env: &mut Env) -> RuntimeResult<ExecResult> {
        // Execute statements in order until one returns, then bubble that
        // up to the activation boundary.
        for statement in body {
            match self.exec_statement(statement, env)? {
                ExecResult::Continue => {}
                ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(&mut self, statement: &Statement, env: &mut Env) -> RuntimeResult<ExecResult> {
        match statement {
            // Imports are resolved by the driver before execution; class
            // declarations were registered before the first statement ran.
            Statement::Import { .. } | Statement::ClassDecl(_) => Ok(ExecResult::Continue),
            Statement::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval_expression(expr, env)?,
                    None => Value::Null,
                };
                env.insert(name.clone(), value);
                Ok(ExecResult::Continue)
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval_expression(condition, env)?;
                let body = if truthy(&condition)? {
                    then_body
                } else {
                    else_body
                };
                self.exec_block(body, env)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr, env)?,
                    None => Value::Null,
                };
                Ok(ExecResult::Return(value))
            }
            Statement::Expr(expr) => {
                self.eval_expression(expr, env)?;
                Ok(ExecResult::Continue)
            }
        }
    }

    fn eval_expression(&mut self, expr: &Expression, env: &mut Env) -> RuntimeResult<Value> {
        match expr {
            Expression::Integer(value) => Ok(Value::Integer(*value)),
            Expression::String(value) => Ok(Value::Str(value.clone())),
            Expression::Boolean(value) => Ok(Value::Boolean(*value)),
            Expression::Identifier(name) => {
                env.get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: name.clone(),
                    })
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval_expression(left, env)?;
                let right = self.eval_expression(right, env)?;
                eval_binary(*op, left, right)
            }
            Expression::UnaryOp { op, expr } => {
                let value = self.eval_expression(expr, env)?;
                match (op, value) {
                    (UnaryOperator::Minus, Value::Integer(n)) => Ok(Value::Integer(-n)),
                    (UnaryOperator::Plus, Value::Integer(n)) => Ok(Value::Integer(n)),
                    (op, value) => Err(RuntimeError::UnsupportedUnary {
                        op: op.symbol(),
                        type_name: value.type_name(),
                    }),
                }
            }
            Expression::Call { callee, args } => self.eval_call(callee, args, env),
            Expression::New { class_name, args } => self.instantiate(class_name, args, env),
            Expression::FieldAccess { object, name } => {
                let receiver = self.eval_expression(object, env)?;
                match receiver {
                    Value::Object(object) => Ok(object
                        .borrow()
                        .fields
                        .get(name)
                        .cloned()
                        .unwrap_or(Value::Null)),
                    // `Class.member` stays a class handle; the call rule
                    // resolves the actual method.
                    Value::ClassRef(class_name) => Ok(Value::ClassRef(class_name)),
                    other => Err(RuntimeError::InvalidReceiver {
                        member: name.clone(),
                        type_name: other.type_name(),
                    }),
                }
            }
            Expression::This => {
                env.get("this")
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: "this".to_string(),
                    })
            }
            Expression::Super { .. } => Err(RuntimeError::UnsupportedSuper),
            Expression::Assignment { target, value } => {
                let value = self.eval_expression(value, env)?;
                match target.as_ref() {
                    Expression::Identifier(name) => {
                        env.insert(name.clone(), value.clone());
                        Ok(value)
                    }
                    Expression::FieldAccess { object, name } => {
                        let receiver = self.eval_expression(object, env)?;
                        let Value::Object(object) = receiver else {
                            return Err(RuntimeError::InvalidAssignmentTarget);
                        };
                        object.borrow_mut().fields.insert(name.clone(), value.clone());
                        Ok(value)
                    }
                    _ => Err(RuntimeError::InvalidAssignmentTarget),
                }
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        env: &mut Env,
    ) -> RuntimeResult<Value> {
        if let Expression::Identifier(name) = callee
            && name == "print"
        {
            let mut rendered = Vec::with_capacity(args.len());
            for arg in args {
                rendered.push(self.eval_expression(arg, env)?.to_output());
            }
            self.output.push_str(&rendered.join(" "));
            self.output.push('\n');
            return Ok(Value::Null);
        }

        if let Expression::FieldAccess { object, name } = callee {
            let receiver = self.eval_expression(object, env)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(self.eval_expression(arg, env)?);
            }
            return match receiver {
                Value::Object(object) => {
                    let class_name = object.borrow().class_name.clone();
                    let method = self.resolve_method(&class_name, name)?;
                    self.invoke(method, Some(Value::Object(object)), arg_values, env)
                }
                Value::ClassRef(class_name) => {
                    let method = self.resolve_method(&class_name, name)?;
                    self.invoke(method, None, arg_values, env)
                }
                other => Err(RuntimeError::InvalidReceiver {
                    member: name.clone(),
                    type_name: other.type_name(),
                }),
            };
        }

        if matches!(callee, Expression::Super { .. }) {
            return Err(RuntimeError::UnsupportedSuper);
        }
        Err(RuntimeError::InvalidCallTarget)
    }

    fn resolve_method(&self, class_name: &str, method: &str) -> RuntimeResult<&'p MethodDecl> {
        self.classes
            .find_method(class_name, method)
            .ok_or_else(|| RuntimeError::MethodNotFound {
                method: method.to_string(),
                class_name: class_name.to_string(),
            })
    }

    /// Runs a method body in a fresh frame cloned from the caller's
    /// environment. Missing arguments bind as `null`, extras are dropped.
    fn invoke(
        &mut self,
        method: &'p MethodDecl,
        this: Option<Value>,
        args: Vec<Value>,
        caller_env: &Env,
    ) -> RuntimeResult<Value> {
        let mut frame = caller_env.clone();
        bind_params(&mut frame, &method.params, args);
        if let Some(this) = this {
            frame.insert("this".to_string(), this);
        }
        match self.exec_block(&method.body, &mut frame)? {
            ExecResult::Continue => Ok(Value::Null),
            ExecResult::Return(value) => Ok(value),
        }
    }

    fn instantiate(
        &mut self,
        class_name: &str,
        args: &[Expression],
        env: &mut Env,
    ) -> RuntimeResult<Value> {
        self.classes.get(class_name)?;

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expression(arg, env)?);
        }

        // Every declared field, own and inherited, starts as null.
        let fields = self
            .classes
            .all_fields(class_name)
            .into_iter()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        let object = Value::object(class_name.to_string(), fields);

        if let Some((params, body)) = self.classes.find_constructor(class_name) {
            let mut frame = env.clone();
            bind_params(&mut frame, params, arg_values);
            frame.insert("this".to_string(), object.clone());
            // The constructor's return value is ignored.
            self.exec_block(body, &mut frame)?;
        }
        Ok(object)
    }
}

fn bind_params(frame: &mut Env, params: &[Param], args: Vec<Value>) {
    let mut args = args.into_iter();
    for param in params {
        frame.insert(param.name.clone(), args.next().unwrap_or(Value::Null));
    }
}

/// Truthiness is defined for integers (non-zero) and booleans only.
fn truthy(value: &Value) -> RuntimeResult<bool> {
    match value {
        Value::Integer(n) => Ok(*n != 0),
        Value::Boolean(b) => Ok(*b),
        other => Err(RuntimeError::InvalidCondition {
            type_name: other.type_name(),
        }),
    }
}

fn eval_binary(op: BinaryOperator, left: Value, right: Value) -> RuntimeResult<Value> {
    // `+` concatenates when either side is a string; everything else is
    // integer-only. Comparisons encode their result as integer 1/0.
    if op == BinaryOperator::Add
        && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)))
    {
        return Ok(Value::Str(left.to_output() + &right.to_output()));
    }

    let (Value::Integer(l), Value::Integer(r)) = (&left, &right) else {
        return Err(RuntimeError::UnsupportedOperands {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        });
    };
    let (l, r) = (*l, *r);

    let value = match op {
        BinaryOperator::Add => Value::Integer(l + r),
        BinaryOperator::Sub => Value::Integer(l - r),
        BinaryOperator::Mul => Value::Integer(l * r),
        BinaryOperator::Div => {
            if r == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Value::Integer(floor_div(l, r))
        }
        BinaryOperator::Eq => Value::Integer((l == r) as i64),
        BinaryOperator::NotEq => Value::Integer((l != r) as i64),
        BinaryOperator::Less => Value::Integer((l < r) as i64),
        BinaryOperator::Greater => Value::Integer((l > r) as i64),
        BinaryOperator::LessEq => Value::Integer((l <= r) as i64),
        BinaryOperator::GreaterEq => Value::Integer((l >= r) as i64),
    };
    Ok(value)
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
}

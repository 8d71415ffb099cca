use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Runtime value model used by the tree-walking interpreter.
///
/// Objects are `Rc`-shared so that every binding of the same instance sees
/// field mutation; everything else copies by value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Str(String),
    Boolean(bool),
    Object(Rc<RefCell<ObjectData>>),
    ClassRef(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub class_name: String,
    pub fields: HashMap<String, Value>,
}

impl Value {
    pub fn object(class_name: String, fields: HashMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(ObjectData { class_name, fields })))
    }

    /// The stringification `print` and string concatenation use.
    pub fn to_output(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Str(value) => value.clone(),
            Value::Boolean(value) => {
                if *value {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Value::Object(object) => format!("<{} object>", object.borrow().class_name),
            Value::ClassRef(name) => format!("<class {name}>"),
            Value::Null => "null".to_string(),
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Integer(_) => "int".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Boolean(_) => "bool".to_string(),
            Value::Object(object) => object.borrow().class_name.clone(),
            Value::ClassRef(name) => format!("class {name}"),
            Value::Null => "null".to_string(),
        }
    }
}

//! Runtime values.
//!
//! Instance checks and proxy construction operate on concrete values; this
//! module models the value universe the way the class universe models
//! types. Scalars map to the builtin classes, instances carry their
//! registered class.

use std::fmt;
use std::rc::Rc;

use crate::{ClassId, Name};

/// Data shared by instance values.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceData {
    /// The runtime class of the instance.
    pub class: ClassId,
    /// Field values, in construction order.
    pub fields: Vec<(Name, Value)>,
}

/// A runtime value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// The none value.
    #[default]
    None,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Float scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Byte-string scalar.
    Bytes(Vec<u8>),
    /// List container.
    List(Vec<Value>),
    /// Set container.
    Set(Vec<Value>),
    /// Dict container.
    Dict(Vec<(Value, Value)>),
    /// Tuple container.
    Tuple(Vec<Value>),
    /// An instance of a registered class.
    Instance(Rc<InstanceData>),
}

impl Value {
    /// Construct an instance value of the given class.
    pub fn instance(class: ClassId, fields: Vec<(Name, Value)>) -> Value {
        Value::Instance(Rc::new(InstanceData { class, fields }))
    }

    /// The runtime class of this value.
    pub fn class_of(&self) -> ClassId {
        match self {
            Value::None => ClassId::NONE_TYPE,
            Value::Bool(_) => ClassId::BOOL,
            Value::Int(_) => ClassId::INT,
            Value::Float(_) => ClassId::FLOAT,
            Value::Str(_) => ClassId::STR,
            Value::Bytes(_) => ClassId::BYTES,
            Value::List(_) => ClassId::LIST,
            Value::Set(_) => ClassId::SET,
            Value::Dict(_) => ClassId::DICT,
            Value::Tuple(_) => ClassId::TUPLE,
            Value::Instance(data) => data.class,
        }
    }

    /// Check whether this is the none value.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => write!(f, "<list of {}>", items.len()),
            Value::Set(items) => write!(f, "<set of {}>", items.len()),
            Value::Dict(items) => write!(f, "<dict of {}>", items.len()),
            Value::Tuple(items) => write!(f, "<tuple of {}>", items.len()),
            Value::Instance(data) => write!(f, "<instance of class #{}>", data.class.raw()),
        }
    }
}

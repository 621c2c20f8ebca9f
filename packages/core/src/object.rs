//! Dynamic object values.
//!
//! An [`Object`] is one instance of a registered structural type: its shared
//! [`TypeDescriptor`] plus one [`Value`] per declared field, in declaration
//! order. Objects that may be referenced from several places live in an
//! [`Arena`](crate::Arena) and are pointed at with a [`Handle`].

use std::fmt;
use std::sync::Arc;

use crate::error::ObjectError;
use crate::types::{FieldDescriptor, FieldKind, ScalarKind, TypeDescriptor};

/// Identity of an object inside an [`Arena`](crate::Arena).
///
/// Two references are "the same object" exactly when their handles are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) usize);

impl Handle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset. Valid for every field kind.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Reference to an arena object; may be shared.
    Ref(Handle),
    /// By-value struct; owned by its referrer.
    Embedded(Box<Object>),
    List(Vec<Value>),
}

impl Value {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Whether this is the zero value of its kind. Zero-valued fields are
    /// omitted on output unless required.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::UInt(u) => *u == 0,
            Value::Float(x) => *x == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Ref(_) => false,
            Value::Embedded(o) => o.is_empty(),
            Value::List(items) => items.is_empty(),
        }
    }

    /// Whether this value has a shape a field of `kind` can hold.
    ///
    /// Reference targets are not checked here: that needs the registry.
    pub fn fits(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (Value::Null, _) => true,
            (_, FieldKind::Marker) => false,
            (Value::String(_), FieldKind::Scalar(ScalarKind::String))
            | (Value::Bool(_), FieldKind::Scalar(ScalarKind::Bool))
            | (Value::Int(_), FieldKind::Scalar(ScalarKind::Int))
            | (Value::UInt(_), FieldKind::Scalar(ScalarKind::UInt))
            | (Value::Float(_), FieldKind::Scalar(ScalarKind::Float))
            | (Value::Ref(_), FieldKind::Ref(_)) => true,
            (Value::Embedded(o), FieldKind::Embedded(name)) => o.type_name() == name,
            (Value::List(items), FieldKind::List(item)) => items.iter().all(|v| v.fits(item)),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Value::Ref(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Embedded(o) => Some(o),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Ref(h) => write!(f, "{h}"),
            Value::Embedded(o) => write!(f, "{{{}}}", o.type_name()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Ref(h)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Embedded(Box::new(o))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One instance of a structural type.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    descriptor: Arc<TypeDescriptor>,
    values: Vec<Value>,
}

impl Object {
    /// A zero-valued instance of `descriptor`.
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let values = descriptor.fields.iter().map(|f| zero_value(&f.kind)).collect();
        Self { descriptor, values }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.descriptor.field_index(field).map(|i| &self.values[i])
    }

    /// Set `field`, checking that the value's shape fits the field kind.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), ObjectError> {
        let value = value.into();
        let index = self
            .descriptor
            .field_index(field)
            .ok_or_else(|| ObjectError::UnknownField {
                type_name: self.descriptor.name.clone(),
                field: field.to_string(),
            })?;
        let kind = &self.descriptor.fields[index].kind;
        if !value.fits(kind) {
            return Err(ObjectError::KindMismatch {
                type_name: self.descriptor.name.clone(),
                field: field.to_string(),
                kind: kind.clone(),
                value: value.to_string(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Builder form of [`Object::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self, ObjectError> {
        self.set(field, value)?;
        Ok(self)
    }

    pub(crate) fn value_at(&self, index: usize) -> &Value {
        &self.values[index]
    }

    pub(crate) fn set_at(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }

    /// The identifier, if the type has an identifier field and it is set.
    pub fn id(&self) -> Option<&str> {
        let (index, _) = self.descriptor.id_field()?;
        self.values[index].as_str().filter(|s| !s.is_empty())
    }

    /// Every declared field with its current value, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.descriptor.fields.iter().zip(self.values.iter())
    }

    /// Whether every field holds its zero value.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Value::is_empty)
    }
}

fn zero_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Scalar(ScalarKind::String) => Value::String(String::new()),
        FieldKind::Scalar(ScalarKind::Bool) => Value::Bool(false),
        FieldKind::Scalar(ScalarKind::Int) => Value::Int(0),
        FieldKind::Scalar(ScalarKind::UInt) => Value::UInt(0),
        FieldKind::Scalar(ScalarKind::Float) => Value::Float(0.0),
        FieldKind::List(_) => Value::List(Vec::new()),
        FieldKind::Marker | FieldKind::Ref(_) | FieldKind::Embedded(_) => Value::Null,
    }
}

// --- tests -------------------------------------------------------------------

//! Attribute values carried by events.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::schema::AttributeType;

/// A single attribute value.
///
/// `Object` values are compared by pointer identity.
#[derive(Clone, Default)]
pub enum AttributeValue {
    /// Missing value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// String.
    String(String),
    /// Opaque object.
    Object(Arc<dyn Any + Send + Sync>),
}

impl AttributeValue {
    /// Returns `true` for [`AttributeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attribute type of this value, `None` for null.
    #[must_use]
    pub fn attr_type(&self) -> Option<AttributeType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(AttributeType::Bool),
            Self::Int(_) => Some(AttributeType::Int),
            Self::Long(_) => Some(AttributeType::Long),
            Self::Float(_) => Some(AttributeType::Float),
            Self::Double(_) => Some(AttributeType::Double),
            Self::String(_) => Some(AttributeType::String),
            Self::Object(_) => Some(AttributeType::Object),
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Long(v) => write!(f, "Long({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Double(v) => write!(f, "Double({v})"),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values flowing through the graph and the coercion rules applied to them.
//!
//! Editable fields always hold text. At cook time that text, or the value
//! arriving over a link, is coerced to the row's declared [`DataType`].
//! Coercion is fail-soft: a failure becomes an absent input, never a hard
//! evaluation error.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Data type declared by a row or port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Signed integer
    Integer,
    /// Floating point value
    Float,
    /// Text
    String,
    /// Filesystem path
    FilePath,
    /// Handle to an externally owned object
    Opaque,
    /// Untyped pass-through
    Any,
}

impl DataType {
    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::FilePath => "file path",
            Self::Opaque => "opaque",
            Self::Any => "any",
        }
    }

    /// Get the color for this data type (for UI)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Integer => [60, 120, 216],
            Self::Float => [40, 180, 120],
            Self::String => [200, 80, 220],
            Self::FilePath => [220, 160, 60],
            Self::Opaque => [120, 120, 160],
            Self::Any => [255, 165, 0],
        }
    }

    /// Check if an output of this type may feed an input of `other`
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        if self == other {
            return true;
        }

        // Numbers also feed text rows, which stringify them
        matches!(
            (self, other),
            (Self::Integer, Self::Float)
                | (Self::Float, Self::Integer)
                | (Self::String, Self::FilePath)
                | (Self::FilePath, Self::String)
                | (Self::Integer | Self::Float, Self::String)
        )
    }

    /// Convert editable field text into a value of this type
    pub fn coerce_text(&self, text: &str) -> Result<Value, CoercionError> {
        let unparsable = || CoercionError::Unparsable {
            text: text.to_string(),
            target: *self,
        };

        match self {
            // "3.0" is accepted for integer rows
            Self::Integer => parse_float(text)
                .and_then(truncate_to_i64)
                .map(Value::Integer)
                .ok_or_else(unparsable),
            Self::Float => parse_float(text).map(Value::Float).ok_or_else(unparsable),
            Self::FilePath => Ok(Value::FilePath(PathBuf::from(text))),
            Self::String | Self::Opaque | Self::Any => Ok(Value::String(text.to_string())),
        }
    }

    /// Convert a value produced upstream into a value of this type
    pub fn coerce(&self, value: Value) -> Result<Value, CoercionError> {
        match (self, value) {
            (Self::Opaque | Self::Any, value) => Ok(value),
            (Self::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (Self::Integer, Value::Float(f)) => {
                truncate_to_i64(f).map(Value::Integer).ok_or(CoercionError::Incompatible {
                    found: DataType::Float,
                    target: DataType::Integer,
                })
            }
            (Self::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (Self::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (Self::Integer | Self::Float, Value::String(text)) => self.coerce_text(&text),
            (Self::String, Value::String(text)) => Ok(Value::String(text)),
            (Self::String, Value::Integer(i)) => Ok(Value::String(i.to_string())),
            (Self::String, Value::Float(f)) => Ok(Value::String(f.to_string())),
            (Self::String | Self::FilePath, Value::FilePath(path)) => Ok(Value::FilePath(path)),
            (Self::FilePath, Value::String(text)) => Ok(Value::FilePath(PathBuf::from(text))),
            (target, value) => Err(CoercionError::Incompatible {
                found: value.data_type(),
                target: *target,
            }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Truncate toward zero; `None` for NaN and values outside the `i64` range
fn truncate_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    (t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

/// Value produced by a node or gathered for one of its rows
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// Text
    String(String),
    /// Filesystem path
    FilePath(PathBuf),
    /// Externally owned object, e.g. a parsed document
    Opaque(OpaqueHandle),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::String(_) => DataType::String,
            Self::FilePath(_) => DataType::FilePath,
            Self::Opaque(_) => DataType::Opaque,
        }
    }

    /// Numeric view of the value; integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of the value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Path view of the value; text is accepted as a path
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::FilePath(p) => Some(p),
            Self::String(s) => Some(Path::new(s)),
            _ => None,
        }
    }

    /// Handle view of the value
    pub fn as_opaque(&self) -> Option<&OpaqueHandle> {
        match self {
            Self::Opaque(handle) => Some(handle),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::FilePath(p) => write!(f, "{}", p.display()),
            Self::Opaque(handle) => write!(f, "<{}>", handle.type_name()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Self::FilePath(value)
    }
}

/// Shared handle to an object the engine does not own.
///
/// Handles compare by identity: two handles are equal only when they point
/// at the same allocation.
#[derive(Clone)]
pub struct OpaqueHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl OpaqueHandle {
    /// Wrap an object in a new handle
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self {
            inner: Arc::new(object),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the object as `T`, if that is its type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Name of the wrapped type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueHandle").field(&self.type_name).finish()
    }
}

/// Failure to convert text or a value to a row's declared type.
///
/// Cooking never surfaces this error; it turns into an absent input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    /// Field text could not be parsed
    #[error("Cannot parse '{text}' as {target}")]
    Unparsable {
        /// Offending text
        text: String,
        /// Declared type of the row
        target: DataType,
    },

    /// Value type has no conversion to the declared type
    #[error("Cannot convert {found} value to {target}")]
    Incompatible {
        /// Type of the incoming value
        found: DataType,
        /// Declared type of the row
        target: DataType,
    },
}

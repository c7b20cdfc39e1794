// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dynamic value model for module exports
//!
//! Objects and arrays are shared handles: cloning a [`Value`] clones the
//! handle, not the contents. This gives the `exports` container the identity
//! semantics the instantiation algorithm depends on ("identical" means the
//! same allocation), while `PartialEq` stays structural so tests can compare
//! by content.

use crate::runtime::RequireFn;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared object contents
pub type ObjectRef = Arc<Mutex<HashMap<String, Value>>>;

/// Shared array contents
pub type ArrayRef = Arc<Mutex<Vec<Value>>>;

/// A module export value
#[derive(Clone, Default)]
pub enum Value {
    /// No value (a factory that produced nothing)
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// String value
    String(String),
    /// Shared array
    Array(ArrayRef),
    /// Shared string-keyed object
    Object(ObjectRef),
    /// The `require` function handed to factories that declare the
    /// `require` reserved dependency token
    Require(RequireFn),
}

impl Value {
    /// Create a fresh empty object
    pub fn object() -> Value {
        Value::Object(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Create an array from the given items
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Arc::new(Mutex::new(items)))
    }

    /// Whether this value is `Undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether this value is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Read an entry from an object value; `None` for other shapes
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(entries) => entries.lock().get(key).cloned(),
            _ => None,
        }
    }

    /// Write an entry into an object value; returns whether the write applied
    pub fn set(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(entries) => {
                entries.lock().insert(key.to_string(), value);
                true
            }
            _ => false,
        }
    }

    /// Borrow the string contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric contents, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Identity comparison: objects and arrays compare by allocation,
    /// primitives by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Require(a), Value::Require(b)) => a.same(b),
            _ => self == other,
        }
    }

    /// Convert a `serde_json::Value` into a loader value
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(Arc::new(Mutex::new(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ))),
        }
    }
}

/// Structural equality. Containers lock while comparing, so comparing two
/// distinct but mutually-referential object graphs is unsupported (use
/// [`Value::same`] for identity).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // ptr_eq short-circuit also avoids self-comparison deadlock
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || *a.lock() == *b.lock(),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || *a.lock() == *b.lock(),
            (Value::Require(a), Value::Require(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items.lock().iter()).finish(),
            Value::Object(entries) => {
                let map = entries.lock();
                f.debug_map().entries(map.iter()).finish()
            }
            Value::Require(_) => f.write_str("[function require]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
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

// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::collections::{BTreeMap, HashMap};

use time::OffsetDateTime;

pub type Array = Vec<Value>;
pub type Struct = BTreeMap<String, Value>;

/// Represents an XML-RPC data value
///
/// Equality is structural. Two `DateTime` values are equal when they denote
/// the same instant, whatever their offsets.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Int32(i32),
    /// `<i8>`, only accepted when the 8-byte extension is enabled.
    Int64(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    DateTime(OffsetDateTime),
    Bytes(Vec<u8>),
    /// `<nil/>`, only accepted when the nil extension is enabled.
    Nil,
    Array(Array),
    Struct(Struct),
}

/// Discriminant of a `Value`, used to pick an encoder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
    Int32,
    Int64,
    Double,
    Bool,
    Str,
    DateTime,
    Bytes,
    Nil,
    Array,
    Struct,
}

impl Value {
    pub fn kind(&self) -> Kind {
        match *self {
            Value::Int32(_) => Kind::Int32,
            Value::Int64(_) => Kind::Int64,
            Value::Double(_) => Kind::Double,
            Value::Bool(_) => Kind::Bool,
            Value::Str(_) => Kind::Str,
            Value::DateTime(_) => Kind::DateTime,
            Value::Bytes(_) => Kind::Bytes,
            Value::Nil => Kind::Nil,
            Value::Array(_) => Kind::Array,
            Value::Struct(_) => Kind::Struct,
        }
    }

    /// If the value is a Struct, returns the member associated with `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(key))
    }

    /// Follows `keys` through nested structs. Returns None as soon as one is missing.
    pub fn find_path(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().try_fold(self, |target, key| target.get(key))
    }

    /// Depth-first search through nested structs for a member named `key`.
    pub fn search(&self, key: &str) -> Option<&Value> {
        let members = self.as_struct()?;
        members
            .get(key)
            .or_else(|| members.values().find_map(|value| value.search(key)))
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int32(n) => Some(n),
            Value::Int64(n) => i32::try_from(n).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int32(n) => Some(i64::from(n)),
            Value::Int64(n) => Some(n),
            _ => None,
        }
    }

    /// Doubles, and integers widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int32(n) => Some(f64::from(n)),
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

// Nested containers are flattened onto one heap stack before they drop, so
// releasing a deep tree does not recurse once per level.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::Array(items) if items.iter().any(Value::is_container) => std::mem::take(items),
            Value::Struct(members) if members.values().any(Value::is_container) => {
                std::mem::take(members).into_values().collect()
            }
            _ => return,
        };
        while let Some(mut value) = pending.pop() {
            match value {
                Value::Array(ref mut items) => pending.append(items),
                Value::Struct(ref mut members) => pending.extend(std::mem::take(members).into_values()),
                _ => {}
            }
        }
    }
}

impl Value {
    fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Struct(_))
    }
}

macro_rules! from_int32 {
    ($($t:ty),+) => (
        $(impl From<$t> for Value {
            fn from(n: $t) -> Value { Value::Int32(i32::from(n)) }
        })+
    )
}

from_int32! { i8, i16, i32, u8, u16 }

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Double(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Value {
        Value::Double(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(dt: OffsetDateTime) -> Value {
        Value::DateTime(dt)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Value {
        Value::Bytes(bytes.to_vec())
    }
}

impl<A: Into<Value>> From<Vec<A>> for Value {
    fn from(items: Vec<A>) -> Value {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Value>> From<BTreeMap<String, A>> for Value {
    fn from(members: BTreeMap<String, A>) -> Value {
        Value::Struct(members.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<A: Into<Value>> From<HashMap<String, A>> for Value {
    fn from(members: HashMap<String, A>) -> Value {
        Value::Struct(members.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<A: Into<Value>> From<Option<A>> for Value {
    fn from(value: Option<A>) -> Value {
        value.map_or(Value::Nil, Into::into)
    }
}

//! Key hashing, equality and normalization
//!
//! This module decides how a [`Value`] behaves as a table key.
//!
//! ## Fast path
//!
//! Nil, Bool, Int, Float, Symbol and Str are *fast-path* kinds: they hash and
//! compare with fixed built-in logic. No user capability is ever called for
//! them, including singleton hooks attached to a string.
//!
//! ## Dispatch
//!
//! `Object` keys dispatch to their [`Storable`](crate::Storable) impl. The
//! hash code may be of any magnitude and is folded to 64 bits. The equality
//! test is called on the key being looked up, with the stored key as its
//! argument.
//!
//! ## Normalization
//!
//! A key stored for the first time is normalized: an unfrozen string is
//! replaced by an independent frozen copy, so later mutation of the caller's
//! string cannot change the stored key. Everything else, frozen strings
//! included, is stored as given.
//!
//! ## Identity mode
//!
//! A table comparing by identity uses [`KeyMode::Identity`]: keys are equal
//! only when they are the same object, and nothing is copied.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::value::{float_eql, ObjectRef, Value};

/// How a table compares its keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Compare with key equality (`eql`)
    #[default]
    Equality,
    /// Compare with object identity
    Identity,
}

/// Fast-path classification of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Nil
    Nil,
    /// Boolean
    Bool,
    /// Exact integer
    Int,
    /// Floating point
    Float,
    /// Interned symbol
    Symbol,
    /// Text
    Str,
    /// User-defined object, dispatches to its capability
    Custom,
}

impl KeyKind {
    /// Classify a key
    pub fn of(key: &Value) -> Self {
        match key {
            Value::Nil => KeyKind::Nil,
            Value::Bool(_) => KeyKind::Bool,
            Value::Int(_) => KeyKind::Int,
            Value::Float(_) => KeyKind::Float,
            Value::Symbol(_) => KeyKind::Symbol,
            Value::Str(_) => KeyKind::Str,
            Value::Object(_) => KeyKind::Custom,
        }
    }

    /// Whether this kind uses built-in hash/equality
    pub fn is_fast_path(self) -> bool {
        !matches!(self, KeyKind::Custom)
    }

    fn tag(self) -> u8 {
        match self {
            KeyKind::Nil => 0,
            KeyKind::Bool => 1,
            KeyKind::Int => 2,
            KeyKind::Float => 3,
            KeyKind::Symbol => 4,
            KeyKind::Str => 5,
            KeyKind::Custom => 6,
        }
    }
}

/// 64-bit hash of a key under `mode`
///
/// Fails only when an `Object` key's capability fails; that error is returned
/// as-is.
pub fn hash_key(key: &Value, mode: KeyMode) -> Result<u64> {
    match mode {
        KeyMode::Equality => match key {
            Value::Object(obj) => Ok(obj.hash_code()?.fold()),
            _ => Ok(builtin_hash(key)),
        },
        KeyMode::Identity => Ok(identity_hash(key)),
    }
}

/// Key equality under `mode`
///
/// `probe` is the key being looked up; `stored` is the key already in the
/// table.
pub fn keys_eql(probe: &Value, stored: &Value, mode: KeyMode) -> Result<bool> {
    if probe.same_object(stored) {
        return Ok(true);
    }
    match mode {
        KeyMode::Identity => Ok(false),
        KeyMode::Equality => match probe {
            Value::Object(obj) => obj.eql(stored),
            _ => Ok(builtin_eql(probe, stored)),
        },
    }
}

/// The key object a table stores for a newly inserted `key`
///
/// Returns a new frozen copy for an unfrozen string in equality mode, and
/// `key` itself otherwise.
pub fn normalize(key: Value, mode: KeyMode) -> Value {
    match (&key, mode) {
        (Value::Str(s), KeyMode::Equality) if !s.is_frozen() => Value::Str(s.frozen_copy()),
        _ => key,
    }
}

fn builtin_hash(key: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    KeyKind::of(key).tag().hash(&mut hasher);
    match key {
        Value::Nil => {}
        Value::Bool(b) => b.hash(&mut hasher),
        Value::Int(i) => i.hash(&mut hasher),
        Value::Float(f) => {
            // -0.0 and 0.0 are equal keys
            let f = if *f == 0.0 { 0.0 } else { *f };
            f.to_bits().hash(&mut hasher);
        }
        Value::Symbol(s) => s.hash(&mut hasher),
        Value::Str(s) => s.with_text(|t| t.hash(&mut hasher)),
        Value::Object(o) => object_addr(o).hash(&mut hasher),
    }
    hasher.finish()
}

fn builtin_eql(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => float_eql(*x, *y),
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x.with_text(|tx| y.with_text(|ty| tx == ty)),
        _ => false,
    }
}

fn identity_hash(key: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    KeyKind::of(key).tag().hash(&mut hasher);
    match key {
        Value::Str(s) => (Arc::as_ptr(s) as usize).hash(&mut hasher),
        Value::Object(o) => object_addr(o).hash(&mut hasher),
        Value::Float(f) => f.to_bits().hash(&mut hasher),
        other => return builtin_hash(other),
    }
    hasher.finish()
}

fn object_addr(obj: &ObjectRef) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

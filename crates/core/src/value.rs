//! Value types for stratamap
//!
//! This module defines:
//! - Value: Unified enum for every storable value
//! - StrObject: Heap-allocated text with a one-way frozen flag
//!
//! ## Value Model
//!
//! The Value enum has exactly 7 variants:
//! - Nil, Bool, Int, Float, Symbol: immediates, identity is the value itself
//! - Str: shared text object, identity is the allocation
//! - Object: user-defined [`Storable`], identity is the allocation
//!
//! ### Type Rules
//!
//! - Different kinds are NEVER equal: `Int(1) != Float(1.0)`
//! - Float keys compare with IEEE `==`, except that a NaN equals a NaN with
//!   the same bit pattern so NaN keys stay retrievable
//! - `-0.0` and `0.0` are equal keys
//!
//! Key hashing and equality live in [`crate::key`]; `PartialEq` on `Value`
//! agrees with it for built-in kinds and falls back to object identity for
//! `Object`, since a user capability may fail.

use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storable::Storable;
use crate::symbol::Symbol;

/// Shared handle to a text object
pub type StrRef = Arc<StrObject>;

/// Shared handle to a user-defined storable object
pub type ObjectRef = Arc<dyn Storable>;

/// Growable text with a one-way frozen flag
///
/// A string may also carry *singleton hooks*: a [`Storable`] attached to this
/// one object, overriding hash/equality for it the way a per-object method
/// override would. Tables never call singleton hooks, and
/// [`StrObject::dup`] does not copy them.
pub struct StrObject {
    text: RwLock<String>,
    frozen: AtomicBool,
    singleton: Option<ObjectRef>,
}

impl StrObject {
    /// New unfrozen string
    pub fn new(text: impl Into<String>) -> StrRef {
        Arc::new(StrObject {
            text: RwLock::new(text.into()),
            frozen: AtomicBool::new(false),
            singleton: None,
        })
    }

    /// New frozen string
    pub fn new_frozen(text: impl Into<String>) -> StrRef {
        Arc::new(StrObject {
            text: RwLock::new(text.into()),
            frozen: AtomicBool::new(true),
            singleton: None,
        })
    }

    /// New unfrozen string carrying singleton hooks
    pub fn with_singleton(text: impl Into<String>, hooks: ObjectRef) -> StrRef {
        Arc::new(StrObject {
            text: RwLock::new(text.into()),
            frozen: AtomicBool::new(false),
            singleton: Some(hooks),
        })
    }

    /// Copy of the current text
    pub fn text(&self) -> String {
        self.text.read().clone()
    }

    /// Run `f` against the current text without copying it
    pub fn with_text<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let text = self.text.read();
        f(text.as_str())
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.text.read().len()
    }

    /// Whether the text is empty
    pub fn is_empty(&self) -> bool {
        self.text.read().is_empty()
    }

    /// Append in place
    pub fn push_str(&self, s: &str) -> Result<()> {
        self.check_frozen()?;
        self.text.write().push_str(s);
        Ok(())
    }

    /// Replace the whole text in place
    pub fn replace(&self, s: &str) -> Result<()> {
        self.check_frozen()?;
        let mut text = self.text.write();
        text.clear();
        text.push_str(s);
        Ok(())
    }

    /// Freeze this string; idempotent
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Whether this string is frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Singleton hooks attached to this object, if any
    pub fn singleton(&self) -> Option<&ObjectRef> {
        self.singleton.as_ref()
    }

    /// Independent unfrozen copy; singleton hooks are not copied
    pub fn dup(&self) -> StrRef {
        StrObject::new(self.text())
    }

    /// Independent frozen copy; singleton hooks are not copied
    pub fn frozen_copy(&self) -> StrRef {
        StrObject::new_frozen(self.text())
    }

    fn check_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::frozen("String"));
        }
        Ok(())
    }
}

impl fmt::Debug for StrObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.text.read())
    }
}

/// Unified value type for keys and values
#[derive(Clone)]
pub enum Value {
    /// Absence of a value
    Nil,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// Interned token
    Symbol(Symbol),
    /// Shared text object
    Str(StrRef),
    /// User-defined object dispatching to its own [`Storable`] impl
    Object(ObjectRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_eql(*a, *b),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => {
                Arc::ptr_eq(a, b) || a.with_text(|x| b.with_text(|y| x == y))
            }
            (Value::Object(a), Value::Object(b)) => object_ptr_eq(a, b),
            // Different kinds are never equal
            _ => false,
        }
    }
}

/// Float key equality: IEEE `==`, plus bit-identical NaNs
pub(crate) fn float_eql(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan() && a.to_bits() == b.to_bits())
}

/// Allocation identity for trait objects, ignoring vtable metadata
pub(crate) fn object_ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl Value {
    /// Unfrozen string value, the result of a string literal like `+"foo"`
    pub fn string(text: impl Into<String>) -> Self {
        Value::Str(StrObject::new(text))
    }

    /// Frozen string value
    pub fn frozen_string(text: impl Into<String>) -> Self {
        Value::Str(StrObject::new_frozen(text))
    }

    /// Interned symbol value
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Symbol::intern(name))
    }

    /// Wrap a user-defined storable object
    pub fn object<T: Storable + 'static>(obj: T) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Symbol(_) => "Symbol",
            Value::Str(_) => "String",
            Value::Object(o) => o.type_name(),
        }
    }

    /// Whether two values are the same object
    ///
    /// Immediates are the same when equal; `Str` and `Object` only when they
    /// share an allocation.
    pub fn same_object(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => object_ptr_eq(a, b),
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(_), _) | (Value::Object(_), _) => false,
            _ => self == other,
        }
    }

    /// Whether this value can no longer be mutated
    ///
    /// Everything except an unfrozen `Str` counts as frozen.
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Str(s) => s.is_frozen(),
            _ => true,
        }
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this is a string value
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Check if this is a user-defined object
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the symbol if this is a Symbol value
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Get the string object if this is a Str value
    pub fn as_str_object(&self) -> Option<&StrRef> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Copy of the text if this is a Str value
    pub fn to_text(&self) -> Option<String> {
        self.as_str_object().map(|s| s.text())
    }

    /// Get the object handle if this is an Object value
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcast an Object value to its concrete type
    pub fn downcast_object<T: Storable + Any>(&self) -> Option<&T> {
        self.as_object().and_then(|o| o.downcast_ref::<T>())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Symbol(s) => write!(f, "{:?}", s),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{:?}", o),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

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

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<StrRef> for Value {
    fn from(s: StrRef) -> Self {
        Value::Str(s)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

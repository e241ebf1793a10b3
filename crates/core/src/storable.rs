//! The storable capability
//!
//! A user-defined key type takes part in a table by implementing [`Storable`]:
//! a hash code and an equality test. The two must agree: keys that are
//! `eql` must return equal hash codes.
//!
//! Both methods are public trait methods, so a table can always call them.
//! Whatever error a method returns reaches the caller of the table operation
//! unchanged.

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::hash_code::HashCode;
use crate::value::Value;

/// Upcast helper so `dyn Storable` can be downcast to its concrete type
pub trait AsAny {
    /// `self` as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hash and equality capability of a user-defined key
pub trait Storable: AsAny + fmt::Debug + Send + Sync {
    /// Hash code of this object; may be of any magnitude
    fn hash_code(&self) -> Result<HashCode>;

    /// Key equality against another value
    ///
    /// Called on the key being looked up, with a stored key as `other`.
    fn eql(&self, other: &Value) -> Result<bool>;

    /// Type name used in diagnostics
    fn type_name(&self) -> &'static str {
        "Object"
    }
}

impl dyn Storable {
    /// Downcast to a concrete storable type
    pub fn downcast_ref<T: Storable + Any>(&self) -> Option<&T> {
        <dyn Storable as AsAny>::as_any(self).downcast_ref::<T>()
    }

    /// Whether the concrete type is `T`
    pub fn is<T: Storable + Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Storable for Point {
        fn hash_code(&self) -> Result<HashCode> {
            Ok(HashCode::from(self.x * 31 + self.y))
        }

        fn eql(&self, other: &Value) -> Result<bool> {
            Ok(other
                .downcast_object::<Point>()
                .map_or(false, |p| p.x == self.x && p.y == self.y))
        }

        fn type_name(&self) -> &'static str {
            "Point"
        }
    }

    #[test]
    fn test_downcast() {
        let obj: Arc<dyn Storable> = Arc::new(Point { x: 1, y: 2 });
        assert!(obj.is::<Point>());
        assert_eq!(obj.downcast_ref::<Point>().map(|p| p.y), Some(2));
        assert_eq!(obj.type_name(), "Point");
    }

    #[test]
    fn test_eql_through_value() {
        let a = Point { x: 3, y: 4 };
        let b = Value::object(Point { x: 3, y: 4 });
        let c = Value::object(Point { x: 4, y: 3 });
        assert!(a.eql(&b).unwrap());
        assert!(!a.eql(&c).unwrap());
        assert!(!a.eql(&Value::Int(3)).unwrap());
    }
}

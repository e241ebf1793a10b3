//! stratamap - insertion-ordered associative container
//!
//! stratamap provides [`Table`], an ordered key → value mapping with the
//! key-storage rules of a dynamic-language runtime's hash:
//!
//! - the first key object stored for an entry is kept for good
//! - unfrozen string keys are stored as frozen copies
//! - built-in kinds never dispatch to user hash/equality code
//! - user-defined keys may return hash codes of any magnitude
//! - value updates are allowed while enumerating
//!
//! # Quick Start
//!
//! ```
//! use stratamap::{Table, Value};
//!
//! let table = Table::new();
//! let key = Value::string("foo");
//! table.store(key.clone(), Value::Int(0))?;
//!
//! // The caller's string can still change; the stored key cannot
//! key.as_str_object().unwrap().push_str("bar")?;
//! assert_eq!(table.keys()[0].to_text().as_deref(), Some("foo"));
//! # Ok::<(), stratamap::Error>(())
//! ```

pub use stratamap_core::*;
pub use stratamap_storage::Table;

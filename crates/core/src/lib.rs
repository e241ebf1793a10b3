//! Core types and traits for stratamap
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Unified value enum, with heap identity for strings and objects
//! - StrObject: Growable text with a one-way frozen flag
//! - Symbol: Interned atom-like tokens
//! - Storable: Hash/equality capability of user-defined keys
//! - HashCode: Hash codes of unbounded magnitude
//! - key: Fast-path hashing, key equality and key normalization
//! - TableConfig: Index tuning loaded from TOML
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hash_code;
pub mod key;
pub mod storable;
pub mod symbol;
pub mod value;

pub use config::TableConfig;
pub use error::{Error, Result};
pub use hash_code::HashCode;
pub use key::{KeyKind, KeyMode};
pub use storable::Storable;
pub use symbol::Symbol;
pub use value::{ObjectRef, StrObject, StrRef, Value};

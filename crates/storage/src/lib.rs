//! Storage layer for stratamap
//!
//! This crate implements the insertion-ordered table:
//! - Table: `&self` store/lookup/delete behind a `parking_lot::RwLock`
//! - SlotIndex: open-addressing hash → position index
//! - Key normalization and fast-path hashing from `stratamap-core`
//! - Enumeration that tolerates value updates from its own callback
//!
//! # Key storage
//!
//! A table keeps the key object that first created an entry. Storing an
//! equal key later replaces the value only. New unfrozen string keys are
//! stored as frozen copies so the caller can keep mutating its own string.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod index;
pub mod table;

pub use table::Table;

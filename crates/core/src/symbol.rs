//! Interned symbols
//!
//! Symbols are atom-like tokens. Every symbol with the same name shares one
//! allocation, so symbol equality is pointer equality.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

static INTERNER: Lazy<Mutex<FxHashSet<Arc<str>>>> = Lazy::new(|| Mutex::new(FxHashSet::default()));

/// An interned token such as `:ok`
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Intern `name`, returning the shared symbol
    pub fn intern(name: &str) -> Self {
        let mut table = INTERNER.lock();
        if let Some(existing) = table.get(name) {
            return Symbol(Arc::clone(existing));
        }
        let name: Arc<str> = Arc::from(name);
        table.insert(Arc::clone(&name));
        Symbol(name)
    }

    /// Symbol name without the leading colon
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the interned name, stable for the process lifetime
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const u8 as usize
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

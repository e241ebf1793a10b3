//! Table: insertion-ordered associative container
//!
//! This module implements the table using:
//! - `Vec<Option<Entry>>` for insertion-ordered entry storage (`None` = deleted)
//! - [`SlotIndex`] for open-addressing lookup by hash
//! - `parking_lot::RwLock` around both, with `&self` operations
//! - Atomics for the frozen flag and the enumeration depth
//!
//! # Design Notes
//!
//! - **Keys are fixed once stored**: storing an equal key again only replaces
//!   the value; the stored key object and its position never change
//! - **Defensive key copies**: a new unfrozen string key is stored as a frozen
//!   copy (see [`stratamap_core::key::normalize`])
//! - **No lock around user code**: hash and equality capabilities run with no
//!   lock held. A probe snapshots candidate entries under a read lock, compares
//!   outside it, then applies the change under the write lock only if the
//!   table generation is unchanged; otherwise it retries
//! - **Stable positions while enumerating**: compaction of deleted entries is
//!   deferred while any enumeration is active, so an enumeration can walk by
//!   position and see value updates made from inside its own callback

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, warn};

use stratamap_core::key::{self, KeyMode};
use stratamap_core::{Error, Result, TableConfig, Value};

use crate::index::SlotIndex;

/// A stored key/value pair
#[derive(Debug, Clone)]
struct Entry {
    /// Folded 64-bit hash of `key`
    hash: u64,
    key: Value,
    value: Value,
}

/// Entry seen during a probe, compared outside the lock
struct Candidate {
    pos: usize,
    key: Value,
    value: Value,
}

type Candidates = SmallVec<[Candidate; 4]>;

/// Lock-protected table state
#[derive(Debug, Clone)]
struct TableInner {
    entries: Vec<Option<Entry>>,
    index: SlotIndex,
    live: usize,
    mode: KeyMode,
    /// Bumped by every change to the key set or to entry positions
    generation: u64,
}

impl TableInner {
    fn new(config: &TableConfig) -> Self {
        Self {
            entries: Vec::with_capacity(config.initial_capacity),
            index: SlotIndex::for_entries(config.initial_capacity, config.max_load_factor),
            live: 0,
            mode: KeyMode::Equality,
            generation: 0,
        }
    }

    /// Live entries whose hash matches, in probe order
    fn candidates(&self, hash: u64) -> Candidates {
        self.index
            .probe(hash)
            .filter_map(|pos| match &self.entries[pos] {
                Some(e) if e.hash == hash => Some(Candidate {
                    pos,
                    key: e.key.clone(),
                    value: e.value.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, hash: u64, key: Value, value: Value, config: &TableConfig) {
        if !self.index.has_room(config.max_load_factor) {
            self.rebuild(config);
        }
        let pos = self.entries.len();
        self.entries.push(Some(Entry { hash, key, value }));
        self.index.insert(hash, pos);
        self.live += 1;
        self.generation += 1;
    }

    fn remove(&mut self, pos: usize) -> Option<Entry> {
        let entry = self.entries.get_mut(pos)?.take()?;
        self.live -= 1;
        self.generation += 1;
        Some(entry)
    }

    /// Drop deleted entries and rebuild the index sized for one more entry
    ///
    /// Moves entries, so never called while the table is being enumerated.
    fn rebuild(&mut self, config: &TableConfig) {
        let before = self.index.capacity();
        self.entries.retain(Option::is_some);
        let mut index = SlotIndex::for_entries(self.live + 1, config.max_load_factor);
        for (pos, entry) in self.entries.iter().enumerate() {
            if let Some(e) = entry {
                index.insert(e.hash, pos);
            }
        }
        self.index = index;
        self.generation += 1;
        debug!(
            target: "stratamap::table",
            live = self.live,
            slots_before = before,
            slots_after = self.index.capacity(),
            "Index rebuilt"
        );
    }

    fn dead(&self) -> usize {
        self.entries.len() - self.live
    }

    /// Next live entry at or after `from`
    fn next_live(&self, from: usize) -> Option<(usize, Value, Value)> {
        self.entries
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(pos, e)| e.as_ref().map(|e| (pos, e.key.clone(), e.value.clone())))
    }

    fn live_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().flatten()
    }
}

/// Marks a table as being enumerated for the guard's lifetime
struct IterGuard<'a> {
    depth: &'a AtomicUsize,
}

impl<'a> IterGuard<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self { depth }
    }
}

impl Drop for IterGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Insertion-ordered associative container
///
/// Keys are [`Value`]s. Built-in kinds hash and compare with fixed logic;
/// `Value::Object` keys dispatch to their [`Storable`](stratamap_core::Storable)
/// capability.
///
/// # State
///
/// A table starts mutable. [`Table::freeze`] makes it frozen for good: every
/// structural operation then fails with [`Error::Frozen`], and reads keep
/// working.
pub struct Table {
    inner: RwLock<TableInner>,
    config: TableConfig,
    frozen: AtomicBool,
    /// Number of enumerations in progress
    iterating: AtomicUsize,
}

impl Table {
    /// Create a new empty table with default configuration
    pub fn new() -> Self {
        Self::from_valid_config(TableConfig::default())
    }

    /// Create a new empty table with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration fails validation.
    pub fn with_config(config: TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TableConfig) -> Self {
        Self {
            inner: RwLock::new(TableInner::new(&config)),
            config,
            frozen: AtomicBool::new(false),
            iterating: AtomicUsize::new(0),
        }
    }

    /// Create a table pre-populated by storing each pair in order
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let table = Self::new();
        for (k, v) in pairs {
            table.store(k, v)?;
        }
        Ok(table)
    }

    /// The configuration this table was created with
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    // ========================================================================
    // Store
    // ========================================================================

    /// Associate `key` with `value`, returning `value`
    ///
    /// - If an equal key is already stored, only its value is replaced; the
    ///   stored key object and its position are unchanged
    /// - Otherwise the key is normalized (an unfrozen string is replaced by a
    ///   frozen copy) and a new entry is appended
    ///
    /// # Errors
    ///
    /// - `Error::Frozen` if the table is frozen; nothing else happens
    /// - `Error::NewKeyDuringIteration` if the key is new and the table is
    ///   being enumerated
    /// - Any error returned by the key's capability, unchanged
    pub fn store(&self, key: Value, value: Value) -> Result<Value> {
        self.check_frozen()?;

        'retry: loop {
            let (mode, generation) = {
                let inner = self.inner.read();
                (inner.mode, inner.generation)
            };
            let hash = key::hash_key(&key, mode)?;
            let candidates = {
                let inner = self.inner.read();
                if inner.generation != generation {
                    continue 'retry;
                }
                inner.candidates(hash)
            };

            let mut found = None;
            for candidate in candidates {
                if key::keys_eql(&key, &candidate.key, mode)? {
                    found = Some(candidate.pos);
                    break;
                }
            }

            let mut inner = self.inner.write();
            // A capability may have frozen or reshaped the table meanwhile
            self.check_frozen()?;
            if inner.generation != generation {
                continue 'retry;
            }

            match found {
                Some(pos) => {
                    if let Some(entry) = inner.entries[pos].as_mut() {
                        entry.value = value.clone();
                    }
                }
                None => {
                    if self.is_iterating() {
                        drop(inner);
                        warn!(
                            target: "stratamap::table",
                            key_type = key.type_name(),
                            "Rejected new key during iteration"
                        );
                        return Err(Error::NewKeyDuringIteration);
                    }
                    let stored_key = key::normalize(key, mode);
                    inner.push(hash, stored_key, value.clone(), &self.config);
                }
            }
            return Ok(value);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Value stored under a key equal to `key`
    pub fn get(&self, key: &Value) -> Result<Option<Value>> {
        Ok(self.find(key)?.map(|c| c.value))
    }

    /// Value stored under `key`, or `Error::KeyNotFound`
    pub fn fetch(&self, key: &Value) -> Result<Value> {
        self.get(key)?
            .ok_or_else(|| Error::KeyNotFound(format!("{:?}", key)))
    }

    /// Whether a key equal to `key` is stored
    pub fn contains_key(&self, key: &Value) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// The stored key object equal to `key`
    ///
    /// This is the object that was stored when the entry was created, which
    /// may differ from `key` in identity.
    pub fn key_for(&self, key: &Value) -> Result<Option<Value>> {
        Ok(self.find(key)?.map(|c| c.key))
    }

    fn find(&self, key: &Value) -> Result<Option<Candidate>> {
        let mode = self.inner.read().mode;
        let hash = key::hash_key(key, mode)?;
        let candidates = self.inner.read().candidates(hash);
        for candidate in candidates {
            if key::keys_eql(key, &candidate.key, mode)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.read().live
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in insertion order
    pub fn keys(&self) -> Vec<Value> {
        self.inner.read().live_entries().map(|e| e.key.clone()).collect()
    }

    /// Values in insertion order
    pub fn values(&self) -> Vec<Value> {
        self.inner
            .read()
            .live_entries()
            .map(|e| e.value.clone())
            .collect()
    }

    /// Key/value pairs in insertion order
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.inner
            .read()
            .live_entries()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// First entry in insertion order
    pub fn first(&self) -> Option<(Value, Value)> {
        self.inner
            .read()
            .live_entries()
            .next()
            .map(|e| (e.key.clone(), e.value.clone()))
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Call `f` with each entry in insertion order
    ///
    /// `f` may call back into this table. Storing a new value under an
    /// existing key is allowed and is seen by this enumeration if that entry
    /// has not been visited yet. Deleting is allowed; deleted entries are
    /// skipped. Storing a new key fails with `Error::NewKeyDuringIteration`.
    ///
    /// An error returned by `f` stops the enumeration and is returned.
    pub fn each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Result<()>,
    {
        let _guard = IterGuard::enter(&self.iterating);
        let mut pos = 0;
        loop {
            let next = self.inner.read().next_live(pos);
            match next {
                Some((at, key, value)) => {
                    f(&key, &value)?;
                    pos = at + 1;
                }
                None => return Ok(()),
            }
        }
    }

    /// Whether an enumeration is in progress
    pub fn is_iterating(&self) -> bool {
        self.iterating.load(Ordering::SeqCst) > 0
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Remove the entry for `key`, returning its value
    pub fn delete(&self, key: &Value) -> Result<Option<Value>> {
        self.check_frozen()?;

        'retry: loop {
            let (mode, generation) = {
                let inner = self.inner.read();
                (inner.mode, inner.generation)
            };
            let hash = key::hash_key(key, mode)?;
            let candidates = {
                let inner = self.inner.read();
                if inner.generation != generation {
                    continue 'retry;
                }
                inner.candidates(hash)
            };

            let mut found = None;
            for candidate in candidates {
                if key::keys_eql(key, &candidate.key, mode)? {
                    found = Some(candidate.pos);
                    break;
                }
            }
            let Some(pos) = found else {
                return Ok(None);
            };

            let mut inner = self.inner.write();
            self.check_frozen()?;
            if inner.generation != generation {
                continue 'retry;
            }
            let removed = inner.remove(pos).map(|e| e.value);
            self.maybe_compact(&mut inner);
            return Ok(removed);
        }
    }

    /// Remove every entry
    ///
    /// # Errors
    ///
    /// `Error::Frozen` if frozen, `Error::ClearDuringIteration` while
    /// enumerating.
    pub fn clear(&self) -> Result<()> {
        self.check_frozen()?;
        if self.is_iterating() {
            return Err(Error::ClearDuringIteration);
        }
        let mut inner = self.inner.write();
        let mode = inner.mode;
        let generation = inner.generation;
        *inner = TableInner::new(&self.config);
        inner.mode = mode;
        inner.generation = generation + 1;
        Ok(())
    }

    /// Recompute every key's hash
    ///
    /// Needed after user objects used as keys changed in a way that changes
    /// their hash. Entries that have become equal are merged: the earlier
    /// key keeps its position and takes the later entry's value.
    ///
    /// # Errors
    ///
    /// `Error::Frozen` if frozen, `Error::RehashDuringIteration` while
    /// enumerating, or a capability error.
    pub fn rehash(&self) -> Result<()> {
        self.check_frozen()?;
        if self.is_iterating() {
            return Err(Error::RehashDuringIteration);
        }

        loop {
            let (mode, generation, pairs) = {
                let inner = self.inner.read();
                let pairs: Vec<(Value, Value)> = inner
                    .live_entries()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect();
                (inner.mode, inner.generation, pairs)
            };

            // Built outside the lock: capabilities run here
            let mut rebuilt = TableInner::new(&self.config);
            rebuilt.mode = mode;
            for (k, v) in pairs {
                let hash = key::hash_key(&k, mode)?;
                let mut found = None;
                for candidate in rebuilt.candidates(hash) {
                    if key::keys_eql(&k, &candidate.key, mode)? {
                        found = Some(candidate.pos);
                        break;
                    }
                }
                match found {
                    Some(pos) => {
                        if let Some(entry) = rebuilt.entries[pos].as_mut() {
                            entry.value = v;
                        }
                    }
                    None => rebuilt.push(hash, k, v, &self.config),
                }
            }

            let mut inner = self.inner.write();
            self.check_frozen()?;
            if inner.generation != generation {
                continue;
            }
            debug!(
                target: "stratamap::table",
                before = inner.live,
                after = rebuilt.live,
                "Table rehashed"
            );
            rebuilt.generation = generation + 1;
            *inner = rebuilt;
            return Ok(());
        }
    }

    /// Switch to comparing keys by identity; one-way
    ///
    /// Afterwards keys are equal only when they are the same object, and
    /// unfrozen string keys are stored as given.
    ///
    /// # Errors
    ///
    /// `Error::Frozen` if frozen, `Error::CompareByIdentityDuringIteration`
    /// while enumerating.
    pub fn compare_by_identity(&self) -> Result<()> {
        self.check_frozen()?;
        if self.is_iterating() {
            return Err(Error::CompareByIdentityDuringIteration);
        }
        let mut inner = self.inner.write();
        if inner.mode == KeyMode::Identity {
            return Ok(());
        }
        let hashes = inner
            .live_entries()
            .map(|e| key::hash_key(&e.key, KeyMode::Identity))
            .collect::<Result<Vec<u64>>>()?;
        for (entry, hash) in inner.entries.iter_mut().flatten().zip(hashes) {
            entry.hash = hash;
        }
        inner.mode = KeyMode::Identity;
        inner.rebuild(&self.config);
        debug!(target: "stratamap::table", live = inner.live, "Switched to identity comparison");
        Ok(())
    }

    /// Whether keys are compared by identity
    pub fn is_compare_by_identity(&self) -> bool {
        self.inner.read().mode == KeyMode::Identity
    }

    /// Copy of this table: same entries and key mode, not frozen
    pub fn dup(&self) -> Table {
        let inner = self.inner.read().clone();
        Table {
            inner: RwLock::new(inner),
            config: self.config.clone(),
            frozen: AtomicBool::new(false),
            iterating: AtomicUsize::new(0),
        }
    }

    // ========================================================================
    // Frozen state
    // ========================================================================

    /// Freeze this table; idempotent and irreversible
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::SeqCst) {
            debug!(target: "stratamap::table", live = self.len(), "Table frozen");
        }
    }

    /// Whether this table is frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn check_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::frozen("Table"));
        }
        Ok(())
    }

    fn maybe_compact(&self, inner: &mut TableInner) {
        if self.is_iterating() || inner.entries.is_empty() {
            return;
        }
        let ratio = inner.dead() as f64 / inner.entries.len() as f64;
        if ratio >= self.config.tombstone_compaction_ratio {
            inner.rebuild(&self.config);
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key and value Debug impls may read this table
        let entries = self.entries();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

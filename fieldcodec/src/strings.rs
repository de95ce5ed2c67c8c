//! The per-stream unique string table and its shared handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Append-only table mapping unique strings to 1-based positional tokens,
/// plus the rolling timestamp reference state that must stay synchronized
/// between a writer and its matching reader.
///
/// Tokens are positional, not content-addressed: the reader must replay the
/// same sequence of insertions the writer performed, so a table is shared by
/// reference (see [`SharedStringTable`]) and never copied between the two
/// sides of a stream.
///
/// Additions are staged: they are visible immediately (so a packet under
/// construction can reference its own strings) but only become permanent on
/// [`commit`](Self::commit). [`rollback`](Self::rollback) discards staged
/// entries and restores the timestamp state, which is what makes a failed
/// packet write leave no trace.
#[derive(Debug, Default)]
pub struct UniqueStringTable {
    entries: Vec<String>,
    index: HashMap<String, u32>,
    committed_len: usize,
    reference_ticks: Option<i64>,
    committed_reference: Option<i64>,
    factor: Option<u64>,
    committed_factor: Option<u64>,
}

impl UniqueStringTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including staged ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no strings have been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by its 1-based token.
    #[must_use]
    pub fn get(&self, token: u32) -> Option<&str> {
        if token == 0 {
            return None;
        }
        self.entries.get(token as usize - 1).map(String::as_str)
    }

    /// Returns the token already assigned to `value`, if any.
    #[must_use]
    pub fn token_of(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Interns a string, returning its 1-based token and whether the entry
    /// is new (staged by this call).
    pub fn intern(&mut self, value: &str) -> (u32, bool) {
        if let Some(token) = self.index.get(value) {
            return (*token, false);
        }
        self.entries.push(value.to_owned());
        let token = self.entries.len() as u32;
        self.index.insert(value.to_owned(), token);
        (token, true)
    }

    /// The current timestamp reference, in ticks.
    #[must_use]
    pub const fn reference_ticks(&self) -> Option<i64> {
        self.reference_ticks
    }

    /// Updates the timestamp reference.
    pub fn set_reference_ticks(&mut self, ticks: i64) {
        self.reference_ticks = Some(ticks);
    }

    /// The generic timestamp factor divisor, if one has been set.
    #[must_use]
    pub const fn factor(&self) -> Option<u64> {
        self.factor
    }

    /// Updates the generic timestamp factor. Zero clears it.
    pub fn set_factor(&mut self, factor: u64) {
        self.factor = if factor == 0 { None } else { Some(factor) };
    }

    /// Makes all staged entries and timestamp state permanent.
    pub fn commit(&mut self) {
        self.committed_len = self.entries.len();
        self.committed_reference = self.reference_ticks;
        self.committed_factor = self.factor;
    }

    /// Discards staged entries and restores the committed timestamp state.
    pub fn rollback(&mut self) {
        for entry in self.entries.drain(self.committed_len..) {
            self.index.remove(&entry);
        }
        self.reference_ticks = self.committed_reference;
        self.factor = self.committed_factor;
    }
}

/// Shared handle to a [`UniqueStringTable`].
///
/// Both sides of a stream (or multiple related field writers) hold clones of
/// the same handle so they observe the identical sequence of token
/// assignments. The codec is single-threaded, so `Rc<RefCell<_>>` is the
/// right ownership shape here.
pub type SharedStringTable = Rc<RefCell<UniqueStringTable>>;

/// Creates a fresh shared string table.
#[must_use]
pub fn shared_table() -> SharedStringTable {
    Rc::new(RefCell::new(UniqueStringTable::new()))
}

//! Fixed-size position cache with last-write-wins collision handling

/// A 56-bit key and a non-zero 8-bit value packed in one word
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct Entry(u64);

impl Entry {
    pub fn new() -> Self {
        Self(0)
    }
    pub fn pack(key: u64, value: u8) -> Self {
        Self(key << 8 | value as u64)
    }
    pub fn key(self) -> u64 {
        self.0 >> 8
    }
    pub fn value(self) -> u8 {
        self.0 as u8
    }
}

/// Number of keys that fit the 56 bits of an entry
pub const KEY_LIMIT: u64 = 1 << 56;

/// Default number of entries, a prime just below 2^23 (64 MiB)
pub const DEFAULT_TABLE_SIZE: usize = 8388593;

/// Maps position keys to 8-bit values
///
/// A key lives in slot `key % capacity`. Storing into an occupied slot
/// overwrites it, so an evicted key simply reads back as missing. The value
/// 0 is reserved for missing entries.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TABLE_SIZE)
    }

    /// Creates a table with `size` entries, preferably a prime
    pub fn with_capacity(size: usize) -> Self {
        assert!(size > 0, "transposition table needs at least one entry");
        Self {
            entries: vec![Entry::new(); size],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn index(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    /// Stores a non-zero value for `key`, replacing whatever held the slot
    pub fn put(&mut self, key: u64, value: u8) {
        debug_assert!(key < KEY_LIMIT);
        debug_assert!(value != 0);
        let i = self.index(key);
        self.entries[i] = Entry::pack(key, value);
    }

    /// Returns the value stored for `key`, or 0 if it is missing
    pub fn get(&self, key: u64) -> u8 {
        debug_assert!(key < KEY_LIMIT);
        let entry = self.entries[self.index(key)];
        if entry.key() == key {
            entry.value()
        } else {
            0
        }
    }

    /// Empties the table
    pub fn reset(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = Entry::new();
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

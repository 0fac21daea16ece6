//! Back-to-front flat buffer builder
//!
//! Objects are written children first. The builder grows its buffer from the
//! end towards the front, so every object refers only to objects that were
//! written before it and all stored references are positive forward offsets.
//! Internally the bytes are kept reversed and flipped once in [`FlatBuilder::finish`].

use std::marker::PhantomData;

use rustc_hash::FxHashMap;

use crate::buffer::{SIZE_UOFFSET, VTABLE_HEADER_SIZE};
use crate::error::{FormatError, Result};

/// Offset of a written object, counted from the end of the buffer
pub struct Offset<T> {
    value: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Offset<T> {
    /// Create a typed offset
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Raw offset from the end of the buffer
    #[inline]
    pub const fn value(self) -> u32 {
        self.value
    }
}

impl<T> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Offset<T> {}

impl<T> std::fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Offset({})", self.value)
    }
}

/// Marker for length-prefixed strings
pub struct Str;

/// Marker for byte vectors
pub struct Bytes;

/// Marker for vectors of offsets to `T`
pub struct VectorOf<T>(PhantomData<T>);

/// Flat buffer builder
#[derive(Debug)]
pub struct FlatBuilder {
    /// Written bytes in reverse order
    rev: Vec<u8>,
    /// Largest alignment requested so far
    min_align: usize,
    /// Fields of the table under construction: (slot, offset)
    field_locs: Vec<(u16, u32)>,
    /// Offset where the open table started
    table_start: Option<u32>,
    /// Serialized vtables already in the buffer
    vtables: FxHashMap<Vec<u8>, u32>,
    /// Shared strings already in the buffer
    strings: FxHashMap<String, u32>,
}

impl FlatBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create an empty builder with preallocated space
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rev: Vec::with_capacity(capacity),
            min_align: 1,
            field_locs: Vec::new(),
            table_start: None,
            vtables: FxHashMap::default(),
            strings: FxHashMap::default(),
        }
    }

    /// Bytes written so far
    #[inline]
    pub fn offset(&self) -> u32 {
        self.rev.len() as u32
    }

    /// Discard everything written so far
    pub fn reset(&mut self) {
        self.rev.clear();
        self.min_align = 1;
        self.field_locs.clear();
        self.table_start = None;
        self.vtables.clear();
        self.strings.clear();
    }

    /// Pad so that after writing `additional` bytes the next `size`-byte
    /// value is aligned to `size` in the finished buffer
    pub fn prep(&mut self, size: usize, additional: usize) {
        self.min_align = self.min_align.max(size);
        let pad = (size - (self.rev.len() + additional) % size) % size;
        self.rev.resize(self.rev.len() + pad, 0);
    }

    #[inline]
    fn put_u32(&mut self, value: u32) {
        // Reversed storage: big-endian here reads back as little-endian.
        self.rev.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a byte
    pub fn push_u8(&mut self, value: u8) -> u32 {
        self.prep(1, 0);
        self.rev.push(value);
        self.offset()
    }

    /// Write a little-endian `u16`
    pub fn push_u16(&mut self, value: u16) -> u32 {
        self.prep(2, 0);
        self.rev.extend_from_slice(&value.to_be_bytes());
        self.offset()
    }

    /// Write a little-endian `u32`
    pub fn push_u32(&mut self, value: u32) -> u32 {
        self.prep(4, 0);
        self.put_u32(value);
        self.offset()
    }

    /// Write a relative reference to an object written earlier
    pub fn push_offset<T>(&mut self, target: Offset<T>) -> u32 {
        self.prep(SIZE_UOFFSET, 0);
        debug_assert!(target.value() <= self.offset(), "reference to unwritten object");
        let rel = self.offset() + SIZE_UOFFSET as u32 - target.value();
        self.put_u32(rel);
        self.offset()
    }

    fn put_vector_bytes(&mut self, bytes: &[u8]) -> u32 {
        debug_assert!(self.table_start.is_none(), "vector written inside a table");
        self.prep(SIZE_UOFFSET, bytes.len());
        self.rev.extend(bytes.iter().rev());
        self.put_u32(bytes.len() as u32);
        self.offset()
    }

    /// Write a length-prefixed byte vector
    pub fn create_bytes(&mut self, bytes: &[u8]) -> Offset<Bytes> {
        Offset::new(self.put_vector_bytes(bytes))
    }

    /// Write a length-prefixed string
    pub fn create_string(&mut self, s: &str) -> Offset<Str> {
        Offset::new(self.put_vector_bytes(s.as_bytes()))
    }

    /// Write a string once and reuse it for later identical requests
    pub fn create_shared_string(&mut self, s: &str) -> Offset<Str> {
        if let Some(&existing) = self.strings.get(s) {
            return Offset::new(existing);
        }
        let offset = self.create_string(s);
        self.strings.insert(s.to_owned(), offset.value());
        offset
    }

    /// Write a vector of references, preserving order
    pub fn create_vector<T>(&mut self, items: &[Offset<T>]) -> Offset<VectorOf<T>> {
        debug_assert!(self.table_start.is_none(), "vector written inside a table");
        self.prep(SIZE_UOFFSET, items.len() * SIZE_UOFFSET);
        for item in items.iter().rev() {
            self.push_offset(*item);
        }
        self.put_u32(items.len() as u32);
        Offset::new(self.offset())
    }

    /// Begin a table; only scalar and reference fields may follow until [`Self::end_table`]
    pub fn start_table(&mut self) {
        debug_assert!(self.table_start.is_none(), "nested table");
        self.field_locs.clear();
        self.table_start = Some(self.offset());
    }

    /// Add a byte field, omitted when equal to its default
    pub fn add_u8(&mut self, slot: u16, value: u8, default: u8) {
        if value != default {
            let loc = self.push_u8(value);
            self.field_locs.push((slot, loc));
        }
    }

    /// Add a boolean field, omitted when equal to its default
    pub fn add_bool(&mut self, slot: u16, value: bool, default: bool) {
        self.add_u8(slot, value as u8, default as u8);
    }

    /// Add a `u32` field, omitted when equal to its default
    pub fn add_u32(&mut self, slot: u16, value: u32, default: u32) {
        if value != default {
            let loc = self.push_u32(value);
            self.field_locs.push((slot, loc));
        }
    }

    /// Add a reference field
    pub fn add_offset<T>(&mut self, slot: u16, target: Offset<T>) {
        let loc = self.push_offset(target);
        self.field_locs.push((slot, loc));
    }

    /// Finish the open table: write its vtable (or reuse an identical one)
    /// and patch the table's vtable pointer
    pub fn end_table<T>(&mut self) -> Offset<T> {
        let start = self.table_start.take().unwrap_or_else(|| self.offset());

        // Placeholder for the signed vtable pointer
        self.prep(4, 0);
        self.put_u32(0);
        let object = self.offset();

        let slots = self
            .field_locs
            .iter()
            .map(|&(slot, _)| slot as usize + 1)
            .max()
            .unwrap_or(0);
        let mut entries = vec![0u16; slots];
        for &(slot, loc) in &self.field_locs {
            entries[slot as usize] = (object - loc) as u16;
        }
        self.field_locs.clear();

        let vtable_len = (VTABLE_HEADER_SIZE + slots * 2) as u16;
        let table_len = (object - start) as u16;
        let mut key = Vec::with_capacity(vtable_len as usize);
        key.extend_from_slice(&vtable_len.to_le_bytes());
        key.extend_from_slice(&table_len.to_le_bytes());
        for entry in &entries {
            key.extend_from_slice(&entry.to_le_bytes());
        }

        let vtable = match self.vtables.get(&key) {
            Some(&existing) => existing,
            None => {
                self.rev.extend(key.iter().rev());
                let at = self.offset();
                self.vtables.insert(key, at);
                at
            }
        };

        // table position - vtable position, in finished-buffer terms
        let soffset = vtable as i64 - object as i64;
        let at = object as usize;
        self.rev[at - 4..at].copy_from_slice(&(soffset as i32).to_be_bytes());

        Offset::new(object)
    }

    /// Write the root reference and return the finished buffer
    ///
    /// The first four bytes of the result hold the position of `root`.
    pub fn finish<T>(&mut self, root: Offset<T>) -> Result<Vec<u8>> {
        let align = self.min_align.max(SIZE_UOFFSET);
        self.prep(align, SIZE_UOFFSET);
        self.push_offset(root);
        if self.rev.len() > i32::MAX as usize {
            return Err(FormatError::BufferTooLarge);
        }

        let mut bytes = std::mem::take(&mut self.rev);
        bytes.reverse();
        self.reset();
        Ok(bytes)
    }
}

impl Default for FlatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

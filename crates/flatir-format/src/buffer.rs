//! Little-endian buffer primitives
//!
//! Every read is bounds-checked against the buffer length. Offsets handed out
//! by this module are absolute byte positions inside the buffer; they are
//! never turned into references to anything but the borrowed slice.

use crate::error::{FormatError, Result};

/// Size of a 32-bit unsigned offset
pub const SIZE_UOFFSET: usize = 4;

/// Size of the vtable header (vtable length + table length, both `u16`)
pub const VTABLE_HEADER_SIZE: usize = 4;

/// Size of one vtable slot
pub const SIZE_VOFFSET: usize = 2;

/// A read-only view over a flat IR buffer
#[derive(Debug, Clone, Copy)]
pub struct FlatBuf<'a> {
    bytes: &'a [u8],
}

impl<'a> FlatBuf<'a> {
    /// Wrap a byte slice
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Buffer length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Underlying bytes
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Borrow `size` bytes starting at `offset`
    pub fn slice(&self, offset: usize, size: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(size)
            .filter(|&end| end <= self.bytes.len())
            .map(|end| &self.bytes[offset..end])
            .ok_or(FormatError::OutOfBounds {
                offset,
                size,
                len: self.bytes.len(),
            })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    /// Read a byte
    #[inline]
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.array::<1>(offset)?[0])
    }

    /// Read a little-endian `u16`
    #[inline]
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array(offset)?))
    }

    /// Read a little-endian `u32`
    #[inline]
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(offset)?))
    }

    /// Read a little-endian `i32`
    #[inline]
    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(offset)?))
    }

    /// Follow the relative offset stored at `offset`
    pub fn indirect(&self, offset: usize) -> Result<usize> {
        let target = offset + self.read_u32(offset)? as usize;
        if target >= self.bytes.len() {
            return Err(FormatError::OutOfBounds {
                offset: target,
                size: 1,
                len: self.bytes.len(),
            });
        }
        Ok(target)
    }

    /// Absolute position of a vtable
    pub fn vtable(&self, table: usize) -> Result<usize> {
        let soffset = self.read_i32(table)? as i64;
        let vtable = table as i64 - soffset;
        if vtable < 0 || vtable as usize + VTABLE_HEADER_SIZE > self.bytes.len() {
            return Err(FormatError::OutOfBounds {
                offset: vtable.max(0) as usize,
                size: VTABLE_HEADER_SIZE,
                len: self.bytes.len(),
            });
        }
        Ok(vtable as usize)
    }

    /// Resolve a table field to its absolute position
    ///
    /// `None` means the field is absent and the caller's default applies.
    /// Slots past the end of the vtable are absent as well, which is what
    /// lets newer readers open buffers written with fewer fields.
    pub fn field_offset(&self, table: usize, slot: u16) -> Result<Option<usize>> {
        let vtable = self.vtable(table)?;
        let vtable_len = self.read_u16(vtable)? as usize;
        let entry = VTABLE_HEADER_SIZE + slot as usize * SIZE_VOFFSET;
        if entry + SIZE_VOFFSET > vtable_len {
            return Ok(None);
        }
        match self.read_u16(vtable + entry)? {
            0 => Ok(None),
            rel => Ok(Some(table + rel as usize)),
        }
    }

    /// Element count of the vector at `offset`
    #[inline]
    pub fn vector_len(&self, offset: usize) -> Result<usize> {
        Ok(self.read_u32(offset)? as usize)
    }

    /// Validate a vector of `elem_size`-byte elements and return `(len, data_start)`
    pub fn vector(&self, offset: usize, elem_size: usize) -> Result<(usize, usize)> {
        let len = self.vector_len(offset)?;
        let data = offset + SIZE_UOFFSET;
        let size = len
            .checked_mul(elem_size)
            .ok_or(FormatError::BufferTooLarge)?;
        self.slice(data, size)?;
        Ok((len, data))
    }

    /// Length-prefixed byte string at `offset` (not null-terminated)
    pub fn string_at(&self, offset: usize) -> Result<&'a [u8]> {
        let len = self.vector_len(offset)?;
        self.slice(offset + SIZE_UOFFSET, len)
    }

    /// Length-prefixed UTF-8 string at `offset`
    pub fn str_at(&self, offset: usize, field: &'static str) -> Result<&'a str> {
        std::str::from_utf8(self.string_at(offset)?).map_err(|_| FormatError::InvalidUtf8(field))
    }
}

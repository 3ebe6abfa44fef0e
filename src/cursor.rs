//! Bounds-checked byte cursor with explicit little-/big-endian reads and
//! marker scanning (component C1).
//!
//! Generalizes the bounds-checked `from_bytes(&[u8]) -> Result<Self>`
//! pattern repeated across the teacher's `FILHeader`, `FILTrailer`,
//! `FileAddress` and `IndexHeader` parsers into one reusable cursor type, per
//! spec §9's directive to encapsulate both endiannesses behind a single
//! cursor rather than hand-rolling byte shifts at every call site.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::IRptError;

pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        ByteCursor { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes remaining from the current position, unconsumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], IRptError> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or(IRptError::TruncatedFile { at: self.pos, needed: n })?;
        if end > self.data.len() {
            return Err(IRptError::TruncatedFile { at: self.pos, needed: n });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, IRptError> {
        let mut slice = self.take(1)?;
        slice
            .read_u8()
            .map_err(|_| IRptError::TruncatedFile { at: self.pos, needed: 1 })
    }

    pub fn u16_le(&mut self) -> Result<u16, IRptError> {
        let mut slice = self.take(2)?;
        Ok(slice.read_u16::<LittleEndian>().expect("length checked by take()"))
    }

    pub fn u32_le(&mut self) -> Result<u32, IRptError> {
        let mut slice = self.take(4)?;
        Ok(slice.read_u32::<LittleEndian>().expect("length checked by take()"))
    }

    pub fn u16_be(&mut self) -> Result<u16, IRptError> {
        let mut slice = self.take(2)?;
        Ok(slice.read_u16::<BigEndian>().expect("length checked by take()"))
    }

    pub fn u32_be(&mut self) -> Result<u32, IRptError> {
        let mut slice = self.take(4)?;
        Ok(slice.read_u32::<BigEndian>().expect("length checked by take()"))
    }

    /// Reads a 6-byte big-endian value into a `u64` (the Windows SID
    /// authority field is 48 bits).
    pub fn u48_be(&mut self) -> Result<u64, IRptError> {
        let slice = self.take(6)?;
        let mut buf = [0u8; 8];
        buf[2..].copy_from_slice(slice);
        Ok(u64::from_be_bytes(buf))
    }

    /// Finds the first occurrence of `needle` at or after the current
    /// position, returning its absolute offset. Uses the standard library's
    /// substring search (a window scan); spec §9 allows this over a
    /// hand-rolled search for multi-megabyte buffers.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        find_bytes(self.rest(), needle).map(|p| p + self.pos)
    }
}

/// Plain byte-slice substring search, shared by directory-guided and
/// full-scan marker lookups.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads a little-endian `u32` at an absolute offset without an
/// intermediate cursor, used for the fixed-position table-directory fields.
pub fn u32_le_at(data: &[u8], offset: usize) -> Result<u32, IRptError> {
    ByteCursor::at(data, offset).u32_le()
}

//! Bounds-checked little-endian reads over a byte buffer.
//!
//! [`ByteReader`] serves two callers: the ZIP reader uses the absolute
//! `read_*` accessors to decode fixed-layout headers, and the PDF lexer uses
//! the cursor methods to walk content streams byte by byte. Every read
//! checks `pos + len` against the buffer length and fails with
//! [`OutOfBounds`] rather than reading past the end.

use crate::error::OutOfBounds;

/// Immutable byte buffer plus a read cursor.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    /// Borrow `len` bytes starting at `pos`.
    pub fn read_bytes(&self, pos: usize, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = pos.checked_add(len).ok_or(OutOfBounds {
            pos,
            len,
            available: self.buf.len(),
        })?;
        self.buf.get(pos..end).ok_or(OutOfBounds {
            pos,
            len,
            available: self.buf.len(),
        })
    }

    pub fn read_u16_le(&self, pos: usize) -> Result<u16, OutOfBounds> {
        let b = self.read_bytes(pos, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&self, pos: usize) -> Result<u32, OutOfBounds> {
        let b = self.read_bytes(pos, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    // ============ Cursor ============

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor; positions past the end clamp to the end.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.pos
            .checked_add(offset)
            .and_then(|p| self.buf.get(p))
            .copied()
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn starts_with_at(&self, pos: usize, needle: &[u8]) -> bool {
        self.read_bytes(pos, needle.len())
            .map(|b| b == needle)
            .unwrap_or(false)
    }

    /// Offset of the first occurrence of `needle` at or after `from`.
    pub fn find_from(&self, from: usize, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || from >= self.buf.len() {
            return None;
        }
        self.buf[from..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|i| from + i)
    }
}

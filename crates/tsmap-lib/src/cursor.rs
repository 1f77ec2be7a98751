//! Positioned little-endian reads over an in-memory sector buffer.
//!
//! The cursor knows nothing about record layouts. Every read is bounds-checked
//! and fails with [`Error::OutOfBounds`] instead of touching memory past the
//! end of the buffer, so a corrupt length field stops the decode immediately.

use crate::error::{Error, Result};

/// Cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        if offset > data.len() {
            return Err(Error::OutOfBounds {
                offset,
                len: 0,
                buffer_len: data.len(),
            });
        }
        Ok(Self { data, pos: offset })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Advance the cursor by `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Skip `count` fixed-size records of `size` bytes each.
    pub fn skip_records(&mut self, count: usize, size: usize) -> Result<()> {
        let total = count.checked_mul(size).ok_or(Error::OutOfBounds {
            offset: self.pos,
            len: usize::MAX,
            buffer_len: self.data.len(),
        })?;
        self.skip(total)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array::<4>()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array::<4>()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array::<8>()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array::<4>()?))
    }

    /// Read a signed 32-bit element count.
    ///
    /// Negative counts are rejected; they can only come from a misaligned or
    /// corrupt record.
    pub fn read_count(&mut self) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| Error::InvalidCount {
            count: i64::from(count),
            offset,
        })
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::OutOfBounds {
                offset: self.pos,
                len: n,
                buffer_len: self.data.len(),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

/// Test a single bit of a flags byte.
pub fn is_bit_set(value: u8, bit: u8) -> bool {
    bit < 8 && (value >> bit) & 1 == 1
}

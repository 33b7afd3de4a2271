//! Owned, 8-byte aligned storage for matrix values
//!
//! Values of every type live in one flat byte arena. The backing words keep
//! the base 8-byte aligned, so any built-in element at index `p` (byte offset
//! `p * size`) can be viewed as a typed slice without copying.

use crate::error::{Error, Result};
use crate::types::Element;

const WORD: usize = std::mem::size_of::<u64>();

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ValueArena {
    words: Vec<u64>,
    len: usize,
}

impl ValueArena {
    /// Allocate `len` zeroed bytes, reporting failure instead of aborting.
    pub fn try_zeroed(len: usize) -> Result<Self> {
        let nwords = len.div_ceil(WORD);
        let mut words = Vec::new();
        words
            .try_reserve_exact(nwords)
            .map_err(|_| Error::OutOfMemory { bytes: len })?;
        words.resize(nwords, 0);
        Ok(Self { words, len })
    }

    /// Arena holding `nelem` elements of `size` bytes each.
    pub fn try_for_elements(nelem: usize, size: usize) -> Result<Self> {
        let len = nelem.checked_mul(size).ok_or(Error::OutOfMemory {
            bytes: usize::MAX,
        })?;
        Self::try_zeroed(len)
    }

    /// Copy raw bytes into a new arena.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut arena = Self::try_zeroed(bytes.len())?;
        arena.as_bytes_mut().copy_from_slice(bytes);
        Ok(arena)
    }

    /// Copy typed values into a new arena.
    pub fn from_slice<T: Element>(values: &[T]) -> Result<Self> {
        Self::from_bytes(bytemuck::cast_slice(values))
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }

    /// Typed view of the whole arena
    pub fn typed<T: Element>(&self) -> Result<&[T]> {
        Ok(bytemuck::try_cast_slice(self.as_bytes())?)
    }

    /// Mutable typed view of the whole arena
    pub fn typed_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        Ok(bytemuck::try_cast_slice_mut(self.as_bytes_mut())?)
    }
}

impl std::fmt::Debug for ValueArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueArena").field("len", &self.len).finish()
    }
}

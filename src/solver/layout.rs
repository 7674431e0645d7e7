//! Layout of stacked per-shift vectors.
//!
//! A stacked vector holds one block of length `N` per shift, flattened into a
//! single slice of length `N * N_s`. Blocks are contiguous and ordered by
//! shift index (shift-major): element `k` of shift `s` lives at `s * N + k`.
//! Every kernel that touches a stacked vector goes through this type.

use crate::error::{MultishiftError, Result};
use rayon::prelude::*;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackedLayout {
    block_len: usize,
    n_blocks: usize,
}

impl StackedLayout {
    pub fn new(block_len: usize, n_blocks: usize) -> Self {
        Self {
            block_len,
            n_blocks,
        }
    }

    /// Infer the layout of a stacked vector of `total_len` elements with
    /// blocks of `block_len`.
    pub fn from_total(total_len: usize, block_len: usize) -> Result<Self> {
        if block_len == 0 {
            if total_len == 0 {
                return Ok(Self::new(0, 0));
            }
            return Err(MultishiftError::Dimension(format!(
                "stacked length {total_len} cannot be split into blocks of length 0"
            )));
        }
        if total_len % block_len != 0 {
            return Err(MultishiftError::Dimension(format!(
                "stacked length {total_len} is not a multiple of block length {block_len}"
            )));
        }
        Ok(Self::new(block_len, total_len / block_len))
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    pub fn total_len(&self) -> usize {
        self.block_len * self.n_blocks
    }

    /// Flattened index of element `k` of block `s`.
    pub fn index(&self, s: usize, k: usize) -> usize {
        s * self.block_len + k
    }

    pub fn block_range(&self, s: usize) -> Range<usize> {
        let start = s * self.block_len;
        start..start + self.block_len
    }

    /// Check that `len` is the length of a stacked vector in this layout.
    pub fn check(&self, name: &str, len: usize) -> Result<()> {
        if len != self.total_len() {
            return Err(MultishiftError::Dimension(format!(
                "{name} has length {len}, expected {} ({} blocks of {})",
                self.total_len(),
                self.n_blocks,
                self.block_len
            )));
        }
        Ok(())
    }

    /// Parallel iterator over the blocks of `data`, in shift order.
    ///
    /// `data` must already be checked against this layout.
    pub fn blocks_mut<'a, T: Send>(&self, data: &'a mut [T]) -> rayon::slice::ChunksMut<'a, T> {
        debug_assert_eq!(data.len(), self.total_len());
        data.par_chunks_mut(self.block_len.max(1))
    }
}

//! This undocumented and unstable module is for tooling that needs to work
//! with chunk and parent chaining values directly, for example to check the
//! shape of the tree or to hash one chunk of a larger input in isolation.
//! There might be breaking changes to this module between patch versions.
//!
//! Everything here uses the default (unkeyed) mode.

use crate::output::Output;
use crate::{Flags, Hash, IV};

pub const BLOCK_LEN: usize = crate::BLOCK_LEN;
pub const CHUNK_LEN: usize = crate::CHUNK_LEN;

/// The state of a single chunk at an explicit chunk index.
#[derive(Clone, Debug)]
pub struct ChunkState(crate::chunk::ChunkState);

impl ChunkState {
    pub fn new(chunk_counter: u64) -> Self {
        Self(crate::chunk::ChunkState::new(IV, chunk_counter, Flags::empty()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add input to the chunk. The total must not exceed [`CHUNK_LEN`].
    #[inline]
    pub fn update(&mut self, input: &[u8]) -> &mut Self {
        self.0.update(input);
        self
    }

    /// The chunk's chaining value, or its root hash when `is_root` is set.
    /// Only chunk 0 of an input that fits in one chunk is a root. A chaining
    /// value comes back as a [`Hash`] for convenience but isn't one.
    pub fn finalize(&self, is_root: bool) -> Hash {
        finish(self.0.output(), is_root)
    }
}

/// The parent of two child chaining values, or the root hash of the whole
/// input when `is_root` is set.
pub fn parent_cv(left_child: &Hash, right_child: &Hash, is_root: bool) -> Hash {
    let (left, right) = (left_child.as_bytes(), right_child.as_bytes());
    finish(crate::tree::parent_node_output(left, right, IV, Flags::empty()), is_root)
}

fn finish(output: Output, is_root: bool) -> Hash {
    match is_root {
        true => output.root_hash(),
        false => Hash::from_bytes(output.chaining_value()),
    }
}

//! The Merkle tree builder.
//!
//! Completed chunk chaining values go onto a stack of pending subtrees, each
//! tagged with its size in chunks. Pushing a subtree merges it with the top of
//! the stack for as long as the sizes match, exactly like carry propagation in
//! a binary counter. The stack therefore holds one entry per 1-bit in the
//! number of chunks pushed so far, largest subtree at the bottom, and the
//! final tree shape depends only on the total input length.
//!
//! A chunk is only pushed once the hasher knows more input follows it, so no
//! merge performed here is ever the root. The root is formed in
//! [`CvStack::root_output`], which folds the remaining subtrees from the top
//! down onto the Output of the last chunk without compressing anything that
//! might still need the ROOT flag.

use crate::output::Output;
use crate::{CVBytes, CVWords, Flags, BLOCK_LEN, MAX_DEPTH};
use arrayvec::ArrayVec;
use core::fmt;

pub(crate) fn parent_node_output(
    left_child: &CVBytes,
    right_child: &CVBytes,
    key: &CVWords,
    flags: Flags,
) -> Output {
    let mut block = [0; BLOCK_LEN];
    block[..32].copy_from_slice(left_child);
    block[32..].copy_from_slice(right_child);
    Output {
        cv: *key,
        block,
        block_len: BLOCK_LEN as u8, // Always BLOCK_LEN (64) for parent nodes.
        counter: 0,                 // Always 0 for parent nodes.
        flags: flags | Flags::PARENT,
    }
}

#[derive(Clone, Copy)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub(crate) struct Subtree {
    pub(crate) cv: CVBytes,
    // Always a power of two.
    pub(crate) chunks: u64,
}

#[derive(Clone, Default)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub(crate) struct CvStack {
    // 2^54 chunks of 1024 bytes is 2^64 bytes, so 54 entries is enough for
    // any input length a u64 can count.
    entries: ArrayVec<Subtree, MAX_DEPTH>,
}

impl CvStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total number of chunks covered by the pending subtrees.
    pub(crate) fn chunks(&self) -> u64 {
        self.entries.iter().map(|subtree| subtree.chunks).sum()
    }

    pub(crate) fn push_chunk_cv(&mut self, chunk_cv: &CVBytes, key: &CVWords, flags: Flags) {
        let mut node = Subtree {
            cv: *chunk_cv,
            chunks: 1,
        };
        while let Some(left) = self
            .entries
            .last()
            .copied()
            .filter(|top| top.chunks == node.chunks)
        {
            self.entries.pop();
            node = Subtree {
                cv: parent_node_output(&left.cv, &node.cv, key, flags).chaining_value(),
                chunks: 2 * node.chunks,
            };
        }
        self.entries.push(node);
        self.debug_assert_invariants();
    }

    /// Starting with the Output of the last chunk, compute all the parent
    /// nodes along the right edge of the tree, and return the root Output.
    pub(crate) fn root_output(&self, last_chunk: Output, key: &CVWords, flags: Flags) -> Output {
        let mut output = last_chunk;
        for subtree in self.entries.iter().rev() {
            output = parent_node_output(&subtree.cv, &output.chaining_value(), key, flags);
        }
        output
    }

    fn debug_assert_invariants(&self) {
        if cfg!(debug_assertions) {
            for subtree in &self.entries {
                debug_assert_eq!(subtree.chunks.count_ones(), 1, "subtree not a power of 2");
            }
            for pair in self.entries.windows(2) {
                debug_assert!(pair[0].chunks > pair[1].chunks, "unmerged subtrees");
            }
            debug_assert_eq!(self.chunks().count_ones() as usize, self.entries.len());
        }
    }
}

// Don't derive(Debug), because chaining values may be secret.
impl fmt::Debug for CvStack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|subtree| subtree.chunks))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::IV;

    fn fake_cv(i: u64) -> CVBytes {
        let mut cv = [0; 32];
        cv[..8].copy_from_slice(&i.to_le_bytes());
        cv
    }

    fn sizes(stack: &CvStack) -> ArrayVec<u64, MAX_DEPTH> {
        stack.entries.iter().map(|subtree| subtree.chunks).collect()
    }

    #[test]
    fn test_stack_follows_binary_counter() {
        let mut stack = CvStack::new();
        for n in 1u64..=300 {
            stack.push_chunk_cv(&fake_cv(n), IV, Flags::empty());
            assert_eq!(stack.len(), n.count_ones() as usize, "after {} chunks", n);
            assert_eq!(stack.chunks(), n);
            // Each entry corresponds to one set bit, largest first.
            let mut expected = ArrayVec::<u64, MAX_DEPTH>::new();
            for bit in (0..64).rev() {
                if n & (1 << bit) != 0 {
                    expected.push(1 << bit);
                }
            }
            assert_eq!(sizes(&stack), expected);
        }
    }

    #[test]
    fn test_merge_is_a_parent_compression() {
        let mut stack = CvStack::new();
        stack.push_chunk_cv(&fake_cv(1), IV, Flags::empty());
        stack.push_chunk_cv(&fake_cv(2), IV, Flags::empty());
        let expected = parent_node_output(&fake_cv(1), &fake_cv(2), IV, Flags::empty())
            .chaining_value();
        assert_eq!(stack.entries[0].cv, expected);
        assert_eq!(stack.entries[0].chunks, 2);
    }

    #[test]
    fn test_root_output_folds_right_edge() {
        // Three chunks pushed: stack is [2, 1]. The last chunk's output is
        // folded under the single-chunk subtree first, then under the pair.
        let mut stack = CvStack::new();
        for i in 0..3 {
            stack.push_chunk_cv(&fake_cv(i), IV, Flags::KEYED_HASH);
        }
        let last = parent_node_output(&fake_cv(10), &fake_cv(11), IV, Flags::KEYED_HASH);
        let root = stack.root_output(last.clone(), IV, Flags::KEYED_HASH);

        let pair = parent_node_output(&fake_cv(0), &fake_cv(1), IV, Flags::KEYED_HASH)
            .chaining_value();
        let lower = parent_node_output(&fake_cv(2), &last.chaining_value(), IV, Flags::KEYED_HASH);
        let expected = parent_node_output(&pair, &lower.chaining_value(), IV, Flags::KEYED_HASH);
        assert_eq!(root.root_hash(), expected.root_hash());
        assert!(root.flags.contains(Flags::PARENT | Flags::KEYED_HASH));
        assert!(!root.flags.contains(Flags::ROOT));
    }

    #[test]
    fn test_empty_stack_returns_last_chunk() {
        let stack = CvStack::new();
        let last = parent_node_output(&fake_cv(1), &fake_cv(2), IV, Flags::empty());
        let root = stack.root_output(last.clone(), IV, Flags::empty());
        assert_eq!(root.root_hash(), last.root_hash());
    }
}

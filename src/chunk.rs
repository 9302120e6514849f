//! The chunk processor.

use crate::output::Output;
use crate::{portable, CVWords, Flags, BLOCK_LEN, CHUNK_LEN};
use core::fmt;

// The last block of a chunk is never compressed here. It sits in `buf` until
// either more input arrives (and it turns out not to be the last block after
// all) or the caller asks for an Output, which applies CHUNK_END and, at the
// root, ROOT.
#[derive(Clone)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub(crate) struct ChunkState {
    pub(crate) cv: CVWords,
    pub(crate) chunk_counter: u64,
    pub(crate) buf: [u8; BLOCK_LEN],
    pub(crate) buf_len: u8,
    pub(crate) blocks_compressed: u8,
    pub(crate) flags: Flags,
}

impl ChunkState {
    pub(crate) fn new(key: &CVWords, chunk_counter: u64, flags: Flags) -> Self {
        Self {
            cv: *key,
            chunk_counter,
            buf: [0; BLOCK_LEN],
            buf_len: 0,
            blocks_compressed: 0,
            flags,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks_compressed as usize * BLOCK_LEN + self.buf_len as usize
    }

    // Bits that depend on where the buffered block sits in the chunk.
    // CHUNK_END is only known by the caller of output().
    fn block_flags(&self) -> Flags {
        let mut flags = self.flags;
        flags.set(Flags::CHUNK_START, self.blocks_compressed == 0);
        flags
    }

    fn compress_buffered_block(&mut self) {
        debug_assert_eq!(self.buf_len as usize, BLOCK_LEN);
        self.cv = portable::compress_cv(
            &self.cv,
            &self.buf,
            BLOCK_LEN as u8,
            self.chunk_counter,
            self.block_flags(),
        );
        self.buf = [0; BLOCK_LEN];
        self.buf_len = 0;
        self.blocks_compressed += 1;
    }

    /// Absorb input into the chunk. A full buffer is compressed only when the
    /// next byte shows up, so the final block is always still in `buf`. The
    /// caller never gives us more than what fits in the chunk.
    pub(crate) fn update(&mut self, mut input: &[u8]) -> &mut Self {
        debug_assert!(self.len() + input.len() <= CHUNK_LEN, "chunk overflow");
        while !input.is_empty() {
            if self.buf_len as usize == BLOCK_LEN {
                self.compress_buffered_block();
            }
            let free = &mut self.buf[self.buf_len as usize..];
            let (head, tail) = input.split_at(free.len().min(input.len()));
            free[..head.len()].copy_from_slice(head);
            self.buf_len += head.len() as u8;
            input = tail;
        }
        self
    }

    pub(crate) fn output(&self) -> Output {
        Output {
            cv: self.cv,
            block: self.buf,
            block_len: self.buf_len,
            counter: self.chunk_counter,
            flags: self.block_flags() | Flags::CHUNK_END,
        }
    }
}

// Position only. The CV and buffered bytes are secret in keyed modes.
impl fmt::Debug for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ChunkState")
            .field("len", &self.len())
            .field("chunk_counter", &self.chunk_counter)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{paint_test_input, TEST_KEY_WORDS};
    use core::cmp;

    // Compress the blocks of one chunk by hand, to pin down the flags and the
    // zero padding of the final block.
    fn manual_chunk_cv(key: &CVWords, chunk: &[u8], counter: u64, flags: Flags) -> CVWords {
        let mut cv = *key;
        let num_blocks = cmp::max(1, (chunk.len() + BLOCK_LEN - 1) / BLOCK_LEN);
        for i in 0..num_blocks {
            let start = i * BLOCK_LEN;
            let end = cmp::min(chunk.len(), start + BLOCK_LEN);
            let mut block = [0; BLOCK_LEN];
            block[..end - start].copy_from_slice(&chunk[start..end]);
            let mut block_flags = flags;
            if i == 0 {
                block_flags |= Flags::CHUNK_START;
            }
            if i == num_blocks - 1 {
                block_flags |= Flags::CHUNK_END;
            }
            cv = portable::compress_cv(&cv, &block, (end - start) as u8, counter, block_flags);
        }
        cv
    }

    #[test]
    fn test_chunk_cv_matches_manual_compression() {
        let mut input = [0; CHUNK_LEN];
        paint_test_input(&mut input);
        for &len in &[0, 1, 63, 64, 65, 128, 129, CHUNK_LEN - 1, CHUNK_LEN] {
            let counter = 7;
            let flags = Flags::KEYED_HASH;
            let expected = manual_chunk_cv(&TEST_KEY_WORDS, &input[..len], counter, flags);
            let mut state = ChunkState::new(&TEST_KEY_WORDS, counter, flags);
            state.update(&input[..len]);
            assert_eq!(state.len(), len);
            assert_eq!(
                portable::cv_to_bytes(&expected),
                state.output().chaining_value(),
                "len {}",
                len
            );
        }
    }

    #[test]
    fn test_update_splits_are_invisible() {
        let mut input = [0; CHUNK_LEN];
        paint_test_input(&mut input);
        let mut whole = ChunkState::new(&TEST_KEY_WORDS, 0, Flags::empty());
        whole.update(&input);

        for &split in &[1, 63, 64, 65, 500, CHUNK_LEN - 64, CHUNK_LEN - 1] {
            let mut pieces = ChunkState::new(&TEST_KEY_WORDS, 0, Flags::empty());
            pieces.update(&input[..split]).update(&input[split..]);
            assert_eq!(whole.output().chaining_value(), pieces.output().chaining_value());
        }

        let mut bytewise = ChunkState::new(&TEST_KEY_WORDS, 0, Flags::empty());
        for byte in input.iter() {
            bytewise.update(core::slice::from_ref(byte));
        }
        assert_eq!(whole.output().chaining_value(), bytewise.output().chaining_value());
    }

    #[test]
    fn test_final_block_stays_pending() {
        let mut state = ChunkState::new(&TEST_KEY_WORDS, 0, Flags::empty());
        state.update(&[1; BLOCK_LEN]);
        assert_eq!(state.blocks_compressed, 0);
        assert_eq!(state.buf_len as usize, BLOCK_LEN);
        state.update(&[2]);
        assert_eq!(state.blocks_compressed, 1);
        assert_eq!(state.buf_len, 1);
    }

    #[test]
    fn test_chunk_counter_separates_chunks() {
        let mut a = ChunkState::new(&TEST_KEY_WORDS, 0, Flags::empty());
        let mut b = ChunkState::new(&TEST_KEY_WORDS, 1, Flags::empty());
        a.update(b"same bytes");
        b.update(b"same bytes");
        assert_ne!(a.output().chaining_value(), b.output().chaining_value());
    }
}

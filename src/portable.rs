//! The compression function.
//!
//! This is the only place where the published constants and round structure
//! matter for bit compatibility. There are no SIMD variants; every caller in
//! the crate goes through [`compress_cv`] or [`compress_xof`].

use crate::{counter_high, counter_low, CVBytes, CVWords, Flags, BLOCK_LEN, IV, MSG_SCHEDULE};
use arrayref::array_ref;

// State indexes touched by each G call in a round: four columns, then four
// diagonals. The i-th call takes message words 2i and 2i+1 of the schedule.
const LANES: [[usize; 4]; 8] = [
    [0, 4, 8, 12],
    [1, 5, 9, 13],
    [2, 6, 10, 14],
    [3, 7, 11, 15],
    [0, 5, 10, 15],
    [1, 6, 11, 12],
    [2, 7, 8, 13],
    [3, 4, 9, 14],
];

fn load_words<const N: usize>(bytes: &[u8]) -> [u32; N] {
    debug_assert_eq!(bytes.len(), 4 * N);
    let mut words = [0; N];
    for (word, quad) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes(*array_ref!(quad, 0, 4));
    }
    words
}

fn store_words(words: &[u32], bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len(), 4 * words.len());
    for (quad, word) in bytes.chunks_exact_mut(4).zip(words) {
        quad.copy_from_slice(&word.to_le_bytes());
    }
}

/// Interpret a key or a chaining value as little-endian words.
pub(crate) fn cv_from_bytes(bytes: &CVBytes) -> CVWords {
    load_words(bytes)
}

pub(crate) fn cv_to_bytes(cv: &CVWords) -> CVBytes {
    let mut bytes = [0; 32];
    store_words(cv, &mut bytes);
    bytes
}

struct State([u32; 16]);

impl State {
    fn new(cv: &CVWords, counter: u64, block_len: u8, flags: Flags) -> Self {
        let mut words = [0; 16];
        words[..8].copy_from_slice(cv);
        words[8..12].copy_from_slice(&IV[..4]);
        words[12] = counter_low(counter);
        words[13] = counter_high(counter);
        words[14] = block_len as u32;
        words[15] = flags.bits() as u32;
        Self(words)
    }

    #[inline(always)]
    fn g(&mut self, [a, b, c, d]: [usize; 4], x: u32, y: u32) {
        let s = &mut self.0;
        s[a] = s[a].wrapping_add(s[b]).wrapping_add(x);
        s[d] = (s[d] ^ s[a]).rotate_right(16);
        s[c] = s[c].wrapping_add(s[d]);
        s[b] = (s[b] ^ s[c]).rotate_right(12);
        s[a] = s[a].wrapping_add(s[b]).wrapping_add(y);
        s[d] = (s[d] ^ s[a]).rotate_right(8);
        s[c] = s[c].wrapping_add(s[d]);
        s[b] = (s[b] ^ s[c]).rotate_right(7);
    }

    fn mix(&mut self, msg: &[u32; 16]) {
        for schedule in MSG_SCHEDULE.iter() {
            for (i, &lane) in LANES.iter().enumerate() {
                self.g(lane, msg[schedule[2 * i]], msg[schedule[2 * i + 1]]);
            }
        }
    }

    fn run(cv: &CVWords, block: &[u8; BLOCK_LEN], len: u8, counter: u64, flags: Flags) -> Self {
        debug_assert!(len as usize <= BLOCK_LEN);
        let mut state = Self::new(cv, counter, len, flags);
        state.mix(&load_words(block));
        state
    }
}

/// Compress one block and return the new chaining value.
pub(crate) fn compress_cv(
    cv: &CVWords,
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: Flags,
) -> CVWords {
    let State(s) = State::run(cv, block, block_len, counter, flags);
    core::array::from_fn(|i| s[i] ^ s[i + 8])
}

/// Compress one block and return all 64 bytes of the output state. Only root
/// compressions use the second half, which folds in the input CV.
pub(crate) fn compress_xof(
    cv: &CVWords,
    block: &[u8; BLOCK_LEN],
    block_len: u8,
    counter: u64,
    flags: Flags,
) -> [u8; BLOCK_LEN] {
    let State(s) = State::run(cv, block, block_len, counter, flags);
    let words: [u32; 16] = core::array::from_fn(|i| match i {
        0..=7 => s[i] ^ s[i + 8],
        _ => s[i] ^ cv[i - 8],
    });
    let mut out = [0; BLOCK_LEN];
    store_words(&words, &mut out);
    out
}

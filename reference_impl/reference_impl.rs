//! A deliberately plain BLAKE3, used only as a test oracle.
//!
//! It keeps the whole input in memory and builds the hash tree recursively at
//! finalization, splitting each subtree so that its left half is the largest
//! power-of-two number of chunks. The main crate streams input through a CV
//! stack instead, so the two agree only if both get the tree shape right. The
//! compression function permutes the message words between rounds rather
//! than using a precomputed schedule.

const BLOCK_LEN: usize = 64;
const CHUNK_LEN: usize = 1024;
const KEY_LEN: usize = 32;

const CHUNK_START: u32 = 1;
const CHUNK_END: u32 = 2;
const PARENT: u32 = 4;
const ROOT: u32 = 8;
const KEYED_HASH: u32 = 16;
const DERIVE_KEY_CONTEXT: u32 = 32;
const DERIVE_KEY_MATERIAL: u32 = 64;

const IV: [u32; 8] = [
    0x6A09E667, 0xBB67AE85, 0x3C6EF372, 0xA54FF53A, 0x510E527F, 0x9B05688C, 0x1F83D9AB, 0x5BE0CD19,
];

const MSG_PERMUTATION: [usize; 16] = [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8];

fn quarter_round(v: &mut [u32; 16], [a, b, c, d]: [usize; 4], x: u32, y: u32) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(12);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(8);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(7);
}

/// The full 16-word output: words 0..8 are the chaining value, and words
/// 8..16 are only used for extended root output.
fn compress(cv: [u32; 8], mut m: [u32; 16], counter: u64, len: u32, flags: u32) -> [u32; 16] {
    let mut v = [0; 16];
    v[..8].copy_from_slice(&cv);
    v[8..12].copy_from_slice(&IV[..4]);
    v[12] = counter as u32;
    v[13] = (counter >> 32) as u32;
    v[14] = len;
    v[15] = flags;

    for round in 0..7 {
        if round > 0 {
            m = MSG_PERMUTATION.map(|i| m[i]);
        }
        quarter_round(&mut v, [0, 4, 8, 12], m[0], m[1]);
        quarter_round(&mut v, [1, 5, 9, 13], m[2], m[3]);
        quarter_round(&mut v, [2, 6, 10, 14], m[4], m[5]);
        quarter_round(&mut v, [3, 7, 11, 15], m[6], m[7]);
        quarter_round(&mut v, [0, 5, 10, 15], m[8], m[9]);
        quarter_round(&mut v, [1, 6, 11, 12], m[10], m[11]);
        quarter_round(&mut v, [2, 7, 8, 13], m[12], m[13]);
        quarter_round(&mut v, [3, 4, 9, 14], m[14], m[15]);
    }

    let mut out = [0; 16];
    for i in 0..8 {
        out[i] = v[i] ^ v[i + 8];
        out[i + 8] = v[i + 8] ^ cv[i];
    }
    out
}

// Zero-pads short input.
fn le_words<const N: usize>(bytes: &[u8]) -> [u32; N] {
    let mut words = [0; N];
    for (i, &byte) in bytes.iter().enumerate() {
        words[i / 4] |= (byte as u32) << (8 * (i % 4));
    }
    words
}

/// Everything that goes into a node's last compression. The caller picks
/// either a chaining value or root output from it.
struct Node {
    cv: [u32; 8],
    m: [u32; 16],
    counter: u64,
    len: u32,
    flags: u32,
}

impl Node {
    fn chaining_value(&self) -> [u32; 8] {
        let out = compress(self.cv, self.m, self.counter, self.len, self.flags);
        let mut cv = [0; 8];
        cv.copy_from_slice(&out[..8]);
        cv
    }

    fn write_root_output(&self, out: &mut [u8]) {
        for (block_index, block) in out.chunks_mut(BLOCK_LEN).enumerate() {
            let words = compress(self.cv, self.m, block_index as u64, self.len, self.flags | ROOT);
            for (i, byte) in block.iter_mut().enumerate() {
                *byte = (words[i / 4] >> (8 * (i % 4))) as u8;
            }
        }
    }
}

fn chunk_node(key: [u32; 8], flags: u32, chunk: &[u8], chunk_index: u64) -> Node {
    debug_assert!(chunk.len() <= CHUNK_LEN);
    let mut blocks: Vec<&[u8]> = chunk.chunks(BLOCK_LEN).collect();
    if blocks.is_empty() {
        blocks.push(&[]);
    }
    let (last, rest) = blocks.split_last().unwrap();
    let mut cv = key;
    for (i, block) in rest.iter().enumerate() {
        let start = if i == 0 { CHUNK_START } else { 0 };
        let out = compress(cv, le_words(block), chunk_index, BLOCK_LEN as u32, flags | start);
        cv.copy_from_slice(&out[..8]);
    }
    let start = if rest.is_empty() { CHUNK_START } else { 0 };
    Node {
        cv,
        m: le_words(last),
        counter: chunk_index,
        len: last.len() as u32,
        flags: flags | start | CHUNK_END,
    }
}

fn subtree_node(key: [u32; 8], flags: u32, input: &[u8], first_chunk: u64) -> Node {
    if input.len() <= CHUNK_LEN {
        return chunk_node(key, flags, input, first_chunk);
    }
    let chunks = (input.len() + CHUNK_LEN - 1) / CHUNK_LEN;
    // Largest power of two strictly less than `chunks`.
    let left_chunks = 1usize << (usize::BITS - 1 - (chunks - 1).leading_zeros());
    let (left, right) = input.split_at(left_chunks * CHUNK_LEN);
    let left_cv = subtree_node(key, flags, left, first_chunk).chaining_value();
    let right_first = first_chunk + left_chunks as u64;
    let right_cv = subtree_node(key, flags, right, right_first).chaining_value();
    let mut m = [0; 16];
    m[..8].copy_from_slice(&left_cv);
    m[8..].copy_from_slice(&right_cv);
    Node {
        cv: key,
        m,
        counter: 0,
        len: BLOCK_LEN as u32,
        flags: flags | PARENT,
    }
}

/// Buffers input until [`finalize`](Hasher::finalize).
pub struct Hasher {
    key: [u32; 8],
    flags: u32,
    input: Vec<u8>,
}

impl Hasher {
    fn with_key(key: [u32; 8], flags: u32) -> Self {
        Self {
            key,
            flags,
            input: Vec::new(),
        }
    }

    pub fn new() -> Self {
        Self::with_key(IV, 0)
    }

    pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
        Self::with_key(le_words(key), KEYED_HASH)
    }

    pub fn new_derive_key(context: &str) -> Self {
        let mut context_key = [0; KEY_LEN];
        let mut context_hasher = Self::with_key(IV, DERIVE_KEY_CONTEXT);
        context_hasher.update(context.as_bytes());
        context_hasher.finalize(&mut context_key);
        Self::with_key(le_words(&context_key), DERIVE_KEY_MATERIAL)
    }

    pub fn update(&mut self, input: &[u8]) {
        self.input.extend_from_slice(input);
    }

    /// Fill `out` with output bytes. Any length works, including zero.
    pub fn finalize(&self, out: &mut [u8]) {
        subtree_node(self.key, self.flags, &self.input, 0).write_root_output(out);
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

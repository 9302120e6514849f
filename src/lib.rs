//! [BLAKE3] in portable Rust: the default hash, a keyed hash for MACs, a key
//! derivation function, and output of any length from each of them.
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use blake3_engine::{Hasher, Mode};
//!
//! // One call for input that's already in memory...
//! let digest = blake3_engine::hash(b"hello, world");
//!
//! // ...or a Hasher for input that arrives in pieces. How the input is split
//! // up doesn't matter.
//! let mut hasher = Hasher::new();
//! for piece in [&b"hello"[..], b", ", b"world"] {
//!     hasher.update(piece);
//! }
//! assert_eq!(hasher.finalize(), digest);
//!
//! // Any amount of output. The first 32 bytes are the regular digest.
//! let mut long = [0; 200];
//! hasher.finalize_xof().fill(&mut long);
//! assert_eq!(digest, long[..32]);
//!
//! // Keys read at runtime are checked for length instead of panicking.
//! let key = [0x2a; 32];
//! let tag = Hasher::with_mode(Mode::KeyedHash(&key))?.update(b"msg").finalize();
//! assert_eq!(tag, blake3_engine::try_keyed_hash(&key, b"msg")?);
//! assert!(blake3_engine::try_keyed_hash(&key[..20], b"msg").is_err());
//!
//! println!("{}", digest); // 64 lowercase hex digits
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `std`, on by default: [`std::io::Write`] for [`Hasher`],
//!   [`std::io::Read`] and [`std::io::Seek`] for [`OutputReader`], and
//!   [`Hasher::finalize_vec`]. Turning it off makes the crate `no_std`, and
//!   it never allocates.
//! - `traits-preview`: the RustCrypto [`digest`] traits, with that crate
//!   re-exported as `traits::digest`. Its API isn't stable yet, so this
//!   feature is exempt from SemVer.
//! - `zeroize`: `Zeroize` for [`Hash`], [`Hasher`] and [`OutputReader`].
//!
//! Hashers log through [`tracing`] at debug and trace level when they are
//! built, reset or finalized, and when an output reader moves. Keys,
//! chaining values and output never appear in those events.
//!
//! [BLAKE3]: https://github.com/BLAKE3-team/BLAKE3-specs
//! [`digest`]: https://docs.rs/digest
//! [`tracing`]: https://docs.rs/tracing

#![cfg_attr(not(feature = "std"), no_std)]


// Chunk and parent chaining values for callers that build their own trees.
// Not covered by SemVer.
#[doc(hidden)]
pub mod guts;

#[cfg(feature = "traits-preview")]
pub mod traits;

mod chunk;
mod error;
mod hash;
mod mode;
mod output;
mod portable;
mod tree;

pub use crate::error::{Error, HexError};
pub use crate::hash::Hash;
pub use crate::mode::Mode;
pub use crate::output::OutputReader;

use crate::chunk::ChunkState;
use crate::output::Output;
use crate::tree::CvStack;
use core::fmt;
use core::mem;

/// Length of a [`Hash`] and of the default output in every mode.
pub const OUT_LEN: usize = 32;

/// Keyed mode takes exactly this many key bytes.
pub const KEY_LEN: usize = 32;

// The CV stack never holds more than one entry per bit of the chunk counter,
// and 2^54 chunks of 1024 bytes covers every u64 byte count.
const MAX_DEPTH: usize = 54;

// Exported for the benches and the test vector crate.
#[doc(hidden)]
pub const BLOCK_LEN: usize = 64;
#[doc(hidden)]
pub const CHUNK_LEN: usize = 1024;

type CVWords = [u32; 8];
type CVBytes = [u8; 32]; // little-endian

const IV: &CVWords = &[
    0x6A09E667, 0xBB67AE85, 0x3C6EF372, 0xA54FF53A, 0x510E527F, 0x9B05688C, 0x1F83D9AB, 0x5BE0CD19,
];

// Row r is the message permutation applied r times to the identity.
const MSG_SCHEDULE: [[usize; 16]; 7] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8],
    [3, 4, 10, 12, 13, 2, 7, 14, 6, 5, 9, 0, 11, 15, 8, 1],
    [10, 7, 12, 9, 14, 3, 13, 15, 4, 0, 11, 2, 5, 8, 1, 6],
    [12, 13, 9, 11, 15, 10, 14, 8, 7, 2, 5, 3, 0, 1, 6, 4],
    [9, 14, 11, 5, 8, 12, 15, 1, 13, 3, 0, 10, 2, 6, 4, 7],
    [11, 15, 5, 0, 1, 9, 8, 6, 14, 10, 2, 12, 3, 4, 7, 13],
];

// Domain bits for the last word of every compression. Each says where the
// block sits in the tree, or which mode is running.
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct Flags: u8 {
        const CHUNK_START = 1 << 0;
        const CHUNK_END = 1 << 1;
        const PARENT = 1 << 2;
        const ROOT = 1 << 3;
        const KEYED_HASH = 1 << 4;
        const DERIVE_KEY_CONTEXT = 1 << 5;
        const DERIVE_KEY_MATERIAL = 1 << 6;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}

#[cfg(feature = "zeroize")]
impl zeroize::DefaultIsZeroes for Flags {}

// The 64-bit counter occupies two state words, low half first.
fn counter_low(counter: u64) -> u32 {
    (counter & 0xffff_ffff) as u32
}

fn counter_high(counter: u64) -> u32 {
    (counter >> 32) as u32
}

// The one-shot functions are a Hasher that lives for one update. There is
// no separate all-at-once path to keep in sync with it.
fn hash_all_at_once(input: &[u8], key: &CVWords, flags: Flags) -> Output {
    let mut hasher = Hasher::new_internal(key, flags);
    hasher.update(input);
    hasher.final_output()
}

/// Hash `input` in the default, unkeyed mode and return the 32-byte digest.
///
/// Same result as [`Hasher::new`] followed by any sequence of
/// [`Hasher::update`] calls covering `input`. For other output lengths use
/// [`hash_into`].
pub fn hash(input: &[u8]) -> Hash {
    hash_all_at_once(input, IV, Flags::empty()).root_hash()
}

/// Hash `input` in the default mode and fill all of `out`. A 32-byte `out`
/// receives exactly the bytes of [`hash`], and longer outputs extend it.
pub fn hash_into(input: &[u8], out: &mut [u8]) {
    OutputReader::new(hash_all_at_once(input, IV, Flags::empty())).fill(out);
}

/// Hash `input` under a 32-byte secret key, giving a MAC tag.
///
/// Check tags by comparing [`Hash`] values, which is constant-time, never by
/// comparing the raw bytes. If the key is a slice whose length hasn't been
/// checked, call [`try_keyed_hash`] instead.
pub fn keyed_hash(key: &[u8; KEY_LEN], input: &[u8]) -> Hash {
    hash_all_at_once(input, &mode::keyed_words(key), Flags::KEYED_HASH).root_hash()
}

/// [`keyed_hash`] with output of any length, filling all of `out`.
pub fn keyed_hash_into(key: &[u8; KEY_LEN], input: &[u8], out: &mut [u8]) {
    let output = hash_all_at_once(input, &mode::keyed_words(key), Flags::KEYED_HASH);
    OutputReader::new(output).fill(out);
}

/// [`keyed_hash`] with a key of any length. Fails with
/// [`Error::InvalidKeySize`] unless the key is [`KEY_LEN`] bytes.
pub fn try_keyed_hash(key: &[u8], input: &[u8]) -> Result<Hash, Error> {
    let key = error::check_key(key)?;
    Ok(keyed_hash(key, input))
}

/// Derive a 32-byte subkey from `key_material`, separated by `context`.
///
/// Two steps run here. The context string is hashed on its own with
/// context-only domain flags, and that hash becomes the key for hashing the
/// material with material-only flags. Different contexts therefore give
/// unrelated subkeys from the same material, and no subkey can collide with
/// a plain or keyed hash of the material.
///
/// The context should be a string constant that names the application and
/// the purpose, and never changes, for example
/// `"acme-backup 2024-03-01 14:02:11 chunk encryption key"`. It must not
/// depend on runtime data; put that in `key_material`.
///
/// This is a KDF for keys that are already uniformly random. It is not a
/// password hash.
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; OUT_LEN] {
    let key_words = mode::context_key_words(context);
    let output = hash_all_at_once(key_material, &key_words, Flags::DERIVE_KEY_MATERIAL);
    output.root_hash().into()
}

/// [`derive_key`] with a subkey of any length, filling all of `out`.
pub fn derive_key_into(context: &str, key_material: &[u8], out: &mut [u8]) {
    let key_words = mode::context_key_words(context);
    let output = hash_all_at_once(key_material, &key_words, Flags::DERIVE_KEY_MATERIAL);
    OutputReader::new(output).fill(out);
}

/// Streaming BLAKE3 in one of the three [`Mode`]s.
///
/// Feed input with [`update`](Hasher::update) in pieces of any size. The
/// result only depends on the concatenated bytes, never on where the breaks
/// fell. The finalize methods borrow the hasher, so it stays usable: more
/// input can follow and be finalized again.
///
/// ```
/// use blake3_engine::Hasher;
///
/// let mut hasher = Hasher::new_derive_key("example.com 2024 session keys v1");
/// hasher.update(b"input key material");
/// let mut session_keys = [0; 64];
/// hasher.finalize_into(&mut session_keys);
///
/// hasher.update(b" and some more");
/// assert_ne!(hasher.finalize(), session_keys[..32]);
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub struct Hasher {
    key: CVWords,
    chunk_state: ChunkState,
    cv_stack: CvStack,
}

impl Hasher {
    fn new_internal(key: &CVWords, flags: Flags) -> Self {
        Self {
            key: *key,
            chunk_state: ChunkState::new(key, 0, flags),
            cv_stack: CvStack::new(),
        }
    }

    /// A hasher for the default, unkeyed mode, the streaming form of
    /// [`hash`].
    pub fn new() -> Self {
        tracing::debug!(mode = Mode::Hash.name(), "constructed hasher");
        Self::new_internal(IV, Flags::empty())
    }

    /// A MAC hasher, the streaming form of [`keyed_hash`].
    pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
        tracing::debug!(mode = Mode::KeyedHash(key).name(), "constructed hasher");
        Self::new_internal(&mode::keyed_words(key), Flags::KEYED_HASH)
    }

    /// [`new_keyed`](Hasher::new_keyed) for a key that might be the wrong
    /// length. Anything other than [`KEY_LEN`] bytes gives
    /// [`Error::InvalidKeySize`].
    pub fn new_keyed_from_slice(key: &[u8]) -> Result<Self, Error> {
        Self::with_mode(Mode::KeyedHash(key))
    }

    /// A key derivation hasher, the streaming form of [`derive_key`]. The
    /// context string is hashed here, once.
    pub fn new_derive_key(context: &str) -> Self {
        tracing::debug!(mode = Mode::DeriveKey(context).name(), "constructed hasher");
        Self::new_internal(&mode::context_key_words(context), Flags::DERIVE_KEY_MATERIAL)
    }

    /// A hasher for a mode chosen at runtime. The only failure is a
    /// [`Mode::KeyedHash`] key that isn't [`KEY_LEN`] bytes.
    pub fn with_mode(mode: Mode) -> Result<Self, Error> {
        let (key_words, flags) = mode.key_words_and_flags()?;
        tracing::debug!(mode = mode.name(), "constructed hasher");
        Ok(Self::new_internal(&key_words, flags))
    }

    /// Drop all input so far. The mode, including any key or derived
    /// context key, stays.
    pub fn reset(&mut self) -> &mut Self {
        tracing::trace!(count = self.count(), "resetting hasher");
        self.chunk_state = ChunkState::new(&self.key, 0, self.chunk_state.flags);
        self.cv_stack.clear();
        self
    }

    // Only called when more input is waiting, so the chunk being retired is
    // never the root and its chaining value is final.
    fn retire_full_chunk(&mut self) {
        let flags = self.chunk_state.flags;
        let next = ChunkState::new(&self.key, self.chunk_state.chunk_counter + 1, flags);
        let full = mem::replace(&mut self.chunk_state, next);
        self.cv_stack.push_chunk_cv(&full.output().chaining_value(), &self.key, flags);
    }

    /// Absorb more input. Returns `self` so calls can be chained.
    pub fn update(&mut self, mut input: &[u8]) -> &mut Self {
        while !input.is_empty() {
            if self.chunk_state.len() == CHUNK_LEN {
                self.retire_full_chunk();
            }
            let room = CHUNK_LEN - self.chunk_state.len();
            let (head, tail) = input.split_at(room.min(input.len()));
            self.chunk_state.update(head);
            input = tail;
        }
        debug_assert_eq!(self.cv_stack.chunks(), self.chunk_state.chunk_counter);
        self
    }

    fn final_output(&self) -> Output {
        tracing::trace!(
            count = self.count(),
            stack_depth = self.cv_stack.len(),
            "finalizing"
        );
        self.cv_stack
            .root_output(self.chunk_state.output(), &self.key, self.chunk_state.flags)
    }

    /// The 32-byte result for everything absorbed so far. The hasher is left
    /// as it was.
    pub fn finalize(&self) -> Hash {
        self.final_output().root_hash()
    }

    /// A reader over the extended output for everything absorbed so far.
    /// The hasher is left as it was, and the reader doesn't borrow it.
    pub fn finalize_xof(&self) -> OutputReader {
        OutputReader::new(self.final_output())
    }

    /// Fill all of `out` with output, starting at offset 0.
    pub fn finalize_into(&self, out: &mut [u8]) {
        self.finalize_xof().fill(out);
    }

    /// The first `len` bytes of output, in a new `Vec`.
    #[cfg(feature = "std")]
    pub fn finalize_vec(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        self.finalize_into(&mut out);
        out
    }

    /// Bytes absorbed since construction or the last [`reset`](Hasher::reset).
    pub fn count(&self) -> u64 {
        let finished_chunks = self.chunk_state.chunk_counter;
        finished_chunks * CHUNK_LEN as u64 + self.chunk_state.len() as u64
    }
}

// Only the mode flags and the byte count. Everything else is key-dependent.
impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("flags", &self.chunk_state.flags)
            .field("count", &self.count())
            .finish()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets a `Hasher` sit at the end of [`std::io::copy`]. Every write is
/// accepted in full, and flushing does nothing.
#[cfg(feature = "std")]
impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Hasher::update(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

//! The mode selector.
//!
//! A mode boils down to two things: the key words that seed every chunk and
//! parent compression, and the domain flag set on every block.

use crate::error::{check_key, Error};
use crate::{hash_all_at_once, portable, CVWords, Flags, IV, KEY_LEN};
use core::fmt;

/// The three ways to configure a [`Hasher`](crate::Hasher).
///
/// # Examples
///
/// ```
/// use blake3_engine::{Hasher, Mode};
///
/// let mut hasher = Hasher::with_mode(Mode::KeyedHash(&[42; 32]))?;
/// hasher.update(b"foo");
/// assert_eq!(hasher.finalize(), blake3_engine::keyed_hash(&[42; 32], b"foo"));
///
/// // Keys that aren't exactly 32 bytes are rejected.
/// assert!(Hasher::with_mode(Mode::KeyedHash(b"too short")).is_err());
/// # Ok::<(), blake3_engine::Error>(())
/// ```
#[derive(Clone, Copy)]
pub enum Mode<'a> {
    /// The default, unkeyed hash function.
    Hash,
    /// The keyed hash function, a MAC. The key must be exactly
    /// [`KEY_LEN`](crate::KEY_LEN) bytes.
    KeyedHash(&'a [u8]),
    /// The key derivation function, with the given context string. The
    /// context string should be hardcoded, globally unique, and
    /// application-specific.
    DeriveKey(&'a str),
}

impl Mode<'_> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Mode::Hash => "hash",
            Mode::KeyedHash(_) => "keyed_hash",
            Mode::DeriveKey(_) => "derive_key",
        }
    }

    /// Resolve the mode into key words and flags. Key derivation hashes the
    /// context string here, once, so the result can be reused by reset().
    pub(crate) fn key_words_and_flags(&self) -> Result<(CVWords, Flags), Error> {
        match *self {
            Mode::Hash => Ok((*IV, Flags::empty())),
            Mode::KeyedHash(key) => {
                let key = check_key(key)?;
                Ok((keyed_words(key), Flags::KEYED_HASH))
            }
            Mode::DeriveKey(context) => {
                Ok((context_key_words(context), Flags::DERIVE_KEY_MATERIAL))
            }
        }
    }
}

// Don't derive(Debug), because keys are secret.
impl fmt::Debug for Mode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Hash => f.write_str("Hash"),
            Mode::KeyedHash(_) => f.write_str("KeyedHash(..)"),
            Mode::DeriveKey(context) => f.debug_tuple("DeriveKey").field(context).finish(),
        }
    }
}

pub(crate) fn keyed_words(key: &[u8; KEY_LEN]) -> CVWords {
    portable::cv_from_bytes(key)
}

// The first phase of key derivation: hash the context string with the
// DERIVE_KEY_CONTEXT flag, and use the result as the key for the material.
pub(crate) fn context_key_words(context: &str) -> CVWords {
    tracing::debug!(context_len = context.len(), "hashing derive_key context");
    let context_output = hash_all_at_once(context.as_bytes(), IV, Flags::DERIVE_KEY_CONTEXT);
    portable::cv_from_bytes(context_output.root_hash().as_bytes())
}

use crate::KEY_LEN;

/// The error type for constructing a keyed [`Hasher`](crate::Hasher) from an
/// untyped key.
///
/// This is the only way a hashing operation can fail. Callers who already
/// hold a `&[u8; 32]` can use [`Hasher::new_keyed`](crate::Hasher::new_keyed)
/// or [`keyed_hash`](crate::keyed_hash) and never see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The key was not exactly [`KEY_LEN`] bytes long. Carries the length
    /// that was received.
    #[error("invalid key size: expected 32 bytes, received {0}")]
    InvalidKeySize(usize),
}

pub(crate) fn check_key(key: &[u8]) -> Result<&[u8; KEY_LEN], Error> {
    key.try_into().map_err(|_| Error::InvalidKeySize(key.len()))
}

/// The error type for [`Hash::from_hex`](crate::Hash::from_hex).
///
/// The `.to_string()` representation of this error currently distinguishes
/// between bad length errors and bad character errors. This is to help with
/// logging and debugging, but it isn't a stable API detail, and it may change
/// at any time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum HexError {
    #[error("invalid hex character: {0:?}")]
    InvalidChar(char),
    #[error("invalid hex character: 0x{0:x}")]
    InvalidByte(u8),
    #[error("expected 64 hex bytes, received {0}")]
    InvalidLen(usize),
}

impl HexError {
    pub(crate) fn bad_byte(byte: u8) -> Self {
        if byte < 128 {
            HexError::InvalidChar(byte as char)
        } else {
            HexError::InvalidByte(byte)
        }
    }
}

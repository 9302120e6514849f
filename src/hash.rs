//! The 32-byte digest type.

use crate::{HexError, OUT_LEN};
use arrayvec::ArrayString;
use core::fmt;

/// A 32-byte BLAKE3 output, as returned by [`hash`](crate::hash),
/// [`keyed_hash`](crate::keyed_hash) and [`Hasher::finalize`].
///
/// Comparing two `Hash`es, or a `Hash` and a byte array, takes the same time
/// wherever the first difference is. This matters when a `Hash` is a MAC tag
/// that an attacker can recover byte by byte. Plain `[u8; 32]` comparison has
/// no such guarantee, so `Hash` deliberately has no `Deref` or `AsRef`
/// impls that would let the bytes be compared without noticing. Use
/// [`as_bytes`](Hash::as_bytes) or `Into<[u8; 32]>` to get the raw bytes on
/// purpose.
///
/// The `Display` and `FromStr` impls use lowercase hex, the same as
/// [`to_hex`](Hash::to_hex) and [`from_hex`](Hash::from_hex).
///
/// [`Hasher::finalize`]: crate::Hasher::finalize
#[derive(Clone, Copy, Hash)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub struct Hash([u8; OUT_LEN]);

fn hex_digit(nibble: u8) -> char {
    debug_assert!(nibble < 16);
    let ascii = match nibble {
        0..=9 => b'0' + nibble,
        _ => b'a' + (nibble - 10),
    };
    ascii as char
}

fn nibble(byte: u8) -> Result<u8, HexError> {
    (byte as char)
        .to_digit(16)
        .map(|value| value as u8)
        .ok_or_else(|| HexError::bad_byte(byte))
}

impl Hash {
    /// Borrow the bytes. Comparisons on the result are not constant-time.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; OUT_LEN] {
        &self.0
    }

    /// Wrap 32 raw bytes.
    pub const fn from_bytes(bytes: [u8; OUT_LEN]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex, in a fixed-size [`ArrayString`] that never touches the
    /// heap. Comparing the returned string is not constant-time.
    pub fn to_hex(&self) -> ArrayString<{ 2 * OUT_LEN }> {
        let mut hex = ArrayString::new();
        for byte in self.0 {
            hex.push(hex_digit(byte >> 4));
            hex.push(hex_digit(byte & 0x0f));
        }
        hex
    }

    /// Parse exactly 64 hex digits, upper or lower case. `"..".parse()`
    /// does the same thing.
    pub fn from_hex(hex: impl AsRef<[u8]>) -> Result<Self, HexError> {
        let hex = hex.as_ref();
        if hex.len() != 2 * OUT_LEN {
            return Err(HexError::InvalidLen(hex.len()));
        }
        let mut bytes = [0; OUT_LEN];
        for (byte, digits) in bytes.iter_mut().zip(hex.chunks_exact(2)) {
            *byte = (nibble(digits[0])? << 4) | nibble(digits[1])?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; OUT_LEN]> for Hash {
    #[inline]
    fn from(bytes: [u8; OUT_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; OUT_LEN] {
    #[inline]
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl core::str::FromStr for Hash {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, HexError> {
        Self::from_hex(s)
    }
}

// All three comparisons end up in constant_time_eq. Only the slice version
// can return early, on a length mismatch, which isn't secret.
impl PartialEq<[u8; OUT_LEN]> for Hash {
    #[inline]
    fn eq(&self, other: &[u8; OUT_LEN]) -> bool {
        constant_time_eq::constant_time_eq_32(&self.0, other)
    }
}

impl PartialEq for Hash {
    #[inline]
    fn eq(&self, other: &Hash) -> bool {
        *self == other.0
    }
}

impl PartialEq<[u8]> for Hash {
    #[inline]
    fn eq(&self, other: &[u8]) -> bool {
        constant_time_eq::constant_time_eq(&self.0, other)
    }
}

impl Eq for Hash {}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hash({:?})", self.to_hex().as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hex_digits() {
        let mut digits = ArrayString::<16>::new();
        for n in 0..16 {
            digits.push(hex_digit(n));
        }
        assert_eq!(digits.as_str(), "0123456789abcdef");
        for (i, c) in "0123456789abcdefABCDEF".bytes().enumerate() {
            let expected = if i < 16 { i } else { i - 6 };
            assert_eq!(nibble(c), Ok(expected as u8));
        }
        assert_eq!(nibble(b'g'), Err(HexError::InvalidChar('g')));
        assert_eq!(nibble(0xc3), Err(HexError::InvalidByte(0xc3)));
    }

    #[test]
    fn test_equality_against_bytes() {
        let bytes = [0xa5; OUT_LEN];
        let hash = Hash::from(bytes);
        assert!(hash == bytes);
        assert!(hash == bytes[..]);
        assert!(hash != bytes[..31]);
        let mut other = bytes;
        other[31] ^= 1;
        assert!(hash != other);
        assert!(hash != Hash::from(other));
    }
}

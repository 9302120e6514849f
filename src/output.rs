//! The output expander: root finalization and extendable output.

use crate::{portable, CVBytes, CVWords, Flags, Hash, BLOCK_LEN};
use core::fmt;

/// The last compression of a chunk or parent node, not yet run.
///
/// Without the ROOT flag it gives the node's chaining value. With it, the
/// same inputs give the final hash, and counting `counter` up from zero gives
/// as many 64-byte output blocks as anyone asks for.
#[derive(Clone)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub(crate) struct Output {
    pub(crate) cv: CVWords,
    pub(crate) block: [u8; BLOCK_LEN],
    pub(crate) block_len: u8,
    pub(crate) counter: u64,
    pub(crate) flags: Flags,
}

impl Output {
    fn compress_to_cv(&self, counter: u64, flags: Flags) -> CVWords {
        portable::compress_cv(&self.cv, &self.block, self.block_len, counter, flags)
    }

    pub(crate) fn chaining_value(&self) -> CVBytes {
        portable::cv_to_bytes(&self.compress_to_cv(self.counter, self.flags))
    }

    pub(crate) fn root_hash(&self) -> Hash {
        debug_assert_eq!(self.counter, 0);
        let cv = self.compress_to_cv(0, self.flags | Flags::ROOT);
        Hash::from_bytes(portable::cv_to_bytes(&cv))
    }

    fn root_block(&self, index: u64) -> [u8; BLOCK_LEN] {
        let flags = self.flags | Flags::ROOT;
        portable::compress_xof(&self.cv, &self.block, self.block_len, index, flags)
    }
}

/// A cursor over the extended output of a finalized [`Hasher`], from
/// [`Hasher::finalize_xof`].
///
/// The output stream is 2<sup>64</sup> bytes long and every 64-byte block of
/// it is computed on demand from its index. Jumping around with
/// [`set_position`](OutputReader::set_position) costs nothing, and readers
/// cloned or created from the same `Hasher` don't affect each other. The
/// first 32 bytes are the same as [`Hasher::finalize`], and reading N bytes
/// always gives a prefix of what reading more would give.
///
/// Nothing is cached between calls. A read that starts or ends in the middle
/// of a block recomputes that block, so loops should read multiples of 64
/// bytes where they can.
///
/// # Security notes
///
/// Reading fewer than 32 bytes gives a weaker hash: N bits of output give at
/// most N bits of preimage resistance and N/2 bits of collision resistance.
/// Reading more than 32 bytes doesn't make it any stronger than 256 bits.
///
/// [`Hasher`]: crate::Hasher
/// [`Hasher::finalize_xof`]: crate::Hasher::finalize_xof
/// [`Hasher::finalize`]: crate::Hasher::finalize
#[derive(Clone)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize))]
pub struct OutputReader {
    root: Output,
    position: u64,
}

impl OutputReader {
    pub(crate) fn new(root: Output) -> Self {
        // Chunk 0 and parent nodes both compress with counter 0, and the
        // root is always one of those.
        debug_assert_eq!(root.counter, 0);
        Self { root, position: 0 }
    }

    /// Write the next `buf.len()` output bytes into `buf` and move the
    /// position past them. Like `Read::read` without the `Result`, since
    /// this can't fail and always fills the whole buffer.
    ///
    /// Reading past byte 2<sup>64</sup>-1 wraps the position around to the
    /// start of the stream.
    pub fn fill(&mut self, buf: &mut [u8]) {
        let mut written = 0;
        while written < buf.len() {
            let offset = (self.position % BLOCK_LEN as u64) as usize;
            let block = self.root.root_block(self.position / BLOCK_LEN as u64);
            let n = (BLOCK_LEN - offset).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&block[offset..offset + n]);
            written += n;
            self.position = self.position.wrapping_add(n as u64);
        }
    }

    /// The offset of the next byte [`fill`](OutputReader::fill) will write.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to an absolute offset in the output stream. Like
    /// `Seek::seek(SeekFrom::Start(..))`, but infallible.
    pub fn set_position(&mut self, position: u64) {
        tracing::trace!(position, "output reader repositioned");
        self.position = position;
    }
}

// The position is public, the root node isn't.
impl fmt::Debug for OutputReader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OutputReader")
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(feature = "std")]
impl std::io::Read for OutputReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.fill(buf);
        Ok(buf.len())
    }
}

/// `SeekFrom::End` is an error, since the stream has no meaningful end.
/// Seeking before offset 0 is an error too, and relative seeks past the
/// last offset stop at `u64::MAX`. A failed seek leaves the position alone.
#[cfg(feature = "std")]
impl std::io::Seek for OutputReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        use std::io::{Error, ErrorKind, SeekFrom};

        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => match self.position.checked_add_signed(delta) {
                Some(target) => target,
                None if delta > 0 => u64::MAX,
                None => {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "seek before the start of the output",
                    ))
                }
            },
            SeekFrom::End(_) => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "extended output has no end to seek from",
                ))
            }
        };
        self.set_position(target);
        Ok(target)
    }
}

#[cfg(test)]
mod test {
    use crate::test::paint_test_input;
    use crate::Hasher;

    #[test]
    fn test_fill_in_odd_slices_matches_one_fill() {
        let mut input = [0; 3000];
        paint_test_input(&mut input);
        let hasher = Hasher::new().update(&input).clone();

        let mut expected = [0; 1000];
        hasher.finalize_xof().fill(&mut expected);

        let mut reader = hasher.finalize_xof();
        let mut actual = [0; 1000];
        let mut offset = 0;
        for len in [1, 7, 63, 64, 65, 128, 3].iter().cycle() {
            if offset == actual.len() {
                break;
            }
            let take = core::cmp::min(*len, actual.len() - offset);
            reader.fill(&mut actual[offset..][..take]);
            offset += take;
            assert_eq!(reader.position(), offset as u64);
        }
        assert_eq!(&expected[..], &actual[..]);
    }

    #[test]
    fn test_readers_are_independent() {
        let hasher = Hasher::new().update(b"independent readers").clone();
        let mut reader1 = hasher.finalize_xof();
        let mut reader2 = hasher.finalize_xof();

        let mut skipped = [0; 100];
        reader1.fill(&mut skipped);

        let mut out1 = [0; 50];
        let mut out2 = [0; 150];
        reader1.fill(&mut out1);
        reader2.fill(&mut out2);
        assert_eq!(&out1[..], &out2[100..]);
    }

    #[test]
    fn test_set_position_is_absolute() {
        let hasher = Hasher::new().update(b"foo").clone();
        let mut full = [0; 4 * 64];
        hasher.finalize_xof().fill(&mut full);

        let mut reader = hasher.finalize_xof();
        let mut scratch = [0; 17];
        reader.fill(&mut scratch);
        for &position in &[0u64, 1, 63, 64, 65, 130, 200] {
            reader.set_position(position);
            assert_eq!(reader.position(), position);
            let mut out = [0; 20];
            reader.fill(&mut out);
            assert_eq!(&full[position as usize..][..20], &out[..]);
        }
    }

    #[test]
    fn test_high_positions() {
        // Positions near the top of the u64 range are addressable, and their
        // output blocks still match reads that start at the block boundary.
        let hasher = Hasher::new().update(b"far away").clone();
        let last_block_start = u64::MAX - (u64::MAX % 64);

        let mut reader = hasher.finalize_xof();
        reader.set_position(last_block_start);
        let mut block = [0; 63];
        reader.fill(&mut block);
        assert_eq!(reader.position(), u64::MAX);

        let mut reader = hasher.finalize_xof();
        reader.set_position(last_block_start + 10);
        let mut tail = [0; 10];
        reader.fill(&mut tail);
        assert_eq!(&block[10..20], &tail[..]);
    }
}

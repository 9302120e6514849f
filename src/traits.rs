//! RustCrypto [`digest`] trait impls, behind the `traits-preview` feature.
//!
//! Through these traits a [`Hasher`] is either the unkeyed hash (`Digest`,
//! `ExtendableOutput`) or a MAC (`KeyInit`, `Mac`). Derive-key mode has no
//! trait constructor. Every trait `reset` goes through [`Hasher::reset`], so a
//! MAC keeps its key across resets.

pub use digest;

use crate::{Hasher, OutputReader, KEY_LEN};
use arrayref::array_ref;
use digest::crypto_common::{BlockSizeUser, KeySizeUser};
use digest::generic_array::typenum::{U32, U64};
use digest::{
    ExtendableOutput, ExtendableOutputReset, FixedOutput, FixedOutputReset, HashMarker,
    InvalidLength, Key, KeyInit, MacMarker, Output, OutputSizeUser, Reset, Update, XofReader,
};

impl OutputSizeUser for Hasher {
    type OutputSize = U32;
}

impl KeySizeUser for Hasher {
    type KeySize = U32;
}

impl BlockSizeUser for Hasher {
    type BlockSize = U64;
}

impl HashMarker for Hasher {}

impl MacMarker for Hasher {}

// The inherent methods are named the same as the trait methods below, so
// they're always called by path.

impl Update for Hasher {
    fn update(&mut self, data: &[u8]) {
        Hasher::update(self, data);
    }
}

impl Reset for Hasher {
    fn reset(&mut self) {
        Hasher::reset(self);
    }
}

impl FixedOutput for Hasher {
    fn finalize_into(self, out: &mut Output<Self>) {
        Hasher::finalize_into(&self, out);
    }
}

impl FixedOutputReset for Hasher {
    fn finalize_into_reset(&mut self, out: &mut Output<Self>) {
        Hasher::finalize_into(self, out);
        Hasher::reset(self);
    }
}

impl ExtendableOutput for Hasher {
    type Reader = OutputReader;

    fn finalize_xof(self) -> OutputReader {
        Hasher::finalize_xof(&self)
    }
}

impl ExtendableOutputReset for Hasher {
    fn finalize_xof_reset(&mut self) -> OutputReader {
        let reader = Hasher::finalize_xof(self);
        Hasher::reset(self);
        reader
    }
}

impl XofReader for OutputReader {
    fn read(&mut self, buffer: &mut [u8]) {
        self.fill(buffer);
    }
}

impl KeyInit for Hasher {
    fn new(key: &Key<Self>) -> Self {
        Hasher::new_keyed(array_ref!(key, 0, KEY_LEN))
    }

    fn new_from_slice(key: &[u8]) -> Result<Self, InvalidLength> {
        Hasher::new_keyed_from_slice(key).map_err(|_| InvalidLength)
    }
}

//! Hash functions mapping peer addresses and lookup keys onto integers.
//!
//! The ring treats the hash as an injected pure function, anything implementing
//! [HashFn] works, including plain closures `Fn(&T) -> u64`.

use crc::{Crc, CRC_32_ISCSI};
use sha1_smol::Sha1;

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// A deterministic hash from `T` to an integer.
///
/// The output is reduced into the identifier space by the caller.
pub trait HashFn<T: ?Sized> {
    fn hash(&self, input: &T) -> u64;
}

impl<T: ?Sized, F> HashFn<T> for F
where
    F: Fn(&T) -> u64,
{
    fn hash(&self, input: &T) -> u64 {
        self(input)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// SHA-1 of the input bytes, keeping the first 8 bytes of the digest (big-endian).
pub struct Sha1Hash;

impl<T: AsRef<[u8]> + ?Sized> HashFn<T> for Sha1Hash {
    fn hash(&self, input: &T) -> u64 {
        let mut hasher = Sha1::new();
        hasher.update(input.as_ref());

        let digest = hasher.digest().bytes();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        u64::from_be_bytes(prefix)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// CRC-32 (Castagnoli) of the input bytes. Cheap, only fills the low 32 bits.
pub struct Crc32Hash;

impl<T: AsRef<[u8]> + ?Sized> HashFn<T> for Crc32Hash {
    fn hash(&self, input: &T) -> u64 {
        CASTAGNOLI.checksum(input.as_ref()).into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Uses unsigned integers as their own hash.
///
/// Handy for tests and for callers that already hold identifiers.
pub struct IdentityHash;

impl<T: Copy + Into<u64>> HashFn<T> for IdentityHash {
    fn hash(&self, input: &T) -> u64 {
        (*input).into()
    }
}

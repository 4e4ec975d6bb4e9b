//! Hash functions applied to canonical k-mers
//!
//! Constants chosen by testing different digits of pi;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const KEY1: u64 = 0xe121_19c4_114f_22a7; // = 0x4528_21e6_38d0_1377 ^ 0xa409_3822_299f_31d0;
const KEY2: u32 = 0x60e5; //(0xbe54_66cf_34e9_0c6c ^ 0x082e_fa98_ec4e_6c89) & 63;

/// Seed of the murmur3 hash, sketches are only comparable with the same seed
pub const HASH_SEED: u64 = 42;

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum HashAlgorithms {
    /// Murmur3 x64 128 (first word), seed 42
    #[default]
    Murmur3,
    Xxhash,
    /// Folded multiply over the 2-bit packed kmer, kmers <= 32
    Ahash,
}

impl HashAlgorithms {
    /// Seed echoed in signatures, only murmur3 is seeded
    pub fn seed(&self) -> u64 {
        match self {
            HashAlgorithms::Murmur3 => HASH_SEED,
            _ => 0,
        }
    }
}

// Standard xxhash function for all sizes
#[inline]
pub fn xxhash3(kmer: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(kmer)
}

// Specialized hash function for packed kmers <= 32
// Simplified version of ahash-fallback from the ahash crate
#[inline]
pub fn ahash(kmer: u64) -> u64 {
    let temp = (kmer ^ KEY1) as u128 * 6364136223846793005_u128;
    let temp2 = ((temp & 0xffff_ffff_ffff_ffff) as u64) ^ ((temp >> 64) as u64); // XOR the lower 64 bits with the upper 64 bits.
    temp2.rotate_left(KEY2)
}

// Faster version of murmur3 with equivalent output, keeps the first 64 bit word
#[inline]
pub fn murmur3(kmer: &[u8]) -> u64 {
    fastmurmur3::murmur3_x64_128(kmer, HASH_SEED) as u64
}

/// Packs an uppercase ACGT kmer into 2 bits per base (A=0, C=1, G=2, T=3)
#[inline]
pub fn pack_kmer(kmer: &[u8]) -> u64 {
    kmer.iter().fold(0u64, |acc, base| {
        let code = match base {
            b'C' => 1,
            b'G' => 2,
            b'T' => 3,
            _ => 0,
        };
        (acc << 2) | code
    })
}

/// Stores a function pointer to a hash function
#[derive(Clone, Copy)]
pub enum Function {
    Bytes(fn(&[u8]) -> u64),
    Packed(fn(u64) -> u64),
}

impl Function {
    pub fn from_alg(algo: HashAlgorithms) -> Self {
        match algo {
            HashAlgorithms::Murmur3 => Function::Bytes(murmur3),
            HashAlgorithms::Xxhash => Function::Bytes(xxhash3),
            HashAlgorithms::Ahash => Function::Packed(ahash),
        }
    }

    #[inline]
    pub fn hash(&self, kmer: &[u8]) -> u64 {
        match self {
            Function::Bytes(f) => f(kmer),
            Function::Packed(f) => f(pack_kmer(kmer)),
        }
    }
}

//! Bloom filter used to drop kmers that were only seen once
//!
//! The bit set is a vector of atomic words so a single filter can be shared
//! by all workers of a run. Probe positions are derived from the kmer hash by
//! double hashing, the second hash is a remix of the first.
use crate::error::ConfigError;
use crate::hash_functions::ahash;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const WORD_BITS: u64 = u64::BITS as u64;
const MAX_HASHES: u32 = 64;
/// Largest table whose bit count fits a u64 and whose words fit one allocation
const MAX_WORDS: u64 = {
    let by_bits = u64::MAX / WORD_BITS;
    let by_alloc = isize::MAX as u64 / (WORD_BITS / 8);
    if by_bits < by_alloc {
        by_bits
    } else {
        by_alloc
    }
};

/// Result of [`BloomFilter::test_and_insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    NotSeenBefore,
    /// All probes were set, possibly a false positive
    SeenBefore,
}

/// Size of the bit array and number of probes for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSizing {
    pub bits: u64,
    pub hashes: u32,
    pub expected_items: u64,
    /// The memory ceiling forced a smaller table than the target rate needs
    pub clamped: bool,
}

impl BloomSizing {
    pub fn compute(
        expected_items: u64,
        false_positive_rate: f64,
        memory_ceiling: u64,
    ) -> Result<Self, ConfigError> {
        if expected_items == 0 {
            return Err(ConfigError::InvalidGenomeSize);
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(ConfigError::InvalidFalsePositiveRate(false_positive_rate));
        }
        let max_words = memory_ceiling / (WORD_BITS / 8);
        if max_words == 0 {
            return Err(ConfigError::MemoryCeilingTooSmall(memory_ceiling));
        }
        let max_words = max_words.min(MAX_WORDS);

        // m = -n * ln(p) / ln(2)^2
        let ln2 = std::f64::consts::LN_2;
        let optimal_bits =
            (-(expected_items as f64) * false_positive_rate.ln() / (ln2 * ln2)).ceil();
        let optimal_words = (optimal_bits / WORD_BITS as f64).ceil().max(1.0);
        let (words, clamped) = if optimal_words > max_words as f64 {
            (max_words, true)
        } else {
            (optimal_words as u64, false)
        };
        let bits = words * WORD_BITS;

        // k = m / n * ln(2), recomputed for the (possibly clamped) table
        let hashes = ((bits as f64 / expected_items as f64) * ln2)
            .round()
            .clamp(1.0, MAX_HASHES as f64) as u32;

        Ok(BloomSizing {
            bits,
            hashes,
            expected_items,
            clamped,
        })
    }

    pub fn bytes(&self) -> u64 {
        self.bits / 8
    }

    /// (1 - e^(-kn/m))^k for the expected number of items
    pub fn expected_false_positive_rate(&self) -> f64 {
        let k = self.hashes as f64;
        let exponent = -k * self.expected_items as f64 / self.bits as f64;
        (1.0 - exponent.exp()).powf(k)
    }
}

pub struct BloomFilter {
    words: Vec<AtomicU64>,
    bits: u64,
    hashes: u32,
}

impl BloomFilter {
    pub fn new(sizing: BloomSizing) -> Self {
        let num_words = (sizing.bits / WORD_BITS) as usize;
        debug!(
            bits = sizing.bits,
            hashes = sizing.hashes,
            bytes = sizing.bytes(),
            "Allocating bloom filter"
        );
        BloomFilter {
            words: (0..num_words).map(|_| AtomicU64::new(0)).collect(),
            bits: sizing.bits,
            hashes: sizing.hashes,
        }
    }

    pub fn with_target(
        expected_items: u64,
        false_positive_rate: f64,
        memory_ceiling: u64,
    ) -> Result<Self, ConfigError> {
        let sizing = BloomSizing::compute(expected_items, false_positive_rate, memory_ceiling)?;
        if sizing.clamped {
            warn!(
                memory_ceiling,
                expected_false_positive_rate = sizing.expected_false_positive_rate(),
                target = false_positive_rate,
                "Bloom filter limited by memory ceiling, false positive rate will be higher"
            );
        }
        Ok(BloomFilter::new(sizing))
    }

    /// Sets all probe positions of `hash`, returns `SeenBefore` if all of
    /// them were already set.
    #[inline]
    pub fn test_and_insert(&self, hash: u64) -> Admission {
        let step = ahash(hash) | 1;
        let mut all_set = true;
        for i in 0..self.hashes as u64 {
            let bit = hash.wrapping_add(i.wrapping_mul(step)) % self.bits;
            let mask = 1u64 << (bit % WORD_BITS);
            let previous = self.words[(bit / WORD_BITS) as usize].fetch_or(mask, Ordering::Relaxed);
            all_set &= previous & mask != 0;
        }
        if all_set {
            Admission::SeenBefore
        } else {
            Admission::NotSeenBefore
        }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.words.len() as u64 * (WORD_BITS / 8)
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("bits", &self.bits)
            .field("hashes", &self.hashes)
            .finish()
    }
}

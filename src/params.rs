use crate::bloom::BloomSizing;
use crate::error::ConfigError;
use crate::hash_functions::HashAlgorithms;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Parameters of one sketching run, immutable once the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub kmer_size: u8,
    pub sketch_size: usize,
    pub canonical: bool,
    /// All records of all inputs go into a single sketch
    pub concatenated: bool,
    /// Only admit kmers seen at least twice (requires `concatenated`)
    pub use_bloom_filter: bool,
    /// Expected number of distinct kmers, sizes the bloom filter
    pub genome_size_hint: u64,
    /// Upper bound for the bloom filter allocation
    pub memory_ceiling_bytes: u64,
    pub bloom_false_positive_rate: f64,
    /// Windowed sketching, one sketch per window of each record
    pub window_size: Option<u64>,
    pub algorithm: HashAlgorithms,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            kmer_size: 21,
            sketch_size: 1000,
            canonical: true,
            concatenated: false,
            use_bloom_filter: false,
            genome_size_hint: 5_000_000_000,
            memory_ceiling_bytes: 1 << 30,
            bloom_false_positive_rate: 0.001,
            window_size: None,
            algorithm: HashAlgorithms::default(),
        }
    }
}

impl Parameters {
    /// Checks all invariants and returns the grouping to sketch with
    pub fn validate(&self) -> Result<Grouping, ConfigError> {
        if self.kmer_size == 0 {
            return Err(ConfigError::InvalidKmerSize);
        }
        if self.sketch_size == 0 {
            return Err(ConfigError::InvalidSketchSize);
        }
        if self.algorithm == HashAlgorithms::Ahash && self.kmer_size > 32 {
            return Err(ConfigError::KmerTooLongForHash(self.kmer_size));
        }
        if self.use_bloom_filter {
            if !self.concatenated {
                return Err(ConfigError::BloomRequiresConcatenation);
            }
            self.bloom_sizing()?;
        }
        match (self.concatenated, self.window_size) {
            (true, Some(_)) => Err(ConfigError::IncompatibleGrouping),
            (true, None) => Ok(Grouping::Concatenated),
            (false, Some(0)) => Err(ConfigError::InvalidWindowSize),
            (false, Some(size)) => Ok(Grouping::Windowed { size }),
            (false, None) => Ok(Grouping::PerSequence),
        }
    }

    pub fn bloom_sizing(&self) -> Result<BloomSizing, ConfigError> {
        BloomSizing::compute(
            self.genome_size_hint,
            self.bloom_false_positive_rate,
            self.memory_ceiling_bytes,
        )
    }
}

/// Decides which sketch unit a kmer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One unit per record name
    PerSequence,
    /// One unit for everything
    Concatenated,
    /// One unit per `size` kmer start positions of each record
    Windowed { size: u64 },
}

impl Grouping {
    /// Units a record of `length` bases contributes to, as (key, bases covered)
    pub fn unit_keys<'a>(
        &self,
        record_name: &'a str,
        collection_name: &'a str,
        length: u64,
    ) -> Vec<(Cow<'a, str>, u64)> {
        match self {
            Grouping::PerSequence => vec![(Cow::Borrowed(record_name), length)],
            Grouping::Concatenated => vec![(Cow::Borrowed(collection_name), length)],
            Grouping::Windowed { size } => (0..length.div_ceil(*size))
                .map(|window| {
                    let covered = (length - window * size).min(*size);
                    (Cow::Owned(format!("{record_name}:{window}")), covered)
                })
                .collect(),
        }
    }

    /// Index into [`Grouping::unit_keys`] for a kmer starting at `start`
    #[inline]
    pub fn slot(&self, start: usize) -> usize {
        match self {
            Grouping::Windowed { size } => (start as u64 / size) as usize,
            _ => 0,
        }
    }
}

use crate::{hash_functions::HashAlgorithms, params::Parameters, sketch::Sketch};
use serde::{Deserialize, Serialize};

/// Finished output of a run: the ordered sketches and the parameters needed
/// to compare them against other signatures.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Signature {
    pub file_name: String,
    pub kmer_size: u8,
    pub sketch_size: usize,
    pub canonical: bool,
    pub algorithm: HashAlgorithms,
    pub hash_seed: u64,
    pub sketches: Vec<Sketch>,
}

impl Signature {
    pub fn new(file_name: String, params: &Parameters, sketches: Vec<Sketch>) -> Self {
        Signature {
            file_name,
            kmer_size: params.kmer_size,
            sketch_size: params.sketch_size,
            canonical: params.canonical,
            algorithm: params.algorithm,
            hash_seed: params.algorithm.seed(),
            sketches,
        }
    }

    /// True if hashes of both signatures can be compared directly
    pub fn is_compatible(&self, other: &Signature) -> bool {
        self.kmer_size == other.kmer_size
            && self.canonical == other.canonical
            && self.algorithm == other.algorithm
            && self.hash_seed == other.hash_seed
    }

    pub fn sketch(&self, name: &str) -> Option<&Sketch> {
        self.sketches.iter().find(|sketch| sketch.name == name)
    }
}

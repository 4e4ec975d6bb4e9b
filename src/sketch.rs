use crate::error::{Result, SketchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bottom-k sketch of one unit (a sequence, a window or a whole collection).
///
/// Holds the `max_hashes` smallest distinct hashes inserted so far. Merging
/// is equivalent to inserting every hash of the other sketch, the result does
/// not depend on the order of inserts and merges.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Sketch {
    pub name: String, // Name of sequence, window or collection
    hashes: BTreeSet<u64>, // Smallest distinct hashes, ascending
    max_hashes: usize, // Capacity (sketch size)
    length: u64,  // Number of bases contributed
    records: u64, // Number of records contributed
    #[serde(skip, default = "frozen")]
    finalized: bool,
}

fn frozen() -> bool {
    true
}

impl Sketch {
    pub fn new(name: String, max_hashes: usize) -> Self {
        Sketch {
            name,
            hashes: BTreeSet::new(),
            max_hashes,
            length: 0,
            records: 0,
            finalized: false,
        }
    }

    #[inline]
    fn check_open(&self) -> Result<()> {
        if self.finalized {
            return Err(SketchError::UnitFinalized(self.name.clone()));
        }
        Ok(())
    }

    /// Inserts a hash, returns true if the retained set changed
    #[inline]
    pub fn insert(&mut self, hash: u64) -> Result<bool> {
        self.check_open()?;
        if self.hashes.len() < self.max_hashes {
            return Ok(self.hashes.insert(hash));
        }
        match self.hashes.last() {
            Some(&max) if hash < max => {
                if self.hashes.insert(hash) {
                    self.hashes.pop_last();
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }

    /// Merges a raw hash stream
    pub fn extend<I: IntoIterator<Item = u64>>(&mut self, hashes: I) -> Result<()> {
        for hash in hashes {
            self.insert(hash)?;
        }
        Ok(())
    }

    /// Merges another sketch into this one, keeping this sketch's capacity
    pub fn merge(&mut self, other: &Sketch) -> Result<()> {
        self.check_open()?;
        for &hash in &other.hashes {
            // Ascending, nothing after this can be retained
            if self.is_full() && self.hashes.last().is_some_and(|max| hash >= *max) {
                break;
            }
            self.insert(hash)?;
        }
        self.length += other.length;
        self.records += other.records;
        Ok(())
    }

    /// Accounts for a record of `length` bases contributing to this unit
    pub fn add_record(&mut self, length: u64) -> Result<()> {
        self.check_open()?;
        self.length += length;
        self.records += 1;
        Ok(())
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn max_hashes(&self) -> usize {
        self.max_hashes
    }

    /// Number of bases contributed
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Retained hashes in ascending order
    pub fn hashes(&self) -> impl Iterator<Item = u64> + '_ {
        self.hashes.iter().copied()
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.hashes.contains(&hash)
    }

    pub fn max_hash(&self) -> Option<u64> {
        self.hashes.last().copied()
    }

    pub fn is_full(&self) -> bool {
        self.hashes.len() >= self.max_hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

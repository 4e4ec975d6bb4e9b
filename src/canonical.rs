//! Canonical k-mers and k-mer window extraction
//!
//! A canonical k-mer is the lexicographically smaller of the k-mer and its
//! reverse complement. Sequences are uppercased before extraction, every
//! symbol outside `ACGT` is invalid and no window overlapping it is produced.
use std::borrow::Cow;
use std::cmp::Ordering;

/// Symbol outside the nucleotide alphabet, the window containing it is skipped
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid symbol {symbol:#04x} at position {position}")]
pub struct InvalidSymbol {
    pub position: usize,
    pub symbol: u8,
}

#[inline]
pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'T' => Some(b'A'),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalizer {
    canonical: bool,
}

impl Canonicalizer {
    pub fn new(canonical: bool) -> Self {
        Canonicalizer { canonical }
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical
    }

    /// Returns the canonical form of a single kmer, or the (uppercased)
    /// forward kmer if canonicalization is disabled.
    pub fn canonicalize<'a>(&self, kmer: &'a [u8]) -> Result<Cow<'a, [u8]>, InvalidSymbol> {
        for (position, symbol) in kmer.iter().enumerate() {
            if complement(symbol.to_ascii_uppercase()).is_none() {
                return Err(InvalidSymbol {
                    position,
                    symbol: *symbol,
                });
            }
        }
        let forward: Cow<'a, [u8]> = if kmer.iter().any(u8::is_ascii_lowercase) {
            Cow::Owned(kmer.to_ascii_uppercase())
        } else {
            Cow::Borrowed(kmer)
        };
        if !self.canonical {
            return Ok(forward);
        }

        // Compare against the reverse complement without building it first
        let reverse = forward.iter().rev().filter_map(|b| complement(*b));
        match reverse.cmp(forward.iter().copied()) {
            Ordering::Less => Ok(Cow::Owned(
                forward.iter().rev().filter_map(|b| complement(*b)).collect(),
            )),
            _ => Ok(forward),
        }
    }

    /// All valid kmer windows of `seq` with their start position
    pub fn windows<'a>(&self, seq: &'a NormalizedSeq, kmer_size: usize) -> KmerWindows<'a> {
        KmerWindows {
            forward: &seq.forward,
            reverse: &seq.reverse,
            kmer_size,
            canonical: self.canonical,
            pos: 0,
            valid_run: 0,
        }
    }
}

/// Uppercased sequence together with its reverse complement.
///
/// Buffers are reused between records, invalid symbols are kept in the
/// forward strand and written as `N` in the reverse strand.
#[derive(Debug, Default, Clone)]
pub struct NormalizedSeq {
    forward: Vec<u8>,
    reverse: Vec<u8>,
}

impl NormalizedSeq {
    pub fn new(seq: &[u8]) -> Self {
        let mut normalized = NormalizedSeq::default();
        normalized.fill(seq);
        normalized
    }

    pub fn fill(&mut self, seq: &[u8]) {
        self.forward.clear();
        self.forward.extend(seq.iter().map(u8::to_ascii_uppercase));
        self.reverse.clear();
        self.reverse.extend(
            self.forward
                .iter()
                .rev()
                .map(|base| complement(*base).unwrap_or(b'N')),
        );
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Iterator over `(start, kmer)` of every window without invalid symbols
pub struct KmerWindows<'a> {
    forward: &'a [u8],
    reverse: &'a [u8],
    kmer_size: usize,
    canonical: bool,
    pos: usize,
    // Number of valid symbols directly before `pos`
    valid_run: usize,
}

impl<'a> Iterator for KmerWindows<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.kmer_size == 0 {
            return None;
        }
        while self.pos < self.forward.len() {
            let base = self.forward[self.pos];
            self.pos += 1;
            if complement(base).is_none() {
                self.valid_run = 0;
                continue;
            }
            self.valid_run += 1;
            if self.valid_run < self.kmer_size {
                continue;
            }
            let start = self.pos - self.kmer_size;
            let forward = &self.forward[start..self.pos];
            if !self.canonical {
                return Some((start, forward));
            }
            let len = self.forward.len();
            let reverse = &self.reverse[len - self.pos..len - start];
            return Some((start, if reverse < forward { reverse } else { forward }));
        }
        None
    }
}

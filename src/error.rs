/// Result type used throughout the sketching engine
pub type Result<T> = std::result::Result<T, SketchError>;

/// Errors that abort (or must never happen during) a sketch construction run
#[derive(thiserror::Error, Debug)]
pub enum SketchError {
    /// Invalid parameters, reported before any input is read
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input source could not be read at all
    ///
    /// # Fields
    /// * `input` - Display name of the offending source
    /// * `message` - Description of the underlying I/O failure
    #[error("Unable to read input {input}: {message}")]
    SourceIo { input: String, message: String },

    /// A hash was inserted into a unit after it was finalized
    #[error("Sketch unit {0:?} is already finalized")]
    UnitFinalized(String),

    /// The worker pool could not be created
    #[error("Unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Parameter combinations the engine refuses to run with
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("kmer size must be at least 1")]
    InvalidKmerSize,

    #[error("sketch size must be at least 1")]
    InvalidSketchSize,

    #[error("window size must be at least 1")]
    InvalidWindowSize,

    /// The Bloom filter is shared by the whole run and needs a single output unit
    #[error("the bloom filter requires concatenated sketching")]
    BloomRequiresConcatenation,

    /// Only one grouping discipline may be active
    #[error("concatenated and windowed sketching are incompatible")]
    IncompatibleGrouping,

    #[error("bloom filter false positive rate must be in (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),

    #[error("genome size must be at least 1")]
    InvalidGenomeSize,

    /// # Arguments
    /// * `u64` - The configured ceiling in bytes
    #[error("memory ceiling of {0} bytes is too small for a bloom filter")]
    MemoryCeilingTooSmall(u64),

    /// The packed hash only holds 32 bases
    #[error("kmer size {0} is too large for the ahash algorithm (max 32)")]
    KmerTooLongForHash(u8),
}

/// A malformed record; reported and skipped, the run continues
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{input}: record {index}: {message}")]
pub struct RecordError {
    /// Display name of the source the record came from
    pub input: String,
    /// Zero based position of the record within its source
    pub index: usize,
    pub message: String,
}

use crate::{
    bloom::{Admission, BloomFilter},
    canonical::{Canonicalizer, NormalizedSeq},
    error::{RecordError, Result, SketchError},
    file_io::{self, InputSource},
    hash_functions::Function,
    params::{Grouping, Parameters},
    signature::Signature,
    sketch::Sketch,
};
use indicatif::ProgressBar;
use needletail::{errors::ParseErrorKind, parser::SequenceRecord, FastxReader};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use std::{borrow::Cow, collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

/// Message of the record error closing a source that ended on a malformed record
pub const TRUNCATED_SOURCE: &str = "reading stopped after a malformed record, any remaining records were skipped";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Init,
    Streaming,
    Finalizing,
    Done,
}

/// Sketch units in order of first appearance, addressable by name
#[derive(Debug, Default)]
struct Units {
    sketches: Vec<Sketch>,
    index: HashMap<String, usize>,
}

impl Units {
    fn get_or_create(&mut self, name: &str, max_hashes: usize) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.sketches.len();
        self.sketches.push(Sketch::new(name.to_string(), max_hashes));
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn absorb(&mut self, other: Units) -> Result<()> {
        for sketch in other.sketches {
            match self.index.get(&sketch.name) {
                Some(&idx) => self.sketches[idx].merge(&sketch)?,
                None => {
                    self.index.insert(sketch.name.clone(), self.sketches.len());
                    self.sketches.push(sketch);
                }
            }
        }
        Ok(())
    }
}

/// Output of a finished run
#[derive(Debug)]
pub struct Finished {
    pub signature: Signature,
    /// Malformed records that were skipped
    pub record_errors: Vec<RecordError>,
}

pub struct Sketcher {
    params: Parameters,
    grouping: Grouping,
    collection_name: String,
    canonicalizer: Canonicalizer,
    function: Function,
    bloom: Option<Arc<BloomFilter>>,
    units: Units,
    record_errors: Vec<RecordError>,
    records: usize,
    state: BuildState,
    normalized: NormalizedSeq,
    slots: Vec<usize>,
}

impl Sketcher {
    /// Validates the parameters and sets up the run. `collection_name` names
    /// the single unit of a concatenated run and the resulting signature.
    pub fn new(params: Parameters, collection_name: impl Into<String>) -> Result<Self> {
        let grouping = params.validate()?;
        let bloom = if params.use_bloom_filter {
            Some(Arc::new(BloomFilter::with_target(
                params.genome_size_hint,
                params.bloom_false_positive_rate,
                params.memory_ceiling_bytes,
            )?))
        } else {
            None
        };
        debug!(?grouping, bloom = bloom.is_some(), "Sketcher initialized");
        Ok(Self::with_bloom(params, grouping, collection_name.into(), bloom))
    }

    fn with_bloom(
        params: Parameters,
        grouping: Grouping,
        collection_name: String,
        bloom: Option<Arc<BloomFilter>>,
    ) -> Self {
        let mut units = Units::default();
        if grouping == Grouping::Concatenated {
            units.get_or_create(&collection_name, params.sketch_size);
        }
        Sketcher {
            canonicalizer: Canonicalizer::new(params.canonical),
            function: Function::from_alg(params.algorithm),
            params,
            grouping,
            collection_name,
            bloom,
            units,
            record_errors: Vec::new(),
            records: 0,
            state: BuildState::Init,
            normalized: NormalizedSeq::default(),
            slots: Vec::new(),
        }
    }

    /// Empty worker for the same run, sharing the bloom filter
    pub fn fork(&self) -> Self {
        Self::with_bloom(
            self.params.clone(),
            self.grouping,
            self.collection_name.clone(),
            self.bloom.clone(),
        )
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn record_errors(&self) -> &[RecordError] {
        &self.record_errors
    }

    pub fn bloom(&self) -> Option<&BloomFilter> {
        self.bloom.as_deref()
    }

    pub fn process(&mut self, record: &SequenceRecord) -> Result<()> {
        let id = String::from_utf8_lossy(record.id());
        // The name is the first word of the header
        let name = id.split_whitespace().next().unwrap_or_default();
        self.process_sequence(name, &record.seq())
    }

    pub fn process_sequence(&mut self, name: &str, seq: &[u8]) -> Result<()> {
        if self.state == BuildState::Init {
            debug!("Sketcher streaming");
            self.state = BuildState::Streaming;
        }
        self.records += 1;

        let Sketcher {
            params,
            grouping,
            collection_name,
            canonicalizer,
            function,
            bloom,
            units,
            normalized,
            slots,
            ..
        } = self;

        slots.clear();
        for (key, covered) in grouping.unit_keys(name, collection_name, seq.len() as u64) {
            let idx = units.get_or_create(&key, params.sketch_size);
            units.sketches[idx].add_record(covered)?;
            slots.push(idx);
        }
        if slots.is_empty() {
            return Ok(());
        }

        normalized.fill(seq);
        for (start, kmer) in canonicalizer.windows(normalized, params.kmer_size as usize) {
            let hash = function.hash(kmer);
            if let Some(bloom) = bloom {
                // Singletons are dropped, a kmer is admitted once seen again
                if bloom.test_and_insert(hash) == Admission::NotSeenBefore {
                    continue;
                }
            }
            units.sketches[slots[grouping.slot(start)]].insert(hash)?;
        }
        Ok(())
    }

    pub fn record_error(&mut self, error: RecordError) {
        warn!("Skipping malformed record: {}", error);
        self.record_errors.push(error);
    }

    /// Streams all records of `reader`, returns the number of records read.
    ///
    /// Malformed records are recorded and skipped, an I/O error aborts. The
    /// reader stops after a malformed record, so records following it are
    /// reported as one additional error for the truncated rest of the source.
    pub fn sketch_reader(&mut self, input: &str, reader: &mut dyn FastxReader) -> Result<usize> {
        let mut index = 0;
        let mut last_failed = false;
        while let Some(record) = reader.next() {
            match record {
                Ok(record) => {
                    self.process(&record)?;
                    last_failed = false;
                }
                Err(err) if matches!(err.kind, ParseErrorKind::Io) => {
                    return Err(SketchError::SourceIo {
                        input: input.to_string(),
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    self.record_error(RecordError {
                        input: input.to_string(),
                        index,
                        message: err.to_string(),
                    });
                    last_failed = true;
                }
            }
            index += 1;
        }
        if last_failed {
            self.record_error(RecordError {
                input: input.to_string(),
                index,
                message: TRUNCATED_SOURCE.to_string(),
            });
        }
        Ok(index)
    }

    pub fn sketch_source(&mut self, source: &InputSource) -> Result<usize> {
        let start = std::time::Instant::now();
        let name = source.to_string();
        let Some(mut reader) = file_io::open_reader(source)? else {
            warn!(input = %name, "Input contains no records");
            return Ok(0);
        };
        let records = self.sketch_reader(&name, reader.as_mut())?;
        info!(
            "Processed {} with {} records, in {:?} seconds",
            name,
            records,
            start.elapsed().as_millis() as f64 / 1000.0
        );
        Ok(records)
    }

    /// Combines a worker of the same run into this one, units with the same
    /// name are merged, new units keep their order.
    pub fn absorb(&mut self, other: Sketcher) -> Result<()> {
        self.units.absorb(other.units)?;
        self.record_errors.extend(other.record_errors);
        self.records += other.records;
        if other.state != BuildState::Init {
            self.state = BuildState::Streaming;
        }
        Ok(())
    }

    /// Sketches every source on its own worker and combines the workers in
    /// input order. Any source failing to read aborts the run.
    pub fn sketch_sources(
        mut self,
        sources: &[InputSource],
        threads: usize,
        progress: &ProgressBar,
    ) -> Result<Finished> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        let combined = pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let mut worker = self.fork();
                    worker.sketch_source(source)?;
                    progress.inc(1);
                    Ok::<_, SketchError>(worker)
                })
                .try_reduce_with(|mut left, right| {
                    left.absorb(right)?;
                    Ok(left)
                })
        });
        progress.finish_and_clear();

        if let Some(combined) = combined.transpose()? {
            self.absorb(combined)?;
        }
        Ok(self.finish())
    }

    /// Freezes every unit and hands out the signature
    pub fn finish(mut self) -> Finished {
        self.state = BuildState::Finalizing;
        for sketch in self.units.sketches.iter_mut() {
            sketch.finalize();
        }
        self.state = BuildState::Done;
        info!(
            units = self.units.sketches.len(),
            records = self.records,
            record_errors = self.record_errors.len(),
            "Sketching done"
        );
        Finished {
            signature: Signature::new(self.collection_name, &self.params, self.units.sketches),
            record_errors: self.record_errors,
        }
    }
}

/// Name of a unit for display, used for the concatenated collection
pub fn collection_name(sources: &[InputSource]) -> Cow<'static, str> {
    match sources.first() {
        Some(source) => Cow::Owned(source.to_string()),
        None => Cow::Borrowed("empty"),
    }
}

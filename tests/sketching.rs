use clap::Parser;
use sketchy::{
    canonical::Canonicalizer,
    cli::{Cli, Commands, OutputFormats},
    error::SketchError,
    file_io::{FileHandler, InputSource},
    hash_functions::murmur3,
    params::Parameters,
    sketcher::{Finished, Sketcher},
};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn sources(paths: &[&PathBuf]) -> Vec<InputSource> {
    paths.iter().map(|p| InputSource::Path(p.to_path_buf())).collect()
}

fn run(params: Parameters, sources: &[InputSource], threads: usize) -> Result<Finished, SketchError> {
    Sketcher::new(params, "test")?.sketch_sources(sources, threads, &ProgressBar::hidden())
}

fn hashes(finished: &Finished, idx: usize) -> Vec<u64> {
    finished.signature.sketches[idx].hashes().collect()
}

fn random_fasta(seed: u64, records: u64, length: u64) -> String {
    let mut out = String::new();
    for r in 0..records {
        out.push_str(&format!(">seq{}_{} random\n", seed, r));
        for i in 0..length {
            let base = sketchy::hash_functions::ahash(seed * 1_000_000 + r * 10_000 + i) % 4;
            out.push(b"ACGT"[base as usize] as char);
        }
        out.push('\n');
    }
    out
}

#[test]
fn test_per_sequence_order_across_files() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "first.fa", ">a\nACGTACGT\n>b\nGGGGCCCC\n");
    let second = write_file(&dir, "second.fq", "@c\nTTTTAAAA\n+\nIIIIIIII\n@a\nCATCAT\n+\nIIIIII\n");
    let params = Parameters {
        kmer_size: 4,
        sketch_size: 10,
        ..Default::default()
    };
    let finished = run(params, &sources(&[&first, &second]), 2).unwrap();
    let names: Vec<&str> = finished
        .signature
        .sketches
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    // "a" collects both records
    assert_eq!(finished.signature.sketches[0].length(), 14);
    assert_eq!(finished.signature.sketches[0].records(), 2);
    let canon = Canonicalizer::new(true);
    assert!(finished.signature.sketches[0]
        .contains(murmur3(&canon.canonicalize(b"CATC").unwrap())));
    assert!(finished.signature.sketches.iter().all(|s| s.is_finalized()));
    assert!(finished.record_errors.is_empty());
}

#[test]
fn test_concatenated_is_order_independent() {
    let dir = TempDir::new().unwrap();
    let a = write_file(&dir, "a.fa", &random_fasta(1, 5, 500));
    let b = write_file(&dir, "b.fa", &random_fasta(2, 3, 800));
    let c = write_file(&dir, "c.fa", &random_fasta(3, 8, 100));
    let params = Parameters {
        kmer_size: 15,
        sketch_size: 50,
        concatenated: true,
        ..Default::default()
    };
    let forward = run(params.clone(), &sources(&[&a, &b, &c]), 1).unwrap();
    let backward = run(params.clone(), &sources(&[&c, &b, &a]), 3).unwrap();
    assert_eq!(forward.signature.sketches.len(), 1);
    assert_eq!(backward.signature.sketches.len(), 1);
    assert_eq!(hashes(&forward, 0), hashes(&backward, 0));
    assert_eq!(hashes(&forward, 0).len(), 50);
    assert_eq!(forward.signature.sketches[0].length(), 2500 + 2400 + 800);
    assert_eq!(forward.signature.sketches[0].records(), 16);
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..6)
        .map(|i| write_file(&dir, &format!("{i}.fa"), &random_fasta(i, 4, 300)))
        .collect();
    let refs: Vec<&PathBuf> = paths.iter().collect();
    let params = Parameters {
        kmer_size: 21,
        sketch_size: 100,
        ..Default::default()
    };
    let sequential = run(params.clone(), &sources(&refs), 1).unwrap();
    let parallel = run(params, &sources(&refs), 4).unwrap();
    assert_eq!(sequential.signature, parallel.signature);
    assert_eq!(sequential.signature.sketches.len(), 24);
}

#[test]
fn test_bloom_filter_is_shared_across_files() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "1.fa", ">r1\nGATTACA\n");
    let second = write_file(&dir, "2.fa", ">r2\nGATTACA\n");
    let third = write_file(&dir, "3.fa", ">r3\nCCCGG\n");
    let params = Parameters {
        kmer_size: 5,
        sketch_size: 100,
        concatenated: true,
        use_bloom_filter: true,
        genome_size_hint: 1_000,
        memory_ceiling_bytes: 4096,
        bloom_false_positive_rate: 0.0001,
        ..Default::default()
    };
    let sketcher = Sketcher::new(params, "reads").unwrap();
    assert!(sketcher.bloom().unwrap().allocated_bytes() <= 4096);
    let finished = sketcher
        .sketch_sources(&sources(&[&first, &second, &third]), 3, &ProgressBar::hidden())
        .unwrap();
    let sketch = &finished.signature.sketches[0];
    let canon = Canonicalizer::new(true);
    for kmer in ["GATTA", "ATTAC", "TTACA"] {
        assert!(sketch.contains(murmur3(&canon.canonicalize(kmer.as_bytes()).unwrap())));
    }
    assert!(!sketch.contains(murmur3(b"CCCGG")));
}

#[test]
fn test_missing_source_aborts_run() {
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "good.fa", ">a\nACGTACGT\n");
    let missing = dir.path().join("missing.fa");
    let result = run(Parameters::default(), &sources(&[&good, &missing]), 2);
    match result {
        Err(SketchError::SourceIo { input, .. }) => assert!(input.ends_with("missing.fa")),
        other => panic!("Expected source error, got {:?}", other.map(|f| f.signature)),
    }
}

#[test]
fn test_empty_source_contributes_nothing() {
    let dir = TempDir::new().unwrap();
    let empty = write_file(&dir, "empty.fa", "");
    let good = write_file(&dir, "good.fa", ">a\nACGTACGT\n");
    let params = Parameters {
        kmer_size: 4,
        ..Default::default()
    };
    let finished = run(params, &sources(&[&empty, &good]), 1).unwrap();
    assert_eq!(finished.signature.sketches.len(), 1);
    assert_eq!(finished.signature.sketches[0].name, "a");
}

#[test]
fn test_write_and_read_signature() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in.fa", &random_fasta(7, 3, 400));
    let params = Parameters {
        kmer_size: 17,
        sketch_size: 20,
        ..Default::default()
    };
    let finished = run(params, &sources(&[&input]), 1).unwrap();
    for (format, name) in [(OutputFormats::Bin, "out.msh"), (OutputFormats::Json, "out.json.msh")] {
        let output = dir.path().join(name);
        FileHandler::write_output(&finished.signature, &output, format).unwrap();
        let restored = FileHandler::read_signature(&output).unwrap();
        assert_eq!(restored, finished.signature);
        assert_eq!(restored.kmer_size, 17);
        assert_eq!(restored.sketch_size, 20);
        assert!(restored.canonical);
        assert_eq!(restored.hash_seed, 42);
        assert!(restored.is_compatible(&finished.signature));
    }
}

#[test]
fn test_sketch_files_end_to_end() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "x.fa", ">x\nACGTACGTAC\n");
    let second = write_file(&dir, "y.fa", ">y\nTTTTTTT\n");
    let list = write_file(
        &dir,
        "inputs.list",
        &format!("{}\n{}\n", first.display(), second.display()),
    );
    let prefix = dir.path().join("combined");
    let cli = Cli::parse_from([
        "sketchy",
        "sketch",
        "-l",
        "-k",
        "4",
        "-s",
        "3",
        "-c",
        "-o",
        prefix.to_str().unwrap(),
        list.to_str().unwrap(),
    ]);
    let Commands::Sketch(args) = cli.command;

    let output = FileHandler::sketch_files(args.clone(), Some(2), false, true).unwrap();
    assert_eq!(output, Path::new(&format!("{}.msh", prefix.display())));
    let signature = FileHandler::read_signature(&output).unwrap();
    assert_eq!(signature.sketches.len(), 1);
    assert_eq!(signature.sketches[0].name, first.display().to_string());
    assert_eq!(signature.sketches[0].len(), 3);
    assert_eq!(signature.sketches[0].length(), 17);

    // Existing output needs --force
    assert!(FileHandler::sketch_files(args.clone(), Some(1), false, true).is_err());
    assert!(FileHandler::sketch_files(args, Some(1), true, true).is_ok());
}

use crate::hash_functions::HashAlgorithms;
use crate::params::Parameters;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sketchy")]
#[command(bin_name = "sketchy")]
#[command(version)]
#[command(
    about = "Bottom-k minhash sketches of sequence files",
    long_about = "Create a sketch, a reduced representation of a sequence or set of sequences (based on min-hashes) that can be used for fast distance estimation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Number of threads to use (0 = all cores)
    #[arg(short, long, global = true, default_value = "1")]
    pub threads: Option<usize>,
    /// Overwrite output files
    #[arg(short, long, global = true, default_value = "false")]
    pub force: bool,
    /// Log debug output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Only log warnings and errors, no progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormats {
    #[default]
    Bin,
    Json,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Commands {
    /// Sketch one or more files and write the result to <prefix>.msh
    #[command(arg_required_else_help = true)]
    Sketch(SketchArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SketchArgs {
    /// Input fasta/fastq file(s), optionally compressed, "-" for stdin
    #[arg(required = true)]
    pub input: Vec<String>,
    /// Output prefix (first input file if unspecified), ".msh" is appended
    #[arg(short, long)]
    #[arg(value_parser = clap::value_parser!(std::path::PathBuf))]
    pub output: Option<PathBuf>,
    /// Input files are lists of file names
    #[arg(short, long)]
    pub list: bool,
    /// kmer size, all sketches to be compared must have the same size
    #[arg(short = 'k', long = "kmer-size", default_value = "21")]
    pub kmer_size: u8,
    /// Max number of min-hashes per sketch
    #[arg(short = 's', long = "sketch-size", default_value = "1000")]
    pub sketch_size: usize,
    /// Concatenate all sequences of all inputs into a single sketch
    #[arg(short, long)]
    pub concat: bool,
    /// Filter unique kmers with a bloom filter (implies --concat)
    #[arg(short, long)]
    pub unique: bool,
    /// Expected genome size in bases, sizes the bloom filter, accepts K/M/G/T (implies --unique)
    #[arg(short, long, value_parser = parse_size)]
    pub genome: Option<u64>,
    /// Max memory for the bloom filter in bytes, accepts K/M/G/T (implies --unique)
    #[arg(short, long, value_parser = parse_size)]
    pub memory: Option<u64>,
    /// Bloom filter false positive rate
    #[arg(short = 'e', long = "bloom-error", default_value = "0.001")]
    pub bloom_error: f64,
    /// Do not canonicalize kmers (strand specific sketches)
    #[arg(short, long)]
    pub noncanonical: bool,
    /// Change the hashing algorithm
    #[arg(long, default_value = "murmur3")]
    pub algorithm: HashAlgorithms,
    /// Change to other output formats
    #[arg(long, default_value = "bin")]
    pub format: OutputFormats,
}

impl SketchArgs {
    pub fn parameters(&self) -> Parameters {
        let defaults = Parameters::default();
        // genome / memory -> unique -> concat
        let use_bloom_filter = self.unique || self.genome.is_some() || self.memory.is_some();
        Parameters {
            kmer_size: self.kmer_size,
            sketch_size: self.sketch_size,
            canonical: !self.noncanonical,
            concatenated: self.concat || use_bloom_filter,
            use_bloom_filter,
            genome_size_hint: self.genome.unwrap_or(defaults.genome_size_hint),
            memory_ceiling_bytes: self.memory.unwrap_or(defaults.memory_ceiling_bytes),
            bloom_false_positive_rate: self.bloom_error,
            window_size: None,
            algorithm: self.algorithm,
        }
    }
}

/// Parses sizes like `5000`, `100K`, `1.5G` (decimal multipliers)
pub fn parse_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let (number, multiplier) = match value.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let multiplier: u64 = match suffix.to_ascii_uppercase() {
                'K' => 1_000,
                'M' => 1_000_000,
                'G' => 1_000_000_000,
                'T' => 1_000_000_000_000,
                _ => return Err(format!("Unknown size suffix {suffix:?}")),
            };
            (&value[..idx], multiplier)
        }
        _ => (value, 1),
    };
    let number: f64 = number
        .parse()
        .map_err(|_| format!("Invalid size {value:?}"))?;
    if !number.is_finite() || number < 0.0 {
        return Err(format!("Invalid size {value:?}"));
    }
    Ok((number * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("5000"), Ok(5000));
        assert_eq!(parse_size("100K"), Ok(100_000));
        assert_eq!(parse_size("1.5g"), Ok(1_500_000_000));
        assert_eq!(parse_size("2T"), Ok(2_000_000_000_000));
        assert!(parse_size("12X").is_err());
        assert!(parse_size("G").is_err());
        assert!(parse_size("-5").is_err());
    }

    #[test]
    fn test_implications() {
        let cli = Cli::parse_from(["sketchy", "sketch", "-g", "10M", "reads.fq"]);
        let Commands::Sketch(args) = cli.command;
        let params = args.parameters();
        assert!(params.use_bloom_filter);
        assert!(params.concatenated);
        assert_eq!(params.genome_size_hint, 10_000_000);
        assert!(params.validate().is_ok());

        let cli = Cli::parse_from(["sketchy", "sketch", "-n", "-k", "16", "a.fa", "b.fa"]);
        let Commands::Sketch(args) = cli.command;
        let params = args.parameters();
        assert!(!params.canonical);
        assert!(!params.concatenated);
        assert!(!params.use_bloom_filter);
        assert_eq!(params.kmer_size, 16);
        assert_eq!(args.input, vec!["a.fa", "b.fa"]);
    }
}

use crate::cli::OutputFormats;
use crate::cli::SketchArgs;
use crate::error::SketchError;
use crate::signature::Signature;
use crate::sketcher::{self, Sketcher};
use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use needletail::errors::ParseErrorKind;
use needletail::{parse_fastx_file, parse_fastx_stdin, FastxReader};
use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Suffix of sketch files, inputs ending with it are rejected
pub const SKETCH_SUFFIX: &str = ".msh";
pub const STDIN_MARKER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Path(PathBuf),
    Stdin,
}

impl InputSource {
    pub fn parse(arg: &str) -> Self {
        if arg == STDIN_MARKER {
            InputSource::Stdin
        } else {
            InputSource::Path(PathBuf::from(arg))
        }
    }
}

impl Display for InputSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Path(path) => write!(f, "{}", path.display()),
            InputSource::Stdin => write!(f, "stdin"),
        }
    }
}

/// Opens a sequence reader, `None` if the source holds no records at all
pub fn open_reader(source: &InputSource) -> crate::error::Result<Option<Box<dyn FastxReader>>> {
    let reader = match source {
        InputSource::Path(path) => parse_fastx_file(path),
        InputSource::Stdin => parse_fastx_stdin(),
    };
    match reader {
        Ok(reader) => Ok(Some(reader)),
        Err(err) if matches!(err.kind, ParseErrorKind::EmptyFile) => Ok(None),
        Err(err) => Err(SketchError::SourceIo {
            input: source.to_string(),
            message: err.to_string(),
        }),
    }
}

pub fn looks_sketched(path: &str) -> bool {
    path.ends_with(SKETCH_SUFFIX)
}

pub struct FileHandler {}

impl FileHandler {
    /// Sketches all inputs of `args` and writes the signature, returns the output path
    pub fn sketch_files(
        args: SketchArgs,
        threads: Option<usize>,
        force: bool,
        quiet: bool,
    ) -> Result<PathBuf> {
        let start = std::time::Instant::now();
        let params = args.parameters();
        let sources = FileHandler::collect_inputs(&args.input, args.list)?;
        let output = FileHandler::output_path(args.output.as_deref(), &args.input);
        if output.exists() && !force {
            bail!("Output file {:?} already exists, use --force to overwrite", output);
        }

        let sketcher = Sketcher::new(params, sketcher::collection_name(&sources))?;
        let progress = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(sources.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} files [{elapsed_precise}]")?,
            );
            bar
        };
        let finished = sketcher.sketch_sources(&sources, threads.unwrap_or_default(), &progress)?;

        if !finished.record_errors.is_empty() {
            let mut inputs: Vec<&str> = finished
                .record_errors
                .iter()
                .map(|e| e.input.as_str())
                .collect();
            inputs.dedup();
            warn!(
                "Skipped {} malformed record(s) in {} input(s)",
                finished.record_errors.len(),
                inputs.len()
            );
        }

        FileHandler::write_output(&finished.signature, &output, args.format)?;
        info!(
            "Wrote {} sketch(es) to {:?} in {:?} seconds",
            finished.signature.sketches.len(),
            output,
            start.elapsed().as_millis() as f64 / 1000.0
        );
        Ok(output)
    }

    /// Resolves the input arguments (or list files) into sources and checks
    /// that they can be sketched.
    pub fn collect_inputs(input: &[String], list: bool) -> Result<Vec<InputSource>> {
        let mut names = Vec::new();
        for arg in input {
            if looks_sketched(arg) {
                bail!("{} looks like it is already sketched", arg);
            }
            if list {
                let reader = BufReader::new(
                    File::open(arg).with_context(|| format!("Unable to open list {:?}", arg))?,
                );
                for line in reader.lines() {
                    let line = line?;
                    let line = line.trim();
                    if !line.is_empty() {
                        names.push(line.to_string());
                    }
                }
            } else {
                names.push(arg.clone());
            }
        }

        let mut resulting_sources = Vec::with_capacity(names.len());
        let mut found_stdin = false;
        for name in names {
            if looks_sketched(&name) {
                bail!("{} looks like it is already sketched", name);
            }
            let source = InputSource::parse(&name);
            match &source {
                InputSource::Stdin if found_stdin => {
                    bail!("Standard input can only be used once");
                }
                InputSource::Stdin => found_stdin = true,
                InputSource::Path(path) if !path.is_file() => {
                    return Err(anyhow!("File {:?} does not exist", path));
                }
                InputSource::Path(_) => {}
            }
            resulting_sources.push(source);
        }
        if resulting_sources.is_empty() {
            bail!("No input files");
        }
        Ok(resulting_sources)
    }

    /// `<prefix>.msh`, the prefix defaults to the first input (`stdin` for "-")
    pub fn output_path(prefix: Option<&Path>, input: &[String]) -> PathBuf {
        let prefix = match prefix {
            Some(prefix) => prefix.to_string_lossy().to_string(),
            None => match input.first().map(String::as_str) {
                Some(STDIN_MARKER) | None => "stdin".to_string(),
                Some(first) => first.to_string(),
            },
        };
        if looks_sketched(&prefix) {
            PathBuf::from(prefix)
        } else {
            PathBuf::from(format!("{prefix}{SKETCH_SUFFIX}"))
        }
    }

    pub fn write_output(signature: &Signature, output: &Path, format: OutputFormats) -> Result<()> {
        let mut writer = std::io::BufWriter::new(
            File::create(output).with_context(|| format!("Unable to create {:?}", output))?,
        );
        match format {
            OutputFormats::Bin => bincode::serialize_into(&mut writer, signature)?,
            OutputFormats::Json => serde_json::to_writer(&mut writer, signature)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a signature written in either output format
    pub fn read_signature(input: &Path) -> Result<Signature> {
        let bytes =
            std::fs::read(input).with_context(|| format!("Unable to read {:?}", input))?;
        if let Ok(signature) = bincode::deserialize::<Signature>(&bytes) {
            return Ok(signature);
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("{:?} is not a sketch file", input))
    }
}

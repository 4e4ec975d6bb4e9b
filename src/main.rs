use clap::Parser;
use sketchy::cli::{Cli, Commands};
use sketchy::file_io::FileHandler;
use tracing::Level;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sketch(args) => {
            FileHandler::sketch_files(args, cli.threads, cli.force, cli.quiet)?;
        }
    }
    Ok(())
}

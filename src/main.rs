use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use wirekit::config::Config;
use wirekit::corpus::Corpus;
use wirekit::logging::{LogFormat, LogOptions};
use wirekit::pipeline;
use wirekit::Error;

/// Generate dependency injection containers from their declarations
#[derive(Debug, Parser)]
#[command(name = "wirekit", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every container and write the generated files
    Generate(RunArgs),
    /// Resolve every container and report failures without writing anything
    Check(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the project configuration (wirekit.toml)
    config: PathBuf,
    /// More logging, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Log output format: text or json
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (args, write) = match &cli.command {
        Command::Generate(args) => (args, true),
        Command::Check(args) => (args, false),
    };

    let mut log = LogOptions::from_env();
    log.level = log.level.raised(args.verbose);
    if let Some(format) = args.log_format {
        log.format = format;
    }
    log.init();

    match run(args, write) {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

fn run(args: &RunArgs, write: bool) -> Result<(), ()> {
    let config = Config::load(&args.config).map_err(|e| eprintln!("error: {e}"))?;
    let corpus = Corpus::load(&config.index, &config.root).map_err(|e| eprintln!("error: {e}"))?;

    let generation = match pipeline::generate(&corpus, &config.options()) {
        Ok(generation) => generation,
        Err(error) => {
            report(&error, &corpus);
            return Err(());
        }
    };

    if write {
        // groups that resolved are written even if others failed
        match pipeline::write_units(&generation.units, &config.root) {
            Ok(count) => tracing::info!(written = count, total = generation.units.len(), "wrote generated files"),
            Err(error) => {
                eprintln!("error: {error}");
                return Err(());
            }
        }
    }

    if generation.is_success() {
        return Ok(());
    }
    report(&Error::Failed(generation.failures), &corpus);
    Err(())
}

fn report(error: &Error, corpus: &Corpus) {
    for diagnostic in error.diagnostics() {
        eprintln!("{}\n", diagnostic.render(corpus));
    }
    if let Error::Failed(_) = error {
        eprintln!("error: {error}");
    }
}

//! br - train, enroll, compare and convert from the command line.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use biomatch_algorithm::{Config, Engine, File};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Biometric recognition pipeline.
///
/// Every file argument is a descriptor: a path optionally followed by
/// `[key=value,...]` options, e.g. `faces.gal[noDuplicates]`.
#[derive(Parser, Debug)]
#[command(name = "br")]
#[command(about = "Train, enroll and compare with biomatch algorithms")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default algorithm descriptor
    #[arg(short = 'a', long, global = true)]
    algorithm: Option<String>,

    /// Worker threads for projection
    #[arg(short = 'j', long, global = true)]
    parallelism: Option<usize>,

    /// Suppress enrollment and training summaries
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train an algorithm and optionally store the model
    Train {
        input: String,
        /// Model file to write
        model: Option<String>,
    },
    /// Enroll templates into a gallery
    Enroll {
        input: String,
        /// Gallery to write; defaults to an in-memory gallery
        gallery: Option<String>,
    },
    /// Compare queries against targets into a similarity output
    Compare {
        target: String,
        /// Query gallery; `.` compares the target with itself
        query: String,
        output: String,
    },
    /// Convert a template, gallery or output to another format
    Convert {
        /// format, gallery or output
        kind: String,
        input: String,
        output: String,
    },
    /// Concatenate galleries or outputs
    Cat {
        /// gallery or output
        kind: String,
        output: String,
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Print whether an algorithm has no distance stage
    Classifier {
        /// Algorithm descriptor; defaults to the configured algorithm
        algorithm: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("br: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(algorithm) = &cli.algorithm {
        config = config.with_algorithm(algorithm);
    }
    if let Some(n) = cli.parallelism {
        config = config.with_parallelism(n);
    }
    if cli.quiet {
        config = config.with_quiet(true);
    }
    Ok(config)
}

fn descriptor(arg: Option<&str>) -> File {
    arg.map(File::parse).unwrap_or_default()
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    debug!(?config, "engine configuration");
    let engine = Engine::new(config);

    match &cli.command {
        Commands::Train { input, model } => {
            engine.train(&File::parse(input), &descriptor(model.as_deref()))?;
        }
        Commands::Enroll { input, gallery } => {
            let files = engine.enroll(&File::parse(input), &descriptor(gallery.as_deref()))?;
            println!("{}", files.len());
        }
        Commands::Compare {
            target,
            query,
            output,
        } => {
            engine.compare(
                &File::parse(target),
                &File::parse(query),
                &File::parse(output),
            )?;
        }
        Commands::Convert {
            kind,
            input,
            output,
        } => {
            engine.convert(kind, &File::parse(input), &File::parse(output))?;
        }
        Commands::Cat {
            kind,
            output,
            inputs,
        } => {
            let inputs: Vec<File> = inputs.iter().map(|s| File::parse(s)).collect();
            engine.cat(kind, &inputs, &File::parse(output))?;
        }
        Commands::Classifier { algorithm } => {
            let classifier = engine.is_classifier(algorithm.as_deref().unwrap_or_default())?;
            println!("{classifier}");
        }
    }

    engine.finalize();
    Ok(())
}

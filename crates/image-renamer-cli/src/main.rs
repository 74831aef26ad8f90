use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use image_renamer_core::discovery::discover_images;
use image_renamer_core::logging::init_logger;
use image_renamer_core::{
    channel, Config, EventQueue, ModelChoice, OllamaClient, RenameEvent, RenameOrchestrator,
    StartOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "image-renamer")]
#[command(about = "Rename images with titles from a local vision model")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to a rotating file instead of the console
    #[arg(long, global = true)]
    log_file: bool,

    /// Directory for the log file (implies --log-file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed vision models
    Models,

    /// Check that the Ollama server answers
    Check {
        /// Model to send the test request to
        #[arg(long)]
        model: Option<String>,
    },

    /// List the images in a directory
    List {
        /// Directory to list
        directory: PathBuf,
    },

    /// Rename images using AI-generated titles
    Rename {
        /// Directory containing the images
        directory: PathBuf,

        /// Model to use (defaults to the preselected vision model)
        #[arg(short, long)]
        model: Option<String>,

        /// Only rename this file
        #[arg(short, long)]
        file: Option<String>,

        /// Maximum title length
        #[arg(long)]
        max_length: Option<usize>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "image-renamer.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();

    config.log_level = match cli.verbose {
        0 => config.log_level,
        1 => image_renamer_core::LogLevel::Debug,
        _ => image_renamer_core::LogLevel::Trace,
    };

    let log_dir = match cli.log_dir {
        Some(dir) => Some(dir),
        None if cli.log_file => Some(default_log_dir()),
        None => None,
    };
    init_logging(log_dir.as_deref(), &config)?;

    match cli.command {
        Commands::Models => list_models(config),
        Commands::Check { model } => check(config, model),
        Commands::List { directory } => list_images(&directory, &config),
        Commands::Rename {
            directory,
            model,
            file,
            max_length,
            timeout,
        } => {
            if let Some(max_length) = max_length {
                config.max_title_length = max_length;
            }
            if timeout.is_some() {
                config.request_timeout_secs = timeout;
            }
            rename(config, &directory, model, file)
        }
        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log_dir: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let level: log::LevelFilter = config.log_level.into();
    match log_dir {
        Some(dir) => init_logger(dir, level)
            .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e)),
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_env("RENAMER_LOG")
                .init();
            Ok(())
        }
    }
}

/// Default log directory when file logging is requested without a path
fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "image-renamer")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn build_orchestrator(config: Config) -> anyhow::Result<(RenameOrchestrator, EventQueue)> {
    config.validate()?;
    let client = OllamaClient::new(&config).context("Failed to create Ollama client")?;
    info!("Using Ollama at {}", client.base_url());
    let (sink, queue) = channel();
    Ok((RenameOrchestrator::new(Arc::new(client), config, sink), queue))
}

fn list_models(config: Config) -> anyhow::Result<()> {
    let (orchestrator, queue) = build_orchestrator(config)?;
    let choice = orchestrator.load_models();
    queue.drain();

    match &choice {
        ModelChoice::Available { models, selected } => {
            for model in models {
                let marker = if model == selected { "*" } else { " " };
                println!("{} {}", marker, model);
            }
        }
        ModelChoice::NoVisionModels => println!("{}", choice.status_text()),
    }
    Ok(())
}

fn check(config: Config, model: Option<String>) -> anyhow::Result<()> {
    let default_model = config.default_model.clone();
    let (orchestrator, _queue) = build_orchestrator(config)?;
    let model = model.unwrap_or(default_model);

    println!("Testing Ollama connection...");
    if orchestrator.test_connection(&model) {
        println!("✓ Connection successful!");
        Ok(())
    } else {
        bail!("✗ Connection failed. Make sure Ollama is running.")
    }
}

fn list_images(directory: &Path, config: &Config) -> anyhow::Result<()> {
    let images = discover_images(directory, config)?;
    if images.is_empty() {
        println!("No images found in this directory");
    }
    for image in images {
        println!("{}", image.filename);
    }
    Ok(())
}

fn rename(
    config: Config,
    directory: &Path,
    model: Option<String>,
    file: Option<String>,
) -> anyhow::Result<()> {
    let (orchestrator, queue) = build_orchestrator(config)?;
    let count = orchestrator.load_directory(directory)?;
    info!("Loaded {} images from {}", count, directory.display());

    let model = match model {
        Some(model) => model,
        None => {
            let choice = orchestrator.load_models();
            match choice.selected() {
                Some(selected) => selected.to_string(),
                None => bail!(choice.status_text()),
            }
        }
    };
    queue.drain();

    let token = orchestrator.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("Cancelling after the current image...");
        token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    match file {
        Some(filename) => {
            let selection = orchestrator
                .files()
                .iter()
                .position(|f| f.filename == filename);
            let outcome = ensure_started(orchestrator.start_single(selection, Some(&model))?)?;
            render_events(&queue, 1);
            if let Some(outcome) = outcome.join() {
                if !outcome.is_renamed() {
                    bail!(outcome.status_text());
                }
            }
        }
        None => {
            let outcome = ensure_started(orchestrator.start_batch(Some(&model))?)?;
            render_events(&queue, count);
            if let Some(summary) = outcome.join() {
                if summary.failed > 0 {
                    warn!("{} images could not be renamed", summary.failed);
                }
            }
        }
    }
    Ok(())
}

fn ensure_started<T>(outcome: StartOutcome<T>) -> anyhow::Result<StartOutcome<T>> {
    match outcome {
        StartOutcome::Started(_) => Ok(outcome),
        StartOutcome::AlreadyRunning => bail!("A rename is already running"),
        StartOutcome::Rejected(reason) => bail!(reason),
    }
}

/// Drain events on the main thread until the run reports completion
fn render_events(queue: &EventQueue, total: usize) {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{wide_bar} {pos}/{len} ({percent}%) | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );

    while let Some(event) = queue.recv() {
        match event {
            RenameEvent::Status(text) => progress_bar.set_message(text),
            RenameEvent::Preview(_) | RenameEvent::ModelsLoaded { .. } => {}
            RenameEvent::ControlsEnabled { enabled, .. } => {
                if enabled {
                    break;
                }
            }
            RenameEvent::ItemStarted { filename, .. } => {
                progress_bar.set_message(format!("Analyzing: {}", filename));
            }
            RenameEvent::TitleGenerated { title, .. } => {
                progress_bar.set_message(format!("Generated: {}", title));
            }
            RenameEvent::ItemRenamed {
                old_filename,
                new_filename,
                ..
            } => {
                progress_bar.println(format!("✓ {} -> {}", old_filename, new_filename));
                progress_bar.inc(1);
            }
            RenameEvent::ItemFailed {
                filename, message, ..
            } => {
                progress_bar.println(format!("✗ {}: {}", filename, message));
                progress_bar.inc(1);
            }
            RenameEvent::RunCompleted(summary) => {
                progress_bar.finish_with_message(summary.status_text());
            }
            RenameEvent::SingleCompleted(outcome) => {
                progress_bar.finish_with_message(outcome.status_text());
            }
        }
    }
}

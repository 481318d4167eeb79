use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use brandmark::{
    Config, FontRegistry, SloganComposer, WatermarkComposer, batch, quotes,
    startup_checks::{self, StartupCheckError},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the JSON configuration file
    #[arg(
        short,
        long,
        default_value = "Configurations/brandmark.json",
        global = true
    )]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 0 = single threaded, 1 = multi threaded (accepted, always runs sequentially)
    #[arg(
        long,
        alias = "MultiThread",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=1),
        global = true
    )]
    multi_thread: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compose branded slogan images
    Slogan {
        /// Quote text for a single slogan
        #[arg(short, long, required_unless_present = "quotes", conflicts_with = "quotes")]
        text: Option<String>,

        /// Author caption for a single slogan
        #[arg(short, long, requires = "text")]
        author: Option<String>,

        /// JSON file of quotes, one slogan per quote
        #[arg(short, long)]
        quotes: Option<PathBuf>,

        /// Render a single randomly picked quote from the quotes file
        #[arg(long, requires = "quotes")]
        random: bool,

        /// Output file for a single slogan (defaults to the configured output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Watermark every JPEG in a folder
    Watermark {
        #[arg(short, long, default_value = "InputFolder")]
        input: PathBuf,

        #[arg(short, long, default_value = "OutputFolder")]
        output: PathBuf,
    },

    /// List discovered fonts and write the registry snapshot
    Fonts,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli.multi_thread != 0 {
        warn!("Multi-threaded mode is not supported, processing images sequentially");
    }

    let loaded = Config::load(&cli.config)?;
    if !loaded.defaults_used.is_empty() {
        info!(
            "{} configuration keys not set, using defaults: {}",
            loaded.defaults_used.len(),
            loaded.defaults_used.join(", ")
        );
    }
    let config = loaded.config;

    match cli.command {
        Commands::Slogan {
            text,
            author,
            quotes,
            random,
            output,
        } => run_slogan(&config, text, author, quotes, random, output),
        Commands::Watermark { input, output } => run_watermark(&config, &input, &output),
        Commands::Fonts => {
            let registry = discover_fonts(&config)?;
            for (name, path) in registry.iter() {
                println!("{:<40} {}", name, path.display());
            }
            Ok(())
        }
    }
}

fn run_slogan(
    config: &Config,
    text: Option<String>,
    author: Option<String>,
    quotes_file: Option<PathBuf>,
    random: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let single_output = output.unwrap_or_else(|| config.output.file_path());
    let output_dir = match (&quotes_file, random) {
        (Some(_), false) => config.output.directory.clone(),
        _ => single_output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    handle_startup_checks(startup_checks::check_slogan(config, &output_dir))?;

    let registry = discover_fonts(config)?;
    let composer = SloganComposer::new(config, &registry);

    match (text, quotes_file) {
        (Some(text), _) => {
            composer.run(&text, author.as_deref(), &single_output)?;
        }
        (None, Some(path)) => {
            let quotes = quotes::load_quotes(&path)?;
            if random {
                let quote = quotes::pick_random(&quotes, &mut rand::rng())
                    .ok_or("Quotes file contains no quotes")?;
                composer.run(&quote.text, quote.author.as_deref(), &single_output)?;
            } else {
                let summary = batch::slogans_from_quotes(&composer, &quotes, &output_dir);
                info!(
                    "Slogans written: {}, rejected: {}",
                    summary.processed, summary.failed
                );
            }
        }
        (None, None) => return Err("Either --text or --quotes is required".into()),
    }

    Ok(())
}

fn run_watermark(
    config: &Config,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    handle_startup_checks(startup_checks::check_watermark(config, input, output))?;

    let watermark = config
        .watermark
        .clone()
        .ok_or("No Watermark section in configuration")?;
    let registry = discover_fonts(config).unwrap_or_else(|e| {
        warn!("Font discovery failed: {}", e);
        FontRegistry::default()
    });

    let composer = WatermarkComposer::new(watermark, &registry, &config.fonts.folder)?;
    let summary = batch::watermark_directory(&composer, input, output)?;
    info!(
        "Total image creation of {} images complete ({} failed)",
        summary.processed, summary.failed
    );
    Ok(())
}

fn discover_fonts(config: &Config) -> Result<FontRegistry, Box<dyn std::error::Error>> {
    let registry = FontRegistry::discover(&config.fonts.folder)?;
    if let Err(e) = registry.write_snapshot(&config.fonts.snapshot) {
        warn!("Failed to write font snapshot: {}", e);
    }
    Ok(registry)
}

fn handle_startup_checks(
    result: Result<(), Vec<StartupCheckError>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Err(errors) = result else {
        return Ok(());
    };

    for error in &errors {
        tracing::error!("Startup check failed: {}", error);
    }
    if errors.iter().any(StartupCheckError::is_critical) {
        tracing::error!("Critical startup check failed, exiting");
        return Err("Critical startup check failed".into());
    }
    warn!("Non-critical startup checks failed, continuing");
    Ok(())
}

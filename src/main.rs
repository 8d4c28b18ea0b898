//! # SVG Image Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Composizione della configurazione: default → file di config → flag CLI
//! - Avvio dell'optimizer e report dell'errore fatale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, mode, quality, resize, workers, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica il file di configurazione, se presente, e applica gli override
//!    (`--save-config` salva il risultato per i run successivi)
//! 4. Istanzia SvgOptimizer e avvia il run
//! 5. In modalità `--json` un errore fatale viene emesso anche come evento `error`
//!
//! ## Esempio di utilizzo:
//! ```bash
//! svg-image-optimizer poster.svg --mode embed --quality 70 --resize 0.5
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use svg_image_optimizer::{
    json_output::JsonMessage, platform::PlatformCommands, CodecBackend, Config, Mode, SvgOptimizer,
};

#[derive(Parser)]
#[command(name = "svg-image-optimizer")]
#[command(about = "Recompress the base64 images embedded in an SVG to WebP")]
struct Args {
    /// SVG document to optimize
    input: PathBuf,

    /// Write images as separate files or re-embed them as data URIs
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// WebP quality (0-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Resize factor applied to the declared width and height
    #[arg(short, long)]
    resize: Option<f64>,

    /// Prefix prepended to generated hrefs in extract mode
    #[arg(short = 'p', long = "prefix")]
    prefix: Option<String>,

    /// Also keep the decoded source images next to the WebP files
    #[arg(short, long)]
    keep_extracted: bool,

    /// Output directory (default: <input dir>/<input name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// WebP encoder backend
    #[arg(long, value_enum)]
    codec: Option<CodecBackend>,

    /// Configuration file (default: user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store the effective settings in the configuration file before running
    #[arg(long)]
    save_config: bool,

    /// Output progress and results as JSON lines for programmatic use
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// CLI flags win over the configuration file
    fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if let Some(resize) = self.resize {
            config.resize = resize;
        }
        if let Some(ref prefix) = self.prefix {
            config.href_prefix = prefix.clone();
        }
        if self.keep_extracted {
            config.keep_extracted = true;
        }
        if let Some(ref output) = self.output {
            config.output_path = Some(output.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if self.json {
            config.json_output = true;
        }
    }
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path)
            .await
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => match Config::default_path().filter(|path| path.exists()) {
            Some(path) => {
                info!("Using config file: {}", path.display());
                Config::from_file(&path).await?
            }
            None => Config::default(),
        },
    };
    args.apply_to(&mut config);

    if args.save_config {
        let path = args
            .config
            .clone()
            .or_else(Config::default_path)
            .context("No configuration directory available to save the settings")?;
        config
            .save_to_file(&path)
            .await
            .with_context(|| format!("Failed to save config file: {}", path.display()))?;
        info!("💾 Saved settings to {}", path.display());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON events
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Platform: {}", PlatformCommands::system_info());

    let config = load_config(&args).await?;
    let json_output = config.json_output;

    let result = match SvgOptimizer::new(&args.input, config) {
        Ok(optimizer) => optimizer.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            debug!("{} files written", report.written_files.len());
            Ok(())
        }
        Err(e) => {
            if json_output {
                JsonMessage::error(e.stage(), e.to_string()).emit();
            }
            Err(e.into())
        }
    }
}

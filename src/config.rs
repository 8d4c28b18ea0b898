//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di elaborazione
//! - Fornisce validazione dei parametri prima di qualsiasi elaborazione
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `mode`: `extract` (file WebP separati) o `embed` (data URI WebP inline)
//! - `quality`: Qualità WebP (0-100, default: 80)
//! - `resize`: Coefficiente di resize (> 0, default: 1.0)
//! - `href_prefix`: Prefisso per gli href generati in modalità extract
//! - `keep_extracted`: Conserva anche le immagini sorgente decodificate
//! - `output_path`: Directory di output (default: `<dir input>/<nome input>`)
//! - `workers`: Numero di compressioni parallele (default: 4)
//! - `codec`: Backend WebP (`builtin` o `cwebp`)
//! - `json_output`: Eventi JSON su stdout per uso programmatico
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     mode: Mode::Embed,
//!     quality: 70,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::OptimizeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the user config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// How recompressed images end up in the rewritten document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Write each image next to the SVG and reference it by path
    Extract,
    /// Replace each image with a new inline WebP data URI
    Embed,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Extract => write!(f, "extract"),
            Mode::Embed => write!(f, "embed"),
        }
    }
}

/// Which WebP encoder backs the codec adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodecBackend {
    /// In-process encoder from the `image` crate
    Builtin,
    /// External `cwebp` binary
    Cwebp,
}

/// Configuration for SVG image optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Processing mode
    pub mode: Mode,
    /// WebP quality (0-100)
    pub quality: u8,
    /// Coefficient applied to declared width/height before compression
    pub resize: f64,
    /// String prepended to generated file references in extract mode
    pub href_prefix: String,
    /// Keep the decoded source images next to the generated WebP files
    pub keep_extracted: bool,
    /// Output directory (None = `<input dir>/<input name>`)
    pub output_path: Option<PathBuf>,
    /// Number of parallel compression tasks
    pub workers: usize,
    /// WebP encoder backend
    pub codec: CodecBackend,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Extract,
            quality: 80,
            resize: 1.0,
            href_prefix: String::new(),
            keep_extracted: false,
            output_path: None,
            workers: 4,
            codec: CodecBackend::Builtin,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.quality > 100 {
            return Err(OptimizeError::Config(format!(
                "quality must be between 0 and 100, got {}",
                self.quality
            )));
        }

        if !self.resize.is_finite() || self.resize <= 0.0 {
            return Err(OptimizeError::Config(format!(
                "resize coefficient must be a positive number, got {}",
                self.resize
            )));
        }

        if self.workers == 0 {
            return Err(OptimizeError::Config(
                "number of workers must be greater than 0".to_string(),
            ));
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(OptimizeError::Config(format!(
                    "output path is not a directory: {}",
                    output_path.display()
                )));
            }
        }

        Ok(())
    }

    /// Default location of the configuration file (`<config dir>/svg-image-optimizer/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("svg-image-optimizer").join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout (`--json`)
//! - Fornisce un'interfaccia standardizzata per comunicazione inter-processo
//!
//! ## Tipi di messaggi:
//! - `start`: inizio elaborazione del documento
//! - `image_complete`: un'immagine è stata ricompressa
//! - `complete`: documento scritto, con statistiche finali
//! - `error`: errore fatale, con la fase che è fallita

use crate::config::{Config, Mode};
use crate::progress::OptimizationStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio del processo
    Start {
        input: PathBuf,
        output_dir: PathBuf,
        total_images: usize,
        config: JsonConfig,
    },

    /// Un'immagine è stata ricompressa
    ImageComplete {
        index: usize,
        name: String,
        width: u32,
        height: u32,
        original_size: u64,
        compressed_size: u64,
        reduction_percent: f64,
    },

    /// Processo completato
    Complete {
        output_svg: PathBuf,
        images_found: usize,
        images_rewritten: usize,
        images_passed_through: usize,
        files_written: usize,
        total_original_size: u64,
        total_compressed_size: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    Error { stage: String, message: String },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonConfig {
    pub mode: Mode,
    pub quality: u8,
    pub resize: f64,
    pub href_prefix: String,
    pub workers: usize,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn complete(output_svg: PathBuf, stats: &OptimizationStats, duration_seconds: f64) -> Self {
        Self::Complete {
            output_svg,
            images_found: stats.images_found,
            images_rewritten: stats.images_rewritten,
            images_passed_through: stats.images_passed_through,
            files_written: stats.files_written,
            total_original_size: stats.total_original_size,
            total_compressed_size: stats.total_compressed_size,
            duration_seconds,
        }
    }

    pub fn error(stage: &str, message: String) -> Self {
        Self::Error {
            stage: stage.to_string(),
            message,
        }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.mode,
            quality: config.quality,
            resize: config.resize,
            href_prefix: config.href_prefix.clone(),
            workers: config.workers,
        }
    }
}

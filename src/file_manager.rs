//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file di output.
//!
//! ## Responsabilità:
//! - Scrittura dei file di output con creazione delle directory parent
//! - Rimozione best-effort dei file scritti da un run fallito
//! - Utilità per dimensioni e percentuali
//!
//! ## Cleanup:
//! Vengono rimossi solo i path che il run stesso ha scritto: nessuna
//! scansione della directory di output, che può contenere file dell'utente.
//! Un fallimento nella cancellazione è solo un warning.
//!
//! ## Esempio:
//! ```ignore
//! FileManager::write_file(&path, &bytes).await?;
//! let removed = FileManager::remove_files(&written).await;
//! ```

use crate::error::OptimizeError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Manages file operations
pub struct FileManager;

impl FileManager {
    /// Writes a file, creating its parent directories
    pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OptimizeError> {
        let write_error = |source| OptimizeError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        fs::write(path, bytes).await.map_err(write_error)?;
        debug!("Wrote {} ({})", path.display(), Self::format_size(bytes.len() as u64));
        Ok(())
    }

    /// Deletes the given files, best effort. Returns how many were removed.
    pub async fn remove_files(paths: &[PathBuf]) -> usize {
        let mut removed = 0;
        for path in paths {
            match fs::remove_file(path).await {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Cleanup warning: failed to remove {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

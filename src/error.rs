//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` per categorizzare ogni fase che può fallire
//! - Fornisce messaggi che nominano la fase (parse / decode / compress / write)
//!   e, dove possibile, il file o l'indice dell'immagine coinvolta
//! - Integra con `thiserror` per conversioni automatiche
//!
//! ## Categorie di errori:
//! - `Input`: file SVG mancante o non leggibile
//! - `Parse`: documento non ben formato
//! - `Decode`: payload base64 non valido in un data URI
//! - `Compression`: il codec ha rifiutato i byte dell'immagine
//! - `Config`: qualità, resize, workers o dimensioni non validi
//! - `Write`: scrittura di un file di output fallita
//!
//! Tutti gli errori sono fatali: non esiste output parziale. Il cleanup
//! best-effort dei file intermedi non produce errori ma solo warning nel log.
//!
//! ## Esempio:
//! ```ignore
//! if config.resize <= 0.0 {
//!     return Err(OptimizeError::Config("resize coefficient must be positive".into()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for SVG image optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("Input error: cannot read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Decode error in image #{index}: {reason}")]
    Decode { index: usize, reason: String },

    #[error("Compression error in image #{index}: {reason}")]
    Compression { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Write error: {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OptimizeError {
    /// Short name of the stage that failed, used in logs and JSON events
    pub fn stage(&self) -> &'static str {
        match self {
            OptimizeError::Input { .. } => "input",
            OptimizeError::Parse(_) => "parse",
            OptimizeError::Decode { .. } => "decode",
            OptimizeError::Compression { .. } => "compress",
            OptimizeError::Config(_) => "config",
            OptimizeError::Write { .. } | OptimizeError::Io(_) => "write",
            OptimizeError::Serialize(_) => "serialize",
            OptimizeError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stage() {
        let err = OptimizeError::Decode { index: 3, reason: "Invalid byte 33, offset 0.".into() };
        assert_eq!(err.stage(), "decode");
        assert!(err.to_string().contains("image #3"));

        let err = OptimizeError::Input {
            path: PathBuf::from("missing.svg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.stage(), "input");
        assert!(err.to_string().contains("missing.svg"));
    }
}

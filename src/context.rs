//! # Transform Context Module
//!
//! Configurazione immutabile passata attraverso tutto il walk ricorsivo.
//!
//! ## Contenuto:
//! - directory e nome base di output
//! - prefisso href, modalità, qualità, coefficiente di resize
//! - `NameSequencer` condiviso: unico stato mutabile, atomico
//!
//! Il contesto è `Clone`: le copie condividono lo stesso sequencer, quindi i
//! nomi generati restano unici anche tra task concorrenti.

use crate::codec::WEBP_EXTENSION;
use crate::config::{Config, Mode};
use crate::error::OptimizeError;
use crate::sequencer::NameSequencer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable settings of one run plus the shared name counter
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub output_dir: PathBuf,
    pub base_name: String,
    pub href_prefix: String,
    pub mode: Mode,
    pub quality: u8,
    pub resize: f64,
    sequencer: Arc<NameSequencer>,
}

/// A reserved output name, `<base>_<index>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    pub index: usize,
    pub stem: String,
}

impl OutputName {
    /// File name with the given extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.stem, extension)
    }

    /// File name for the decoded source payload.
    ///
    /// A WebP source gets a `.source` infix so it never overwrites the
    /// recompressed `<stem>.webp`.
    pub fn source_file_name(&self, extension: &str) -> String {
        if extension.eq_ignore_ascii_case(WEBP_EXTENSION) {
            format!("{}.source.{}", self.stem, extension)
        } else {
            self.file_name(extension)
        }
    }
}

impl TransformContext {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        href_prefix: impl Into<String>,
        mode: Mode,
        quality: u8,
        resize: f64,
    ) -> Result<Self, OptimizeError> {
        if !resize.is_finite() || resize <= 0.0 {
            return Err(OptimizeError::Config(format!(
                "resize coefficient must be a positive number, got {}",
                resize
            )));
        }
        if quality > 100 {
            return Err(OptimizeError::Config(format!(
                "quality must be between 0 and 100, got {}",
                quality
            )));
        }

        Ok(Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
            href_prefix: href_prefix.into(),
            mode,
            quality,
            resize,
            sequencer: Arc::new(NameSequencer::new()),
        })
    }

    /// Builds the context from a validated configuration
    pub fn from_config(config: &Config, output_dir: &Path, base_name: &str) -> Result<Self, OptimizeError> {
        Self::new(
            output_dir,
            base_name,
            config.href_prefix.clone(),
            config.mode,
            config.quality,
            config.resize,
        )
    }

    /// Reserves the next unique output name and advances the counter
    pub fn reserve_name(&self) -> OutputName {
        let index = self.sequencer.next();
        OutputName {
            index,
            stem: format!("{}_{}", self.base_name, index),
        }
    }

    /// Href written into the document for an extracted image
    pub fn href_for(&self, name: &OutputName) -> String {
        format!("{}{}", self.href_prefix, name.file_name(WEBP_EXTENSION))
    }

    /// Where an extracted image is written
    pub fn output_path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(prefix: &str) -> TransformContext {
        TransformContext::new("/tmp/out", "drawing", prefix, Mode::Extract, 80, 1.0).unwrap()
    }

    #[test]
    fn test_names_follow_base_and_counter() {
        let ctx = context("");
        let first = ctx.reserve_name();
        let second = ctx.reserve_name();
        assert_eq!(first.stem, "drawing_0");
        assert_eq!(second.stem, "drawing_1");
        assert_eq!(ctx.href_for(&first), "drawing_0.webp");
        assert_eq!(ctx.output_path_for("drawing_0.webp"), PathBuf::from("/tmp/out/drawing_0.webp"));
        assert_eq!(ctx.reserve_name().index, 2);
    }

    #[test]
    fn test_source_names_never_collide_with_output() {
        let ctx = context("");
        let name = ctx.reserve_name();
        assert_eq!(name.source_file_name("png"), "drawing_0.png");
        assert_eq!(name.source_file_name("webp"), "drawing_0.source.webp");
        assert_ne!(name.source_file_name("WEBP"), name.file_name(WEBP_EXTENSION));
    }

    #[test]
    fn test_clones_share_the_counter() {
        let ctx = context("https://cdn.example.com/img/");
        let clone = ctx.clone();
        assert_eq!(ctx.reserve_name().index, 0);
        assert_eq!(clone.reserve_name().index, 1);
        assert_eq!(ctx.href_for(&OutputName { index: 1, stem: "drawing_1".into() }),
                   "https://cdn.example.com/img/drawing_1.webp");
    }

    #[test]
    fn test_invalid_settings_are_config_errors() {
        assert!(matches!(
            TransformContext::new("out", "a", "", Mode::Embed, 80, 0.0),
            Err(OptimizeError::Config(_))
        ));
        assert!(matches!(
            TransformContext::new("out", "a", "", Mode::Embed, 120, 1.0),
            Err(OptimizeError::Config(_))
        ));
    }
}

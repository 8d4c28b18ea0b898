//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di un run.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif` sulla fase di compressione
//! - `OptimizationStats`: immagini trovate, riscritte, lasciate invariate e byte risparmiati
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:02] [========================================] 12/12 (100%) drawing_11.webp: 62.3% saved
//! ```
//!
//! In modalità JSON la barra è nascosta per non sporcare stdout.

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for image compression
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_images: u64) -> Self {
        let bar = ProgressBar::new(total_images);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden(total_images: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_images);
        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Abandon the bar after a failure
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    /// Images completed so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Statistics tracker for one run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptimizationStats {
    pub images_found: usize,
    pub images_rewritten: usize,
    pub images_passed_through: usize,
    pub files_written: usize,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rewritten(&mut self, original_size: u64, compressed_size: u64) {
        self.images_found += 1;
        self.images_rewritten += 1;
        self.total_original_size += original_size;
        self.total_compressed_size += compressed_size;
    }

    pub fn add_passed_through(&mut self) {
        self.images_found += 1;
        self.images_passed_through += 1;
    }

    pub fn add_file_written(&mut self) {
        self.files_written += 1;
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_compressed_size)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_original_size, self.total_compressed_size)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Images: {} | Rewritten: {} | Unchanged: {} | Files written: {} | {} -> {} ({:.2}% saved)",
            self.images_found,
            self.images_rewritten,
            self.images_passed_through,
            self.files_written,
            FileManager::format_size(self.total_original_size),
            FileManager::format_size(self.total_compressed_size),
            self.overall_reduction_percent()
        )
    }
}

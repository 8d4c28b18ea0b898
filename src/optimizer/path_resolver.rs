//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output di un run:
//! - nome base del documento (nome file senza estensione)
//! - directory di output (`--output` oppure `<dir input>/<nome base>`)
//! - path del documento riscritto (`<output>/<nome base>.svg`)

use crate::{config::Config, error::OptimizeError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output locations of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub base_name: String,
    pub output_dir: PathBuf,
    pub svg_path: PathBuf,
}

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    pub fn resolve(input_path: &Path, config: &Config) -> Result<OutputPaths, OptimizeError> {
        let base_name = Self::base_name(input_path)?;
        let output_dir = match config.output_path {
            Some(ref dir) => dir.clone(),
            None => Self::default_output_dir(input_path, &base_name),
        };
        let svg_path = output_dir.join(format!("{}.svg", base_name));

        if Self::same_file(&svg_path, input_path) {
            return Err(OptimizeError::Config(format!(
                "output document would overwrite the input: {}",
                input_path.display()
            )));
        }

        debug!("Output directory: {}", output_dir.display());
        Ok(OutputPaths {
            base_name,
            output_dir,
            svg_path,
        })
    }

    /// File name without extension
    pub fn base_name(input_path: &Path) -> Result<String, OptimizeError> {
        input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| OptimizeError::Config(format!("invalid input file name: {}", input_path.display())))
    }

    /// `<input dir>/<base name>`
    pub fn default_output_dir(input_path: &Path, base_name: &str) -> PathBuf {
        input_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(base_name)
    }

    fn same_file(a: &Path, b: &Path) -> bool {
        match (a.canonicalize(), b.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        }
    }
}

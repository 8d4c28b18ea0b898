//! # Optimizer Module
//!
//! Orchestrazione di un run, separata in sottomoduli:
//! - `svg_optimizer`: orchestratore principale
//! - `path_resolver`: logica di calcolo path centralizzata

pub mod path_resolver;
pub mod svg_optimizer;

pub use path_resolver::{OutputPaths, PathResolver};
pub use svg_optimizer::{RunReport, SvgOptimizer};

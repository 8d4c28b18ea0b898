//! # SVG Optimizer Orchestrator Module
//!
//! Questo è il modulo che orchestra un run completo su un documento SVG.
//!
//! ## Flusso di esecuzione:
//! 1. **Input**: lettura del file SVG (`InputError`)
//! 2. **Parse**: testo → albero (`ParseError`)
//! 3. **Prepare**: visita in ordine del documento, decode dei data URI e
//!    prenotazione dei nomi di output (`DecodeError`, `ConfigError`)
//! 4. **Compress**: compressione parallela con worker pool limitato da semaforo
//! 5. **Rebuild**: nuovo albero con i nodi `<image>` riscritti
//! 6. **Write**: immagini estratte e documento, solo se tutte le fasi sono riuscite
//!
//! ## Gestione concorrenza:
//! - Semaforo con `workers` permessi (default: 4)
//! - Ogni compressione gira su `spawn_blocking` con i propri byte e un nome già riservato
//! - I risultati sono raccolti nell'ordine della visita: il primo errore interrompe il run
//!
//! ## Error handling:
//! Nessun output parziale: ogni errore è fatale e il documento viene scritto
//! una sola volta, alla fine. Se la scrittura di un'immagine fallisce, i file
//! già scritti in questo run vengono rimossi.
//!
//! ## Documenti senza immagini:
//! Il run prosegue e scrive il documento ri-serializzato, con un warning.
//!
//! ## Esempio:
//! ```ignore
//! let optimizer = SvgOptimizer::new(Path::new("poster.svg"), config)?;
//! let report = optimizer.run().await?;
//! ```

use crate::{
    codec::{codec_for, ImageCodec},
    config::{Config, Mode},
    context::TransformContext,
    document::{parse_document, write_document, Element, Node},
    error::OptimizeError,
    file_manager::FileManager,
    json_output::{JsonConfig, JsonMessage},
    optimizer::path_resolver::{OutputPaths, PathResolver},
    pipeline::{self, CompressedImage, ExtractedImage, PendingImage},
    progress::{OptimizationStats, ProgressManager},
    transform::{transform, visit_images},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_svg: PathBuf,
    /// Every file written by the run, the document last
    pub written_files: Vec<PathBuf>,
    pub stats: OptimizationStats,
}

/// Files produced for one rewritten image
struct ImageOutput {
    extracted: Option<ExtractedImage>,
    source: ExtractedImage,
}

/// Main SVG optimizer orchestrator
pub struct SvgOptimizer {
    config: Config,
    input_path: PathBuf,
    paths: OutputPaths,
    codec: Arc<dyn ImageCodec>,
}

impl SvgOptimizer {
    /// Create an optimizer with the codec selected in the configuration
    pub fn new(input_path: &Path, config: Config) -> Result<Self, OptimizeError> {
        config.validate()?;
        let codec = codec_for(config.codec)?;
        Self::with_codec(input_path, config, codec)
    }

    /// Create an optimizer with an explicit codec
    pub fn with_codec(
        input_path: &Path,
        config: Config,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, OptimizeError> {
        config.validate()?;
        let paths = PathResolver::resolve(input_path, &config)?;

        Ok(Self {
            config,
            input_path: input_path.to_path_buf(),
            paths,
            codec,
        })
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Run the whole pipeline on the input document
    pub async fn run(&self) -> Result<RunReport, OptimizeError> {
        let started = Instant::now();
        info!("Starting SVG optimization: {}", self.input_path.display());
        info!(
            "🎯 Mode: {} (WebP quality: {}, resize: {}, codec: {})",
            self.config.mode,
            self.config.quality,
            self.config.resize,
            self.codec.name()
        );
        info!("📁 Output directory: {}", self.paths.output_dir.display());

        let text = tokio::fs::read_to_string(&self.input_path)
            .await
            .map_err(|source| OptimizeError::Input {
                path: self.input_path.clone(),
                source,
            })?;

        info!("Parsing SVG");
        let document = parse_document(&text)?;
        let ctx = TransformContext::from_config(&self.config, &self.paths.output_dir, &self.paths.base_name)?;

        let prepared = Self::prepare_images(&document, &ctx)?;
        let candidates = prepared.iter().flatten().count();
        info!(
            "Found {} image nodes, {} with embedded data",
            prepared.len(),
            candidates
        );
        if self.config.json_output {
            JsonMessage::Start {
                input: self.input_path.clone(),
                output_dir: self.paths.output_dir.clone(),
                total_images: candidates,
                config: JsonConfig::from(&self.config),
            }
            .emit();
        }
        if candidates == 0 {
            warn!("No embedded images found, the document is written unchanged");
        }

        let compressed = self.compress_all(prepared, candidates).await?;

        info!("Rebuilding SVG");
        let mut stats = OptimizationStats::new();
        let (rebuilt, outputs) = self.rebuild(&document, compressed, &ctx, &mut stats)?;

        let written_files = self.write_outputs(&rebuilt, outputs, &ctx, &mut stats).await?;

        self.print_final_stats(&stats);
        if self.config.json_output {
            JsonMessage::complete(self.paths.svg_path.clone(), &stats, started.elapsed().as_secs_f64()).emit();
        }

        Ok(RunReport {
            output_svg: self.paths.svg_path.clone(),
            written_files,
            stats,
        })
    }

    /// Decodes and names every image in traversal order
    fn prepare_images(
        document: &Node,
        ctx: &TransformContext,
    ) -> Result<Vec<Option<PendingImage>>, OptimizeError> {
        let mut prepared = Vec::new();
        visit_images(document, &mut |element| {
            let index = prepared.len();
            prepared.push(pipeline::prepare(element, index, ctx)?);
            Ok(())
        })?;
        Ok(prepared)
    }

    async fn compress_all(
        &self,
        prepared: Vec<Option<PendingImage>>,
        candidates: usize,
    ) -> Result<Vec<Option<CompressedImage>>, OptimizeError> {
        let progress = if self.config.json_output || candidates == 0 {
            ProgressManager::hidden(candidates as u64)
        } else {
            ProgressManager::new(candidates as u64)
        };

        // Process images with controlled concurrency
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks = Vec::with_capacity(prepared.len());

        for pending in prepared {
            let Some(pending) = pending else {
                tasks.push(None);
                continue;
            };

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| OptimizeError::Internal(e.to_string()))?;
            let codec = Arc::clone(&self.codec);
            let progress = progress.clone();

            tasks.push(Some(tokio::task::spawn_blocking(move || {
                let _permit = permit; // Keep permit alive
                let stem = pending.name.stem.clone();
                let result = pending.compress(codec.as_ref());

                let message = match &result {
                    Ok(image) => format!(
                        "✅ {}: {:.1}% saved",
                        stem,
                        FileManager::calculate_reduction(image.source.len() as u64, image.bytes.len() as u64)
                    ),
                    Err(_) => format!("❌ {}: error", stem),
                };
                progress.update(&message);
                result
            })));
        }

        // Results keep traversal order; the first failure aborts the run
        let results = futures::future::try_join_all(tasks.into_iter().map(|task| async move {
            match task {
                None => Ok(None),
                Some(handle) => handle
                    .await
                    .map_err(|e| OptimizeError::Internal(format!("compression task failed: {}", e)))?
                    .map(Some),
            }
        }))
        .await;

        match &results {
            Ok(_) => progress.finish(&format!("✅ Compressed {} images", progress.position())),
            Err(e) => progress.abandon(&format!("❌ {}", e)),
        }
        results
    }

    /// Second walk: substitutes the compressed images in the same order
    fn rebuild(
        &self,
        document: &Node,
        compressed: Vec<Option<CompressedImage>>,
        ctx: &TransformContext,
        stats: &mut OptimizationStats,
    ) -> Result<(Node, Vec<ImageOutput>), OptimizeError> {
        let json_output = self.config.json_output;
        let mut queue = compressed.into_iter();
        let mut outputs = Vec::new();

        let rebuilt = transform(document, &mut |element: &Element| -> Result<Element, OptimizeError> {
            match queue.next() {
                Some(Some(image)) => {
                    let (index, stem, width, height) =
                        (image.index, image.name.stem.clone(), image.width, image.height);
                    let emitted = pipeline::emit(element, image, ctx);
                    let (original_size, compressed_size) =
                        (emitted.original_size as u64, emitted.compressed_size as u64);

                    debug!("Image #{} written as {} ({}x{})", index, stem, width, height);
                    stats.add_rewritten(original_size, compressed_size);
                    if json_output {
                        JsonMessage::ImageComplete {
                            index,
                            name: stem,
                            width,
                            height,
                            original_size,
                            compressed_size,
                            reduction_percent: FileManager::calculate_reduction(original_size, compressed_size),
                        }
                        .emit();
                    }

                    outputs.push(ImageOutput {
                        extracted: emitted.extracted,
                        source: emitted.source,
                    });
                    Ok(emitted.element)
                }
                Some(None) => {
                    stats.add_passed_through();
                    Ok(element.clone())
                }
                None => Err(OptimizeError::Internal(
                    "image count changed between document walks".to_string(),
                )),
            }
        })?;

        Ok((rebuilt, outputs))
    }

    async fn write_outputs(
        &self,
        document: &Node,
        outputs: Vec<ImageOutput>,
        ctx: &TransformContext,
        stats: &mut OptimizationStats,
    ) -> Result<Vec<PathBuf>, OptimizeError> {
        // Serialize before touching the disk
        let svg = write_document(document)?;

        let output_dir = &ctx.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| OptimizeError::Write {
                path: output_dir.clone(),
                source,
            })?;

        let keep_sources = self.config.mode == Mode::Extract && self.config.keep_extracted;
        let mut written = Vec::new();

        for output in outputs {
            let files = output
                .extracted
                .iter()
                .chain(keep_sources.then_some(&output.source));

            for file in files {
                let path = ctx.output_path_for(&file.file_name);
                if let Err(e) = FileManager::write_file(&path, &file.bytes).await {
                    Self::remove_partial_output(&written).await;
                    return Err(e);
                }
                stats.add_file_written();
                written.push(path);
            }
        }

        info!("Writing SVG: {}", self.paths.svg_path.display());
        if let Err(e) = FileManager::write_file(&self.paths.svg_path, svg.as_bytes()).await {
            Self::remove_partial_output(&written).await;
            return Err(e);
        }
        written.push(self.paths.svg_path.clone());

        Ok(written)
    }

    async fn remove_partial_output(written: &[PathBuf]) {
        let removed = FileManager::remove_files(written).await;
        warn!("Removed {} of {} files written before the failure", removed, written.len());
    }

    fn print_final_stats(&self, stats: &OptimizationStats) {
        info!("=== Optimization Complete ===");
        info!("{}", stats.format_summary());
        if stats.images_rewritten > 0 {
            info!("💾 Space saved: {}", FileManager::format_size(stats.bytes_saved()));
        }
        info!("Output document: {}", self.paths.svg_path.display());
    }
}

//! # SVG Image Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom, uno per fase del run
//! - `document`: Albero del documento SVG, parser e writer
//! - `transform`: Trasformazione pura dell'albero (visita e sostituzione delle `<image>`)
//! - `pipeline`: Decode, compressione ed emissione di una singola immagine
//! - `codec`: Adapter WebP (encoder integrato o `cwebp`)
//! - `context`: Contesto di trasformazione e nomi di output
//! - `sequencer`: Contatore atomico per i nomi dei file
//! - `optimizer`: Orchestratore principale del processo
//! - `file_manager`: Scrittura file e cleanup degli intermedi
//! - `platform` / `tool_resolver`: Ricerca dei tool esterni
//! - `progress` / `json_output`: Progress bar, statistiche ed eventi JSON
//!
//! ## Utilizzo:
//! ```ignore
//! use svg_image_optimizer::{Config, SvgOptimizer};
//!
//! let config = Config::default();
//! let optimizer = SvgOptimizer::new(&path, config)?;
//! optimizer.run().await?;
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod optimizer;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod sequencer;
pub mod tool_resolver;
pub mod transform;

pub use codec::{BuiltinWebpCodec, CompressRequest, CwebpCodec, ImageCodec};
pub use config::{CodecBackend, Config, Mode};
pub use context::{OutputName, TransformContext};
pub use document::{parse_document, write_document, Element, Node};
pub use error::OptimizeError;
pub use optimizer::{RunReport, SvgOptimizer};
pub use transform::{transform, NodeRewriter};

//! # Image Codec Module
//!
//! Adapter verso l'encoder WebP: riceve i byte grezzi dell'immagine, la
//! qualità e le dimensioni target, e restituisce i byte ricompressi.
//!
//! ## Backend disponibili
//!
//! | Backend | Come funziona |
//! |---------|---------------|
//! | `builtin` | Decodifica, resize e encoding WebP in-process con `image` |
//! | `cwebp` | Tool esterno `cwebp`, con file temporanei (`tempfile`) |
//!
//! Entrambi producono lo stesso formato (WebP lossy), un solo codec per run.
//!
//! ## Pipeline `builtin`
//! 1. **Decode**: `image::load_from_memory` (PNG, JPEG, GIF, BMP, WebP)
//! 2. **Resize**: Lanczos3, solo se le dimensioni target sono diverse
//! 3. **Encode**: `WebPEncoder` lossy con la qualità configurata
//!
//! ## Pipeline `cwebp`
//! ```text
//! cwebp -q <quality> -resize <w> <h> -m 4 -mt <input> -o <output>
//! ```
//!
//! Le chiamate sono bloccanti: l'orchestratore le esegue su
//! `tokio::task::spawn_blocking`.

use crate::config::CodecBackend;
use crate::error::OptimizeError;
use crate::platform::PlatformCommands;
use image::codecs::webp::{WebPEncoder, WebPQuality};
use image::imageops::FilterType;
use image::{ColorType, GenericImageView};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

pub const WEBP_EXTENSION: &str = "webp";
pub const WEBP_MIME_TYPE: &str = "image/webp";
/// Largest width or height a WebP bitstream can carry
pub const MAX_WEBP_DIMENSION: u32 = 16383;

/// Parameters of a single compression call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressRequest {
    /// WebP quality (0-100)
    pub quality: u8,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
}

/// Errors raised by a codec backend
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("{0}")]
    MissingTool(String),

    #[error("target size {width}x{height} is outside 1..={max} px")]
    Dimensions { width: u32, height: u32, max: u32 },
}

impl CompressRequest {
    /// Rejects sizes the encoder cannot produce, before anything is allocated
    pub fn check_dimensions(&self) -> Result<(), CodecError> {
        let valid = 1..=MAX_WEBP_DIMENSION;
        if valid.contains(&self.width) && valid.contains(&self.height) {
            Ok(())
        } else {
            Err(CodecError::Dimensions {
                width: self.width,
                height: self.height,
                max: MAX_WEBP_DIMENSION,
            })
        }
    }
}

/// Black-box WebP encoder
pub trait ImageCodec: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Recompresses `bytes` to WebP at the requested quality and size
    fn compress(&self, bytes: &[u8], request: &CompressRequest) -> Result<Vec<u8>, CodecError>;
}

/// Creates the codec for the configured backend
pub fn codec_for(backend: CodecBackend) -> Result<Arc<dyn ImageCodec>, OptimizeError> {
    match backend {
        CodecBackend::Builtin => Ok(Arc::new(BuiltinWebpCodec)),
        CodecBackend::Cwebp => CwebpCodec::locate()
            .map(|codec| Arc::new(codec) as Arc<dyn ImageCodec>)
            .map_err(|e| OptimizeError::Config(e.to_string())),
    }
}

/// In-process WebP encoder built on the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinWebpCodec;

impl ImageCodec for BuiltinWebpCodec {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn compress(&self, bytes: &[u8], request: &CompressRequest) -> Result<Vec<u8>, CodecError> {
        request.check_dimensions()?;
        let decoded = image::load_from_memory(bytes)?;
        let (source_width, source_height) = decoded.dimensions();

        let resized = if (source_width, source_height) != (request.width, request.height) {
            debug!(
                "Resizing {}x{} -> {}x{}",
                source_width, source_height, request.width, request.height
            );
            decoded.resize_exact(request.width, request.height, FilterType::Lanczos3)
        } else {
            decoded
        };

        let rgba = resized.to_rgba8();
        let mut output = Vec::new();
        // Lossy mode is deprecated upstream but still the only quality-driven encoder in 0.24.
        #[allow(deprecated)]
        WebPEncoder::new_with_quality(&mut output, WebPQuality::lossy(request.quality)).encode(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ColorType::Rgba8,
        )?;
        Ok(output)
    }
}

/// WebP encoder delegating to the external `cwebp` tool
#[derive(Debug, Clone)]
pub struct CwebpCodec {
    tool_path: PathBuf,
}

impl CwebpCodec {
    pub fn new(tool_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
        }
    }

    /// Finds `cwebp` in the bundled tools directory or on the PATH
    pub fn locate() -> Result<Self, CodecError> {
        PlatformCommands::instance()
            .get_tool_path("cwebp")
            .map(Self::new)
            .ok_or_else(|| {
                CodecError::MissingTool(
                    "cwebp is required for the cwebp codec. Please install webp tools.".to_string(),
                )
            })
    }

    fn arguments(request: &CompressRequest, input: &str, output: &str) -> Vec<String> {
        vec![
            "-quiet".to_string(),
            "-q".to_string(),
            request.quality.to_string(),
            "-resize".to_string(),
            request.width.to_string(),
            request.height.to_string(),
            "-m".to_string(),
            "4".to_string(),
            "-mt".to_string(),
            input.to_string(),
            "-o".to_string(),
            output.to_string(),
        ]
    }
}

impl ImageCodec for CwebpCodec {
    fn name(&self) -> &'static str {
        "cwebp"
    }

    fn compress(&self, bytes: &[u8], request: &CompressRequest) -> Result<Vec<u8>, CodecError> {
        request.check_dimensions()?;
        let mut input = tempfile::Builder::new().prefix("svg-image-").tempfile()?;
        input.write_all(bytes)?;
        input.flush()?;
        let output = tempfile::Builder::new()
            .prefix("svg-image-")
            .suffix(".webp")
            .tempfile()?;

        let args = Self::arguments(
            request,
            &input.path().to_string_lossy(),
            &output.path().to_string_lossy(),
        );
        debug!("Command arguments: {:?}", args);

        let start_time = std::time::Instant::now();
        let result = Command::new(&self.tool_path).args(&args).output()?;
        debug!("cwebp finished in {:?}", start_time.elapsed());

        if !result.status.success() {
            return Err(CodecError::Tool {
                tool: "cwebp".to_string(),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(std::fs::read(output.path())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn is_webp(bytes: &[u8]) -> bool {
        bytes.len() > 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
    }

    #[test]
    fn test_builtin_codec_produces_webp() {
        let request = CompressRequest { quality: 80, width: 8, height: 4 };
        let output = BuiltinWebpCodec.compress(&sample_png(8, 4), &request).unwrap();
        assert!(is_webp(&output));
    }

    #[test]
    fn test_builtin_codec_resizes_to_target() {
        let request = CompressRequest { quality: 50, width: 4, height: 2 };
        let output = BuiltinWebpCodec.compress(&sample_png(8, 4), &request).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (4, 2));
    }

    #[test]
    fn test_builtin_codec_rejects_corrupt_data() {
        let request = CompressRequest { quality: 80, width: 1, height: 1 };
        let result = BuiltinWebpCodec.compress(b"definitely not an image", &request);
        assert!(matches!(result, Err(CodecError::Image(_))));
    }

    #[test]
    fn test_oversized_request_is_rejected_before_decoding() {
        let request = CompressRequest { quality: 80, width: 1_000_000_000, height: 4 };
        let result = BuiltinWebpCodec.compress(&sample_png(8, 4), &request);
        assert!(matches!(result, Err(CodecError::Dimensions { width: 1_000_000_000, .. })));

        let codec = CwebpCodec::new("/nonexistent/cwebp-binary");
        let request = CompressRequest { quality: 80, width: 4, height: 0 };
        assert!(matches!(codec.compress(b"", &request), Err(CodecError::Dimensions { .. })));

        let request = CompressRequest { quality: 80, width: MAX_WEBP_DIMENSION, height: 1 };
        assert!(request.check_dimensions().is_ok());
    }

    #[test]
    fn test_cwebp_arguments() {
        let request = CompressRequest { quality: 75, width: 100, height: 50 };
        let args = CwebpCodec::arguments(&request, "in.png", "out.webp");
        assert_eq!(
            args,
            vec!["-quiet", "-q", "75", "-resize", "100", "50", "-m", "4", "-mt", "in.png", "-o", "out.webp"]
        );
    }

    #[test]
    fn test_cwebp_missing_binary_is_an_error() {
        let codec = CwebpCodec::new("/nonexistent/cwebp-binary");
        let request = CompressRequest { quality: 80, width: 1, height: 1 };
        assert!(codec.compress(&sample_png(1, 1), &request).is_err());
    }
}

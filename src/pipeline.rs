//! # Image Pipeline Module
//!
//! Elabora ogni nodo `<image>` trovato dal motore di trasformazione.
//!
//! ## Stati (lineari, senza retry):
//! ```text
//! pending ──prepare──▶ PendingImage ──compress──▶ CompressedImage ──emit──▶ EmittedImage
//!          (decode + dimensioni + nome)   (codec)                 (href nuovo)
//! ```
//!
//! ## Passi:
//! 1. **Validazione**: solo gli href `data:image/...` sono candidati, il resto passa invariato
//! 2. **Decode**: payload base64 dopo la prima virgola (`DecodeError` se non valido)
//! 3. **Dimensioni**: `width`/`height` dichiarati × coefficiente di resize
//! 4. **Compressione**: codec WebP (`CompressionError` se fallisce)
//! 5. **Nome**: `<base>_<contatore>`, riservato durante la visita
//! 6. **Emissione**: href al file (`extract`) o nuovo data URI WebP (`embed`)
//!
//! `prepare` ed `emit` sono economici e girano nell'ordine della visita;
//! `compress` è l'unico passo costoso e può girare in parallelo.
//! Gli attributi `width`/`height` del nodo restituito restano quelli dichiarati.

use crate::codec::{CompressRequest, ImageCodec, MAX_WEBP_DIMENSION, WEBP_EXTENSION, WEBP_MIME_TYPE};
use crate::config::Mode;
use crate::context::{OutputName, TransformContext};
use crate::document::Element;
use crate::error::OptimizeError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Href attributes checked on an image, in order of preference
pub const HREF_ATTRIBUTES: [&str; 2] = ["xlink:href", "href"];

const DATA_IMAGE_PREFIX: &str = "data:image/";

/// Standard alphabet, padding optional on decode
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extension used for sources of unknown media type
const FALLBACK_EXTENSION: &str = "bin";

/// A data-URI reference carried by an image element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageReference<'a> {
    /// Name of the attribute holding the href
    pub attribute: &'a str,
    /// Media type from the data URI header, e.g. `image/png`
    pub media_type: &'a str,
    /// Whether the header declares `;base64`
    pub is_base64: bool,
    /// Everything after the first comma
    pub payload: &'a str,
}

impl<'a> ImageReference<'a> {
    /// Returns the reference when the element carries a raster data URI.
    ///
    /// `None` for elements without attributes, without href, with an external
    /// href, or with an inline SVG (`image/svg+xml`), which is not a raster.
    pub fn from_element(element: &'a Element) -> Option<Self> {
        let (attribute, href) = HREF_ATTRIBUTES
            .iter()
            .find_map(|name| element.attribute(name).map(|value| (*name, value)))?;

        let href = href.trim_start();
        if !href.starts_with(DATA_IMAGE_PREFIX) {
            return None;
        }

        let (header, payload) = href.split_once(',').unwrap_or((href, ""));
        let mut parts = header["data:".len()..].split(';');
        let media_type = parts.next().unwrap_or_default();
        if media_type.eq_ignore_ascii_case("image/svg+xml") {
            return None;
        }
        let is_base64 = parts.any(|part| part.trim().eq_ignore_ascii_case("base64"));

        Some(Self {
            attribute,
            media_type,
            is_base64,
            payload,
        })
    }

    /// File extension matching the source media type.
    ///
    /// Known aliases are normalised; other subtypes are used as-is after
    /// dropping anything that is not ASCII alphanumeric.
    pub fn source_extension(&self) -> String {
        let media_type = self.media_type.trim().to_ascii_lowercase();
        let subtype = media_type.strip_prefix("image/").unwrap_or(&media_type);
        let extension = match subtype {
            "jpeg" | "jpg" | "pjpeg" => "jpg".to_string(),
            "x-ms-bmp" => "bmp".to_string(),
            "x-icon" | "vnd.microsoft.icon" => "ico".to_string(),
            "x-png" => "png".to_string(),
            other => other
                .trim_start_matches("x-")
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect(),
        };
        if extension.is_empty() {
            FALLBACK_EXTENSION.to_string()
        } else {
            extension
        }
    }
}

/// An image that has been decoded and named, waiting for the codec
#[derive(Debug, Clone)]
pub struct PendingImage {
    /// Position of the element among all images of the document
    pub index: usize,
    pub name: OutputName,
    pub href_attribute: String,
    pub source: Vec<u8>,
    pub source_extension: String,
    pub request: CompressRequest,
}

/// Codec output for one image
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub index: usize,
    pub name: OutputName,
    pub href_attribute: String,
    pub source: Vec<u8>,
    pub source_extension: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A file that must be written next to the rewritten document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Final result for one image element
#[derive(Debug, Clone)]
pub struct EmittedImage {
    pub element: Element,
    /// Recompressed file to write (extract mode only)
    pub extracted: Option<ExtractedImage>,
    /// Decoded source payload, available for `--keep-extracted`
    pub source: ExtractedImage,
    pub original_size: usize,
    pub compressed_size: usize,
}

/// Validates, decodes and names an image element.
///
/// Returns `Ok(None)` for pass-through elements. The output name is reserved
/// here, so names follow the traversal order.
pub fn prepare(
    element: &Element,
    index: usize,
    ctx: &TransformContext,
) -> Result<Option<PendingImage>, OptimizeError> {
    let Some(reference) = ImageReference::from_element(element) else {
        debug!("Image #{} has no embedded data URI, leaving it untouched", index);
        return Ok(None);
    };

    if !reference.is_base64 {
        return Err(OptimizeError::Decode {
            index,
            reason: format!("data URI for {} is not base64-encoded", reference.media_type),
        });
    }

    let source = decode_payload(reference.payload).map_err(|reason| OptimizeError::Decode { index, reason })?;
    let (width, height) = target_dimensions(element, ctx.resize, index)?;
    let name = ctx.reserve_name();

    debug!(
        "Image #{} ({}, {} bytes) -> {} at {}x{}",
        index,
        reference.media_type,
        source.len(),
        name.stem,
        width,
        height
    );

    Ok(Some(PendingImage {
        index,
        name,
        href_attribute: reference.attribute.to_string(),
        source,
        source_extension: reference.source_extension(),
        request: CompressRequest {
            quality: ctx.quality,
            width,
            height,
        },
    }))
}

impl PendingImage {
    /// Runs the codec; blocking
    pub fn compress(self, codec: &dyn ImageCodec) -> Result<CompressedImage, OptimizeError> {
        let bytes = codec
            .compress(&self.source, &self.request)
            .map_err(|e| OptimizeError::Compression {
                index: self.index,
                reason: e.to_string(),
            })?;

        Ok(CompressedImage {
            index: self.index,
            name: self.name,
            href_attribute: self.href_attribute,
            source: self.source,
            source_extension: self.source_extension,
            bytes,
            width: self.request.width,
            height: self.request.height,
        })
    }
}

/// Rewrites the element for the compressed image
pub fn emit(element: &Element, compressed: CompressedImage, ctx: &TransformContext) -> EmittedImage {
    let original_size = compressed.source.len();
    let compressed_size = compressed.bytes.len();
    let source = ExtractedImage {
        file_name: compressed.name.source_file_name(&compressed.source_extension),
        bytes: compressed.source,
    };

    match ctx.mode {
        Mode::Extract => {
            let href = ctx.href_for(&compressed.name);
            EmittedImage {
                element: element.replacing_attribute(&compressed.href_attribute, href),
                extracted: Some(ExtractedImage {
                    file_name: compressed.name.file_name(WEBP_EXTENSION),
                    bytes: compressed.bytes,
                }),
                source,
                original_size,
                compressed_size,
            }
        }
        Mode::Embed => EmittedImage {
            element: element.replacing_attribute(&compressed.href_attribute, data_uri(&compressed.bytes)),
            extracted: None,
            source,
            original_size,
            compressed_size,
        },
    }
}

/// Whole pipeline for one element, sequentially.
///
/// Pass-through elements come back as an unchanged copy with no side effect.
pub fn process_image(
    element: &Element,
    index: usize,
    ctx: &TransformContext,
    codec: &dyn ImageCodec,
) -> Result<Option<EmittedImage>, OptimizeError> {
    match prepare(element, index, ctx)? {
        Some(pending) => Ok(Some(emit(element, pending.compress(codec)?, ctx))),
        None => Ok(None),
    }
}

/// `data:image/webp;base64,...` for the given bytes
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", WEBP_MIME_TYPE, STANDARD.encode(bytes))
}

/// Decodes a base64 payload, ignoring ASCII whitespace from wrapped attributes
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, String> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err("empty base64 payload".to_string());
    }
    PAYLOAD_ENGINE.decode(compact.as_bytes()).map_err(|e| e.to_string())
}

/// Declared width/height multiplied by the resize coefficient, in whole pixels
pub fn target_dimensions(element: &Element, resize: f64, index: usize) -> Result<(u32, u32), OptimizeError> {
    if !resize.is_finite() || resize <= 0.0 {
        return Err(OptimizeError::Config(format!(
            "resize coefficient must be a positive number, got {}",
            resize
        )));
    }

    let width = scale(declared_length(element, "width", index)?, resize);
    let height = scale(declared_length(element, "height", index)?, resize);
    if width > MAX_WEBP_DIMENSION as f64 || height > MAX_WEBP_DIMENSION as f64 {
        return Err(OptimizeError::Config(format!(
            "image #{} target size {}x{} exceeds the WebP limit of {} px",
            index, width, height, MAX_WEBP_DIMENSION
        )));
    }
    Ok((width as u32, height as u32))
}

fn declared_length(element: &Element, attribute: &str, index: usize) -> Result<f64, OptimizeError> {
    let raw = element.attribute(attribute).ok_or_else(|| {
        OptimizeError::Config(format!("image #{} has no {} attribute", index, attribute))
    })?;
    parse_length(raw).ok_or_else(|| {
        OptimizeError::Config(format!(
            "image #{} has an unsupported {} value: {:?}",
            index, attribute, raw
        ))
    })
}

/// Parses a plain or `px` length; percentages and other units are rejected
pub fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim_end();
    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn scale(length: f64, resize: f64) -> f64 {
    (length * resize).round().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use std::sync::Mutex;

    /// Returns fixed bytes and remembers every request
    struct RecordingCodec {
        output: Vec<u8>,
        requests: Mutex<Vec<CompressRequest>>,
    }

    impl RecordingCodec {
        fn new(output: &[u8]) -> Self {
            Self {
                output: output.to_vec(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageCodec for RecordingCodec {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn compress(&self, _bytes: &[u8], request: &CompressRequest) -> Result<Vec<u8>, CodecError> {
            self.requests.lock().unwrap().push(*request);
            Ok(self.output.clone())
        }
    }

    struct FailingCodec;

    impl ImageCodec for FailingCodec {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn compress(&self, _bytes: &[u8], _request: &CompressRequest) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::Tool {
                tool: "failing".into(),
                message: "unsupported format".into(),
            })
        }
    }

    fn context(mode: Mode, resize: f64, prefix: &str) -> TransformContext {
        TransformContext::new("/tmp/out", "drawing", prefix, mode, 80, resize).unwrap()
    }

    fn image(href: &str) -> Element {
        Element::new("image")
            .with_attribute("x", "0")
            .with_attribute("xlink:href", href)
            .with_attribute("width", "100")
            .with_attribute("height", "50")
    }

    // "hello" in base64
    const PAYLOAD: &str = "data:image/png;base64,aGVsbG8=";

    #[test]
    fn test_reference_detection() {
        let element = image(PAYLOAD);
        let reference = ImageReference::from_element(&element).unwrap();
        assert_eq!(reference.attribute, "xlink:href");
        assert_eq!(reference.media_type, "image/png");
        assert!(reference.is_base64);
        assert_eq!(reference.payload, "aGVsbG8=");

        let svg2 = Element::new("image").with_attribute("href", "data:image/jpeg;base64,AAAA");
        let reference = ImageReference::from_element(&svg2).unwrap();
        assert_eq!(reference.attribute, "href");
        assert_eq!(reference.source_extension(), "jpg");
    }

    #[test]
    fn test_pass_through_elements() {
        assert!(ImageReference::from_element(&Element::new("image")).is_none());
        assert!(ImageReference::from_element(&Element::new("image").with_attribute("width", "1")).is_none());
        assert!(ImageReference::from_element(&image("photos/cat.png")).is_none());
        assert!(ImageReference::from_element(&image("https://example.com/cat.png")).is_none());
        assert!(ImageReference::from_element(&image("data:image/svg+xml;utf8,<svg/>")).is_none());
    }

    #[test]
    fn test_non_data_href_is_returned_unchanged() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"webp");
        let element = image("photos/cat.png");

        let result = process_image(&element, 0, &ctx, &codec).unwrap();
        assert!(result.is_none());
        assert!(codec.requests.lock().unwrap().is_empty());
        assert_eq!(ctx.reserve_name().index, 0);
    }

    #[test]
    fn test_extract_rewrites_href_to_generated_file() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"webp-bytes");
        let element = image(PAYLOAD);

        let emitted = process_image(&element, 0, &ctx, &codec).unwrap().unwrap();
        assert_eq!(emitted.element.attribute("xlink:href"), Some("drawing_0.webp"));
        assert_eq!(emitted.element.attribute("width"), Some("100"));
        assert_eq!(emitted.element.attribute("height"), Some("50"));
        assert_eq!(
            emitted.extracted,
            Some(ExtractedImage {
                file_name: "drawing_0.webp".to_string(),
                bytes: b"webp-bytes".to_vec()
            })
        );
        assert_eq!(emitted.source.file_name, "drawing_0.png");
        assert_eq!(emitted.source.bytes, b"hello");

        let keys: Vec<&str> = emitted.element.attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["x", "xlink:href", "width", "height"]);
    }

    #[test]
    fn test_extract_uses_href_prefix() {
        let ctx = context(Mode::Extract, 1.0, "../assets/");
        let codec = RecordingCodec::new(b"webp");
        let emitted = process_image(&image(PAYLOAD), 0, &ctx, &codec).unwrap().unwrap();
        assert_eq!(emitted.element.attribute("xlink:href"), Some("../assets/drawing_0.webp"));
    }

    #[test]
    fn test_embed_round_trip_matches_codec_output() {
        let ctx = context(Mode::Embed, 1.0, "");
        let codec_output: Vec<u8> = (0..=255).collect();
        let codec = RecordingCodec::new(&codec_output);

        let emitted = process_image(&image(PAYLOAD), 0, &ctx, &codec).unwrap().unwrap();
        let href = emitted.element.attribute("xlink:href").unwrap();
        assert!(href.starts_with("data:image/webp;base64,"));
        assert!(emitted.extracted.is_none());

        let decoded = decode_payload(&href["data:image/webp;base64,".len()..]).unwrap();
        assert_eq!(decoded, codec_output);
    }

    #[test]
    fn test_resize_law() {
        let codec = RecordingCodec::new(b"webp");

        let ctx = context(Mode::Embed, 1.0, "");
        process_image(&image(PAYLOAD), 0, &ctx, &codec).unwrap();
        let ctx = context(Mode::Embed, 0.5, "");
        process_image(&image(PAYLOAD), 0, &ctx, &codec).unwrap();
        let ctx = context(Mode::Embed, 2.0, "");
        process_image(&image(PAYLOAD), 0, &ctx, &codec).unwrap();

        let requests = codec.requests.lock().unwrap();
        let sizes: Vec<(u32, u32)> = requests.iter().map(|r| (r.width, r.height)).collect();
        assert_eq!(sizes, vec![(100, 50), (50, 25), (200, 100)]);
        assert!(requests.iter().all(|r| r.quality == 80));
    }

    #[test]
    fn test_invalid_base64_is_a_decode_error() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"webp");
        let result = process_image(&image("data:image/png;base64,@@not base64!!"), 7, &ctx, &codec);
        assert!(matches!(result, Err(OptimizeError::Decode { index: 7, .. })));
        assert!(codec.requests.lock().unwrap().is_empty());

        let result = process_image(&image("data:image/png;base64,"), 0, &ctx, &codec);
        assert!(matches!(result, Err(OptimizeError::Decode { .. })));

        let result = process_image(&image("data:image/png,rawbytes"), 0, &ctx, &codec);
        assert!(matches!(result, Err(OptimizeError::Decode { .. })));
    }

    #[test]
    fn test_wrapped_payload_is_accepted() {
        assert_eq!(decode_payload("aGVs\n  bG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_unpadded_payload_is_accepted() {
        assert_eq!(decode_payload("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode_payload("aGk").unwrap(), b"hi");
    }

    #[test]
    fn test_source_extension_follows_media_type() {
        let extension = |href: &str| {
            let element = image(href);
            ImageReference::from_element(&element).unwrap().source_extension()
        };
        assert_eq!(extension("data:image/png;base64,AAAA"), "png");
        assert_eq!(extension("data:image/JPEG;base64,AAAA"), "jpg");
        assert_eq!(extension("data:image/tiff;base64,AAAA"), "tiff");
        assert_eq!(extension("data:image/x-icon;base64,AAAA"), "ico");
        assert_eq!(extension("data:image/avif;base64,AAAA"), "avif");
        assert_eq!(extension("data:image/;base64,AAAA"), "bin");
    }

    #[test]
    fn test_kept_webp_source_does_not_shadow_output() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"recompressed");
        let element = image("data:image/webp;base64,aGVsbG8=");

        let emitted = process_image(&element, 0, &ctx, &codec).unwrap().unwrap();
        let extracted = emitted.extracted.unwrap();
        assert_eq!(extracted.file_name, "drawing_0.webp");
        assert_eq!(extracted.bytes, b"recompressed");
        assert_eq!(emitted.source.file_name, "drawing_0.source.webp");
        assert_eq!(emitted.source.bytes, b"hello");
    }

    #[test]
    fn test_oversized_target_is_rejected_before_compression() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"webp");

        let element = image(PAYLOAD).replacing_attribute("width", "1e9");
        let result = process_image(&element, 3, &ctx, &codec);
        assert!(matches!(result, Err(OptimizeError::Config(_))));

        let element = image(PAYLOAD).replacing_attribute("height", "10000");
        let ctx = context(Mode::Extract, 2.0, "");
        assert!(matches!(process_image(&element, 0, &ctx, &codec), Err(OptimizeError::Config(_))));
        assert!(codec.requests.lock().unwrap().is_empty());

        let element = image(PAYLOAD).replacing_attribute("width", "16383");
        assert_eq!(target_dimensions(&element, 1.0, 0).unwrap(), (16383, 50));
    }

    #[test]
    fn test_missing_dimensions_are_config_errors() {
        let ctx = context(Mode::Extract, 1.0, "");
        let codec = RecordingCodec::new(b"webp");
        let element = Element::new("image").with_attribute("xlink:href", PAYLOAD).with_attribute("width", "10");
        assert!(matches!(process_image(&element, 0, &ctx, &codec), Err(OptimizeError::Config(_))));

        let element = image(PAYLOAD).replacing_attribute("width", "50%");
        assert!(matches!(process_image(&element, 0, &ctx, &codec), Err(OptimizeError::Config(_))));
        assert!(codec.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_codec_failure_is_a_compression_error() {
        let ctx = context(Mode::Extract, 1.0, "");
        let result = process_image(&image(PAYLOAD), 2, &ctx, &FailingCodec);
        assert!(matches!(result, Err(OptimizeError::Compression { index: 2, .. })));
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("100"), Some(100.0));
        assert_eq!(parse_length(" 12.5px "), Some(12.5));
        assert_eq!(parse_length("50%"), None);
        assert_eq!(parse_length("3em"), None);
        assert_eq!(parse_length("0"), None);
        assert_eq!(parse_length("-4"), None);
    }

    #[test]
    fn test_tiny_images_never_scale_to_zero() {
        let element = image(PAYLOAD).replacing_attribute("width", "1").replacing_attribute("height", "1");
        assert_eq!(target_dimensions(&element, 0.1, 0).unwrap(), (1, 1));
        assert!(matches!(target_dimensions(&element, 0.0, 0), Err(OptimizeError::Config(_))));
    }
}

//! Trait-based image decoding with format detection.
//!
//! New formats are added by implementing [`Decoder`] and registering the
//! implementation with a [`DecoderRegistry`].

use ndarray::Array3;

use super::decoders::{ImageDecoder, NpyDecoder};
use super::error::DecodeError;
use crate::data::MetaData;

/// Pixels and metadata of one decoded source.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Pixel data as `(frames, rows, columns)`.
    pub pixels: Array3<f32>,
    pub meta: MetaData,
}

/// A decoder for one family of formats.
pub trait Decoder {
    /// Unique identifier for this decoder (e.g., "image", "npy").
    fn id(&self) -> &'static str;

    /// File extensions this decoder handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check magic bytes or headers for format auto-detection.
    fn can_decode(&self, data: &[u8]) -> bool;

    fn decode(&self, data: &[u8]) -> Result<DecodedImage, DecodeError>;

    /// Higher priority decoders are tried first.
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of available decoders.
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn Decoder>>,
}

impl DecoderRegistry {
    /// Create a registry with the built-in decoders.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ImageDecoder));
        registry.register(Box::new(NpyDecoder));
        registry
    }

    /// Create a registry without any decoder.
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    pub fn register(&mut self, decoder: Box<dyn Decoder>) {
        self.decoders.push(decoder);
        // Stable sort keeps registration order on priority ties.
        self.decoders
            .sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// All supported file extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .decoders
            .iter()
            .flat_map(|d| d.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    pub fn is_supported_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    /// Decode, auto-detecting the format.
    ///
    /// Tries decoders in this order:
    /// 1. By file extension (if a name is given)
    /// 2. By magic byte detection
    /// 3. All decoders as fallback
    pub fn decode(&self, data: &[u8], name: Option<&str>) -> Result<DecodedImage, DecodeError> {
        let extension = name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());

        if let Some(ext) = &extension {
            for decoder in self
                .decoders
                .iter()
                .filter(|d| d.extensions().contains(&ext.as_str()))
            {
                match decoder.decode(data) {
                    Ok(image) => {
                        log::debug!("Decoded with {} decoder (by extension)", decoder.id());
                        return Ok(image);
                    }
                    Err(e) => log::trace!("Decoder {} failed: {}", decoder.id(), e),
                }
            }
        }

        if let Some(decoder) = self.decoders.iter().find(|d| d.can_decode(data)) {
            match decoder.decode(data) {
                Ok(image) => {
                    log::debug!("Decoded with {} decoder (by detection)", decoder.id());
                    return Ok(image);
                }
                Err(e) => log::trace!("Detected decoder {} failed: {}", decoder.id(), e),
            }
        }

        for decoder in &self.decoders {
            if let Ok(image) = decoder.decode(data) {
                log::debug!("Decoded with {} decoder (fallback)", decoder.id());
                return Ok(image);
            }
        }

        Err(DecodeError::new(format!(
            "No decoder could handle the data{}",
            name.map(|n| format!(" ({})", n)).unwrap_or_default()
        )))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts anything starting with `RAW` and returns a 1x1 image.
    struct RawDecoder;

    impl Decoder for RawDecoder {
        fn id(&self) -> &'static str {
            "raw"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["raw"]
        }

        fn can_decode(&self, data: &[u8]) -> bool {
            data.starts_with(b"RAW")
        }

        fn decode(&self, data: &[u8]) -> Result<DecodedImage, DecodeError> {
            if !self.can_decode(data) {
                return Err(DecodeError::new("missing RAW header").with_decoder("raw"));
            }
            Ok(DecodedImage {
                pixels: Array3::zeros((1, 1, 1)),
                meta: MetaData::new().with("Format", "raw"),
            })
        }

        fn priority(&self) -> i32 {
            20
        }
    }

    #[test]
    fn test_supported_extensions() {
        let registry = DecoderRegistry::new();
        let extensions = registry.supported_extensions();
        assert!(extensions.contains(&"png"));
        assert!(extensions.contains(&"npy"));
        assert!(registry.is_supported_file("IMAGE.PNG"));
        assert!(!registry.is_supported_file("report.pdf"));
    }

    #[test]
    fn test_detection_without_extension() {
        let mut registry = DecoderRegistry::new();
        registry.register(Box::new(RawDecoder));
        let image = registry.decode(b"RAW....", None).unwrap();
        assert_eq!(image.meta.get("Format").unwrap(), "raw");
    }

    #[test]
    fn test_wrong_extension_falls_back_to_detection() {
        let mut registry = DecoderRegistry::new();
        registry.register(Box::new(RawDecoder));
        let image = registry.decode(b"RAW....", Some("mislabelled.png")).unwrap();
        assert_eq!(image.pixels.shape(), &[1, 1, 1]);
    }

    #[test]
    fn test_undecodable_data() {
        let registry = DecoderRegistry::new();
        let err = registry.decode(b"not an image", Some("x.bin")).unwrap_err();
        assert!(err.message.contains("x.bin"));
    }
}

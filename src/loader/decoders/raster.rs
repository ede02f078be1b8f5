//! Decoder for standard raster formats (PNG, JPEG, BMP, TIFF, WebP).
//!
//! Colour images are reduced to luminance; the result is a single frame.

use ndarray::{Array2, Axis};

use crate::data::MetaData;
use crate::loader::decoder::{DecodedImage, Decoder};
use crate::loader::error::DecodeError;

pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn id(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"]
    }

    fn can_decode(&self, data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedImage, DecodeError> {
        let format = image::guess_format(data)
            .map_err(|e| DecodeError::new(e.to_string()).with_decoder(self.id()))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| {
                DecodeError::new(format!("Failed to decode image: {}", e)).with_decoder(self.id())
            })?
            .to_luma32f();

        let columns = img.width() as usize;
        let rows = img.height() as usize;
        let pixels = Array2::from_shape_vec((rows, columns), img.into_raw())
            .map_err(|e| DecodeError::new(e.to_string()).with_decoder(self.id()))?
            .insert_axis(Axis(0));

        log::trace!("ImageDecoder: decoded {}x{} {:?} image", columns, rows, format);

        let meta = MetaData::new()
            .with("Format", format!("{:?}", format).to_lowercase())
            .with("Columns", columns)
            .with("Rows", rows)
            .with("NumberOfFrames", 1);
        Ok(DecodedImage { pixels, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_fn(width, height, |x, y| image::Luma([(x + y) as u8 * 10]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_magic_detection() {
        let decoder = ImageDecoder;
        assert!(decoder.can_decode(&png_bytes(2, 2)));
        assert!(!decoder.can_decode(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]));
    }

    #[test]
    fn test_decode_png_shape_and_meta() {
        let decoded = ImageDecoder.decode(&png_bytes(5, 3)).unwrap();
        assert_eq!(decoded.pixels.shape(), &[1, 3, 5]);
        assert_eq!(decoded.meta.get("Format").unwrap(), "png");
        assert_eq!(decoded.meta.get_f64("Columns"), Some(5.0));
        // Luminance is normalised to [0, 1].
        assert_eq!(decoded.pixels[[0, 0, 0]], 0.0);
        assert!((decoded.pixels[[0, 2, 4]] - 60.0 / 255.0).abs() < 1e-4);
    }

    #[test]
    fn test_truncated_data_fails() {
        let bytes = png_bytes(4, 4);
        let err = ImageDecoder.decode(&bytes[..20]).unwrap_err();
        assert_eq!(err.decoder, Some("image"));
    }
}

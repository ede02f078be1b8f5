//! Decoder for NumPy `.npy` files.
//!
//! **Accepted array shapes**:
//! - 2D `(rows, columns)`: one frame
//! - 3D `(frames, rows, columns)`: multi-frame slice
//!
//! Supported data types: `f32`, `f64`, `u8`, `u16`, `i16`, `i32`. Values are
//! kept as-is (no normalisation) so that stored intensities survive.

use std::io::Cursor;

use ndarray::{ArrayD, Axis, Ix2, Ix3};
use ndarray_npy::ReadNpyExt;

use crate::data::MetaData;
use crate::loader::decoder::{DecodedImage, Decoder};
use crate::loader::error::DecodeError;

pub struct NpyDecoder;

impl NpyDecoder {
    /// NumPy magic bytes: \x93NUMPY
    const MAGIC: &'static [u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

    fn to_decoded<T>(array: ArrayD<T>, dtype: &str) -> Result<DecodedImage, DecodeError>
    where
        T: ToPixel + Copy,
    {
        let shape = array.shape().to_vec();
        log::debug!("NpyDecoder: array shape = {:?} ({})", shape, dtype);
        let pixels = array.mapv(ToPixel::to_pixel);

        let pixels = match shape.len() {
            2 => pixels
                .into_dimensionality::<Ix2>()
                .map_err(|e| DecodeError::new(e.to_string()))?
                .insert_axis(Axis(0)),
            3 => pixels
                .into_dimensionality::<Ix3>()
                .map_err(|e| DecodeError::new(e.to_string()))?,
            n => {
                return Err(DecodeError::new(format!(
                    "Unsupported array dimensions: {} (expected 2 or 3)",
                    n
                )));
            }
        };

        let (frames, rows, columns) = pixels.dim();
        let meta = MetaData::new()
            .with("Format", "npy")
            .with("DataType", dtype)
            .with("Columns", columns)
            .with("Rows", rows)
            .with("NumberOfFrames", frames);
        Ok(DecodedImage { pixels, meta })
    }
}

impl Decoder for NpyDecoder {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn can_decode(&self, data: &[u8]) -> bool {
        data.starts_with(Self::MAGIC)
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedImage, DecodeError> {
        let result = if let Ok(array) = ArrayD::<f32>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "f32")
        } else if let Ok(array) = ArrayD::<f64>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "f64")
        } else if let Ok(array) = ArrayD::<u8>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "u8")
        } else if let Ok(array) = ArrayD::<u16>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "u16")
        } else if let Ok(array) = ArrayD::<i16>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "i16")
        } else if let Ok(array) = ArrayD::<i32>::read_npy(Cursor::new(data)) {
            Self::to_decoded(array, "i32")
        } else {
            Err(DecodeError::new(
                "Failed to read NumPy array: unsupported dtype or invalid format",
            ))
        };
        result.map_err(|e| e.with_decoder(self.id()))
    }

    fn priority(&self) -> i32 {
        // Checked before generic images
        10
    }
}

/// Conversion of stored values to pixel intensities.
trait ToPixel {
    fn to_pixel(self) -> f32;
}

impl ToPixel for f32 {
    fn to_pixel(self) -> f32 {
        self
    }
}

impl ToPixel for f64 {
    fn to_pixel(self) -> f32 {
        self as f32
    }
}

impl ToPixel for u8 {
    fn to_pixel(self) -> f32 {
        f32::from(self)
    }
}

impl ToPixel for u16 {
    fn to_pixel(self) -> f32 {
        f32::from(self)
    }
}

impl ToPixel for i16 {
    fn to_pixel(self) -> f32 {
        f32::from(self)
    }
}

impl ToPixel for i32 {
    fn to_pixel(self) -> f32 {
        self as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use ndarray_npy::WriteNpyExt;

    fn npy_bytes<A: WriteNpyExt>(array: &A) -> Vec<u8> {
        let mut bytes = Vec::new();
        array.write_npy(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_magic_detection() {
        let decoder = NpyDecoder;
        assert!(decoder.can_decode(&[0x93, b'N', b'U', b'M', b'P', b'Y', 0x01, 0x00]));
        assert!(!decoder.can_decode(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn test_decode_2d_u16() {
        let array = Array2::<u16>::from_shape_fn((3, 4), |(r, c)| (r * 100 + c) as u16);
        let decoded = NpyDecoder.decode(&npy_bytes(&array)).unwrap();
        assert_eq!(decoded.pixels.shape(), &[1, 3, 4]);
        assert_eq!(decoded.pixels[[0, 2, 3]], 203.0);
        assert_eq!(decoded.meta.get("DataType").unwrap(), "u16");
    }

    #[test]
    fn test_decode_3d_frames() {
        let array = Array3::<f32>::from_elem((2, 3, 4), 0.5);
        let decoded = NpyDecoder.decode(&npy_bytes(&array)).unwrap();
        assert_eq!(decoded.pixels.shape(), &[2, 3, 4]);
        assert_eq!(decoded.meta.get_f64("NumberOfFrames"), Some(2.0));
    }

    #[test]
    fn test_unsupported_dimensions() {
        let array = ndarray::Array1::<f32>::zeros(5);
        let err = NpyDecoder.decode(&npy_bytes(&array)).unwrap_err();
        assert_eq!(err.decoder, Some("npy"));
        assert!(err.message.contains("dimensions"));
    }
}

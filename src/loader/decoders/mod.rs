//! Built-in decoders.

mod npy;
mod raster;

pub use npy::NpyDecoder;
pub use raster::ImageDecoder;

//! Owned volumetric image: an ordered stack of multi-frame slices.

use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Errors raised when combining volumes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VolumeError {
    /// The appended slice does not have the volume's in-plane size.
    #[error("Slice size {found_columns}x{found_rows} does not match volume size {columns}x{rows}")]
    GeometryMismatch {
        columns: usize,
        rows: usize,
        found_columns: usize,
        found_rows: usize,
    },

    /// The volume to append holds no slices.
    #[error("Cannot append an empty volume")]
    Empty,
}

/// Where the slices of one append landed.
///
/// Each step is the index a slice was inserted at, relative to the volume as
/// it was at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    steps: Vec<usize>,
}

impl Insertion {
    /// Final index of the first slice inserted.
    pub fn first(&self) -> usize {
        let mut steps = self.steps.iter();
        let first = steps.next().copied().unwrap_or_default();
        steps.fold(first, |first, &step| if step <= first { first + 1 } else { first })
    }

    pub fn count(&self) -> usize {
        self.steps.len()
    }

    /// Index of a slice that sat at `index` before the append.
    pub fn shift(&self, index: usize) -> usize {
        self.steps
            .iter()
            .fold(index, |index, &step| if step <= index { index + 1 } else { index })
    }
}

/// One 2-D image position within the volume, possibly with several frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Position along the stacking axis; slices are ordered by it.
    pub position: f64,
    /// Pixel data as `(frames, rows, columns)`.
    pub frames: Array3<f32>,
}

impl Slice {
    /// Create a slice from frame data shaped `(frames, rows, columns)`.
    pub fn new(position: f64, frames: Array3<f32>) -> Self {
        Self { position, frames }
    }

    /// Create a single-frame slice from a `(rows, columns)` image.
    pub fn single_frame(position: f64, pixels: Array2<f32>) -> Self {
        Self {
            position,
            frames: pixels.insert_axis(Axis(0)),
        }
    }

    pub fn number_of_frames(&self) -> usize {
        self.frames.shape()[0]
    }

    pub fn rows(&self) -> usize {
        self.frames.shape()[1]
    }

    pub fn columns(&self) -> usize {
        self.frames.shape()[2]
    }

    /// Pixels of one frame, if it exists.
    pub fn frame(&self, frame: usize) -> Option<ArrayView2<'_, f32>> {
        (frame < self.number_of_frames()).then(|| self.frames.index_axis(Axis(0), frame))
    }
}

/// Decoded volumetric (slices) and temporal (frames) image.
///
/// Slices are kept sorted by [`Slice::position`]. New slices that share a
/// position with existing ones are placed after them.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    columns: usize,
    rows: usize,
    slices: Vec<Slice>,
}

impl Volume {
    /// Create a volume holding a single slice.
    pub fn from_slice(slice: Slice) -> Self {
        Self {
            columns: slice.columns(),
            rows: slice.rows(),
            slices: vec![slice],
        }
    }

    /// Create a volume from several slices of identical size.
    pub fn from_slices(slices: Vec<Slice>) -> Result<Self, VolumeError> {
        let mut iter = slices.into_iter();
        let first = iter.next().ok_or(VolumeError::Empty)?;
        let mut volume = Self::from_slice(first);
        for slice in iter {
            volume.insert_slice(slice)?;
        }
        Ok(volume)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn number_of_slices(&self) -> usize {
        self.slices.len()
    }

    /// Largest frame count over all slices.
    pub fn number_of_frames(&self) -> usize {
        self.slices
            .iter()
            .map(Slice::number_of_frames)
            .max()
            .unwrap_or(0)
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    pub fn slice(&self, index: usize) -> Option<&Slice> {
        self.slices.get(index)
    }

    /// Insert one slice in position order and return where it landed.
    pub fn insert_slice(&mut self, slice: Slice) -> Result<usize, VolumeError> {
        if slice.columns() != self.columns || slice.rows() != self.rows {
            return Err(VolumeError::GeometryMismatch {
                columns: self.columns,
                rows: self.rows,
                found_columns: slice.columns(),
                found_rows: slice.rows(),
            });
        }
        let index = self
            .slices
            .partition_point(|existing| existing.position <= slice.position);
        self.slices.insert(index, slice);
        Ok(index)
    }

    /// Insert every slice of `other` in position order.
    ///
    /// The whole append is rejected if any slice has a different size.
    pub fn append(&mut self, other: Volume) -> Result<Insertion, VolumeError> {
        if other.slices.is_empty() {
            return Err(VolumeError::Empty);
        }
        if other.columns != self.columns || other.rows != self.rows {
            return Err(VolumeError::GeometryMismatch {
                columns: self.columns,
                rows: self.rows,
                found_columns: other.columns,
                found_rows: other.rows,
            });
        }
        let mut steps = Vec::with_capacity(other.slices.len());
        for slice in other.slices {
            steps.push(self.insert_slice(slice)?);
        }
        Ok(Insertion { steps })
    }
}

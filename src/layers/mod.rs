//! Rendering layers and the manager that owns their lifecycle.
//!
//! Pixel rendering itself is out of scope: a layer keeps the navigation state,
//! geometry and drawings a renderer would need and reports render passes on the
//! event bus it is bound to.

mod draw_layer;
mod manager;
mod transform;
mod view_layer;

use serde::{Deserialize, Serialize};

pub use draw_layer::{DrawLayer, Drawing, DrawingDetails};
pub use manager::{Layer, LayerManager};
pub use transform::LayerTransform;
pub use view_layer::{ViewController, ViewLayer};

/// Identifier of a layer, unique within one [`LayerManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(u64);

impl LayerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// 2-D point, in display or index space depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-axis scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Voxel position: column `i`, row `j`, slice `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl Position {
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }

    /// Same in-plane position on another slice.
    pub fn with_k(self, k: usize) -> Self {
        Self { k, ..self }
    }
}

//! Global constants for the viewer

pub const APP_NAME: &str = "medview";

/// Layer container size used when none is configured.
pub const DEFAULT_CONTAINER_SIZE: (f64, f64) = (512.0, 512.0);

/// Zoom limit relative to the fitted scale.
pub const DEFAULT_MAX_ZOOM_FACTOR: f64 = 3.0;

/// Default undo history depth.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Vertical/horizontal drag distance (pixels) that steps one slice/frame.
pub const SCROLL_DRAG_THRESHOLD: f64 = 15.0;

/// Relative zoom step per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

/// Version written into state snapshots.
pub const STATE_VERSION: &str = "0.5";

//! Save and restore the viewing state: position, zoom, opacity and drawings.

use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::constants::STATE_VERSION;
use crate::layers::{Drawing, Point, Position};

/// Errors that can occur when reading or applying a state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to parse state: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("State version {found} is newer than supported version {supported}")]
    VersionTooNew { found: String, supported: String },

    #[error("Invalid state version '{0}'")]
    InvalidVersion(String),

    #[error("Invalid state value: {0}")]
    InvalidValue(String),

    /// There is no view layer to capture from or apply to.
    #[error("No data loaded")]
    NoLayers,
}

/// Serializable viewing state of the active layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub version: String,
    pub position: Position,
    pub frame: usize,
    /// Zoom relative to the fitted scale.
    pub scale: f64,
    pub offset: Point,
    pub opacity: f64,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
}

/// "major.minor" as numbers.
fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

impl AppState {
    /// Capture the state of the active view and draw layers.
    pub fn capture(app: &App) -> Result<Self, StateError> {
        let layers = app.layers();
        let view = layers.active_view_layer().ok_or(StateError::NoLayers)?;
        let drawings = layers
            .active_draw_layer()
            .map(|draw| draw.drawings().to_vec())
            .unwrap_or_default();
        Ok(Self {
            version: STATE_VERSION.to_string(),
            position: view.view().position(),
            frame: view.view().frame(),
            scale: layers.added_scale(),
            offset: layers.offset(),
            opacity: view.opacity(),
            drawings,
        })
    }

    /// Reject geometry the layer group cannot recover from.
    pub fn validate(&self) -> Result<(), StateError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(StateError::InvalidValue(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !self.offset.x.is_finite() || !self.offset.y.is_finite() {
            return Err(StateError::InvalidValue(format!(
                "offset must be finite, got {:?}",
                self.offset
            )));
        }
        if !self.opacity.is_finite() {
            return Err(StateError::InvalidValue(format!(
                "opacity must be finite, got {}",
                self.opacity
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a state, refusing versions this build does not know.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let state: Self = serde_json::from_str(json)?;
        let found = parse_version(&state.version)
            .ok_or_else(|| StateError::InvalidVersion(state.version.clone()))?;
        let supported = parse_version(STATE_VERSION)
            .ok_or_else(|| StateError::InvalidVersion(STATE_VERSION.to_string()))?;
        if found > supported {
            return Err(StateError::VersionTooNew {
                found: state.version,
                supported: STATE_VERSION.to_string(),
            });
        }
        state.validate()?;
        Ok(state)
    }

    /// Apply the state to the active layers.
    ///
    /// The zoom is capped at the configured maximum. Drawings replace the
    /// drawings of the active draw layer; they are not recorded in the undo
    /// history.
    pub fn apply(&self, app: &mut App) -> Result<(), StateError> {
        self.validate()?;
        let layers = app.layers_mut();
        let view = layers.active_view_layer_mut().ok_or(StateError::NoLayers)?;
        if !view.set_current_position(self.position, false) {
            log::warn!("AppState: position {:?} out of range", self.position);
        }
        if !view.set_current_frame(self.frame) {
            log::warn!("AppState: frame {} out of range", self.frame);
        }
        view.set_opacity(self.opacity);

        let max_zoom = layers.max_zoom_factor();
        if self.scale > max_zoom {
            log::warn!("AppState: zoom {} capped at {}", self.scale, max_zoom);
        }
        layers.set_zoom_and_offset(self.scale.min(max_zoom), self.offset);

        match layers.active_draw_layer_mut() {
            Some(draw) => {
                draw.delete_all();
                for drawing in &self.drawings {
                    draw.add(drawing.clone());
                }
            }
            None if !self.drawings.is_empty() => {
                log::warn!(
                    "AppState: {} drawing(s) dropped, no draw layer",
                    self.drawings.len()
                );
            }
            None => {}
        }
        app.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::config::AppConfig;
    use crate::data::{MetaData, Slice, Volume};
    use crate::loader::{ItemData, LoadEvent, LoadItem, LoadType, Source};

    fn app_with_image() -> App {
        let mut app = App::new(AppConfig::default());
        let source = Source::Buffer {
            name: "slice".to_string(),
        };
        app.handle_load_event(LoadEvent::Start {
            load_type: LoadType::Image,
            sources: vec![source.clone()],
        });
        app.handle_load_event(LoadEvent::Item(LoadItem {
            source: source.clone(),
            load_type: Some(LoadType::Image),
            data: Some(ItemData::Image {
                image: Volume::from_slice(Slice::new(0.0, Array3::zeros((1, 8, 8)))),
                meta: MetaData::new(),
            }),
        }));
        app.handle_load_event(LoadEvent::End {
            load_type: LoadType::Image,
            sources: vec![source],
        });
        app
    }

    fn state(version: &str) -> AppState {
        AppState {
            version: version.to_string(),
            position: Position::new(1, 2, 0),
            frame: 0,
            scale: 1.5,
            offset: Point::new(3.0, 4.0),
            opacity: 0.5,
            drawings: Vec::new(),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let original = state(STATE_VERSION);
        let parsed = AppState::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_older_version_accepted() {
        let json = state("0.3").to_json().unwrap();
        assert!(AppState::from_json(&json).is_ok());
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = state("0.10").to_json().unwrap();
        assert!(matches!(
            AppState::from_json(&json),
            Err(StateError::VersionTooNew { .. })
        ));
        let json = state("latest").to_json().unwrap();
        assert!(matches!(
            AppState::from_json(&json),
            Err(StateError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_missing_drawings_default_to_empty() {
        let json = r#"{"version":"0.5","position":{"i":0,"j":0,"k":0},"frame":0,
            "scale":1.0,"offset":{"x":0.0,"y":0.0},"opacity":1.0}"#;
        assert!(AppState::from_json(json).unwrap().drawings.is_empty());
    }

    #[test]
    fn test_degenerate_scale_rejected() {
        for scale in [0.0, -1.5] {
            let mut bad = state(STATE_VERSION);
            bad.scale = scale;
            assert!(matches!(
                AppState::from_json(&bad.to_json().unwrap()),
                Err(StateError::InvalidValue(_))
            ));
        }
        let mut bad = state(STATE_VERSION);
        bad.scale = f64::INFINITY;
        assert!(matches!(bad.validate(), Err(StateError::InvalidValue(_))));
        let mut bad = state(STATE_VERSION);
        bad.opacity = f64::NAN;
        assert!(matches!(bad.validate(), Err(StateError::InvalidValue(_))));
    }

    #[test]
    fn test_apply_refuses_zero_scale() {
        let mut app = app_with_image();
        let mut bad = state(STATE_VERSION);
        bad.position = Position::new(0, 0, 0);
        bad.scale = 0.0;
        assert!(matches!(bad.apply(&mut app), Err(StateError::InvalidValue(_))));

        assert_eq!(app.layers().added_scale(), 1.0);
        assert!(app.zoom(0.5, 0.0, 0.0));
        let index = app.layers().display_to_index(Point::new(10.0, 10.0));
        assert!(index.x.is_finite() && index.y.is_finite());
    }

    #[test]
    fn test_apply_caps_scale_at_max_zoom() {
        let mut app = app_with_image();
        let mut big = state(STATE_VERSION);
        big.position = Position::new(0, 0, 0);
        big.scale = 50.0;
        big.apply(&mut app).unwrap();
        assert_eq!(app.layers().added_scale(), app.config().view.max_zoom_factor);
    }

    #[test]
    fn test_capture_without_data() {
        let app = App::new(crate::config::AppConfig::default());
        assert!(matches!(AppState::capture(&app), Err(StateError::NoLayers)));
    }
}

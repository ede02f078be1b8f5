//! Configuration file support for the viewer.
//!
//! The configuration selects the tools, the view behaviour on load, the
//! number of datasets shown side by side and the undo history depth. It is
//! stored as JSON (next to the user config on native, in localStorage on WASM).

use serde::{Deserialize, Serialize};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Parse a level name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(name))
    }

    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Convert to log crate's Level (used by console_log).
    pub fn to_level(&self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub view: ViewConfig,

    /// Tools to set up, in toolbar order. The first one is selected initially.
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolConfig>,

    /// Tool names that work on a draw layer.
    #[serde(default = "default_drawing_tools")]
    pub drawing_tools: Vec<String>,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_app_name() -> String {
    crate::constants::APP_NAME.to_string()
}

fn default_tools() -> Vec<ToolConfig> {
    vec![
        ToolConfig::new("Scroll"),
        ToolConfig::new("ZoomAndPan"),
        ToolConfig {
            name: "Draw".to_string(),
            events: vec!["drawcreate".to_string()],
            options: vec!["Ruler".to_string(), "Rectangle".to_string()],
        },
    ]
}

fn default_drawing_tools() -> Vec<String> {
    ["Draw", "Livewire", "Floodfill"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// View behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Display size (width, height) of the layer container in pixels.
    #[serde(default = "default_container_size")]
    pub container_size: (f64, f64),

    /// Render as soon as the first item of a load arrives.
    #[serde(default = "default_true")]
    pub view_on_first_load_item: bool,

    /// Maximum number of datasets kept at once. Must be at least 1.
    #[serde(default = "default_simultaneous_data")]
    pub simultaneous_data: usize,

    /// Zoom limit relative to the fitted scale.
    #[serde(default = "default_max_zoom_factor")]
    pub max_zoom_factor: f64,
}

fn default_container_size() -> (f64, f64) {
    crate::constants::DEFAULT_CONTAINER_SIZE
}

fn default_true() -> bool {
    true
}

fn default_simultaneous_data() -> usize {
    1
}

fn default_max_zoom_factor() -> f64 {
    crate::constants::DEFAULT_MAX_ZOOM_FACTOR
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            container_size: default_container_size(),
            view_on_first_load_item: true,
            simultaneous_data: default_simultaneous_data(),
            max_zoom_factor: default_max_zoom_factor(),
        }
    }
}

/// One configured tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Registered tool name, e.g. "Scroll".
    pub name: String,
    /// Tool events re-published on the application bus.
    #[serde(default)]
    pub events: Vec<String>,
    /// Tool specific options (draw shapes for "Draw").
    #[serde(default)]
    pub options: Vec<String>,
}

impl ToolConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            options: Vec::new(),
        }
    }
}

/// Undo history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of commands to keep in history
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    crate::constants::DEFAULT_MAX_HISTORY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            view: ViewConfig::default(),
            tools: default_tools(),
            drawing_tools: default_drawing_tools(),
            history: HistoryConfig::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Whether a tool name belongs to the drawing category.
    pub fn is_drawing_tool(&self, name: &str) -> bool {
        self.drawing_tools.iter().any(|t| t == name)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.simultaneous_data == 0 {
            return Err(ConfigError::InvalidValue(
                "view.simultaneous_data must be at least 1".to_string(),
            ));
        }
        if self.view.max_zoom_factor.is_nan() || self.view.max_zoom_factor < 1.0 {
            return Err(ConfigError::InvalidValue(
                "view.max_zoom_factor must be at least 1".to_string(),
            ));
        }
        if self.history.max_history == 0 {
            return Err(ConfigError::InvalidValue(
                "history.max_history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        config.validate()?;

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "medview-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("medview").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("medview")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }
        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Write configuration to a file, creating its directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration where `load_from_default_path` looks for it.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<std::path::PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no user config directory",
            ))
        })?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "medview-config";

    /// Try to load configuration from localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }

    /// Save configuration to localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        let window = web_sys::window()
            .ok_or_else(|| ConfigError::StorageError("No window object available".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| ConfigError::StorageError(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| ConfigError::StorageError("localStorage not available".to_string()))?;

        let json = self.to_json()?;
        storage
            .set_item(Self::LOCALSTORAGE_KEY, &json)
            .map_err(|e| {
                ConfigError::StorageError(format!("Failed to save to localStorage: {:?}", e))
            })?;

        log::info!("Saved configuration to localStorage");
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Storage error (localStorage in WASM)
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trip() {
        let config = AppConfig::default();
        let json = config.to_json().unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();

        assert_eq!(parsed.version, CONFIG_VERSION);
        assert_eq!(parsed.tools, config.tools);
        assert_eq!(parsed.view.simultaneous_data, 1);
        assert_eq!(parsed.history.max_history, 100);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = AppConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(config.drawing_tools, vec!["Draw", "Livewire", "Floodfill"]);
        assert!(config.view.view_on_first_load_item);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{"version": {}}}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_zero_simultaneous_data_rejected() {
        let json = r#"{"version": 1, "view": {"simultaneous_data": 0}}"#;
        assert!(matches!(
            AppConfig::from_json(json),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = std::env::temp_dir().join(format!("medview-config-test-{}", std::process::id()));
        let path = dir.join("nested").join(AppConfig::default_filename());
        let mut config = AppConfig::default();
        config.view.simultaneous_data = 3;
        config.log_level = LogLevel::Debug;

        config.save_to_path(&path).unwrap();
        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.view.simultaneous_data, 3);
        assert_eq!(loaded.log_level, LogLevel::Debug);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_drawing_tool_detection() {
        let mut config = AppConfig::default();
        assert!(config.is_drawing_tool("Livewire"));
        assert!(!config.is_drawing_tool("Scroll"));

        config.drawing_tools = vec!["Ruler".to_string()];
        assert!(config.is_drawing_tool("Ruler"));
        assert!(!config.is_drawing_tool("Draw"));
    }

    #[test]
    fn test_log_level_filters() {
        assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::Warn.to_level(), log::Level::Warn);
        assert_eq!(
            serde_json::to_string(&LogLevel::Trace).unwrap(),
            "\"trace\""
        );
    }
}

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ServiceError, ServiceResult};
use crate::matching::MatchPolicy;

/// Service configuration, fixed for the lifetime of the process
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding the OCR word records
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directory the mural images live in, keyed by image name
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

/// Phrase matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub policy: MatchPolicy,

    /// Retry with punctuation split into separate tokens when nothing matched
    #[serde(default = "default_punctuation_fallback")]
    pub punctuation_fallback: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            punctuation_fallback: default_punctuation_fallback(),
        }
    }
}

/// Highlight drawing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Pixels added above a match so the label has room
    #[serde(default = "default_label_headroom")]
    pub label_headroom: u32,

    /// Pixels between the bottom of the label and the outline
    #[serde(default = "default_label_gap")]
    pub label_gap: u32,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,

    /// RGB outline and label color
    #[serde(default = "default_color")]
    pub color: [u8; 3],

    /// TTF/OTF font for label text, replacing the bundled DejaVu Sans
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// Label height in pixels
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            label_headroom: default_label_headroom(),
            label_gap: default_label_gap(),
            stroke_width: default_stroke_width(),
            color: default_color(),
            font_path: None,
            font_scale: default_font_scale(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `config` file and `MURAL_*` env vars
    pub fn load() -> ServiceResult<Self> {
        Self::load_with(Self::environment())
    }

    /// `MURAL_SECTION__KEY` variables, e.g. `MURAL_STORAGE__IMAGE_DIR`
    fn environment() -> Environment {
        Environment::with_prefix("MURAL")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(environment: Environment) -> ServiceResult<Self> {
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(environment)
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            matching: MatchingConfig::default(),
            annotation: AnnotationConfig::default(),
        }
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        database_path: default_database_path(),
        image_dir: default_image_dir(),
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("word_data.db")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("Images")
}

fn default_punctuation_fallback() -> bool {
    true
}

fn default_label_headroom() -> u32 {
    20
}

fn default_label_gap() -> u32 {
    10
}

fn default_stroke_width() -> u32 {
    5
}

fn default_color() -> [u8; 3] {
    [0, 255, 0]
}

fn default_font_scale() -> f32 {
    22.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_source() {
        let config: ServiceConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.database_path, PathBuf::from("word_data.db"));
        assert_eq!(config.storage.image_dir, PathBuf::from("Images"));
        assert_eq!(config.matching.policy, MatchPolicy::All);
        assert!(config.matching.punctuation_fallback);
        assert_eq!(config.annotation.label_headroom, 20);
        assert_eq!(config.annotation.stroke_width, 5);
        assert_eq!(config.annotation.color, [0, 255, 0]);
        assert!(config.annotation.font_path.is_none());
    }

    #[test]
    fn test_overrides_from_source() {
        let config: ServiceConfig = Config::builder()
            .set_override("matching.policy", "first_per_image")
            .unwrap()
            .set_override("storage.image_dir", "/srv/murals")
            .unwrap()
            .set_override("annotation.stroke_width", 3)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.matching.policy, MatchPolicy::FirstPerImage);
        assert_eq!(config.storage.image_dir, PathBuf::from("/srv/murals"));
        assert_eq!(config.annotation.stroke_width, 3);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_environment_overrides_use_single_underscore_prefix() {
        let vars = [
            ("MURAL_STORAGE__IMAGE_DIR", "/srv/murals"),
            ("MURAL_SERVER__PORT", "9090"),
            ("MURAL_MATCHING__POLICY", "first_per_image"),
            ("OTHER_SERVER__PORT", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config =
            ServiceConfig::load_with(ServiceConfig::environment().source(Some(vars))).unwrap();

        assert_eq!(config.storage.image_dir, PathBuf::from("/srv/murals"));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.matching.policy, MatchPolicy::FirstPerImage);
        assert_eq!(config.storage.database_path, PathBuf::from("word_data.db"));
    }
}

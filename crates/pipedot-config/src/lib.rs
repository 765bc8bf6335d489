//! Runtime configuration (`RunConfig`, §3/§12) and graph preset loading.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read preset directory {path}: {source}")]
    PresetDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read preset file {path}: {source}")]
    PresetFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Ambient runtime configuration (§3, §12): loaded `.env` → `PIPEDOT_*` env
/// vars → built-in defaults, in that priority order.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub logs_root: PathBuf,
    pub default_timeout_ms: u64,
    pub default_max_retries: u32,
    pub max_parallel: usize,
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            logs_root: PathBuf::from("./runs"),
            default_timeout_ms: 30_000,
            default_max_retries: 0,
            max_parallel: 4,
            checkpoint_path: None,
        }
    }
}

impl RunConfig {
    /// Loads `.env` (best-effort), then overlays `PIPEDOT_*` environment
    /// variables on top of built-in defaults.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(v) = std::env::var("PIPEDOT_LOGS_ROOT") {
            config.logs_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PIPEDOT_DEFAULT_TIMEOUT_MS") {
            config.default_timeout_ms = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPEDOT_DEFAULT_TIMEOUT_MS".to_string(),
                message: format!("`{v}` is not a valid integer"),
            })?;
        }
        if let Ok(v) = std::env::var("PIPEDOT_DEFAULT_MAX_RETRIES") {
            config.default_max_retries = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPEDOT_DEFAULT_MAX_RETRIES".to_string(),
                message: format!("`{v}` is not a valid integer"),
            })?;
        }
        if let Ok(v) = std::env::var("PIPEDOT_MAX_PARALLEL") {
            config.max_parallel = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PIPEDOT_MAX_PARALLEL".to_string(),
                message: format!("`{v}` is not a valid integer"),
            })?;
        }
        if let Ok(v) = std::env::var("PIPEDOT_CHECKPOINT_PATH") {
            config.checkpoint_path = Some(PathBuf::from(v));
        }

        Ok(config)
    }
}

/// A named DOT graph preset loaded from disk (generalises the teacher's
/// `PresetRegistry` from typed pipeline JSON to raw DOT text).
#[derive(Debug, Clone)]
pub struct GraphPreset {
    pub id: String,
    pub name: String,
    pub dot: String,
}

#[derive(Debug, Clone, Default)]
pub struct GraphPresetRegistry {
    presets: Vec<GraphPreset>,
}

impl GraphPresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.dot` file in `dir` as a preset keyed by its file stem.
    pub fn load_from_dir(dir: &Path) -> ConfigResult<Self> {
        let mut presets = Vec::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Self::default()),
        };
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::PresetDir {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("dot") {
                continue;
            }
            let dot = fs::read_to_string(&path).map_err(|e| ConfigError::PresetFile {
                path: path.display().to_string(),
                source: e,
            })?;
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("preset")
                .to_string();
            presets.push(GraphPreset {
                name: id.clone(),
                id,
                dot,
            });
        }
        presets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { presets })
    }

    pub fn get(&self, id: &str) -> Option<&GraphPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> &[GraphPreset] {
        &self.presets
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RunConfig::default();
        assert_eq!(config.default_max_retries, 0);
        assert_eq!(config.max_parallel, 4);
    }

    #[test]
    fn missing_preset_dir_returns_empty_registry() {
        let registry = GraphPresetRegistry::load_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn loads_dot_presets_from_directory() {
        let dir = std::env::temp_dir().join(format!("pipedot-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("sample.dot"), "digraph G { s [shape=Mdiamond]; }").unwrap();
        let registry = GraphPresetRegistry::load_from_dir(&dir).unwrap();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["sample"]);
        fs::remove_dir_all(&dir).ok();
    }
}

//! Locating and layering configuration files.
//!
//! Two layers are read, lowest precedence first:
//! 1. the user file, `config.toml` in [`user_config_dir`]
//! 2. the project file, `resumer.toml` in the project directory
//!
//! A missing layer is skipped. A layer that fails to parse or validate is
//! skipped with a warning, so a bad file leaves the dispatcher on the
//! remaining layers and defaults. Each [`ConfigSource`] records which
//! sections and hosts its file contributed.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, ResumerConfig};

const PROJECT_FILE: &str = "resumer.toml";
const USER_FILE: &str = "config.toml";
const APP_DIR: &str = "resumer";

/// Overrides the platform config directory when set and non-empty.
const CONFIG_DIR_ENV: &str = "RESUMER_CONFIG_DIR";

/// Which layer a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// What happened to a layer's file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    /// No file at the path.
    Missing,
    /// Parsed, validated and merged.
    Applied,
    /// Present but unusable; the message is also in the warnings.
    Rejected(String),
}

/// One layer that was checked during loading.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    pub status: LayerStatus,
    /// Sections (`cache`, `connect`, `hosts`) the file set.
    pub sections: Vec<&'static str>,
    /// Host names the file listed, lowercased.
    pub hosts: Vec<String>,
}

impl ConfigSource {
    fn new(layer: Layer, path: &Path, status: LayerStatus) -> Self {
        Self {
            layer,
            path: path.to_path_buf(),
            status,
            sections: Vec::new(),
            hosts: Vec::new(),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == LayerStatus::Applied
    }
}

/// The merged configuration and where each part of it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ResumerConfig,
    /// Every layer checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that were merged.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.applied().map(|s| s.path.as_path()).collect()
    }

    /// The layer whose `[section]` is in effect, if any file set it.
    pub fn origin_of(&self, section: &str) -> Option<&ConfigSource> {
        self.applied()
            .filter(|s| s.sections.iter().any(|&name| name == section))
            .last()
    }

    /// The layer whose addresses are in effect for `host`.
    pub fn host_origin(&self, host: &str) -> Option<&ConfigSource> {
        let host = host.to_ascii_lowercase();
        self.applied().filter(|s| s.hosts.contains(&host)).last()
    }

    /// The file edits should be written back to: the highest precedence file
    /// that was merged, else the user file.
    pub fn save_target(&self) -> Option<&Path> {
        self.applied()
            .last()
            .or_else(|| self.sources.iter().find(|s| s.layer == Layer::User))
            .map(|s| s.path.as_path())
    }

    fn applied(&self) -> impl Iterator<Item = &ConfigSource> {
        self.sources.iter().filter(|s| s.is_applied())
    }
}

/// Load the user layer from the default location, then the project layer
/// from `project_dir` (or the working directory).
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], reading the user layer from `config_dir` when given.
pub fn load_config_with_options(project_dir: Option<&Path>, config_dir: Option<&Path>) -> LoadedConfig {
    let mut loaded = LoadedConfig {
        config: ResumerConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };

    let user_file = config_dir
        .map(|dir| dir.join(USER_FILE))
        .or_else(user_config_path);
    if let Some(path) = user_file {
        apply_layer(&mut loaded, Layer::User, &path);
    }

    let project_file = project_dir.unwrap_or_else(|| Path::new(".")).join(PROJECT_FILE);
    apply_layer(&mut loaded, Layer::Project, &project_file);

    check_ineffective_settings(&loaded.config, &mut loaded.warnings);
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    loaded
}

/// Read and validate a single file.
pub fn load_config_file(path: &Path) -> Result<ResumerConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    ResumerConfig::from_toml(&text)
}

/// Write `config` to `path`, creating parent directories.
///
/// The document is staged beside its destination and renamed into place.
pub fn save_config(config: &ResumerConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_error(dir))?;
    }

    let staged = path.with_extension("toml.tmp");
    std::fs::write(&staged, config.to_toml()?).map_err(write_error(&staged))?;
    std::fs::rename(&staged, path).map_err(write_error(path))?;
    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + use<> {
    let path = path.display().to_string();
    move |source| ConfigError::WriteFile { path, source }
}

/// `config.toml` inside [`user_config_dir`].
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(USER_FILE))
}

/// `$RESUMER_CONFIG_DIR`, else `resumer/` under the platform config directory.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join(APP_DIR)),
    }
}

fn apply_layer(loaded: &mut LoadedConfig, layer: Layer, path: &Path) {
    if !path.is_file() {
        loaded.sources.push(ConfigSource::new(layer, path, LayerStatus::Missing));
        return;
    }

    match load_config_file(path) {
        Ok(parsed) => {
            let mut source = ConfigSource::new(layer, path, LayerStatus::Applied);
            if parsed.cache.is_some() {
                source.sections.push("cache");
            }
            if parsed.connect.is_some() {
                source.sections.push("connect");
            }
            if !parsed.hosts.is_empty() {
                source.sections.push("hosts");
                source.hosts = parsed.hosts.keys().cloned().collect();
            }
            tracing::debug!(%layer, path = %path.display(), sections = ?source.sections, "applied config layer");

            loaded.config.merge(parsed);
            loaded.sources.push(source);
        }
        Err(err) => {
            let message = format!("Ignoring {layer} config {}: {err}", path.display());
            loaded.warnings.push(message.clone());
            loaded
                .sources
                .push(ConfigSource::new(layer, path, LayerStatus::Rejected(message)));
        }
    }
}

/// Flag settings that are valid on their own but have no effect together.
fn check_ineffective_settings(config: &ResumerConfig, warnings: &mut Vec<String>) {
    let cache = config.cache.clone().unwrap_or_default();

    let reuse_requested = config
        .connect
        .as_ref()
        .and_then(|c| c.reuse_sessions)
        .unwrap_or(false);
    if !cache.enabled && reuse_requested {
        warnings.push(
            "[connect] reuse_sessions = true has no effect while [cache] is disabled; \
             no session will ever be offered."
                .to_string(),
        );
    }

    if cache.enabled && cache.max_sessions == Some(0) {
        warnings.push(
            "[cache] max_sessions = 0 retains nothing. \
             Set enabled = false to turn the cache off explicitly."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! JSON file adapter for the zone configuration document.
//!
//! Implements [`ConfigPort`].  Documents are validated before they are
//! written and after they are read, so a file that loads is always
//! installable.  Writes go to a sibling temp file first and are renamed
//! into place, so a crash never leaves a half-written document.
//!
//! The adapter remembers the SHA-256 fingerprint of the last document it
//! loaded or saved, which is what [`JsonFileStore::has_unsaved_changes`]
//! compares against.

use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ZoneConfig;
use crate::error::EngineError;
use crate::zones::validator::validate_config;

pub struct JsonFileStore {
    path: PathBuf,
    saved_fingerprint: Cell<Option<[u8; 32]>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            saved_fingerprint: Cell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `config` differs from what was last loaded or saved.
    /// Always `true` before the first load or save.
    pub fn has_unsaved_changes(&self, config: &ZoneConfig) -> bool {
        self.saved_fingerprint.get() != Some(config.fingerprint())
    }
}

fn validation(e: EngineError) -> ConfigError {
    match e {
        EngineError::ConfigInvalid(reason) => ConfigError::ValidationFailed(reason),
        EngineError::NotFound(_) => ConfigError::ValidationFailed("dangling zone reference"),
    }
}

impl ConfigPort for JsonFileStore {
    fn load(&self) -> Result<ZoneConfig, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(e),
        })?;
        let config: ZoneConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        validate_config(&config).map_err(validation)?;

        self.saved_fingerprint.set(Some(config.fingerprint()));
        info!("JsonFileStore: loaded {} zones from {}", config.zones.len(), self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ZoneConfig) -> Result<(), ConfigError> {
        validate_config(config).map_err(validation)?;

        let mut text =
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        text.push('\n');

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(ConfigError::Io)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(ConfigError::Io)?;
        fs::rename(&tmp, &self.path).map_err(ConfigError::Io)?;

        self.saved_fingerprint.set(Some(config.fingerprint()));
        info!("JsonFileStore: saved config to {}", self.path.display());
        Ok(())
    }
}

//! `.import` configuration file and settings resolution.
//!
//! Settings come from, in order of precedence, command line flags, the
//! configuration file and built-in defaults.

use crate::clean::{CleanConfig, Cleaner};
use crate::platform;
use crate::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_NAME: &str = ".import";

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub separator: Option<String>,
    pub cleans: Option<BTreeMap<String, String>>,
    pub protocols: Option<Vec<String>>,
    pub invalids: Option<Vec<String>>,
    pub delimiter: Option<String>,
    pub all: Option<bool>,
    pub force: Option<bool>,
    pub clean: Option<bool>,
    pub convert: Option<bool>,
}

impl FileConfig {
    /// Candidate configuration files, most specific first.
    fn candidates(explicit: Option<&Path>, store_dir: Option<PathBuf>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        if let Some(store_dir) = store_dir {
            candidates.push(store_dir.join(CONFIG_NAME));
        }
        candidates.push(PathBuf::from(CONFIG_NAME));
        candidates.push(platform::get_default_config_path());
        candidates
    }

    /// The configuration file in use, if any.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        let store_dir = std::env::var_os("PASSWORD_STORE_DIR").map(PathBuf::from);
        Self::candidates(explicit, store_dir)
            .into_iter()
            .find(|path| path.is_file())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text)
            .map_err(|e| MigrationError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the configuration file in use, or the defaults when there is
    /// none. An explicitly requested file must exist.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit.filter(|path| !path.is_file()) {
            return Err(MigrationError::Config(format!(
                "configuration file {} not found",
                path.display()
            )));
        }
        match Self::locate(explicit) {
            Some(path) => {
                debug!("Reading configuration from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub separator: Option<String>,
    pub delimiter: Option<String>,
    pub all: bool,
    pub force: bool,
    pub clean: bool,
    pub convert: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub clean: CleanConfig,
    pub cmdclean: bool,
    pub convert: bool,
    pub delimiter: u8,
    pub all: bool,
    pub force: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clean: CleanConfig::default(),
            cmdclean: false,
            convert: false,
            delimiter: b',',
            all: false,
            force: false,
        }
    }
}

fn parse_delimiter(delimiter: &str) -> Result<u8> {
    match delimiter.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(MigrationError::Config(format!(
            "delimiter must be a single ASCII character, got '{}'",
            delimiter
        ))),
    }
}

impl Settings {
    pub fn resolve(file: &FileConfig, overrides: &Overrides) -> Result<Self> {
        let mut clean = CleanConfig::default();
        if let Some(cleans) = &file.cleans {
            clean.cleans = cleans
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect();
        }
        if let Some(protocols) = &file.protocols {
            clean.protocols = protocols.clone();
        }
        if let Some(invalids) = &file.invalids {
            clean.invalids = invalids.clone();
        }
        if let Some(separator) = overrides.separator.as_ref().or(file.separator.as_ref()) {
            clean.set_separator(separator);
        }

        let delimiter = match overrides.delimiter.as_ref().or(file.delimiter.as_ref()) {
            Some(delimiter) => parse_delimiter(delimiter)?,
            None => b',',
        };

        Ok(Self {
            clean,
            cmdclean: overrides.clean || file.clean.unwrap_or(false),
            convert: overrides.convert || file.convert.unwrap_or(false),
            delimiter,
            all: overrides.all || file.all.unwrap_or(false),
            force: overrides.force || file.force.unwrap_or(false),
        })
    }

    pub fn cleaner(&self) -> Cleaner {
        Cleaner::new(self.clean.clone(), self.cmdclean, self.convert)
    }
}

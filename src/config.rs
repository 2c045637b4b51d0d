// src/config.rs

//! # Config
//!
//! Program-level settings for a generated command-line interface. Settings come
//! from code defaults, an optional TOML file and finally the environment
//! (`CLIFORM_NAME_STYLE`, `CLIFORM_NOTRACEBACK`), each layer overriding the last.

use crate::constants::{ENV_NAME_STYLE, ENV_NOTRACEBACK};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`Config`].
    #[error("Failed to parse TOML file at '{path}': {source}")]
    TomlParse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parsing error from the `toml` crate.
        #[source]
        source: toml::de::Error,
    },
    /// An environment variable holds a value that cannot be understood.
    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidEnv {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// How multi-word parameter and command names are spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStyle {
    /// `--dry-run`
    #[default]
    Kebab,
    /// `--dry_run`
    Snake,
}

impl NameStyle {
    /// Spells a canonical (underscore) name in this style.
    pub fn apply(self, name: &str) -> String {
        match self {
            NameStyle::Kebab => name.replace('_', "-"),
            NameStyle::Snake => name.to_string(),
        }
    }

    /// The spelling in the other style, when it differs.
    pub fn alternate(self, name: &str) -> Option<String> {
        let other = match self {
            NameStyle::Kebab => NameStyle::Snake,
            NameStyle::Snake => NameStyle::Kebab,
        };
        let primary = self.apply(name);
        let alternate = other.apply(name);
        (alternate != primary).then_some(alternate)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kebab" | "dash" | "dashes" => Some(NameStyle::Kebab),
            "snake" | "underscore" | "underscores" => Some(NameStyle::Snake),
            _ => None,
        }
    }
}

/// Settings for one generated program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Program name shown in usage lines; defaults to the executable name.
    pub program_name: Option<String>,
    /// Text shown at the top of the root help.
    pub about: Option<String>,
    /// Version reported by `--cli`.
    pub version: Option<String>,
    /// Flag and command spelling.
    pub name_style: NameStyle,
    /// Failed invocations print a single line as if `--notraceback` were given.
    pub terse_errors: bool,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if it exists, otherwise starts from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            log::trace!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Applies the process environment on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Applies overrides read through `lookup`, which maps variable names to values.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_NAME_STYLE) {
            self.name_style = NameStyle::parse(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_NAME_STYLE,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_NOTRACEBACK) {
            self.terse_errors = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_NOTRACEBACK,
                        value,
                    });
                }
            };
        }
        Ok(self)
    }
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_name_style() {
        assert_eq!(NameStyle::Kebab.apply("dry_run"), "dry-run");
        assert_eq!(NameStyle::Snake.apply("dry_run"), "dry_run");
        assert_eq!(NameStyle::Kebab.alternate("dry_run").as_deref(), Some("dry_run"));
        assert_eq!(NameStyle::Kebab.alternate("verbose"), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "program_name = \"calc\"\nname_style = \"snake\"\nterse_errors = true"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.program_name.as_deref(), Some("calc"));
        assert_eq!(config.name_style, NameStyle::Snake);
        assert!(config.terse_errors);
        assert_eq!(config.version, None);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "colour = \"red\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("cliform.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_overrides_from(|var| match var {
                ENV_NAME_STYLE => Some("snake".to_string()),
                ENV_NOTRACEBACK => Some("1".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.name_style, NameStyle::Snake);
        assert!(config.terse_errors);

        let err = Config::default()
            .with_overrides_from(|var| (var == ENV_NAME_STYLE).then(|| "camel".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_NAME_STYLE, .. }));
    }
}

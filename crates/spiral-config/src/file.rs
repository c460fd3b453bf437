// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Typed sections of TOML or JSON run configuration files.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse JSON {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("section {section:?} in {path:?} does not match the expected schema: {source}")]
    Section {
        path: PathBuf,
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses `path` into a JSON value. Files ending in `.json` are read as JSON,
/// everything else as TOML.
pub fn load_value(path: &Path) -> Result<Value, ConfigFileError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(&text).map_err(|source| ConfigFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        let value: toml::Value = toml::from_str(&text).map_err(|source| ConfigFileError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_value(value).map_err(|source| ConfigFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Extracts the section addressed by `keys` (outermost first). Returns
/// `Ok(None)` when the section is absent.
pub fn section<T>(value: &Value, keys: &[&str]) -> Result<Option<T>, serde_json::Error>
where
    T: DeserializeOwned,
{
    let mut node = value;
    for key in keys {
        match node {
            Value::Object(map) => match map.get(*key) {
                Some(next) => node = next,
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }
    serde_json::from_value(node.clone()).map(Some)
}

/// Reads `path` and deserialises the section addressed by `keys`.
pub fn load_section<T>(path: &Path, keys: &[&str]) -> Result<Option<T>, ConfigFileError>
where
    T: DeserializeOwned,
{
    let value = load_value(path)?;
    section(&value, keys).map_err(|source| ConfigFileError::Section {
        path: path.to_path_buf(),
        section: keys.join("."),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Window {
        batch_size: usize,
        randomize: bool,
    }

    #[test]
    fn toml_section_is_deserialised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "[pipeline.window]\nbatch_size = 16\nrandomize = true\n").unwrap();
        let window: Option<Window> = load_section(&path, &["pipeline", "window"]).unwrap();
        assert_eq!(
            window,
            Some(Window {
                batch_size: 16,
                randomize: true
            })
        );
    }

    #[test]
    fn json_is_selected_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"window": {"batch_size": 8, "randomize": false}}"#).unwrap();
        let window: Option<Window> = load_section(&path, &["window"]).unwrap();
        assert_eq!(window.map(|w| w.batch_size), Some(8));
    }

    #[test]
    fn missing_section_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "[other]\nvalue = 1\n").unwrap();
        let window: Option<Window> = load_section(&path, &["window"]).unwrap();
        assert!(window.is_none());
    }

    #[test]
    fn schema_errors_name_the_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "[window]\nbatch_size = \"many\"\nrandomize = true\n").unwrap();
        let err = load_section::<Window>(&path, &["window"]).unwrap_err();
        assert!(matches!(err, ConfigFileError::Section { ref section, .. } if section == "window"));
    }
}

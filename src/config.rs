//! Configuration module, loads vocabularies and keyword spellings from JSON

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::token::Keywords;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Vocabularies the validator checks values against.
///
/// ```json
/// {
///   "channels": ["CNN", "FOXNEWS", "MSNBC"],
///   "channel_aliases": { "FOX": "FOXNEWS" },
///   "shows": ["Hannity"],
///   "people": ["Donald Trump"],
///   "tags": ["male", "presenter"],
///   "keywords": { "and": "AND", "or": "OR" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub channels: Vec<String>,
    /// Alternate spelling to canonical channel
    pub channel_aliases: HashMap<String, String>,
    pub shows: Vec<String>,
    pub people: Vec<String>,
    pub tags: Vec<String>,
    pub keywords: Keywords,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let mut channel_aliases = HashMap::new();
        channel_aliases.insert("FOX".to_string(), "FOXNEWS".to_string());
        Self {
            channels: vec!["CNN".to_string(), "FOXNEWS".to_string(), "MSNBC".to_string()],
            channel_aliases,
            shows: Vec::new(),
            people: Vec::new(),
            tags: Vec::new(),
            keywords: Keywords::default(),
        }
    }
}

impl VocabularyConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.to_path_buf()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tvquery_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_load_valid_json_config() {
        let path = temp_path("vocabulary.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{
                "shows": ["Hannity", "Anderson Cooper 360"],
                "people": ["Rachel Maddow"],
                "tags": ["presenter"]
            }}"#
        )
        .unwrap();

        let config = VocabularyConfig::from_json_file(&path).unwrap();
        assert_eq!(config.shows, vec!["Hannity", "Anderson Cooper 360"]);
        assert_eq!(config.people, vec!["Rachel Maddow"]);
        // Omitted sections fall back to the defaults
        assert_eq!(config.channels, vec!["CNN", "FOXNEWS", "MSNBC"]);
        assert_eq!(config.keywords, Keywords::default());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_keyword_override() {
        let config =
            VocabularyConfig::from_json_str(r#"{"keywords": {"and": "UND"}}"#).unwrap();
        assert_eq!(config.keywords.and, "UND");
        assert_eq!(config.keywords.or, "OR");
    }

    #[test]
    fn test_invalid_json_config() {
        let path = temp_path("invalid.json");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = VocabularyConfig::from_json_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = VocabularyConfig::from_json_file("non_existent_vocabulary.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_default_config() {
        let config = VocabularyConfig::default();
        assert_eq!(config.channel_aliases.get("FOX").map(String::as_str), Some("FOXNEWS"));
        assert!(config.shows.is_empty());
    }
}

use super::text_extractor::DEFAULT_MAX_PAGES;
use crate::core::diagnostics::DEFAULT_DIAGNOSTICS_CAPACITY;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MIME_TYPE: &str = "application/pdf";
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Settings for one book pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookConfig {
    pub folder_id: String,
    pub mime_type: String,
    pub download_dir: PathBuf,
    pub chunk_size: usize,
    pub max_pages: usize,
    pub diagnostics_capacity: usize,
    pub strict_classification: bool,
    pub diagnostics_file: Option<PathBuf>,
}

impl BookConfig {
    /// Defaults for everything except the folder.
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            download_dir: std::env::temp_dir(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            strict_classification: false,
            diagnostics_file: None,
        }
    }

    /// Reads `BOOKS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let folder_id =
            get("BOOKS_DRIVE_FOLDER_ID").ok_or(ConfigError::Missing("BOOKS_DRIVE_FOLDER_ID"))?;
        let mut config = Self::new(folder_id);

        if let Some(mime) = get("BOOKS_MIME_TYPE") {
            config.mime_type = mime;
        }
        if let Some(dir) = get("BOOKS_DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("BOOKS_CHUNK_SIZE") {
            config.chunk_size = parse_positive("BOOKS_CHUNK_SIZE", raw)?;
        }
        if let Some(raw) = get("BOOKS_MAX_PAGES") {
            config.max_pages = parse_positive("BOOKS_MAX_PAGES", raw)?;
        }
        if let Some(raw) = get("BOOKS_DIAGNOSTICS_CAPACITY") {
            config.diagnostics_capacity = parse_positive("BOOKS_DIAGNOSTICS_CAPACITY", raw)?;
        }
        if let Some(raw) = get("BOOKS_STRICT_CLASSIFICATION") {
            config.strict_classification =
                raw.parse::<bool>().map_err(|_| ConfigError::Invalid {
                    key: "BOOKS_STRICT_CLASSIFICATION",
                    value: raw.clone(),
                    reason: "expected true or false",
                })?;
        }
        config.diagnostics_file = get("BOOKS_DIAGNOSTICS_FILE").map(PathBuf::from);

        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: String) -> Result<usize, ConfigError> {
    match raw.parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero",
        }),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "not a number",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn folder_is_required() {
        assert_eq!(
            BookConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("BOOKS_DRIVE_FOLDER_ID"))
        );
        assert_eq!(
            BookConfig::from_lookup(lookup(&[("BOOKS_DRIVE_FOLDER_ID", "  ")])),
            Err(ConfigError::Missing("BOOKS_DRIVE_FOLDER_ID"))
        );
    }

    #[test]
    fn defaults_apply() {
        let config =
            BookConfig::from_lookup(lookup(&[("BOOKS_DRIVE_FOLDER_ID", "folder")])).unwrap();

        assert_eq!(config.folder_id, "folder");
        assert_eq!(config.mime_type, "application/pdf");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.max_pages, 26);
        assert_eq!(config.diagnostics_capacity, 400);
        assert!(!config.strict_classification);
        assert_eq!(config.diagnostics_file, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = BookConfig::from_lookup(lookup(&[
            ("BOOKS_DRIVE_FOLDER_ID", "folder"),
            ("BOOKS_MIME_TYPE", "application/epub+zip"),
            ("BOOKS_DOWNLOAD_DIR", "/var/books"),
            ("BOOKS_CHUNK_SIZE", "4096"),
            ("BOOKS_MAX_PAGES", "10"),
            ("BOOKS_DIAGNOSTICS_CAPACITY", "50"),
            ("BOOKS_STRICT_CLASSIFICATION", "true"),
            ("BOOKS_DIAGNOSTICS_FILE", "/tmp/diag.json"),
        ]))
        .unwrap();

        assert_eq!(config.mime_type, "application/epub+zip");
        assert_eq!(config.download_dir, PathBuf::from("/var/books"));
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.diagnostics_capacity, 50);
        assert!(config.strict_classification);
        assert_eq!(config.diagnostics_file, Some(PathBuf::from("/tmp/diag.json")));
    }

    #[test]
    fn rejects_zero_and_garbage_numbers() {
        let err = BookConfig::from_lookup(lookup(&[
            ("BOOKS_DRIVE_FOLDER_ID", "folder"),
            ("BOOKS_CHUNK_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BOOKS_CHUNK_SIZE"));

        let err = BookConfig::from_lookup(lookup(&[
            ("BOOKS_DRIVE_FOLDER_ID", "folder"),
            ("BOOKS_MAX_PAGES", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BOOKS_MAX_PAGES", .. }));
    }
}

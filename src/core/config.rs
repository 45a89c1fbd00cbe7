//! Configuration types and management for trellis-rs.
//!
//! Configuration is plain serde data loaded from YAML. Every section has a
//! `Default` and a `validate()` so partially specified files work and bad
//! values are rejected before a build starts.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TrellisError};
use crate::lang::language::Language;

pub mod validation;

use validation::{validate_positive_usize, validate_usize_range};

/// Main configuration for the trellis engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrellisConfig {
    /// Parsing and per-file extraction limits
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Graph build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Context expansion settings
    #[serde(default)]
    pub expansion: ExpansionConfig,
}

impl TrellisConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            TrellisError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            TrellisError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.build.validate()?;
        self.expansion.validate()?;
        Ok(())
    }
}

/// Parsing and extraction limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum syntax-tree nesting walked before a signature is abandoned
    pub max_tree_depth: usize,

    /// Files larger than this are recorded as extraction failures
    pub max_file_bytes: usize,

    /// Enabled language keys; empty enables every supported language
    pub languages: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: 512,
            max_file_bytes: 2 * 1024 * 1024,
            languages: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Validate analysis configuration
    pub fn validate(&self) -> Result<()> {
        validate_usize_range(self.max_tree_depth, 8, 100_000, "analysis.max_tree_depth")?;
        validate_positive_usize(self.max_file_bytes, "analysis.max_file_bytes")?;

        for key in &self.languages {
            Language::parse(key).map_err(|_| {
                TrellisError::config_field(
                    format!("Unknown language '{key}'"),
                    "analysis.languages",
                )
            })?;
        }
        Ok(())
    }

    /// Languages enabled by this configuration.
    pub fn enabled_languages(&self) -> BTreeSet<Language> {
        if self.languages.is_empty() {
            return Language::ALL.iter().copied().collect();
        }
        self.languages
            .iter()
            .filter_map(|key| Language::parse(key).ok())
            .collect()
    }

    /// Whether files of `language` should be analyzed.
    pub fn is_enabled(&self, language: Language) -> bool {
        self.languages.is_empty() || self.enabled_languages().contains(&language)
    }
}

/// Graph build settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker threads for extraction (0 uses the rayon default)
    pub worker_threads: usize,

    /// Keep unresolved-reference diagnostics in the build report
    pub record_unresolved: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            record_unresolved: true,
        }
    }
}

impl BuildConfig {
    /// Validate build configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads > 1024 {
            return Err(TrellisError::config_field(
                "worker_threads must not exceed 1024",
                "build.worker_threads",
            ));
        }
        Ok(())
    }
}

/// Context expansion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Serialized bytes counted as one token
    pub bytes_per_token: usize,

    /// Maximum number of hops away from the seed
    pub max_hops: usize,

    /// Budget used when the caller does not supply one
    pub default_token_budget: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            bytes_per_token: 4,
            max_hops: 2,
            default_token_budget: 3000,
        }
    }
}

impl ExpansionConfig {
    /// Validate expansion configuration
    pub fn validate(&self) -> Result<()> {
        validate_usize_range(self.bytes_per_token, 1, 64, "expansion.bytes_per_token")?;
        validate_usize_range(self.max_hops, 1, 16, "expansion.max_hops")?;
        validate_positive_usize(self.default_token_budget, "expansion.default_token_budget")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrellisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.max_tree_depth, 512);
        assert_eq!(config.expansion.bytes_per_token, 4);
        assert_eq!(config.expansion.max_hops, 2);
        assert_eq!(config.expansion.default_token_budget, 3000);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = TrellisConfig::from_yaml_str("expansion:\n  max_hops: 3\n").unwrap();
        assert_eq!(config.expansion.max_hops, 3);
        assert_eq!(config.expansion.bytes_per_token, 4);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TrellisConfig::from_yaml_str("expansion:\n  bytes_per_token: 0\n").unwrap_err();
        assert!(matches!(err, TrellisError::Validation { .. }));

        let err =
            TrellisConfig::from_yaml_str("analysis:\n  languages: [python, cobol]\n").unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Config { field: Some(ref f), .. } if f == "analysis.languages"
        ));
    }

    #[test]
    fn test_enabled_languages_filter() {
        let mut analysis = AnalysisConfig::default();
        assert!(analysis.is_enabled(Language::Ruby));
        assert_eq!(analysis.enabled_languages().len(), Language::ALL.len());

        analysis.languages = vec!["python".to_string(), "rs".to_string()];
        assert!(analysis.is_enabled(Language::Python));
        assert!(analysis.is_enabled(Language::Rust));
        assert!(!analysis.is_enabled(Language::Go));
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trellis.yml");

        let mut config = TrellisConfig::default();
        config.build.worker_threads = 4;
        config.to_yaml_file(&path).unwrap();

        let loaded = TrellisConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TrellisConfig::from_yaml_file("/definitely/not/here.yml").unwrap_err();
        assert!(matches!(err, TrellisError::Io { .. }));
    }
}

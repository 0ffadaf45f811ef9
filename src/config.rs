//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.
//! Values read here are defaults; command line flags override them.

use crate::naming::TargetLanguage;
use std::path::PathBuf;
use thiserror::Error;

/// Region used when neither the snapshot nor the environment declares one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Sentinel written by infrastructure synthesis for environment-dependent values
pub const UNKNOWN_SENTINEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Region fallback policy.
///
/// Injected into grouping and metadata construction instead of reading the
/// process environment ad hoc, so the policy stays a pure function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    /// Region from `AWS_REGION` / `AWS_DEFAULT_REGION`
    pub env_region: Option<String>,
    pub default_region: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            env_region: None,
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl RegionConfig {
    pub fn new(env_region: Option<String>, default_region: impl Into<String>) -> Self {
        Self {
            env_region: env_region.filter(|r| is_declared(r)),
            default_region: default_region.into(),
        }
    }

    /// Resolve a declared region.
    ///
    /// The declared value wins unless it is absent, blank or the `unknown`
    /// sentinel; then the environment region, then the default.
    pub fn resolve(&self, declared: Option<&str>) -> String {
        if let Some(region) = declared.filter(|r| is_declared(r)) {
            return region.trim().to_string();
        }

        self.env_region
            .clone()
            .unwrap_or_else(|| self.default_region.clone())
    }
}

/// Whether a value is concrete, i.e. not blank and not the `unknown` sentinel
pub fn is_declared(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case(UNKNOWN_SENTINEL)
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub snapshot_dir: PathBuf,
    pub output_dir: PathBuf,
    pub language: TargetLanguage,
    pub package: String,
    pub jobs: usize,
    pub regions: RegionConfig,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(".snapshots"),
            output_dir: PathBuf::from("generated"),
            language: TargetLanguage::TypeScript,
            package: "models".to_string(),
            jobs: 1,
            regions: RegionConfig::default(),
            log_format: LogFormat::Compact,
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let language = match get("CODEGEN_LANGUAGE") {
            Some(value) => value.parse().map_err(|message| ConfigError::InvalidValue {
                key: "CODEGEN_LANGUAGE".to_string(),
                message,
            })?,
            None => defaults.language,
        };

        let jobs = match get("CODEGEN_JOBS") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(jobs) if jobs > 0 => jobs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "CODEGEN_JOBS".to_string(),
                        message: format!("expected a positive integer, got '{}'", value),
                    })
                }
            },
            None => defaults.jobs,
        };

        let regions = RegionConfig::new(
            get("AWS_REGION").or_else(|| get("AWS_DEFAULT_REGION")),
            get("CODEGEN_DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        );

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            snapshot_dir: get("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),
            output_dir: get("CODEGEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            language,
            package: get("CODEGEN_PACKAGE").unwrap_or(defaults.package),
            jobs,
            regions,
            log_format,
        })
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
    fn test_declared_region_wins() {
        let regions = RegionConfig::new(Some("eu-west-1".to_string()), DEFAULT_REGION);
        assert_eq!(regions.resolve(Some("ap-south-1")), "ap-south-1");
    }

    #[test]
    fn test_unknown_region_falls_back_to_environment() {
        let regions = RegionConfig::new(Some("eu-west-1".to_string()), DEFAULT_REGION);
        assert_eq!(regions.resolve(Some("unknown")), "eu-west-1");
        assert_eq!(regions.resolve(Some("UNKNOWN")), "eu-west-1");
        assert_eq!(regions.resolve(None), "eu-west-1");
    }

    #[test]
    fn test_unknown_region_falls_back_to_default() {
        let regions = RegionConfig::default();
        assert_eq!(regions.resolve(Some("unknown")), DEFAULT_REGION);
        assert_eq!(regions.resolve(Some("  ")), DEFAULT_REGION);
    }

    #[test]
    fn test_unknown_environment_region_is_ignored() {
        let regions = RegionConfig::new(Some("unknown".to_string()), "eu-central-1");
        assert_eq!(regions.env_region, None);
        assert_eq!(regions.resolve(None), "eu-central-1");
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.snapshot_dir, PathBuf::from(".snapshots"));
        assert_eq!(settings.language, TargetLanguage::TypeScript);
        assert_eq!(settings.jobs, 1);
        assert_eq!(settings.regions.default_region, DEFAULT_REGION);
    }

    #[test]
    fn test_settings_from_environment() {
        let settings = Settings::from_lookup(lookup(&[
            ("SNAPSHOT_DIR", "/var/snapshots"),
            ("CODEGEN_LANGUAGE", "python"),
            ("CODEGEN_JOBS", "4"),
            ("AWS_DEFAULT_REGION", "eu-north-1"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(settings.snapshot_dir, PathBuf::from("/var/snapshots"));
        assert_eq!(settings.language, TargetLanguage::Python);
        assert_eq!(settings.jobs, 4);
        assert_eq!(settings.regions.env_region.as_deref(), Some("eu-north-1"));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_aws_region_preferred_over_default_region_variable() {
        let settings = Settings::from_lookup(lookup(&[
            ("AWS_REGION", "us-west-2"),
            ("AWS_DEFAULT_REGION", "eu-north-1"),
        ]))
        .unwrap();
        assert_eq!(settings.regions.env_region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_invalid_jobs_rejected() {
        let result = Settings::from_lookup(lookup(&[("CODEGEN_JOBS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_language_rejected() {
        let result = Settings::from_lookup(lookup(&[("CODEGEN_LANGUAGE", "cobol")]));
        assert!(result.is_err());
    }
}

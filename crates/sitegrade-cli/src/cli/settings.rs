//! Configuration layering for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file
//! (`~/.sitegrade/config.json` or `--config PATH`), provider credentials
//! from the environment, then command-line flags.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sitegrade::{AuditConfig, CancelPolicy, EngineSettings, ProviderCredentials, PsiStrategy, ScoringPolicy};
use std::path::{Path, PathBuf};

/// Contents of a config file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub audit: AuditConfig,
    pub scoring: ScoringPolicy,
    pub global_fetch_ceiling: Option<usize>,
}

/// Audit settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct FlagOverrides {
    pub max_pages: Option<usize>,
    pub max_depth: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub competitors: Vec<String>,
    pub psi_strategy: Option<PsiStrategy>,
    pub ignore_robots: bool,
    pub cancel_policy: Option<CancelPolicy>,
}

/// `~/.sitegrade/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sitegrade").join("config.json"))
}

/// Load the config file.
///
/// An explicit path must exist. The default location is optional.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: FileConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Fold the layers into one audit config and engine settings.
pub fn resolve(
    file: FileConfig,
    env: ProviderCredentials,
    flags: &FlagOverrides,
) -> (AuditConfig, EngineSettings) {
    let mut audit = file.audit;
    audit.credentials = env.or(audit.credentials);

    if let Some(v) = flags.max_pages {
        audit.max_pages = v;
    }
    if let Some(v) = flags.max_depth {
        audit.max_depth = v;
    }
    if let Some(v) = flags.timeout_ms {
        audit.overall_timeout_ms = v;
    }
    if let Some(v) = flags.request_timeout_ms {
        audit.per_request_timeout_ms = v;
    }
    if let Some(v) = flags.concurrency {
        audit.fetch_concurrency = v;
    }
    if !flags.competitors.is_empty() {
        audit.competitor_urls = flags.competitors.clone();
    }
    if let Some(v) = flags.psi_strategy {
        audit.credentials.psi_strategy = v;
    }
    if flags.ignore_robots {
        audit.respect_robots = false;
    }
    if let Some(v) = flags.cancel_policy {
        audit.cancel_policy = v;
    }

    let defaults = EngineSettings::default();
    let settings = EngineSettings {
        global_fetch_ceiling: file
            .global_fetch_ceiling
            .unwrap_or(defaults.global_fetch_ceiling),
        scoring: file.scoring,
        ..defaults
    };
    (audit, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(r#"{"audit": {"max_pages": 12}}"#);
        let config = load_file(Some(file.path())).unwrap();
        assert_eq!(config.audit.max_pages, 12);
        assert_eq!(config.audit.max_depth, AuditConfig::default().max_depth);
        assert!(config.global_fetch_ceiling.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_file(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let file = write_config("{ not json");
        let err = load_file(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }

    #[test]
    fn test_layer_precedence() {
        let file = write_config(
            r#"{
                "audit": {
                    "max_pages": 12,
                    "max_depth": 4,
                    "credentials": {"psi_api_key": "from-file", "authority_api_key": "file-token"}
                },
                "scoring": {"grade": {"provisional_below": 0.4}},
                "global_fetch_ceiling": 8
            }"#,
        );
        let config = load_file(Some(file.path())).unwrap();
        let env = ProviderCredentials {
            psi_api_key: Some("from-env".into()),
            ..ProviderCredentials::default()
        };
        let flags = FlagOverrides {
            max_pages: Some(3),
            psi_strategy: Some(PsiStrategy::Desktop),
            ignore_robots: true,
            ..FlagOverrides::default()
        };

        let (audit, settings) = resolve(config, env, &flags);
        assert_eq!(audit.max_pages, 3);
        assert_eq!(audit.max_depth, 4);
        assert!(!audit.respect_robots);
        assert_eq!(audit.credentials.psi_api_key.as_deref(), Some("from-env"));
        assert_eq!(audit.credentials.authority_api_key.as_deref(), Some("file-token"));
        assert_eq!(audit.credentials.psi_strategy, PsiStrategy::Desktop);
        assert_eq!(settings.global_fetch_ceiling, 8);
        assert_eq!(settings.scoring.grade.provisional_below, 0.4);
    }

    #[test]
    fn test_no_file_no_flags_is_default() {
        let (audit, settings) = resolve(
            FileConfig::default(),
            ProviderCredentials::default(),
            &FlagOverrides::default(),
        );
        assert_eq!(audit.max_pages, AuditConfig::default().max_pages);
        assert_eq!(
            settings.global_fetch_ceiling,
            EngineSettings::default().global_fetch_ceiling
        );
    }
}

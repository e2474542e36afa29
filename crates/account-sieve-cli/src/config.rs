use std::path::{Path, PathBuf};

use account_sieve_client::ClientConfig;
use account_sieve_core::{ConfigError, PipelineConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse JSON config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config {} must end in .yaml, .yml or .json", .path.display())]
    UnknownFormat { path: PathBuf },
}

/// Settings file layout:
///
/// ```yaml
/// client:
///   base_url: http://127.0.0.1:4020/
/// pipeline:
///   result_limit: 5
///   page_retry:
///     max_retries: 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SieveConfig {
    pub client: ClientConfig,
    pub pipeline: PipelineConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub limit: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub retries: Option<u32>,
}

impl SieveConfig {
    /// # Errors
    /// Fails when the file is unreadable, has an unknown extension or does
    /// not parse.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        let body = std::fs::read_to_string(path)
            .map_err(|source| LoadError::Read { path: path.to_path_buf(), source })?;
        match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_str(&body)
                .map_err(|source| LoadError::Yaml { path: path.to_path_buf(), source }),
            Some("json") => serde_json::from_str(&body)
                .map_err(|source| LoadError::Json { path: path.to_path_buf(), source }),
            _ => Err(LoadError::UnknownFormat { path: path.to_path_buf() }),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(base_url) = overrides.base_url {
            self.client.base_url = base_url;
        }
        if let Some(limit) = overrides.limit {
            self.pipeline.result_limit = limit;
        }
        if let Some(max_concurrent) = overrides.max_concurrent {
            self.pipeline.max_concurrent_details = Some(max_concurrent);
        }
        if let Some(retries) = overrides.retries {
            self.pipeline.page_retry.max_retries = retries;
        }
        self
    }

    /// # Errors
    /// Returns the first invalid client or pipeline setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        self.pipeline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, body: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("account-sieve-{}-{name}", std::process::id()));
        if let Err(err) = std::fs::write(&path, body) {
            panic!("failed to write {}: {err}", path.display());
        }
        path
    }

    fn load(name: &str, body: &str) -> Result<SieveConfig, LoadError> {
        let path = write_temp(name, body);
        let loaded = SieveConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        loaded
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config = load(
            "partial.yaml",
            "client:\n  base_url: http://127.0.0.1:4020/\npipeline:\n  result_limit: 3\n",
        )
        .unwrap_or_else(|err| panic!("yaml config should load: {err}"));

        assert_eq!(config.client.base_url, "http://127.0.0.1:4020/");
        assert_eq!(config.client.list_route, "list");
        assert_eq!(config.pipeline.result_limit, 3);
        assert_eq!(config.pipeline.page_retry.max_retries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_config_is_accepted() {
        let config = load(
            "config.json",
            r#"{ "pipeline": { "max_concurrent_details": 4, "page_retry": { "retry_delay_ms": 10 } } }"#,
        )
        .unwrap_or_else(|err| panic!("json config should load: {err}"));

        assert_eq!(config.pipeline.max_concurrent_details, Some(4));
        assert_eq!(config.pipeline.page_retry.retry_delay_ms, 10);
        assert_eq!(config.client, ClientConfig::default());
    }

    #[test]
    fn unknown_extension_and_bad_documents_are_rejected() {
        assert!(matches!(load("config.toml", "x = 1"), Err(LoadError::UnknownFormat { .. })));
        assert!(matches!(load("broken.yaml", "pipeline: [1, 2"), Err(LoadError::Yaml { .. })));
        assert!(matches!(load("broken.json", "{"), Err(LoadError::Json { .. })));
        assert!(matches!(
            SieveConfig::load(Path::new("/nonexistent/account-sieve.yaml")),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn flags_override_file_values() {
        let config = SieveConfig::default().with_overrides(Overrides {
            base_url: Some("http://localhost:9999".to_string()),
            limit: Some(10),
            max_concurrent: Some(3),
            retries: Some(0),
        });

        assert_eq!(config.client.base_url, "http://localhost:9999");
        assert_eq!(config.pipeline.result_limit, 10);
        assert_eq!(config.pipeline.max_concurrent_details, Some(3));
        assert_eq!(config.pipeline.page_retry.max_retries, 0);
        assert_eq!(config.pipeline.page_retry.retry_delay_ms, 500);
    }

    #[test]
    fn validation_reports_the_offending_setting() {
        let config = SieveConfig::default()
            .with_overrides(Overrides { max_concurrent: Some(0), ..Overrides::default() });
        assert_eq!(config.validate(), Err(ConfigError::Zero { field: "max_concurrent_details" }));

        let config = SieveConfig::default()
            .with_overrides(Overrides { base_url: Some(String::new()), ..Overrides::default() });
        assert_eq!(config.validate(), Err(ConfigError::EmptyBaseUrl));

        let config = SieveConfig::default()
            .with_overrides(Overrides { max_concurrent: Some(usize::MAX), ..Overrides::default() });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge { field: "max_concurrent_details", .. })
        ));
    }
}

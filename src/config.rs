use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY};
use crate::cache::DEFAULT_TTL;
use crate::domain::{NameMode, OrganismId};
use crate::error::AnnotatorError;
use crate::fetcher::DEFAULT_NEGATIVE_TTL;
use crate::lookup::RetryPolicy;
use crate::parser::ParseOptions;
use crate::transport::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};

pub const CONFIG_FILE_NAME: &str = "uniprot-annotator.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub organism_id: Option<String>,
    #[serde(default)]
    pub name_mode: Option<NameMode>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub backoff_base_ms: Option<u64>,
    #[serde(default)]
    pub cache_ttl_hours: Option<u64>,
    #[serde(default)]
    pub negative_cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub max_batch_size: Option<usize>,
    #[serde(default)]
    pub feature_types: Option<FeatureTypesEntry>,
}

/// `"all"`, `"visualization"`, or an explicit list of UniProt feature types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeatureTypesEntry {
    Preset(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub source: Option<Utf8PathBuf>,
    pub base_url: String,
    pub organism: OrganismId,
    pub name_mode: NameMode,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub negative_cache_ttl: Duration,
    pub max_concurrency: usize,
    pub max_batch_size: usize,
    pub parse_options: ParseOptions,
}

impl ResolvedConfig {
    /// Effective settings in the on-disk shape.
    pub fn to_config(&self) -> Config {
        Config {
            schema_version: Some(self.schema_version),
            base_url: Some(self.base_url.clone()),
            organism_id: Some(self.organism.to_string()),
            name_mode: Some(self.name_mode),
            request_timeout_secs: Some(self.request_timeout.as_secs()),
            max_retries: Some(self.retry.max_retries),
            backoff_base_ms: Some(self.retry.backoff_base.as_millis() as u64),
            cache_ttl_hours: Some(self.cache_ttl.as_secs() / 3600),
            negative_cache_ttl_secs: Some(self.negative_cache_ttl.as_secs()),
            max_concurrency: Some(self.max_concurrency),
            max_batch_size: Some(self.max_batch_size),
            feature_types: Some(match &self.parse_options.feature_types {
                None => FeatureTypesEntry::Preset("all".to_string()),
                Some(kinds) => FeatureTypesEntry::List(kinds.iter().cloned().collect()),
            }),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the explicit `path`, else `uniprot-annotator.json` in the current
    /// directory, else the per-user config file; falls back to defaults when
    /// none of those exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AnnotatorError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            debug!("no config file found; using defaults");
            return Self::resolve_config(Config::default(), None);
        };

        let config = Self::read(&config_path)?;
        Self::resolve_config(config, Some(config_path))
    }

    pub fn read(path: &Utf8Path) -> Result<Config, AnnotatorError> {
        let content = fs::read_to_string(path)
            .map_err(|_| AnnotatorError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| AnnotatorError::ConfigParse(err.to_string()))
    }

    pub fn user_config_path() -> Option<Utf8PathBuf> {
        let dirs = ProjectDirs::from("org", "uniprot-annotator", "uniprot-annotator")?;
        Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.as_std_path().exists() {
            return Some(local);
        }
        Self::user_config_path().filter(|path| path.as_std_path().exists())
    }

    pub fn resolve_config(
        config: Config,
        source: Option<Utf8PathBuf>,
    ) -> Result<ResolvedConfig, AnnotatorError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(AnnotatorError::ConfigValue(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AnnotatorError::ConfigValue(format!(
                "base_url must be an http(s) URL: {base_url}"
            )));
        }

        let organism = match config.organism_id {
            Some(value) => value.parse()?,
            None => OrganismId::default(),
        };

        let request_timeout = config
            .request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(AnnotatorError::ConfigValue(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
            backoff_base: config
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
        };

        let cache_ttl = config
            .cache_ttl_hours
            .map(|hours| Duration::from_secs(hours.saturating_mul(3600)))
            .unwrap_or(DEFAULT_TTL);
        let negative_cache_ttl = config
            .negative_cache_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_NEGATIVE_TTL);

        let max_concurrency = config.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        let max_batch_size = config.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE);
        if max_concurrency == 0 || max_batch_size == 0 {
            return Err(AnnotatorError::ConfigValue(
                "max_concurrency and max_batch_size must be positive".to_string(),
            ));
        }

        let parse_options = match config.feature_types {
            None => ParseOptions::default(),
            Some(FeatureTypesEntry::Preset(preset)) => match preset.as_str() {
                "all" => ParseOptions::default(),
                "visualization" => ParseOptions::visualization(),
                other => {
                    return Err(AnnotatorError::ConfigValue(format!(
                        "unknown feature_types preset {other:?}"
                    )));
                }
            },
            Some(FeatureTypesEntry::List(kinds)) => ParseOptions {
                feature_types: Some(kinds.into_iter().collect::<BTreeSet<_>>()),
            },
        };

        Ok(ResolvedConfig {
            schema_version,
            source,
            base_url,
            organism,
            name_mode: config.name_mode.unwrap_or_default(),
            request_timeout,
            retry,
            cache_ttl,
            negative_cache_ttl,
            max_concurrency,
            max_batch_size,
            parse_options,
        })
    }
}

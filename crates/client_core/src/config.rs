use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use shared::protocol::{STARTUPS_TABLE, STARTUP_UPLOADS_BUCKET};
use thiserror::Error;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "backend.toml";

/// What a submission does when the logo upload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadFailurePolicy {
    /// Continue with a null logo URL.
    #[default]
    Degrade,
    /// Fail the submission before anything is inserted.
    Abort,
}

impl FromStr for UploadFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "abort" => Ok(Self::Abort),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: Url,
    pub anon_key: String,
    pub bucket: String,
    pub table: String,
    pub upload_failure_policy: UploadFailurePolicy,
}

impl BackendSettings {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_backend_url(url)?,
            anon_key: anon_key.into(),
            bucket: STARTUP_UPLOADS_BUCKET.into(),
            table: STARTUPS_TABLE.into(),
            upload_failure_policy: UploadFailurePolicy::default(),
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),
    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid upload failure policy '{0}' (expected 'degrade' or 'abort')")]
    InvalidPolicy(String),
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    url: Option<String>,
    anon_key: Option<String>,
    bucket: Option<String>,
    table: Option<String>,
    upload_failure_policy: Option<String>,
}

#[derive(Debug, Default)]
struct RawSettings {
    url: Option<String>,
    anon_key: Option<String>,
    bucket: Option<String>,
    table: Option<String>,
    upload_failure_policy: Option<String>,
}

pub fn load_settings() -> Result<BackendSettings, ConfigError> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| {
        std::env::var(key).ok()
    })
}

/// Defaults, then the TOML file at `path` if it exists, then environment
/// overrides. Later sources win.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BackendSettings, ConfigError> {
    let mut raw = RawSettings::default();

    match fs::read_to_string(path) {
        Ok(contents) => {
            let file_cfg: FileSettings =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            raw.url = file_cfg.url;
            raw.anon_key = file_cfg.anon_key;
            raw.bucket = file_cfg.bucket;
            raw.table = file_cfg.table;
            raw.upload_failure_policy = file_cfg.upload_failure_policy;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = lookup("SUPABASE_URL") {
        raw.url = Some(v);
    }
    if let Some(v) = lookup("APP__SUPABASE_URL") {
        raw.url = Some(v);
    }

    if let Some(v) = lookup("SUPABASE_ANON_KEY") {
        raw.anon_key = Some(v);
    }
    if let Some(v) = lookup("APP__SUPABASE_ANON_KEY") {
        raw.anon_key = Some(v);
    }

    if let Some(v) = lookup("APP__STORAGE_BUCKET") {
        raw.bucket = Some(v);
    }
    if let Some(v) = lookup("APP__PROFILE_TABLE") {
        raw.table = Some(v);
    }
    if let Some(v) = lookup("APP__UPLOAD_FAILURE_POLICY") {
        raw.upload_failure_policy = Some(v);
    }

    let url = raw
        .url
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing("url"))?;
    let anon_key = raw
        .anon_key
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing("anon_key"))?;

    let mut settings = BackendSettings::new(&url, anon_key)?;
    if let Some(bucket) = raw.bucket.filter(|v| !v.trim().is_empty()) {
        settings.bucket = bucket.trim().to_string();
    }
    if let Some(table) = raw.table.filter(|v| !v.trim().is_empty()) {
        settings.table = table.trim().to_string();
    }
    if let Some(policy) = raw.upload_failure_policy {
        settings.upload_failure_policy = policy.parse()?;
    }

    Ok(settings)
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an http(s) base url".into(),
        });
    }

    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

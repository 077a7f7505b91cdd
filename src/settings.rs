//! Configuration files and option precedence
//!
//! Precedence, lowest to highest: built-in defaults, global config file
//! (`$HOME/.katyusha/katyusha.yaml`), benchmark file (`-b`), environment
//! (`KATYUSHA_*`, handled by clap), explicit flags.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use katyusha_core::{BenchmarkParameters, Headers, ParameterGroups};

use crate::cli::BenchmarkArgs;

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_REQUESTS: u64 = 1000;
const DEFAULT_CONNECTIONS: usize = 10;
const DEFAULT_ABORT: u64 = 1000;
const DEFAULT_DESCRIPTION: &str = "Default benchmark description";

/// Declarative benchmark options, as stored in YAML files. Every field is
/// optional so files can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BenchmarkFile {
    pub description: Option<String>,
    pub host: Option<String>,
    pub method: Option<String>,
    pub version_endpoint: Option<String>,

    pub requests: Option<u64>,
    pub connections: Option<usize>,
    pub abort: Option<u64>,

    pub insecure: Option<bool>,
    pub ca: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,

    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub keep_alive: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub request_delay: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub read_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub write_timeout: Option<Duration>,

    pub header: Vec<String>,
    pub parameter: Vec<String>,
    pub body: Option<String>,

    /// Inventory location; only meaningful in the global config file.
    pub db: Option<PathBuf>,
}

impl BenchmarkFile {
    /// Load a benchmark file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read benchmark file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("could not parse benchmark file {}", path.display()))
    }

    /// Overlay `other` on top of `self`; set fields in `other` win, header
    /// and parameter lists accumulate.
    pub fn merged(mut self, other: BenchmarkFile) -> Self {
        self.description = other.description.or(self.description);
        self.host = other.host.or(self.host);
        self.method = other.method.or(self.method);
        self.version_endpoint = other.version_endpoint.or(self.version_endpoint);
        self.requests = other.requests.or(self.requests);
        self.connections = other.connections.or(self.connections);
        self.abort = other.abort.or(self.abort);
        self.insecure = other.insecure.or(self.insecure);
        self.ca = other.ca.or(self.ca);
        self.cert = other.cert.or(self.cert);
        self.key = other.key.or(self.key);
        self.duration = other.duration.or(self.duration);
        self.keep_alive = other.keep_alive.or(self.keep_alive);
        self.request_delay = other.request_delay.or(self.request_delay);
        self.read_timeout = other.read_timeout.or(self.read_timeout);
        self.write_timeout = other.write_timeout.or(self.write_timeout);
        self.header.extend(other.header);
        self.parameter.extend(other.parameter);
        self.body = other.body.or(self.body);
        self.db = other.db.or(self.db);
        self
    }

    /// Overlay explicit flags; flags win over file values.
    pub fn apply_flags(mut self, args: &BenchmarkArgs) -> Self {
        self.description = args.description.clone().or(self.description);
        self.host = args.host.clone().or(self.host);
        self.method = args.method.clone().or(self.method);
        self.version_endpoint = args.version_endpoint.clone().or(self.version_endpoint);
        self.requests = args.requests.or(self.requests);
        self.connections = args.connections.or(self.connections);
        self.abort = args.abort.or(self.abort);
        if args.insecure {
            self.insecure = Some(true);
        }
        self.ca = args.ca.clone().or(self.ca);
        self.cert = args.cert.clone().or(self.cert);
        self.key = args.key.clone().or(self.key);
        self.duration = args.duration.or(self.duration);
        self.keep_alive = args.keep_alive.or(self.keep_alive);
        self.request_delay = args.request_delay.or(self.request_delay);
        self.read_timeout = args.read_timeout.or(self.read_timeout);
        self.write_timeout = args.write_timeout.or(self.write_timeout);
        self.header.extend(args.headers.iter().cloned());
        self.parameter.extend(args.parameters.iter().cloned());
        self
    }

    /// Resolve into validated benchmark parameters plus the description.
    pub fn into_parameters(self) -> Result<(BenchmarkParameters, String)> {
        let Some(host) = self.host else {
            bail!("host not provided");
        };

        let mut headers = Headers::new();
        for raw in &self.header {
            headers.set(raw)?;
        }

        let mut parameters = ParameterGroups::new();
        for raw in &self.parameter {
            parameters.push_group(raw)?;
        }

        let params = BenchmarkParameters {
            url: host,
            method: self.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            target_endpoint: self.version_endpoint.unwrap_or_default(),
            req_count: self.requests.unwrap_or(DEFAULT_REQUESTS),
            abort_after: self.abort.unwrap_or(DEFAULT_ABORT),
            concurrent_conns: self.connections.unwrap_or(DEFAULT_CONNECTIONS),
            skip_verify: self.insecure.unwrap_or(false),
            ca: self.ca.unwrap_or_default(),
            cert: self.cert.unwrap_or_default(),
            key: self.key.unwrap_or_default(),
            duration: self.duration.unwrap_or(Duration::ZERO),
            keep_alive: self.keep_alive.unwrap_or(Duration::ZERO),
            request_delay: self.request_delay.unwrap_or(Duration::ZERO),
            read_timeout: self.read_timeout.unwrap_or(Duration::ZERO),
            write_timeout: self.write_timeout.unwrap_or(Duration::ZERO),
            headers,
            parameters,
            body: self.body.map(String::into_bytes).unwrap_or_default(),
        };

        let description = self
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Ok((params, description))
    }
}

/// Loaded global settings.
#[derive(Debug, Default)]
pub struct Settings {
    defaults: BenchmarkFile,
}

impl Settings {
    /// Load the global config file. A missing file is only an error when it
    /// was asked for explicitly.
    pub fn load(config_flag: Option<PathBuf>) -> Result<Self> {
        let explicit = config_flag.is_some();
        let path = config_flag.unwrap_or_else(default_config_path);

        let defaults = if path.exists() {
            BenchmarkFile::load(&path)?
        } else if explicit {
            bail!("config file {} does not exist", path.display());
        } else {
            BenchmarkFile::default()
        };

        Ok(Self { defaults })
    }

    /// Benchmark defaults carried by the global config file.
    pub fn benchmark_defaults(&self) -> BenchmarkFile {
        self.defaults.clone()
    }

    /// Resolve the inventory location: `--db`/`KATYUSHA_DB`, then the global
    /// config file, then `$HOME/.katyusha/inventory.db`. The parent
    /// directory is created when missing.
    pub fn db_path(&self, db_flag: Option<PathBuf>) -> Result<PathBuf> {
        let path = db_flag
            .or_else(|| self.defaults.db.clone())
            .unwrap_or_else(default_db_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("could not create inventory directory {}", parent.display())
                })?;
            }
        }

        Ok(path)
    }
}

fn katyusha_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".katyusha")
}

fn default_config_path() -> PathBuf {
    katyusha_home().join("katyusha.yaml")
}

fn default_db_path() -> PathBuf {
    katyusha_home().join("inventory.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
description: "smoke test"
host: "http://localhost:8080"
method: POST
requests: 50
connections: 5
duration: 30s
request_delay: 100ms
header:
  - "TEST: TEST"
parameter:
  - "key=value"
body: "TEST BODY"
"#;

    #[test]
    fn test_file_parses_and_resolves() {
        let file: BenchmarkFile = serde_yaml::from_str(SAMPLE).unwrap();
        let (params, description) = file.into_parameters().unwrap();

        assert_eq!(description, "smoke test");
        assert_eq!(params.url, "http://localhost:8080");
        assert_eq!(params.method, "POST");
        assert_eq!(params.req_count, 50);
        assert_eq!(params.concurrent_conns, 5);
        assert_eq!(params.duration, Duration::from_secs(30));
        assert_eq!(params.request_delay, Duration::from_millis(100));
        assert_eq!(params.headers.get("TEST"), Some("TEST"));
        assert_eq!(params.parameters.len(), 1);
        assert_eq!(params.body, b"TEST BODY");
        // Untouched fields fall back to built-in defaults.
        assert_eq!(params.abort_after, 1000);
    }

    #[test]
    fn test_defaults_applied_when_file_is_minimal() {
        let file = BenchmarkFile {
            host: Some("http://localhost:1".to_string()),
            ..Default::default()
        };
        let (params, description) = file.into_parameters().unwrap();

        assert_eq!(params.method, "GET");
        assert_eq!(params.req_count, 1000);
        assert_eq!(params.concurrent_conns, 10);
        assert_eq!(params.abort_after, 1000);
        assert_eq!(description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_missing_host_is_an_error() {
        assert!(BenchmarkFile::default().into_parameters().is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file: BenchmarkFile = serde_yaml::from_str(SAMPLE).unwrap();
        let args = BenchmarkArgs {
            method: Some("PUT".to_string()),
            requests: Some(7),
            headers: vec!["Extra: 1".to_string()],
            ..Default::default()
        };

        let (params, _) = file.apply_flags(&args).into_parameters().unwrap();

        assert_eq!(params.method, "PUT");
        assert_eq!(params.req_count, 7);
        assert_eq!(params.headers.get("TEST"), Some("TEST"));
        assert_eq!(params.headers.get("Extra"), Some("1"));
    }

    #[test]
    fn test_merged_prefers_overlay() {
        let base: BenchmarkFile = serde_yaml::from_str(SAMPLE).unwrap();
        let overlay = BenchmarkFile {
            method: Some("DELETE".to_string()),
            ..Default::default()
        };

        let merged = base.merged(overlay);
        assert_eq!(merged.method.as_deref(), Some("DELETE"));
        assert_eq!(merged.host.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_malformed_header_in_file_fails() {
        let file = BenchmarkFile {
            host: Some("http://localhost:1".to_string()),
            header: vec!["no colon here".to_string()],
            ..Default::default()
        };
        assert!(file.into_parameters().is_err());
    }
}

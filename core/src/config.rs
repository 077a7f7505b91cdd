//! Benchmark parameter types and input parsing
//!
//! `BenchmarkParameters` is immutable for the duration of one run. Header
//! and parameter values arrive as raw strings (`"Name: value"`,
//! `"k1=v1&k2=v2"`) from the CLI, benchmark files and the inventory, and go
//! through the same parsers everywhere.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w-]+):\s*(.+)").expect("header regex"));

/// Single-valued request headers, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store a raw `"Name: value"` entry.
    ///
    /// The name must match `[\w-]+`; anything else is a configuration error.
    pub fn set(&mut self, raw: &str) -> Result<()> {
        let caps = HEADER_RE
            .captures(raw)
            .ok_or_else(|| Error::config(format!("can't parse header {raw:?}")))?;

        // The regex alone lets `.+` backtrack into trailing whitespace, so
        // an all-whitespace value would slip through.
        if caps[2].trim().is_empty() {
            return Err(Error::config(format!("can't parse header {raw:?}")));
        }

        self.0.insert(caps[1].to_string(), caps[2].to_string());
        Ok(())
    }

    /// Insert an already-split name/value pair without re-parsing
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Iterate over header entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Number of stored headers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no headers are stored
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a header value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Encode entries in the persisted `"name: value"` form, sorted by name.
    pub fn to_rows(&self) -> Vec<String> {
        let mut rows: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        rows.sort();
        rows
    }
}

/// Ordered parameter groups; one group is chosen uniformly at random per
/// request and applied as query args (GET) or form args (POST/PUT).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterGroups(Vec<HashMap<String, String>>);

impl ParameterGroups {
    /// Create an empty group list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `"k1=v1&k2=v2"` group and append it.
    ///
    /// Every `&`-separated segment must contain exactly one `=`.
    pub fn push_group(&mut self, raw: &str) -> Result<()> {
        let mut group = HashMap::new();

        for segment in raw.split('&') {
            let parts: Vec<&str> = segment.split('=').collect();
            if parts.len() != 2 {
                return Err(Error::config(format!("can't parse parameter {raw:?}")));
            }
            group.insert(parts[0].to_string(), parts[1].to_string());
        }

        self.0.push(group);
        Ok(())
    }

    /// The stored groups, in insertion order
    pub fn groups(&self) -> &[HashMap<String, String>] {
        &self.0
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no groups are stored
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode groups in the persisted `"k1=v1&k2=v2"` form, one row per
    /// group, keys sorted within a group.
    pub fn to_rows(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|group| {
                let mut pairs: Vec<String> =
                    group.iter().map(|(k, v)| format!("{k}={v}")).collect();
                pairs.sort();
                pairs.join("&")
            })
            .collect()
    }
}

/// What ends a benchmark run: a request budget or an elapsed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Issue exactly this many requests
    Requests(u64),
    /// Issue requests until this much time has elapsed
    Duration(Duration),
}

/// Parameters of one benchmark run.
///
/// Constructed by the caller and owned by the driver until the summary is
/// returned. Empty strings mean "unused" for `target_endpoint`, `ca`,
/// `cert` and `key`; zero durations disable the corresponding behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkParameters {
    /// Absolute target URL
    pub url: String,
    /// HTTP method (GET, POST, PUT, ...)
    pub method: String,
    /// Relative endpoint probed once before the run for a version string
    pub target_endpoint: String,

    /// Request budget; 0 defers to `duration`
    pub req_count: u64,
    /// Failure count that aborts the run; 0 disables
    pub abort_after: u64,
    /// Number of concurrent worker connections (>= 1)
    pub concurrent_conns: usize,

    /// Disable TLS verification (CA/cert/key are then ignored)
    pub skip_verify: bool,
    /// Path to a PEM CA bundle loaded as a private root set
    pub ca: String,
    /// Path to a PEM client certificate (used together with `key`)
    pub cert: String,
    /// Path to a PEM client key (used together with `cert`)
    pub key: String,

    /// Run duration; non-zero takes precedence over `req_count`
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Connection idle keep-alive
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
    /// Pause between consecutive requests of one worker
    #[serde(with = "humantime_serde")]
    pub request_delay: Duration,
    /// Per-exchange read timeout
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Per-exchange write timeout
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Request headers
    pub headers: Headers,
    /// Parameter groups
    pub parameters: ParameterGroups,

    /// Request body, applied to POST/PUT only
    #[serde(with = "body_text")]
    pub body: Vec<u8>,
}

impl Default for BenchmarkParameters {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            target_endpoint: String::new(),
            req_count: 0,
            abort_after: 0,
            concurrent_conns: 1,
            skip_verify: false,
            ca: String::new(),
            cert: String::new(),
            key: String::new(),
            duration: Duration::ZERO,
            keep_alive: Duration::ZERO,
            request_delay: Duration::ZERO,
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            headers: Headers::new(),
            parameters: ParameterGroups::new(),
            body: Vec::new(),
        }
    }
}

impl BenchmarkParameters {
    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL is missing, the method is
    /// not a valid HTTP method, `concurrent_conns` is zero, or neither
    /// `req_count` nor `duration` defines a stop condition.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("target URL must be provided"));
        }

        reqwest::Url::parse(&self.url)
            .map_err(|e| Error::config(format!("invalid target URL {:?}: {e}", self.url)))?;

        reqwest::Method::from_bytes(self.method.as_bytes())
            .map_err(|_| Error::config(format!("invalid HTTP method {:?}", self.method)))?;

        if self.concurrent_conns == 0 {
            return Err(Error::config("concurrent connections must be at least 1"));
        }

        if self.req_count == 0 && self.duration.is_zero() {
            return Err(Error::config(
                "either a request count or a duration must define the stop condition",
            ));
        }

        if self.req_count > 0 && !self.duration.is_zero() {
            tracing::warn!(
                req_count = self.req_count,
                duration = %humantime::format_duration(self.duration),
                "both stop conditions set, duration wins"
            );
        }

        Ok(())
    }

    /// Resolve the stop condition; a non-zero duration wins over a budget.
    pub fn stop_condition(&self) -> StopCondition {
        if !self.duration.is_zero() {
            StopCondition::Duration(self.duration)
        } else {
            StopCondition::Requests(self.req_count)
        }
    }
}

/// Serialize the request body as text so benchmark files can carry it as a
/// plain YAML string.
mod body_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

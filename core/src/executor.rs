//! Request execution against the benchmark target
//!
//! The driver talks to the network through the [`RequestExecutor`] trait so
//! the worker pipeline can be exercised without a server. [`HttpExecutor`]
//! is the production implementation: one shared connection-pooled client,
//! a prepared request template, and per-request parameter-group selection.

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Identity, Method, Url};
use std::fs;
use std::time::Instant;

use crate::config::BenchmarkParameters;
use crate::error::{Error, Result};
use crate::stats::RequestStat;
use crate::PRODUCT_TOKEN;

/// One HTTP exchange against an immutable request template.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform one exchange and report its timing and outcome.
    async fn execute(&self) -> RequestStat;

    /// Fetch the target version string from the auxiliary endpoint.
    async fn probe_version(&self) -> Result<String>;
}

/// Production executor over a shared `reqwest` client.
pub struct HttpExecutor {
    client: reqwest::Client,
    method: Method,
    url: Url,
    headers: HeaderMap,
    groups: Vec<Vec<(String, String)>>,
    body: Vec<u8>,
    target_endpoint: String,
}

impl HttpExecutor {
    /// Build the executor from benchmark parameters.
    ///
    /// # Errors
    ///
    /// Fails on invalid URL/method/header material and on unreadable or
    /// malformed TLS files.
    pub fn new(params: &BenchmarkParameters) -> Result<Self> {
        let url = Url::parse(&params.url)
            .map_err(|e| Error::config(format!("invalid target URL {:?}: {e}", params.url)))?;

        let method = Method::from_bytes(params.method.as_bytes())
            .map_err(|_| Error::config(format!("invalid HTTP method {:?}", params.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in params.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let groups = params
            .parameters
            .groups()
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        let client = build_client(params)?;

        Ok(Self {
            client,
            method,
            url,
            headers,
            groups,
            body: params.body.clone(),
            target_endpoint: params.target_endpoint.clone(),
        })
    }
}

fn build_client(params: &BenchmarkParameters) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .user_agent(PRODUCT_TOKEN)
        .pool_max_idle_per_host(params.concurrent_conns);

    if !params.keep_alive.is_zero() {
        builder = builder.pool_idle_timeout(params.keep_alive);
    }

    if !params.read_timeout.is_zero() {
        builder = builder.read_timeout(params.read_timeout);
    }

    // reqwest exposes no dedicated write timeout; the write budget caps the
    // whole exchange instead.
    if !params.write_timeout.is_zero() {
        builder = builder.timeout(params.write_timeout);
    }

    if params.skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    } else if !params.ca.is_empty() {
        let ca_pem = fs::read(&params.ca)
            .map_err(|e| Error::tls(format!("error reading CA file {}: {e}", params.ca)))?;
        let ca = Certificate::from_pem(&ca_pem)
            .map_err(|e| Error::tls(format!("malformed CA file {}: {e}", params.ca)))?;

        builder = builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca);

        if !params.cert.is_empty() && !params.key.is_empty() {
            let mut identity_pem = fs::read(&params.cert).map_err(|e| {
                Error::tls(format!("error reading cert file {}: {e}", params.cert))
            })?;
            let key_pem = fs::read(&params.key)
                .map_err(|e| Error::tls(format!("error reading key file {}: {e}", params.key)))?;
            identity_pem.extend_from_slice(&key_pem);

            let identity = Identity::from_pem(&identity_pem)
                .map_err(|e| Error::tls(format!("could not load client key pair: {e}")))?;
            builder = builder.identity(identity);
        }
    }

    builder.build().map_err(Error::from)
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self) -> RequestStat {
        let mut request = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());

        if let Some(group) = self.groups.choose(&mut rand::rng()) {
            request = if self.method == Method::GET {
                request.query(group)
            } else {
                request.form(group)
            };
        }

        if !self.body.is_empty() && (self.method == Method::POST || self.method == Method::PUT) {
            request = request.body(self.body.clone());
        }

        let start = Utc::now();
        let started = Instant::now();

        let (status_code, body_size, error) = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(body) => (status, body.len(), None),
                    Err(e) => (status, 0, Some(e.to_string())),
                }
            }
            Err(e) => (0, 0, Some(e.to_string())),
        };

        let duration = started.elapsed();

        RequestStat {
            start,
            end: Utc::now(),
            duration,
            body_size,
            status_code,
            error,
        }
    }

    async fn probe_version(&self) -> Result<String> {
        let endpoint = self
            .url
            .join(&self.target_endpoint)
            .map_err(|e| Error::config(format!("invalid target endpoint: {e}")))?;

        let response = self.client.get(endpoint).send().await?;
        let body = response.text().await?;

        Ok(body.trim().to_string())
    }
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("parameter_groups", &self.groups.len())
            .finish()
    }
}

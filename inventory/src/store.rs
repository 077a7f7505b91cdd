//! Inventory CRUD over an SQLite pool

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use katyusha_core::{BenchmarkParameters, Headers, ParameterGroups, Summary};

use crate::error::{InventoryError, Result};
use crate::model::{BenchmarkConfiguration, BenchmarkSummary};
use crate::schema::{CONFIG_FIELDS, SCHEMA, SUMMARY_FIELDS};

/// Inventory of benchmark configurations and summaries.
pub struct Inventory {
    pool: SqlitePool,
}

fn encode_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

fn decode_duration(text: &str) -> Result<Duration> {
    humantime::parse_duration(text)
        .map_err(|e| InventoryError::decode(format!("bad duration {text:?}: {e}")))
}

fn decode_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| InventoryError::decode(format!("bad timestamp {text:?}: {e}")))
}

impl Inventory {
    /// Open (and create, if missing) the inventory database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// In-memory inventory, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Store a configuration under a unique (url, description) pair.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Conflict`] carrying the existing id when
    /// the pair is already stored.
    pub async fn insert_config(
        &self,
        params: &BenchmarkParameters,
        description: &str,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let insert = format!(
            "INSERT INTO benchmark_configuration({CONFIG_FIELDS}) \
             VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"
        );

        let inserted = sqlx::query(&insert)
            .bind(description)
            .bind(&params.url)
            .bind(&params.method)
            .bind(params.req_count as i64)
            .bind(params.concurrent_conns as i64)
            .bind(params.skip_verify)
            .bind(params.abort_after as i64)
            .bind(&params.ca)
            .bind(&params.cert)
            .bind(&params.key)
            .bind(encode_duration(params.duration))
            .bind(encode_duration(params.keep_alive))
            .bind(encode_duration(params.request_delay))
            .bind(encode_duration(params.read_timeout))
            .bind(encode_duration(params.write_timeout))
            .bind(&params.body)
            .execute(&mut *tx)
            .await;

        let config_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(e) => {
                let unique = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if unique {
                    drop(tx);
                    let existing = self.find(&params.url, description).await?;
                    let id = existing.map(|config| config.id).unwrap_or_default();
                    return Err(InventoryError::Conflict { id });
                }
                return Err(e.into());
            }
        };

        for header in params.headers.to_rows() {
            sqlx::query("INSERT INTO headers(header,config_id) VALUES(?,?)")
                .bind(header)
                .bind(config_id)
                .execute(&mut *tx)
                .await?;
        }

        for parameter in params.parameters.to_rows() {
            sqlx::query("INSERT INTO parameters(parameter,config_id) VALUES(?,?)")
                .bind(parameter)
                .bind(config_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(config_id, url = %params.url, "configuration stored");

        Ok(config_id)
    }

    /// All stored configurations.
    pub async fn find_all(&self) -> Result<Vec<BenchmarkConfiguration>> {
        let query = format!("SELECT id,{CONFIG_FIELDS} FROM benchmark_configuration");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut configs = Vec::with_capacity(rows.len());
        for row in rows {
            configs.push(self.config_from_row(row).await?);
        }

        Ok(configs)
    }

    /// Look a configuration up by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<BenchmarkConfiguration>> {
        let query = format!("SELECT id,{CONFIG_FIELDS} FROM benchmark_configuration WHERE id = ?");
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(self.config_from_row(row).await?)),
            None => Ok(None),
        }
    }

    /// All configurations stored for a URL.
    pub async fn find_by_url(&self, url: &str) -> Result<Vec<BenchmarkConfiguration>> {
        let query = format!("SELECT id,{CONFIG_FIELDS} FROM benchmark_configuration WHERE url = ?");
        let rows = sqlx::query(&query).bind(url).fetch_all(&self.pool).await?;

        let mut configs = Vec::with_capacity(rows.len());
        for row in rows {
            configs.push(self.config_from_row(row).await?);
        }

        Ok(configs)
    }

    /// Look a configuration up by its unique (url, description) pair.
    pub async fn find(
        &self,
        url: &str,
        description: &str,
    ) -> Result<Option<BenchmarkConfiguration>> {
        let query = format!(
            "SELECT id,{CONFIG_FIELDS} FROM benchmark_configuration \
             WHERE url = ? AND description = ?"
        );
        let row = sqlx::query(&query)
            .bind(url)
            .bind(description)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.config_from_row(row).await?)),
            None => Ok(None),
        }
    }

    /// Store a run summary for a configuration, with one error row per
    /// distinct error key, atomically.
    pub async fn insert_summary(&self, summary: &Summary, config_id: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let insert = format!(
            "INSERT INTO benchmark_summary({SUMMARY_FIELDS},config_id) \
             VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"
        );

        let done = sqlx::query(&insert)
            .bind(summary.start.to_rfc3339())
            .bind(summary.end.to_rfc3339())
            .bind(encode_duration(summary.total_time))
            .bind(summary.req_count as i64)
            .bind(summary.success as i64)
            .bind(summary.fail as i64)
            .bind(summary.data_transferred as i64)
            .bind(summary.req_per_sec)
            .bind(encode_duration(summary.avg))
            .bind(encode_duration(summary.min))
            .bind(encode_duration(summary.max))
            .bind(encode_duration(summary.p50))
            .bind(encode_duration(summary.p75))
            .bind(encode_duration(summary.p90))
            .bind(encode_duration(summary.p99))
            .bind(config_id)
            .execute(&mut *tx)
            .await?;

        let summary_id = done.last_insert_rowid();

        for (name, count) in &summary.errors {
            sqlx::query("INSERT INTO errors(name,count,summary_id) VALUES(?,?,?)")
                .bind(name)
                .bind(*count as i64)
                .bind(summary_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(summary_id, config_id, "summary stored");

        Ok(summary_id)
    }

    /// All summaries stored for a configuration.
    pub async fn find_summaries(&self, config_id: i64) -> Result<Vec<BenchmarkSummary>> {
        let query =
            format!("SELECT id,{SUMMARY_FIELDS} FROM benchmark_summary WHERE config_id = ?");
        let rows = sqlx::query(&query)
            .bind(config_id)
            .fetch_all(&self.pool)
            .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(self.summary_from_row(row, config_id).await?);
        }

        Ok(summaries)
    }

    /// Delete a configuration; summaries, errors, headers and parameters
    /// cascade.
    pub async fn delete(&self, config_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM benchmark_configuration WHERE id = ?")
            .bind(config_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(config_id, "configuration deleted");

        Ok(())
    }

    async fn config_from_row(&self, row: SqliteRow) -> Result<BenchmarkConfiguration> {
        let id: i64 = row.try_get("id")?;

        let mut headers = Headers::new();
        let header_rows = sqlx::query("SELECT header FROM headers WHERE config_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        for header_row in header_rows {
            let raw: String = header_row.try_get("header")?;
            headers
                .set(&raw)
                .map_err(|e| InventoryError::decode(e.to_string()))?;
        }

        let mut parameters = ParameterGroups::new();
        let parameter_rows = sqlx::query("SELECT parameter FROM parameters WHERE config_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        for parameter_row in parameter_rows {
            let raw: String = parameter_row.try_get("parameter")?;
            parameters
                .push_group(&raw)
                .map_err(|e| InventoryError::decode(e.to_string()))?;
        }

        let duration: String = row.try_get("duration")?;
        let keep_alive: String = row.try_get("keep_alive")?;
        let request_delay: String = row.try_get("request_delay")?;
        let read_timeout: String = row.try_get("read_timeout")?;
        let write_timeout: String = row.try_get("write_timeout")?;

        let params = BenchmarkParameters {
            url: row.try_get("url")?,
            method: row.try_get("method")?,
            target_endpoint: String::new(),
            req_count: row.try_get::<i64, _>("requests_count")? as u64,
            abort_after: row.try_get::<i64, _>("abort_after")? as u64,
            concurrent_conns: row.try_get::<i64, _>("concurrent_conns")? as usize,
            skip_verify: row.try_get("skip_verify")?,
            ca: row.try_get("ca")?,
            cert: row.try_get("cert")?,
            key: row.try_get("key")?,
            duration: decode_duration(&duration)?,
            keep_alive: decode_duration(&keep_alive)?,
            request_delay: decode_duration(&request_delay)?,
            read_timeout: decode_duration(&read_timeout)?,
            write_timeout: decode_duration(&write_timeout)?,
            headers,
            parameters,
            body: row.try_get("body")?,
        };

        Ok(BenchmarkConfiguration {
            id,
            description: row.try_get("description")?,
            params,
        })
    }

    async fn summary_from_row(&self, row: SqliteRow, config_id: i64) -> Result<BenchmarkSummary> {
        let id: i64 = row.try_get("id")?;

        let mut errors = std::collections::HashMap::new();
        let error_rows = sqlx::query("SELECT name,count FROM errors WHERE summary_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        for error_row in error_rows {
            let name: String = error_row.try_get("name")?;
            let count: i64 = error_row.try_get("count")?;
            errors.insert(name, count as u64);
        }

        let start: String = row.try_get("start")?;
        let end: String = row.try_get("end")?;
        let total_time: String = row.try_get("duration")?;
        let avg: String = row.try_get("avg_req_time")?;
        let min: String = row.try_get("min_req_time")?;
        let max: String = row.try_get("max_req_time")?;
        let p50: String = row.try_get("p50_req_time")?;
        let p75: String = row.try_get("p75_req_time")?;
        let p90: String = row.try_get("p90_req_time")?;
        let p99: String = row.try_get("p99_req_time")?;

        let summary = Summary {
            url: String::new(),
            target_version: String::new(),
            start: decode_timestamp(&start)?,
            end: decode_timestamp(&end)?,
            total_time: decode_duration(&total_time)?,
            req_count: row.try_get::<i64, _>("requests_count")? as u64,
            success: row.try_get::<i64, _>("success_req")? as u64,
            fail: row.try_get::<i64, _>("fail_req")? as u64,
            data_transferred: row.try_get::<i64, _>("data_transfered")? as u64,
            req_per_sec: row.try_get("req_per_sec")?,
            avg: decode_duration(&avg)?,
            min: decode_duration(&min)?,
            max: decode_duration(&max)?,
            p50: decode_duration(&p50)?,
            p75: decode_duration(&p75)?,
            p90: decode_duration(&p90)?,
            p99: decode_duration(&p99)?,
            std_deviation: 0.0,
            errors,
        };

        Ok(BenchmarkSummary {
            id,
            config_id,
            summary,
        })
    }
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory").finish()
    }
}

//! Stored inventory entities

use katyusha_core::{BenchmarkParameters, Summary};
use std::fmt;

/// A persisted benchmark configuration. (`url`, `description`) is unique
/// across the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfiguration {
    /// Stable row id (>= 1)
    pub id: i64,
    /// Operator-supplied description
    pub description: String,
    /// The stored parameters
    pub params: BenchmarkParameters,
}

impl fmt::Display for BenchmarkConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        writeln!(f, "Benchmark configuration:")?;
        writeln!(f, "ID:                     {}", self.id)?;
        writeln!(f, "Description:            {}", self.description)?;
        writeln!(f, "URL:                    {}", p.url)?;
        writeln!(f, "Method:                 {}", p.method)?;
        writeln!(f, "Request count:          {}", p.req_count)?;
        writeln!(f, "Abort:                  {}", p.abort_after)?;
        writeln!(f, "Concurrent connections: {}", p.concurrent_conns)?;
        writeln!(f, "Skip verify:            {}", p.skip_verify)?;
        writeln!(f, "CA:                     {}", p.ca)?;
        writeln!(f, "Cert:                   {}", p.cert)?;
        writeln!(f, "Key:                    {}", p.key)?;
        writeln!(
            f,
            "Duration:               {}",
            humantime::format_duration(p.duration)
        )?;
        writeln!(
            f,
            "Keep alive:             {}",
            humantime::format_duration(p.keep_alive)
        )?;
        writeln!(
            f,
            "Request delay:          {}",
            humantime::format_duration(p.request_delay)
        )?;
        writeln!(
            f,
            "Read timeout:           {}",
            humantime::format_duration(p.read_timeout)
        )?;
        writeln!(
            f,
            "Write timeout:          {}",
            humantime::format_duration(p.write_timeout)
        )?;
        writeln!(f, "Headers:                {:?}", p.headers.to_rows())?;
        writeln!(f, "Parameters:             {:?}", p.parameters.to_rows())?;
        write!(
            f,
            "Body:                   {}",
            String::from_utf8_lossy(&p.body)
        )
    }
}

/// A persisted run summary tied to its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    /// Stable row id
    pub id: i64,
    /// Owning configuration id
    pub config_id: i64,
    /// The stored summary
    pub summary: Summary,
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary ID:          {}", self.id)?;
        write!(f, "{}", self.summary)
    }
}

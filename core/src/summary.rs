//! Benchmark summary assembly and latency percentiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Raw totals collected by the aggregator for one run.
#[derive(Debug, Default)]
pub struct RunTotals {
    /// Observed latencies, in arrival order
    pub latencies: Vec<Duration>,
    /// Requests with status 200 and no transport error
    pub success: u64,
    /// Everything else
    pub fail: u64,
    /// Bytes of response body over successful requests
    pub data_transferred: u64,
    /// Error key -> occurrence count
    pub errors: HashMap<String, u64>,
}

/// End results of one benchmark run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Target URL the run was driven against
    pub url: String,
    /// Version string probed from the auxiliary endpoint; may carry an
    /// error description
    pub target_version: String,

    /// When the run started
    pub start: DateTime<Utc>,
    /// When the run ended
    pub end: DateTime<Utc>,
    /// Total run time
    #[serde(with = "humantime_serde")]
    pub total_time: Duration,

    /// Total requests observed (`success + fail`)
    pub req_count: u64,
    /// Requests with status 200 and no transport error
    pub success: u64,
    /// Failed requests
    pub fail: u64,
    /// Bytes of response body over successful requests
    pub data_transferred: u64,

    /// Successful requests per second (see module docs for the edge case
    /// below one second)
    pub req_per_sec: f64,

    /// Average request time (total latency over successful requests)
    #[serde(with = "humantime_serde")]
    pub avg: Duration,
    /// Fastest observed request
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    /// Slowest observed request
    #[serde(with = "humantime_serde")]
    pub max: Duration,

    /// 50th percentile request time
    #[serde(with = "humantime_serde")]
    pub p50: Duration,
    /// 75th percentile request time
    #[serde(with = "humantime_serde")]
    pub p75: Duration,
    /// 90th percentile request time
    #[serde(with = "humantime_serde")]
    pub p90: Duration,
    /// 99th percentile request time
    #[serde(with = "humantime_serde")]
    pub p99: Duration,

    /// Population standard deviation of all observed latencies, in seconds
    pub std_deviation: f64,

    /// Error key -> occurrence count; keys sum to `fail`
    pub errors: HashMap<String, u64>,
}

/// Percentile of a sorted latency vector: rank `ceil(q/100 * n)` into the
/// 1-indexed array. No interpolation; `n = 1, q = 50` yields the only
/// element. Zero when the vector is empty.
pub(crate) fn percentile(sorted: &[Duration], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }

    let rank = ((q / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn std_deviation(latencies: &[Duration]) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }

    let n = latencies.len() as f64;
    let mean = latencies.iter().map(Duration::as_secs_f64).sum::<f64>() / n;
    let variance = latencies
        .iter()
        .map(|d| (d.as_secs_f64() - mean).powi(2))
        .sum::<f64>()
        / n;

    variance.sqrt()
}

impl Summary {
    /// Assemble the summary from run totals.
    ///
    /// A run cancelled before any stat arrived yields all-zero metrics and
    /// an empty error histogram.
    pub fn from_run(
        url: String,
        target_version: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        total_time: Duration,
        mut totals: RunTotals,
    ) -> Self {
        totals.latencies.sort();
        let latencies = &totals.latencies;

        let min = latencies.first().copied().unwrap_or(Duration::ZERO);
        let max = latencies.last().copied().unwrap_or(Duration::ZERO);

        // Average over *successful* requests, kept for parity with stored
        // summaries even though the numerator spans all latencies.
        let avg = if totals.success > 0 {
            latencies.iter().sum::<Duration>() / totals.success as u32
        } else {
            Duration::ZERO
        };

        let req_per_sec = if total_time > Duration::from_secs(1) {
            totals.success as f64 / total_time.as_secs() as f64
        } else {
            totals.success as f64
        };

        Self {
            url,
            target_version,
            start,
            end,
            total_time,
            req_count: totals.success + totals.fail,
            success: totals.success,
            fail: totals.fail,
            data_transferred: totals.data_transferred,
            req_per_sec,
            avg,
            min,
            max,
            p50: percentile(latencies, 50.0),
            p75: percentile(latencies, 75.0),
            p90: percentile(latencies, 90.0),
            p99: percentile(latencies, 99.0),
            std_deviation: std_deviation(latencies),
            errors: totals.errors,
        }
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "URL:                 {}", self.url)?;
        writeln!(f, "Target Version:      {}", self.target_version)?;
        writeln!(f, "Start:               {}", self.start.to_rfc3339())?;
        writeln!(f, "End:                 {}", self.end.to_rfc3339())?;
        writeln!(
            f,
            "Test Duration:       {}",
            humantime::format_duration(self.total_time)
        )?;
        writeln!(f, "Total Requests:      {}", self.req_count)?;
        writeln!(f, "Requests per Second: {:.2}", self.req_per_sec)?;
        writeln!(f, "Successful requests: {}", self.success)?;
        writeln!(f, "Failed requests:     {}", self.fail)?;
        writeln!(
            f,
            "Data transferred:    {}",
            human_bytes(self.data_transferred)
        )?;
        writeln!(
            f,
            "Average Request time: {}",
            humantime::format_duration(self.avg)
        )?;
        writeln!(
            f,
            "Min Request time:    {}",
            humantime::format_duration(self.min)
        )?;
        writeln!(
            f,
            "Max Request time:    {}",
            humantime::format_duration(self.max)
        )?;
        writeln!(
            f,
            "P50 Request time:    {}",
            humantime::format_duration(self.p50)
        )?;
        writeln!(
            f,
            "P75 Request time:    {}",
            humantime::format_duration(self.p75)
        )?;
        writeln!(
            f,
            "P90 Request time:    {}",
            humantime::format_duration(self.p90)
        )?;
        writeln!(
            f,
            "P99 Request time:    {}",
            humantime::format_duration(self.p99)
        )?;
        write!(f, "Errors:              {:?}", self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_percentile_single_value() {
        let sorted = vec![ms(42)];
        assert_eq!(percentile(&sorted, 50.0), ms(42));
        assert_eq!(percentile(&sorted, 99.0), ms(42));
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0), Duration::ZERO);
    }

    #[test]
    fn test_percentile_ceil_rank() {
        let sorted: Vec<Duration> = (1..=10).map(ms).collect();
        // ceil(0.50 * 10) = 5 -> 5ms, ceil(0.75 * 10) = 8 -> 8ms
        assert_eq!(percentile(&sorted, 50.0), ms(5));
        assert_eq!(percentile(&sorted, 75.0), ms(8));
        assert_eq!(percentile(&sorted, 90.0), ms(9));
        assert_eq!(percentile(&sorted, 99.0), ms(10));
    }

    #[test]
    fn test_percentiles_monotone() {
        let mut sorted: Vec<Duration> = [3u64, 1, 4, 1, 5, 9, 2, 6].iter().map(|&v| ms(v)).collect();
        sorted.sort();

        let p50 = percentile(&sorted, 50.0);
        let p75 = percentile(&sorted, 75.0);
        let p90 = percentile(&sorted, 90.0);
        let p99 = percentile(&sorted, 99.0);

        assert!(sorted[0] <= p50);
        assert!(p50 <= p75);
        assert!(p75 <= p90);
        assert!(p90 <= p99);
        assert!(p99 <= sorted[sorted.len() - 1]);
    }

    #[test]
    fn test_from_run_counts_and_latency() {
        let totals = RunTotals {
            latencies: vec![ms(30), ms(10), ms(20)],
            success: 2,
            fail: 1,
            data_transferred: 128,
            errors: HashMap::from([("Internal Server Error".to_string(), 1)]),
        };

        let summary = Summary::from_run(
            "http://localhost".to_string(),
            String::new(),
            Utc::now(),
            Utc::now(),
            Duration::from_millis(500),
            totals,
        );

        assert_eq!(summary.req_count, 3);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.fail, 1);
        assert_eq!(summary.min, ms(10));
        assert_eq!(summary.max, ms(30));
        // 60ms of latency over 2 successful requests
        assert_eq!(summary.avg, ms(30));
        assert_eq!(summary.errors.values().sum::<u64>(), summary.fail);
    }

    #[test]
    fn test_from_run_empty_is_all_zero() {
        let summary = Summary::from_run(
            "http://localhost".to_string(),
            String::new(),
            Utc::now(),
            Utc::now(),
            Duration::from_millis(10),
            RunTotals::default(),
        );

        assert_eq!(summary.req_count, 0);
        assert_eq!(summary.min, Duration::ZERO);
        assert_eq!(summary.max, Duration::ZERO);
        assert_eq!(summary.avg, Duration::ZERO);
        assert_eq!(summary.p99, Duration::ZERO);
        assert_eq!(summary.req_per_sec, 0.0);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_req_per_sec_under_one_second() {
        let totals = RunTotals {
            latencies: vec![ms(5)],
            success: 1,
            ..Default::default()
        };
        let summary = Summary::from_run(
            String::new(),
            String::new(),
            Utc::now(),
            Utc::now(),
            Duration::from_millis(800),
            totals,
        );
        assert_eq!(summary.req_per_sec, 1.0);
    }

    #[test]
    fn test_req_per_sec_floors_seconds() {
        let totals = RunTotals {
            latencies: vec![ms(5); 10],
            success: 10,
            ..Default::default()
        };
        let summary = Summary::from_run(
            String::new(),
            String::new(),
            Utc::now(),
            Utc::now(),
            // 2.9s floors to 2s
            Duration::from_millis(2900),
            totals,
        );
        assert_eq!(summary.req_per_sec, 5.0);
    }

    #[test]
    fn test_std_deviation_population() {
        let latencies: Vec<Duration> = [2u64, 4, 4, 4, 5, 5, 7, 9].iter().map(|&v| ms(v)).collect();
        // Known population stddev of this series is exactly 2 (in ms).
        assert!((std_deviation(&latencies) - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}

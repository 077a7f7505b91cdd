//! Inventory database schema

/// Five-table schema. Durations persist as humantime text, timestamps as
/// RFC3339 text; every child table cascades on delete of its parent.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_configuration (
    id INTEGER PRIMARY KEY,
    description TEXT,
    url TEXT,
    method TEXT,
    requests_count INTEGER,
    concurrent_conns INTEGER,
    skip_verify INTEGER,
    abort_after INTEGER,
    ca TEXT,
    cert TEXT,
    key TEXT,
    duration TEXT,
    keep_alive TEXT,
    request_delay TEXT,
    read_timeout TEXT,
    write_timeout TEXT,
    body BLOB,
    UNIQUE(description,url)
);

CREATE TABLE IF NOT EXISTS headers (
    id INTEGER PRIMARY KEY,
    header TEXT,
    config_id INTEGER,

    FOREIGN KEY(config_id) REFERENCES benchmark_configuration(id)
    ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS parameters (
    id INTEGER PRIMARY KEY,
    parameter TEXT,
    config_id INTEGER,

    FOREIGN KEY(config_id) REFERENCES benchmark_configuration(id)
    ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS benchmark_summary (
    id INTEGER PRIMARY KEY,
    start TEXT,
    end TEXT,
    duration TEXT,
    requests_count INTEGER,
    success_req INTEGER,
    fail_req INTEGER,
    data_transfered INTEGER,
    req_per_sec REAL,
    avg_req_time TEXT,
    min_req_time TEXT,
    max_req_time TEXT,
    p50_req_time TEXT,
    p75_req_time TEXT,
    p90_req_time TEXT,
    p99_req_time TEXT,
    config_id INTEGER,

    FOREIGN KEY(config_id) REFERENCES benchmark_configuration(id)
    ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS errors (
    id INTEGER PRIMARY KEY,
    name TEXT,
    count INTEGER,
    summary_id INTEGER,

    FOREIGN KEY(summary_id) REFERENCES benchmark_summary(id)
    ON DELETE CASCADE
);
"#;

pub(crate) const CONFIG_FIELDS: &str = "description,url,method,requests_count,concurrent_conns,\
skip_verify,abort_after,ca,cert,key,duration,keep_alive,request_delay,read_timeout,write_timeout,body";

pub(crate) const SUMMARY_FIELDS: &str = "start,end,duration,requests_count,success_req,fail_req,\
data_transfered,req_per_sec,avg_req_time,min_req_time,max_req_time,p50_req_time,p75_req_time,\
p90_req_time,p99_req_time";

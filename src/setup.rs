use log::{debug, error, info};
use postgrest::Postgrest;
use serde::Serialize;
use thiserror::Error;

use crate::config::{Source, SupabaseConfig};

pub const PROBE_TABLE: &str = "schedules";
const PROBE_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("missing or incomplete environment variables: {}", .vars.join(", "))]
    Incomplete { vars: Vec<&'static str> },
    #[error("request error: {0}")]
    Request(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Parse(String),
}

pub fn check_config(config: &SupabaseConfig) -> Result<(), SetupError> {
    let vars = config.incomplete_vars();
    if vars.is_empty() {
        Ok(())
    } else {
        Err(SetupError::Incomplete { vars })
    }
}

pub async fn probe(client: &Postgrest, table: &str) -> Result<usize, SetupError> {
    debug!("probing table {table}");

    let response = client
        .from(table)
        .select("id")
        .limit(PROBE_LIMIT)
        .execute()
        .await
        .map_err(|e| {
            error!("supabase request error: {e}");
            SetupError::Request(e.to_string())
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!("error reading response body: {e}");
        SetupError::Request(e.to_string())
    })?;

    if !status.is_success() {
        return Err(SetupError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let rows = count_rows(&body)?;
    info!("found {rows} rows in {table}");
    Ok(rows)
}

pub(crate) fn count_rows(body: &str) -> Result<usize, SetupError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SetupError::Parse(e.to_string()))?;
    match value {
        serde_json::Value::Array(rows) => Ok(rows.len()),
        other => Err(SetupError::Parse(format!("expected an array, got {other}"))),
    }
}

#[derive(Debug, Serialize)]
pub struct VarReport {
    pub var: &'static str,
    pub source: Source,
    pub value: String,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub dotenv_found: bool,
    pub vars: Vec<VarReport>,
    pub ready: bool,
}

impl Report {
    pub fn new(config: &SupabaseConfig, dotenv_found: bool) -> Self {
        let vars: Vec<VarReport> = config
            .values()
            .into_iter()
            .map(|r| VarReport {
                var: r.var,
                source: r.source,
                value: r.redacted(),
                ready: !r.is_placeholder(),
            })
            .collect();
        let ready = vars.iter().all(|v| v.ready);
        Self {
            dotenv_found,
            vars,
            ready,
        }
    }
}

pub const INSTRUCTIONS: &str = "\
1. Go to https://supabase.com and create a new project
2. Go to Settings > API in your Supabase dashboard
3. Copy your Project URL and API keys to .env file
4. Run the SQL migrations in the Supabase SQL editor:
   - supabase/migrations/create_users_table.sql
   - supabase/migrations/create_schedules_table.sql
   - supabase/migrations/create_security_events_table.sql
5. Run this check again to test the connection";

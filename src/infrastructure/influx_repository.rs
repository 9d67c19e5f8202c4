// InfluxDB repository implementation
use crate::application::telemetry_repository::{TelemetryQuery, TelemetryRepository};
use crate::domain::error::TelemetryError;
use crate::domain::record::{self, EVENT_TIME, FieldValue, Record};
use crate::infrastructure::config::{InfluxSettings, QuerySettings, prepare_query};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::HashMap;

const TELEMETRY_QUERY: &str = "SELECT ${fields} FROM ${measurement} \
     WHERE ${device_tag} = '${device}' AND time >= '${start}' AND time < '${end}' \
     GROUP BY time(${window}) fill(none)";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    device_tag: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxRepository {
    pub fn new(influx: InfluxSettings, query: &QuerySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: influx.host.trim_end_matches('/').to_string(),
            token: influx.token,
            database: influx.database,
            retention_policy: influx.retention_policy,
            measurement: query.measurement.clone(),
            device_tag: query.device_tag.clone(),
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(query)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse, TelemetryError> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                TelemetryError::UpstreamUnavailable(format!("failed to send request to InfluxDB: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::UpstreamUnavailable(format!(
                "InfluxDB query failed with status {status}: {body}"
            )));
        }

        let data = response.json::<InfluxQLResponse>().await.map_err(|e| {
            TelemetryError::UpstreamUnavailable(format!("failed to parse InfluxDB response: {e}"))
        })?;

        check_query_error(data)
    }

    /// Allowlisted field keys present in the measurement, sorted.
    async fn discover_fields(&self) -> Result<Vec<String>, TelemetryError> {
        let query = format!("SHOW FIELD KEYS FROM {}", quote_identifier(&self.measurement));
        let response = self.execute_query(&query).await?;

        let mut fields: Vec<String> = first_series(&response)
            .flat_map(|s| s.values.iter())
            .filter_map(|row| row.first().and_then(|v| v.as_str()))
            .filter(|name| record::is_allowlisted(name))
            .map(str::to_string)
            .collect();
        fields.sort();
        fields.dedup();
        Ok(fields)
    }

    fn build_telemetry_query(&self, query: &TelemetryQuery, fields: &[String]) -> String {
        let mut vars = HashMap::new();
        vars.insert("fields".to_string(), select_clause(fields));
        vars.insert("measurement".to_string(), quote_identifier(&self.measurement));
        vars.insert("device_tag".to_string(), quote_identifier(&self.device_tag));
        vars.insert("device".to_string(), escape_literal(&query.device_id));
        vars.insert(
            "start".to_string(),
            query.range.start().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        vars.insert(
            "end".to_string(),
            query.range.end().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        vars.insert("window".to_string(), query.window.as_str().to_string());
        prepare_query(TELEMETRY_QUERY, &vars)
    }
}

#[async_trait]
impl TelemetryRepository for InfluxRepository {
    async fn list_device_ids(&self) -> Result<Vec<String>, TelemetryError> {
        let query = format!(
            "SHOW TAG VALUES FROM {} WITH KEY = {}",
            quote_identifier(&self.measurement),
            quote_identifier(&self.device_tag)
        );
        let response = self.execute_query(&query).await?;

        // Rows are [key, value]
        let ids = first_series(&response)
            .flat_map(|s| s.values.iter())
            .filter_map(|row| row.get(1).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();

        Ok(ids)
    }

    async fn fetch_records(&self, query: &TelemetryQuery) -> Result<Vec<Record>, TelemetryError> {
        let fields = self.discover_fields().await?;
        if fields.is_empty() {
            tracing::debug!("No telemetry fields in measurement {}", self.measurement);
            return Ok(Vec::new());
        }

        let influxql = self.build_telemetry_query(query, &fields);
        tracing::debug!("Executing telemetry query: {}", influxql);
        let response = self.execute_query(&influxql).await?;

        let records: Vec<Record> = first_series(&response).flat_map(series_to_records).collect();
        tracing::debug!(
            "Got {} records from InfluxDB for device {}",
            records.len(),
            query.device_id
        );
        Ok(records)
    }
}

/// InfluxQL reports statement errors inside a 200 response.
fn check_query_error(data: InfluxQLResponse) -> Result<InfluxQLResponse, TelemetryError> {
    if let Some(error) = data.results.iter().find_map(|r| r.error.as_ref()) {
        tracing::error!("InfluxDB query error: {}", error);
        return Err(TelemetryError::UpstreamUnavailable(format!(
            "InfluxDB query error: {error}"
        )));
    }
    Ok(data)
}

fn first_series(response: &InfluxQLResponse) -> impl Iterator<Item = &InfluxQLSeries> {
    response
        .results
        .first()
        .and_then(|r| r.series.as_ref())
        .into_iter()
        .flatten()
}

/// Convert a columnar series into records. Null cells are left out of the field map.
fn series_to_records(series: &InfluxQLSeries) -> Vec<Record> {
    let time_idx = series.columns.iter().position(|c| c == "time");

    series
        .values
        .iter()
        .map(|row| {
            let mut record = Record::default();
            for (idx, (column, cell)) in series.columns.iter().zip(row).enumerate() {
                let Some(value) = FieldValue::from_json(cell) else {
                    continue;
                };
                if Some(idx) == time_idx {
                    record.time = Some(value);
                } else {
                    record.fields.insert(column.clone(), value);
                }
            }
            record
        })
        .collect()
}

/// `mean` per bucket; `event_time` can be a string field, which only `last` accepts.
fn select_clause(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| {
            let aggregate = if field == EVENT_TIME { "last" } else { "mean" };
            let quoted = quote_identifier(field);
            format!("{aggregate}({quoted}) AS {quoted}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

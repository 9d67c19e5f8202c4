// HTTP request handlers
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::SERIES_SPEED;
use crate::domain::window::TimeRange;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeQuery {
    fn to_range(&self) -> Result<TimeRange, TelemetryError> {
        let start = parse_instant("start", self.start.as_deref())?;
        let end = parse_instant("end", self.end.as_deref())?;
        TimeRange::new(start, end)
    }
}

/// RFC 3339 or integer unix seconds.
fn parse_instant(name: &str, raw: Option<&str>) -> Result<DateTime<Utc>, TelemetryError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TelemetryError::InvalidRange(format!("missing '{name}' parameter")))?;

    if let Ok(seconds) = raw.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            TelemetryError::InvalidRange(format!("'{name}' is out of range: {raw}"))
        });
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TelemetryError::InvalidRange(format!("cannot parse '{name}' ({raw}): {e}")))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all devices
pub async fn list_devices(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);

    match state.device_service.list_devices().await {
        Ok(devices) => match json_response(&devices, compress).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => e.into_response(),
    }
}

/// Speed, voltage, fuel and track series for one device over a time range
pub async fn get_telemetry(
    Path(id): Path<String>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let range = match query.to_range() {
        Ok(range) => range,
        Err(e) => return e.into_response(),
    };

    match state.telemetry_service.get_telemetry(&id, range).await {
        Ok(result) => {
            tracing::info!(
                device_id = %id,
                window = %result.metadata.aggregation_window,
                speed = result.series(SERIES_SPEED).len(),
                track = result.track.len(),
                "Served telemetry"
            );
            match json_response(&result, compress).await {
                Ok(response) => response,
                Err(status) => status.into_response(),
            }
        }
        Err(e) => e.into_response(),
    }
}

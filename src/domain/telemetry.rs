// Telemetry response domain models
use super::window::AggregationWindow;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SERIES_SPEED: &str = "speed";
pub const SERIES_VOLTAGE: &str = "main_power_voltage";
pub const SERIES_FUEL_TOTAL: &str = "fuel_total";

/// One point of a scalar series. `time` is unix seconds rendered as a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub time: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(time: String, value: f64) -> Self {
        Self { time, value }
    }
}

/// One GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub time: String,
    pub lat: f64,
    pub lon: f64,
    pub event_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMetadata {
    pub device_id: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    /// Number of track points, kept under this name for existing consumers.
    pub total_records: usize,
    /// Number of records read from the store, including skipped ones.
    pub record_count: usize,
    pub available_fuel_sensors: Vec<String>,
    pub aggregation_window: AggregationWindow,
    pub range_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryResult {
    pub series: BTreeMap<String, Vec<DataPoint>>,
    pub fuel_sensors: BTreeMap<String, Vec<DataPoint>>,
    pub track: Vec<TrackPoint>,
    pub metadata: TelemetryMetadata,
}

impl TelemetryResult {
    pub fn series(&self, name: &str) -> &[DataPoint] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

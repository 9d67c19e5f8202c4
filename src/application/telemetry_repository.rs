// Repository trait for telemetry data access
use crate::domain::error::TelemetryError;
use crate::domain::record::Record;
use crate::domain::window::{AggregationWindow, TimeRange};
use async_trait::async_trait;

/// Filter and bucketing the store must apply before records reach the series builder.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryQuery {
    pub device_id: String,
    pub range: TimeRange,
    pub window: AggregationWindow,
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// List all device identifiers known to the store
    async fn list_device_ids(&self) -> Result<Vec<String>, TelemetryError>;

    /// Fetch bucket-averaged records for one device, ascending by time.
    /// Empty buckets are omitted and only allowlisted fields are returned.
    async fn fetch_records(&self, query: &TelemetryQuery) -> Result<Vec<Record>, TelemetryError>;
}

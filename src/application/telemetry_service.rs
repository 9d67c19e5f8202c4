// Telemetry service - Window selection, bounded store fetch and series building
use crate::application::series_builder::SeriesBuilder;
use crate::application::telemetry_repository::{TelemetryQuery, TelemetryRepository};
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::TelemetryResult;
use crate::domain::window::{self, AggregationWindow, TimeRange};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct TelemetryService {
    repository: Arc<dyn TelemetryRepository>,
    fetch_timeout: Duration,
}

impl TelemetryService {
    pub fn new(repository: Arc<dyn TelemetryRepository>, fetch_timeout: Duration) -> Self {
        Self {
            repository,
            fetch_timeout,
        }
    }

    pub fn resolve_window(&self, range: &TimeRange) -> AggregationWindow {
        window::select(range)
    }

    /// Dropping the returned future cancels the in-flight store request.
    pub async fn get_telemetry(
        &self,
        device_id: &str,
        range: TimeRange,
    ) -> Result<TelemetryResult, TelemetryError> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(TelemetryError::InvalidDevice(
                "device identifier must not be empty".to_string(),
            ));
        }

        let window = self.resolve_window(&range);
        let query = TelemetryQuery {
            device_id: device_id.to_string(),
            range,
            window,
        };

        tracing::debug!(
            device_id,
            window = %window,
            bucket_secs = window.as_duration().as_secs(),
            range_days = range.range_days(),
            "Fetching telemetry"
        );

        let started = Instant::now();
        let records = tokio::time::timeout(self.fetch_timeout, self.repository.fetch_records(&query))
            .await
            .map_err(|_| {
                tracing::warn!(device_id, timeout = ?self.fetch_timeout, "Telemetry fetch timed out");
                TelemetryError::UpstreamTimeout {
                    timeout_secs: self.fetch_timeout.as_secs(),
                }
            })??;

        tracing::debug!(
            device_id,
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched telemetry records"
        );

        let owned_id = query.device_id;
        tokio::task::spawn_blocking(move || SeriesBuilder::build(&owned_id, records, &range, window))
            .await
            .map_err(|e| TelemetryError::Internal(format!("series builder task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Record, SPEED};
    use crate::domain::telemetry::SERIES_SPEED;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    const T0: i64 = 1_700_000_000;

    enum Behaviour {
        Records(Vec<Record>),
        Hang,
        Fail,
    }

    struct FakeRepository {
        behaviour: Behaviour,
        queries: Mutex<Vec<TelemetryQuery>>,
    }

    impl FakeRepository {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TelemetryRepository for FakeRepository {
        async fn list_device_ids(&self) -> Result<Vec<String>, TelemetryError> {
            Ok(Vec::new())
        }

        async fn fetch_records(&self, query: &TelemetryQuery) -> Result<Vec<Record>, TelemetryError> {
            self.queries.lock().unwrap().push(query.clone());
            match &self.behaviour {
                Behaviour::Records(records) => Ok(records.clone()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Vec::new())
                }
                Behaviour::Fail => Err(TelemetryError::UpstreamUnavailable(
                    "connection refused".to_string(),
                )),
            }
        }
    }

    fn range_days(days: i64) -> TimeRange {
        TimeRange::new(
            Utc.timestamp_opt(T0, 0).unwrap(),
            Utc.timestamp_opt(T0 + days * 86_400, 0).unwrap(),
        )
        .unwrap()
    }

    fn service(repo: Arc<FakeRepository>, timeout: Duration) -> TelemetryService {
        TelemetryService::new(repo, timeout)
    }

    #[tokio::test]
    async fn test_builds_result_with_selected_window() {
        let repo = FakeRepository::new(Behaviour::Records(vec![
            Record::new(T0).with_field(SPEED, 55.555),
        ]));
        let svc = service(repo.clone(), Duration::from_secs(5));

        let result = svc.get_telemetry(" truck-7 ", range_days(10)).await.unwrap();

        assert_eq!(result.series(SERIES_SPEED)[0].value, 55.56);
        assert_eq!(result.metadata.aggregation_window, AggregationWindow::FifteenMinutes);
        assert_eq!(result.metadata.range_days, 10.0);
        assert_eq!(result.metadata.device_id, "truck-7");

        let queries = repo.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].device_id, "truck-7");
        assert_eq!(queries[0].window, AggregationWindow::FifteenMinutes);
    }

    #[tokio::test]
    async fn test_rejects_empty_device_without_fetching() {
        let repo = FakeRepository::new(Behaviour::Records(Vec::new()));
        let svc = service(repo.clone(), Duration::from_secs(5));

        let err = svc.get_telemetry("  ", range_days(1)).await.unwrap_err();

        assert!(matches!(err, TelemetryError::InvalidDevice(_)));
        assert!(repo.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_timeout() {
        let repo = FakeRepository::new(Behaviour::Hang);
        let svc = service(repo, Duration::from_millis(20));

        let err = svc.get_telemetry("truck-7", range_days(1)).await.unwrap_err();

        assert!(matches!(err, TelemetryError::UpstreamTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_store_failure_propagates_unchanged() {
        let repo = FakeRepository::new(Behaviour::Fail);
        let svc = service(repo, Duration::from_secs(5));

        let err = svc.get_telemetry("truck-7", range_days(1)).await.unwrap_err();

        assert!(matches!(err, TelemetryError::UpstreamUnavailable(ref msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_record_discards_partial_result() {
        let repo = FakeRepository::new(Behaviour::Records(vec![
            Record::new(T0).with_field(SPEED, 10.0),
            Record::new(T0 + 60).with_field(SPEED, "not-a-number"),
        ]));
        let svc = service(repo, Duration::from_secs(5));

        let err = svc.get_telemetry("truck-7", range_days(1)).await.unwrap_err();

        assert!(matches!(err, TelemetryError::MalformedRecord { .. }));
    }

    #[test]
    fn test_resolve_window() {
        let svc = service(FakeRepository::new(Behaviour::Fail), Duration::from_secs(5));
        assert_eq!(svc.resolve_window(&range_days(1)), AggregationWindow::OneMinute);
        assert_eq!(svc.resolve_window(&range_days(91)), AggregationWindow::FourHours);
    }
}

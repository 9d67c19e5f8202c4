// Time range and aggregation window selection
use super::error::TelemetryError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TelemetryError> {
        if start >= end {
            return Err(TelemetryError::InvalidRange(format!(
                "start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Span of the range in fractional days, unrounded.
    pub fn range_days(&self) -> f64 {
        let span = self.end - self.start;
        let seconds = span.num_seconds() as f64
            + f64::from(span.subsec_nanos()) / 1_000_000_000.0;
        seconds / SECONDS_PER_DAY
    }
}

/// Bucket width the store averages samples over. Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AggregationWindow {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
}

impl AggregationWindow {
    /// Duration literal understood by the store's `GROUP BY time(..)`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
        }
    }

    pub fn as_duration(&self) -> Duration {
        let minutes = match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::OneHour => 60,
            Self::FourHours => 240,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl fmt::Display for AggregationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (inclusive, in days) for each window, finest first.
const BANDS: [(f64, AggregationWindow); 4] = [
    (1.0, AggregationWindow::OneMinute),
    (7.0, AggregationWindow::FiveMinutes),
    (30.0, AggregationWindow::FifteenMinutes),
    (90.0, AggregationWindow::OneHour),
];

/// Pick the finest window whose band covers the range span.
pub fn select(range: &TimeRange) -> AggregationWindow {
    select_for_days(range.range_days())
}

fn select_for_days(days: f64) -> AggregationWindow {
    BANDS
        .iter()
        .find(|(upper, _)| days <= *upper)
        .map(|(_, window)| *window)
        .unwrap_or(AggregationWindow::FourHours)
}

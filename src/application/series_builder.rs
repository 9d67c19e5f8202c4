// Series builder - Folds aggregated records into chart and map series
use crate::domain::error::TelemetryError;
use crate::domain::record::{
    self, EVENT_TIME, FieldValue, LATITUDE, LONGITUDE, MAIN_POWER_VOLTAGE, Record, SPEED,
};
use crate::domain::telemetry::{
    DataPoint, SERIES_FUEL_TOTAL, SERIES_SPEED, SERIES_VOLTAGE, TelemetryMetadata,
    TelemetryResult, TrackPoint,
};
use crate::domain::window::{AggregationWindow, TimeRange};
use std::collections::BTreeMap;

const MILLIVOLTS_PER_VOLT: f64 = 1000.0;

/// Per-request accumulators. Built fresh by every call to [`SeriesBuilder::build`].
#[derive(Default)]
pub struct SeriesBuilder {
    speed: Vec<DataPoint>,
    voltage: Vec<DataPoint>,
    fuel_total: Vec<DataPoint>,
    fuel_sensors: BTreeMap<String, Vec<DataPoint>>,
    track: Vec<TrackPoint>,
    records: usize,
    skipped: usize,
}

impl SeriesBuilder {
    /// Single pass over `records` in delivery order. Any value that cannot be coerced
    /// aborts the whole build; no partial result is returned.
    pub fn build<I>(
        device_id: &str,
        records: I,
        range: &TimeRange,
        window: AggregationWindow,
    ) -> Result<TelemetryResult, TelemetryError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut builder = Self::default();
        for record in records {
            builder.push(&record)?;
        }
        Ok(builder.finish(device_id, range, window))
    }

    fn push(&mut self, record: &Record) -> Result<(), TelemetryError> {
        self.records += 1;

        let Some(timestamp) = record.time.as_ref().and_then(record::to_unix_seconds) else {
            self.skipped += 1;
            return Ok(());
        };
        let time = timestamp.to_string();

        if let Some(value) = record.get(SPEED) {
            let speed = float_field(SPEED, value, timestamp)?;
            self.speed
                .push(DataPoint::new(time.clone(), record::round2(speed)));
        }

        if let Some(value) = record.get(MAIN_POWER_VOLTAGE) {
            let millivolts = float_field(MAIN_POWER_VOLTAGE, value, timestamp)?;
            self.voltage.push(DataPoint::new(
                time.clone(),
                record::round2(millivolts / MILLIVOLTS_PER_VOLT),
            ));
        }

        let mut fuel_sum = None;
        for (name, value) in record.fields.iter().filter(|(k, _)| record::is_fuel_sensor(k)) {
            let level = float_field(name, value, timestamp)?;
            self.fuel_sensors
                .entry(name.clone())
                .or_default()
                .push(DataPoint::new(time.clone(), record::round2(level)));
            *fuel_sum.get_or_insert(0.0) += level;
        }
        if let Some(sum) = fuel_sum {
            if !sum.is_finite() {
                return Err(malformed(SERIES_FUEL_TOTAL, &FieldValue::Float(sum), timestamp));
            }
            self.fuel_total
                .push(DataPoint::new(time.clone(), record::round2(sum)));
        }

        if let (Some(lat), Some(lon)) = (record.get(LATITUDE), record.get(LONGITUDE)) {
            let lat = float_field(LATITUDE, lat, timestamp)?;
            let lon = float_field(LONGITUDE, lon, timestamp)?;
            let event_time = match record.get(EVENT_TIME) {
                Some(value) => record::to_int64(value)
                    .ok_or_else(|| malformed(EVENT_TIME, value, timestamp))?,
                None => timestamp,
            };
            self.track.push(TrackPoint {
                time,
                lat,
                lon,
                event_time,
            });
        }

        Ok(())
    }

    fn finish(
        self,
        device_id: &str,
        range: &TimeRange,
        window: AggregationWindow,
    ) -> TelemetryResult {
        tracing::debug!(
            device_id,
            records = self.records,
            skipped = self.skipped,
            speed = self.speed.len(),
            voltage = self.voltage.len(),
            fuel_sensors = self.fuel_sensors.len(),
            track = self.track.len(),
            "Built telemetry series"
        );

        // BTreeMap keys are already in lexicographic order.
        let available_fuel_sensors: Vec<String> = self.fuel_sensors.keys().cloned().collect();

        let mut series = BTreeMap::new();
        series.insert(SERIES_SPEED.to_string(), self.speed);
        series.insert(SERIES_VOLTAGE.to_string(), self.voltage);
        series.insert(SERIES_FUEL_TOTAL.to_string(), self.fuel_total);

        let metadata = TelemetryMetadata {
            device_id: device_id.to_string(),
            start_timestamp: range.start().to_rfc3339(),
            end_timestamp: range.end().to_rfc3339(),
            total_records: self.track.len(),
            record_count: self.records,
            available_fuel_sensors,
            aggregation_window: window,
            range_days: record::round2(range.range_days()),
        };

        TelemetryResult {
            series,
            fuel_sensors: self.fuel_sensors,
            track: self.track,
            metadata,
        }
    }
}

fn float_field(field: &str, value: &FieldValue, timestamp: i64) -> Result<f64, TelemetryError> {
    record::to_float(value).ok_or_else(|| malformed(field, value, timestamp))
}

fn malformed(field: &str, value: &FieldValue, timestamp: i64) -> TelemetryError {
    TelemetryError::MalformedRecord {
        field: field.to_string(),
        timestamp,
        value: value.to_string(),
    }
}

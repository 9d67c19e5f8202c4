// Device service - Use case for listing devices
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::device::Device;
use crate::domain::error::TelemetryError;
use std::sync::Arc;

#[derive(Clone)]
pub struct DeviceService {
    repository: Arc<dyn TelemetryRepository>,
}

impl DeviceService {
    pub fn new(repository: Arc<dyn TelemetryRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>, TelemetryError> {
        let ids = self.repository.list_device_ids().await?;
        let mut devices: Vec<Device> = ids.into_iter().map(Device::new).collect();
        devices.sort();
        devices.dedup();
        Ok(devices)
    }
}

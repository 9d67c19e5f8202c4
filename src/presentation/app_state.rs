// Application state for HTTP handlers
use crate::application::device_service::DeviceService;
use crate::application::telemetry_service::TelemetryService;

#[derive(Clone)]
pub struct AppState {
    pub device_service: DeviceService,
    pub telemetry_service: TelemetryService,
}

// Application layer - Use cases and the store collaborator contract
pub mod device_service;
pub mod series_builder;
pub mod telemetry_repository;
pub mod telemetry_service;

// Domain layer - Pure types and policies, no I/O
pub mod device;
pub mod error;
pub mod record;
pub mod telemetry;
pub mod window;

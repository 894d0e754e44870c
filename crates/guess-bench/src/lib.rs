pub mod analytics;
pub mod config;
pub mod logging;
pub mod play;
pub mod simulation;
pub mod telemetry;

pub mod auth;
pub mod client;
pub mod configuration;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod startup;
pub mod telemetry;

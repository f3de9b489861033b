//! Fail-fast smoke tests for a deployed solar analyzer worker.
//!
//! [`checks::Suite`] walks a fixed battery of request/expectation pairs
//! against the worker's HTTP API and stops at the first violated expectation.

pub mod checks;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod report;

pub use checks::{Check, Suite};
pub use client::{Reply, WorkerClient};
pub use config::{ConfigSource, SmokeConfig};
pub use errors::{SmokeError, SmokeResult};
pub use models::{Coordinates, DateRange, SolarConfig};
pub use report::Report;

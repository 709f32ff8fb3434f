//! Server-side components of the snowgate ID service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration and its validation.
//! - [`gate`] - Bounded admission with timed acquire.
//! - [`pipeline`] - Per-request admission, generation and response.
//! - [`service`] - gRPC service implementation and session handling.
//! - [`telemetry`] - Logging setup and optional OpenTelemetry metrics.

pub mod config;
pub mod gate;
pub mod pipeline;
pub mod service;
pub mod telemetry;

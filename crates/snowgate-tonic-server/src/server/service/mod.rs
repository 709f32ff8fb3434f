//! gRPC service implementation.
//!
//! This module contains the client-facing `IdGenerator` service and the
//! per-session request loop. Both feed requests through the shared
//! [`RequestPipeline`](crate::server::pipeline::RequestPipeline).
//!
//! ## Structure
//!
//! - [`config`] - Clock selection and the generator type.
//! - [`handler`] - gRPC service entry point (`IdService`).
//! - [`session`] - Request loop for one bidirectional session.

pub mod config;
pub mod handler;
pub mod session;

//! Shared types and error definitions used by the `snowgate` gRPC server and
//! its clients.
//!
//! ## Submodules
//!
//! - [`error`] - Service error type and its mapping onto `tonic::Status`.
//! - [`types`] - The request/response record, wire constants and layout
//!   helpers.
//! - [`proto`] - Generated Protobuf messages and service definitions.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/snowgate.proto`.
///
/// ## Service
///
/// - `NextId` - one ID per call; overload is answered in-band with `-1`.
/// - `Session` - bidirectional stream, one response per request, closed by
///   the server on overload or any generation failure.
/// - `ParseId` - decomposes an ID with the server's layout.
pub mod proto {
    tonic::include_proto!("snowgate");

    /// Encoded file descriptor set, for registering with server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("snowgate_descriptor");
}

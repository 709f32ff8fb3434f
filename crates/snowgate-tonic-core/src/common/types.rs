//! # Request/response record and wire helpers
//!
//! The transport hands the pipeline an [`IdExchange`] and receives the same
//! record back with `result_id` filled in. Keeping this record separate from
//! the generated protobuf types lets the pipeline be exercised without a
//! network in between.
//!
//! ## Constants
//!
//! - [`OVERLOAD_SENTINEL`] - the only in-band error value (`-1`).

use crate::{
    Error, Result,
    proto::{IdParts, IdRequest, IdResponse},
};
use snowgate::{SnowflakeId, SnowflakeLayout};

/// `result_id` reported when a request was rejected because no admission
/// permit became available in time.
///
/// No generated ID is ever negative, so the value cannot collide with one.
pub const OVERLOAD_SENTINEL: i64 = -1;

/// One request/response exchange, correlated by the session it arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdExchange {
    pub requestor_datacenter_id: i32,
    pub requestor_machine_id: i32,
    /// The generated ID, [`OVERLOAD_SENTINEL`], or zero before a response
    /// has been decided.
    pub result_id: i64,
}

impl IdExchange {
    pub const fn new(requestor_datacenter_id: i32, requestor_machine_id: i32) -> Self {
        Self {
            requestor_datacenter_id,
            requestor_machine_id,
            result_id: 0,
        }
    }

    /// Returns the record answered with `result_id`.
    #[must_use]
    pub const fn respond(mut self, result_id: i64) -> Self {
        self.result_id = result_id;
        self
    }

    pub const fn is_overload(&self) -> bool {
        self.result_id == OVERLOAD_SENTINEL
    }
}

impl From<IdExchange> for IdResponse {
    fn from(exchange: IdExchange) -> Self {
        Self {
            requestor_datacenter_id: exchange.requestor_datacenter_id,
            requestor_machine_id: exchange.requestor_machine_id,
            result_id: exchange.result_id,
        }
    }
}

impl From<IdResponse> for IdExchange {
    fn from(response: IdResponse) -> Self {
        Self {
            requestor_datacenter_id: response.requestor_datacenter_id,
            requestor_machine_id: response.requestor_machine_id,
            result_id: response.result_id,
        }
    }
}

/// Datacenter and machine ids provisioned for this node, used when a request
/// leaves them unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeIds {
    pub datacenter_id: i32,
    pub machine_id: i32,
}

impl NodeIds {
    /// Builds the exchange for `request`, filling omitted ids from the node.
    pub fn resolve(&self, request: &IdRequest) -> IdExchange {
        IdExchange::new(
            request
                .requestor_datacenter_id
                .unwrap_or(self.datacenter_id),
            request.requestor_machine_id.unwrap_or(self.machine_id),
        )
    }
}

/// Decomposes a wire ID with `layout`, reporting the absolute time alongside
/// the epoch-relative one.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] for negative IDs, which no layout can
/// produce.
pub fn id_parts(layout: &SnowflakeLayout, id: i64, epoch_ms: u64) -> Result<IdParts> {
    let raw = u64::try_from(id).map_err(|_| Error::InvalidRequest {
        reason: format!("id {id} is negative"),
    })?;
    let parts = layout.decompose(SnowflakeId::from_raw(raw));
    Ok(IdParts {
        timestamp: parts.timestamp,
        datacenter_id: parts.datacenter_id,
        machine_id: parts.machine_id,
        sequence: parts.sequence,
        unix_millis: parts.timestamp.saturating_add(epoch_ms),
    })
}

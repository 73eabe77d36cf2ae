//! Room Address Lookup
//!
//! Join flows resolve a target address through an external collaborator
//! keyed by the room's database id. Only the interface lives here; the
//! HTTP-backed implementation belongs to the account layer, outside this
//! crate.

use std::future::Future;

/// A resolved join target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAddress {
    /// Region host token (e.g. `b2warsaw1`) the room lives on.
    pub server: String,
    /// Opaque join id handed to the join-room command.
    pub address: String,
}

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The lookup endpoint rate-limited the caller. A hard stop: join
    /// flows fail immediately without retrying.
    #[error("room address lookup was rate limited")]
    RateLimited,

    /// Any other lookup failure.
    #[error("room address lookup failed: {0}")]
    Failed(String),
}

/// Collaborator that resolves a room id to a join target.
pub trait RoomLookup: Send + Sync {
    /// Resolve the address for `room_id`.
    fn resolve(
        &self,
        room_id: u32,
    ) -> impl Future<Output = Result<RoomAddress, LookupError>> + Send;
}

//! Protocol-Independent Value Types
//!
//! Leaf types with no dependency on the connection machinery: the avatar
//! codec, the peer identity generator, and the closed Team/Mode/ServerRegion
//! families with their wire constants.

pub mod avatar;
pub mod peer;
pub mod types;

pub use avatar::{Avatar, AvatarError, ShapeLayer};
pub use peer::generate_peer_id;
pub use types::{Mode, ServerRegion, Team};

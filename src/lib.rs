//! # Bonk Session
//!
//! Client-side real-time session engine for the bonk.io multiplayer protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       BONK SESSION                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Protocol-independent value types          │
//! │  ├── avatar.rs   - Binary avatar codec + JSON wire form      │
//! │  ├── peer.rs     - Ephemeral peer identity generator         │
//! │  └── types.rs    - Team / Mode / ServerRegion wire constants │
//! │                                                              │
//! │  room/           - Local mirror of server-asserted state     │
//! │  ├── state.rs    - RoomState, Player, ChatMessage            │
//! │  └── events.rs   - Subscriber-facing session notifications   │
//! │                                                              │
//! │  network/        - Protocol state machine (non-deterministic)│
//! │  ├── transport.rs- socket.io framed WebSocket client         │
//! │  ├── lookup.rs   - Room address lookup collaborator          │
//! │  ├── protocol.rs - Numbered event decode/encode tables       │
//! │  ├── dispatch.rs - Inbound event dispatch engine             │
//! │  └── session.rs  - Session lifecycle + keep-alive            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Guarantee
//!
//! The room mirror in `room/` is mutated only by the dispatch engine (on
//! inbound events) and by outgoing-command handlers (optimistic updates
//! paired with a successful send). The roster never holds two players with
//! the same short id, and exactly one roster entry carries the local flag
//! while a session is established.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod network;
pub mod room;

// Re-export commonly used types
pub use crate::core::avatar::{Avatar, AvatarError, ShapeLayer};
pub use crate::core::peer::generate_peer_id;
pub use crate::core::types::{Mode, ServerRegion, Team};
pub use crate::network::lookup::{LookupError, RoomAddress, RoomLookup};
pub use crate::network::protocol::ErrorToken;
pub use crate::network::session::{
    CreateRoomOptions, Identity, Session, SessionError, SessionPhase,
};
pub use crate::network::transport::{Connection, TransportError};
pub use crate::room::events::SessionEvent;
pub use crate::room::state::{ChatMessage, Player, RoomState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol generation sent in create-room and join-room handshakes.
pub const PROTOCOL_VERSION: u32 = 49;

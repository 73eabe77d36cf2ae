//! Network Layer
//!
//! The protocol state machine: framed WebSocket transport, numbered event
//! tables, the inbound dispatch engine, and the session lifecycle
//! controller. Everything non-deterministic lives here; the room mirror in
//! `room/` stays plain data.

pub mod dispatch;
pub mod lookup;
pub mod protocol;
pub mod session;
pub mod transport;

pub use lookup::{LookupError, RoomAddress, RoomLookup};
pub use protocol::{ClientCommand, ErrorToken, ServerEvent};
pub use session::{CreateRoomOptions, Identity, Session, SessionError, SessionPhase};
pub use transport::{Connection, Frame, TransportError};

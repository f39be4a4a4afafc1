//! hub-core
//!
//! Transport-agnostic core of the session hub:
//! - connection handle abstraction and participants
//! - session registry (admission, removal, lookup, snapshot)
//! - dispatcher with per-type handlers
//! - broadcast engine
//! - per-connection session loop
//! - [`Hub`], which owns all of the above

pub mod connection;
pub mod error;
pub mod participant;
pub mod registry;
pub mod dispatcher;
pub mod broadcast;
pub mod session;
pub mod hub;
pub mod memory;

pub use connection::{ConnectionHandle, Frame, FrameSink, FrameStream};
pub use error::{HubError, TransportError};
pub use participant::{Participant, ParticipantId};
pub use registry::SessionRegistry;

pub use dispatcher::{
    AcknowledgeHandler,
    ChatBroadcastHandler,
    Dispatcher,
    HandlerContext,
    MessageHandler,
};

pub use broadcast::{broadcast, BroadcastReport};
pub use session::{run_session, SessionEnd};
pub use hub::{Hub, HubConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_PARTICIPANTS};

//! hub-server
//!
//! WebSocket front end for the session hub.

pub mod config;
pub mod server;
pub mod transport;

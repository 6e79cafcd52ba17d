//! Session management
//!
//! A session is one (organization, request id, connection) tuple:
//! - `SessionKey` names the conversation and builds the endpoint URL
//! - `Connection` owns one WebSocket and its writer/reader tasks
//! - `SessionController` keeps at most one connection open and replaces it
//!   whenever the key changes

mod connection;
mod controller;
mod key;
mod stats;

pub use connection::{
    ConnectionEvent, Connection, Connector, SendError, SessionEvent, WebSocketConnector,
    OUTBOUND_QUEUE_CAPACITY,
};
pub use controller::SessionController;
pub use key::SessionKey;
pub use stats::SessionStats;

//! Network glue between the terminal UI and the command-execution backend.
//!
//! [`BackendClient`] wraps the REST API, [`EventChannel`] owns the
//! auto-reconnecting Socket.IO connection used for server pushes.

pub mod channel;
pub mod config;
pub mod error;
pub mod socketio;
pub mod transport;

pub use channel::{ChannelSession, EventChannel, Subscription};
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{ChannelError, ConfigError, ErrorKind, TransportError, GENERIC_EXECUTE_FAILURE};
pub use transport::{BackendClient, CommandTransport, DEFAULT_HISTORY_LIMIT};

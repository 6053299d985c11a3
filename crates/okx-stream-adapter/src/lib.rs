/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public OKX streaming adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::LoginSigner;

// Re-export configuration and errors
pub use config::{Credentials, HEARTBEAT_INTERVAL, OkxConfig};
pub use error::{OkxError, Result};

// Re-export the protocol seam
pub use protocol::{InboundMessage, StreamPayload, StreamingProtocol};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{MessageNormalizer, OkxWebsocketClient, StreamHandle};

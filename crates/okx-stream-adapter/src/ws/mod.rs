/*
[INPUT]:  Submodule implementations
[OUTPUT]: Public WebSocket API surface
[POS]:    WebSocket layer - module organization
[UPDATE]: When adding WebSocket submodules
*/

pub mod client;
pub mod frame;
pub mod normalizer;
pub(crate) mod registry;
pub(crate) mod session;

pub use client::{OkxWebsocketClient, StreamHandle};
pub use frame::{DecodedFrame, decode_frame};
pub use normalizer::MessageNormalizer;

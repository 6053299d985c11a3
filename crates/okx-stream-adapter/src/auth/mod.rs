/*
[INPUT]:  API credentials
[OUTPUT]: Login signatures for private-stream authentication
[POS]:    Auth layer - module wiring
[UPDATE]: When the exchange changes its authentication flow
*/

pub mod signer;

pub use signer::{LOGIN_SIGN_PATH, LoginSigner};

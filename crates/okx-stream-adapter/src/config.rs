/*
[INPUT]:  Caller-supplied connection options and credentials
[OUTPUT]: Validated client configuration
[POS]:    Configuration layer - explicit struct replacing ad-hoc options
[UPDATE]: When adding connection options or changing defaults
*/

use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{OkxError, Result};
use crate::types::{ProtocolGeneration, SideConvention};

/// Heartbeat cadence while a session is ready
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// API credentials for private channels.
///
/// All three fields are required by the exchange's login handshake; the
/// secret never appears in logs or error messages.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Client configuration.
///
/// Optional fields are explicit: credentials are checked before any
/// private-stream operation, endpoint overrides fall back to the
/// generation's defaults, and the trade-side convention defaults per
/// generation.
#[derive(Debug, Clone)]
pub struct OkxConfig {
    pub generation: ProtocolGeneration,
    pub credentials: Option<Credentials>,
    /// Override for the public-channel endpoint, mainly for tests
    pub public_endpoint: Option<String>,
    /// Override for the private-channel endpoint, mainly for tests
    pub private_endpoint: Option<String>,
    pub heartbeat_interval: Duration,
    /// Numeric trade-side convention; `None` uses the generation default
    pub side_convention: Option<SideConvention>,
    /// Correlation id attached to all log lines for this client
    pub correlation_id: String,
}

impl OkxConfig {
    /// Configuration for one protocol generation with default options
    pub fn new(generation: ProtocolGeneration) -> Self {
        Self {
            generation,
            credentials: None,
            public_endpoint: None,
            private_endpoint: None,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            side_convention: None,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_side_convention(mut self, convention: SideConvention) -> Self {
        self.side_convention = Some(convention);
        self
    }

    /// Validate endpoint overrides and credential completeness
    pub fn validate(&self) -> Result<()> {
        for endpoint in [&self.public_endpoint, &self.private_endpoint]
            .into_iter()
            .flatten()
        {
            Url::parse(endpoint)?;
        }
        if let Some(credentials) = &self.credentials
            && (credentials.api_key.is_empty() || credentials.secret.is_empty())
        {
            return Err(OkxError::InvalidArgument(
                "credentials must include api key and secret".into(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(OkxError::InvalidArgument(
                "heartbeat interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

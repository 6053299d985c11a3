/*
[INPUT]:  Adapter configuration and caller subscribe/unsubscribe requests
[OUTPUT]: Stream handles delivering canonical events via channels
[POS]:    WebSocket layer - public entry point over per-group sessions
[UPDATE]: When adding new channels or changing session ownership
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::OkxConfig;
use crate::error::{OkxError, Result};
use crate::types::{CanonicalEvent, ChannelGroup, ChannelKind, currencies::canonical_instrument};
use crate::ws::registry::SubscriptionRegistry;
use crate::ws::session::{self, SessionCommand};

/// Streaming client for one exchange account across all protocol
/// generations.
///
/// Each channel group gets its own socket, owned by a background session
/// task; this type only validates requests and hands them over as
/// commands. Subscribing never blocks on the network.
pub struct OkxWebsocketClient {
    config: OkxConfig,
    sessions: Mutex<HashMap<ChannelGroup, SessionHandle>>,
}

#[derive(Clone)]
struct SessionHandle {
    registry: Arc<Mutex<SubscriptionRegistry>>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

/// One live subscription: an event receiver plus the means to end it
#[derive(Debug)]
pub struct StreamHandle {
    ids: Vec<u64>,
    closed: Arc<AtomicBool>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<CanonicalEvent>,
}

impl StreamHandle {
    /// Next canonical event, or None once the subscription is finished
    pub async fn recv(&mut self) -> Option<CanonicalEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<CanonicalEvent> {
        self.events.try_recv().ok()
    }

    /// End this subscription.
    ///
    /// Delivery stops immediately; the wire-level unsubscribe happens in
    /// the background on generations that support it.
    pub fn unsubscribe(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = self
            .registry
            .lock()
            .expect("registry lock")
            .remove(&self.ids);
        if !removed.is_empty() {
            let _ = self.command_tx.send(SessionCommand::Unsubscribe(removed));
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl OkxWebsocketClient {
    /// Validate the configuration and build a client. No connection is
    /// opened until the first subscription.
    pub fn new(config: OkxConfig) -> Result<Self> {
        config.validate()?;
        info!(
            correlation_id = %config.correlation_id,
            generation = ?config.generation,
            "websocket client created"
        );
        Ok(Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to 24h ticker updates for the given instruments
    pub fn subscribe_tickers(&self, instruments: &[&str]) -> Result<StreamHandle> {
        self.subscribe(ChannelKind::Ticker, instruments)
    }

    /// Subscribe to order book snapshots and deltas for the given
    /// instruments
    pub fn subscribe_depth(&self, instruments: &[&str]) -> Result<StreamHandle> {
        self.subscribe(ChannelKind::Depth, instruments)
    }

    /// Subscribe to public trade prints for the given instruments
    pub fn subscribe_trades(&self, instruments: &[&str]) -> Result<StreamHandle> {
        self.subscribe(ChannelKind::Trade, instruments)
    }

    /// Subscribe to the account's own order updates. An empty instrument
    /// list covers the whole account where the generation allows it.
    pub fn subscribe_orders(&self, instruments: &[&str]) -> Result<StreamHandle> {
        self.subscribe(ChannelKind::Order, instruments)
    }

    /// Subscribe to balance updates, optionally narrowed to currencies
    pub fn subscribe_balance(&self, currencies: &[&str]) -> Result<StreamHandle> {
        self.subscribe(ChannelKind::Balance, currencies)
    }

    /// Shut down every session. Outstanding handles receive the
    /// connection-closed sentinel and then end.
    pub fn close(&self) {
        let sessions = {
            let mut guard = self.sessions.lock().expect("sessions lock");
            std::mem::take(&mut *guard)
        };
        for (group, handle) in sessions {
            debug!(?group, "shutting down session");
            let _ = handle.command_tx.send(SessionCommand::Shutdown);
        }
    }

    fn subscribe(&self, kind: ChannelKind, instruments: &[&str]) -> Result<StreamHandle> {
        // Balance alone may cover the whole account with no id list
        if instruments.is_empty() && kind != ChannelKind::Balance {
            return Err(OkxError::InvalidArgument(format!(
                "{kind:?} subscription requires at least one instrument"
            )));
        }
        if kind.requires_auth() && self.config.credentials.is_none() {
            return Err(OkxError::MissingCredentials);
        }

        let protocol = self.config.generation.protocol();
        let canonical: Vec<String> = instruments
            .iter()
            .map(|raw| canonical_instrument(raw, '-'))
            .collect();

        let session = self.session(kind.group());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let ids = session.registry.lock().expect("registry lock").register(
            kind,
            &canonical,
            protocol,
            event_tx,
            closed.clone(),
        );

        session
            .command_tx
            .send(SessionCommand::Sync)
            .map_err(|_| OkxError::SessionClosed)?;

        debug!(
            correlation_id = %self.config.correlation_id,
            ?kind,
            instruments = ?canonical,
            "subscription registered"
        );

        Ok(StreamHandle {
            ids,
            closed,
            registry: session.registry.clone(),
            command_tx: session.command_tx.clone(),
            events: event_rx,
        })
    }

    /// Session handle for a channel group, spawning the task on first use
    /// or after its predecessor ended.
    fn session(&self, group: ChannelGroup) -> SessionHandle {
        let mut guard = self.sessions.lock().expect("sessions lock");
        if let Some(handle) = guard.get(&group)
            && !handle.command_tx.is_closed()
        {
            return handle.clone();
        }

        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(session::run(
            self.config.clone(),
            group,
            registry.clone(),
            command_rx,
        ));

        let handle = SessionHandle {
            registry,
            command_tx,
        };
        guard.insert(group, handle.clone());
        handle
    }
}

/*
[INPUT]:  Caller subscribe/unsubscribe requests and server acknowledgments
[OUTPUT]: Replayable subscription state and routed event delivery
[POS]:    WebSocket layer - source of truth for what should be subscribed
[UPDATE]: When channel grouping or replay semantics change
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::StreamingProtocol;
use crate::types::{CanonicalEvent, ChannelKind};

/// Acknowledgment state of one logical subscription.
///
/// A subscription moves PENDING to ACKED at most once per connection
/// epoch; reconnection reverts every ACKED entry to PENDING before replay.
/// Closed entries are removed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Pending,
    Acked,
}

/// One logical subscription, owned exclusively by the registry
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub kind: ChannelKind,
    /// Canonical instrument ids; empty for account-wide channels
    pub instruments: Vec<String>,
    /// Channel key echoed by this generation's acknowledgments
    pub key: String,
    pub state: SubscriptionState,
    /// Subscribe frame already sent on the current connection
    sent: bool,
    sender: mpsc::UnboundedSender<CanonicalEvent>,
    closed: Arc<AtomicBool>,
}

impl Subscription {
    fn is_live(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// Insertion-ordered registry of logical subscriptions, independent of any
/// one physical connection.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Subscription>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one subscribe request in PENDING state.
    ///
    /// Instrument channels get one entry per id; account-wide channels
    /// (empty id list) get a single entry. All entries of one request
    /// share the caller's event sender and closed flag.
    pub fn register(
        &mut self,
        kind: ChannelKind,
        instruments: &[String],
        protocol: &dyn StreamingProtocol,
        sender: mpsc::UnboundedSender<CanonicalEvent>,
        closed: Arc<AtomicBool>,
    ) -> Vec<u64> {
        let groups: Vec<Vec<String>> = if instruments.is_empty() {
            vec![Vec::new()]
        } else {
            instruments.iter().map(|id| vec![id.clone()]).collect()
        };

        groups
            .into_iter()
            .map(|group| {
                let id = self.next_id;
                self.next_id += 1;
                let key = protocol.channel_key(kind, group.first().map(String::as_str));
                self.entries.push(Subscription {
                    id,
                    kind,
                    instruments: group,
                    key,
                    state: SubscriptionState::Pending,
                    sent: false,
                    sender: sender.clone(),
                    closed: closed.clone(),
                });
                id
            })
            .collect()
    }

    /// Flip every PENDING entry matching the echoed key to ACKED.
    ///
    /// Unknown keys are logged and ignored, never fatal.
    pub fn mark_acked(&mut self, key: &str) -> usize {
        let mut flipped = 0;
        for entry in &mut self.entries {
            if entry.key == key && entry.state == SubscriptionState::Pending {
                entry.state = SubscriptionState::Acked;
                flipped += 1;
            }
        }
        if flipped == 0 {
            warn!(key, "acknowledgment for unknown channel key, ignoring");
        }
        flipped
    }

    /// Remove closed entries and return their (kind, instruments) for
    /// wire-level unsubscription
    pub fn remove(&mut self, ids: &[u64]) -> Vec<(ChannelKind, Vec<String>)> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            if ids.contains(&entry.id) {
                removed.push((entry.kind, entry.instruments.clone()));
                false
            } else {
                true
            }
        });
        removed
    }

    /// Revert every ACKED entry to PENDING ahead of a replay
    pub fn reset_for_replay(&mut self) {
        for entry in &mut self.entries {
            if entry.state == SubscriptionState::Acked {
                entry.state = SubscriptionState::Pending;
            }
            entry.sent = false;
        }
    }

    /// Subscribe frames for every PENDING entry not yet sent on the
    /// current connection, in insertion order. Entries are marked sent.
    ///
    /// Consecutive entries of the same channel kind coalesce into one
    /// request so batching generations emit a single frame for them.
    pub fn take_pending_frames(&mut self, protocol: &dyn StreamingProtocol) -> Vec<String> {
        let mut frames = Vec::new();
        let mut run: Option<(ChannelKind, Vec<String>)> = None;

        for entry in &mut self.entries {
            if entry.state != SubscriptionState::Pending || entry.sent || !entry.is_live() {
                continue;
            }
            entry.sent = true;
            match &mut run {
                Some((kind, ids)) if *kind == entry.kind => {
                    ids.extend(entry.instruments.iter().cloned());
                }
                _ => {
                    if let Some((kind, ids)) = run.take() {
                        frames.extend(protocol.subscribe_frames(kind, &ids));
                    }
                    run = Some((entry.kind, entry.instruments.clone()));
                }
            }
        }
        if let Some((kind, ids)) = run {
            frames.extend(protocol.subscribe_frames(kind, &ids));
        }
        frames
    }

    /// Deliver events to every live subscription of the kind whose
    /// instrument set covers each event's own instrument.
    ///
    /// Entries whose receiver is gone are treated as closed and dropped.
    pub fn deliver(&mut self, kind: ChannelKind, events: &[CanonicalEvent]) {
        if events.is_empty() {
            return;
        }
        let mut dead = Vec::new();
        for entry in &self.entries {
            if entry.kind != kind || !entry.is_live() {
                continue;
            }
            for event in events {
                let covers = entry.instruments.is_empty()
                    || event
                        .instrument()
                        .is_none_or(|id| entry.instruments.iter().any(|own| own == id));
                if !covers {
                    continue;
                }
                if entry.sender.send(event.clone()).is_err() {
                    debug!(id = entry.id, "subscription receiver dropped, pruning");
                    dead.push(entry.id);
                    break;
                }
            }
        }
        if !dead.is_empty() {
            self.remove(&dead);
        }
    }

    /// Emit the connection-closed sentinel to every live subscription
    pub fn broadcast_closed(&mut self) {
        let mut dead = Vec::new();
        for entry in &self.entries {
            if entry.is_live() && entry.sender.send(CanonicalEvent::ConnectionClosed).is_err() {
                dead.push(entry.id);
            }
        }
        if !dead.is_empty() {
            self.remove(&dead);
        }
    }

    /// True when no live subscription remains on this channel group
    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(Subscription::is_live)
    }

    #[cfg(test)]
    fn states(&self) -> Vec<SubscriptionState> {
        self.entries.iter().map(|entry| entry.state).collect()
    }
}

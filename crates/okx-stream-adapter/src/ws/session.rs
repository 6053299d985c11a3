/*
[INPUT]:  Session commands, registry state, and raw socket frames
[OUTPUT]: Canonical events into subscriber channels, frames onto the wire
[POS]:    WebSocket layer - one task owning one channel group's socket
[UPDATE]: When connection lifecycle or login handling changes
*/

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::config::OkxConfig;
use crate::auth::LoginSigner;
use crate::protocol::{InboundMessage, StreamingProtocol};
use crate::types::{ChannelGroup, ChannelKind};
use crate::ws::frame::{DecodedFrame, decode_frame};
use crate::ws::normalizer::MessageNormalizer;
use crate::ws::registry::SubscriptionRegistry;

/// Pause before redialing after a failed connection attempt. Dropped
/// established connections redial immediately.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Control messages from the client API into the session task
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Flush newly registered PENDING subscriptions to the wire
    Sync,
    /// Subscriptions already removed from the registry; undo them on the
    /// wire where the generation allows it
    Unsubscribe(Vec<(ChannelKind, Vec<String>)>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Login sent, waiting for the server's verdict before any subscribe
    Authenticating,
    Ready,
}

enum ConnectionEnd {
    Lost,
    Terminal,
}

/// Drive one channel group's connection until shutdown.
///
/// The task owns the socket exclusively: subscribe requests arrive as
/// commands, never as direct writes from another task.
pub(crate) async fn run(
    config: OkxConfig,
    group: ChannelGroup,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let protocol = config.generation.protocol();
    let mut normalizer = MessageNormalizer::new(protocol, config.side_convention);
    let endpoint = endpoint_for(&config, protocol, group);

    loop {
        info!(
            correlation_id = %config.correlation_id,
            %endpoint,
            ?group,
            "connecting"
        );
        let stream = match connect_async(&endpoint).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                warn!(correlation_id = %config.correlation_id, error = %err, "connect failed");
                if drain_until_deadline(&mut commands, CONNECT_RETRY_DELAY).await {
                    registry.lock().expect("registry lock").broadcast_closed();
                    return;
                }
                continue;
            }
        };

        normalizer.reset_epoch();
        registry.lock().expect("registry lock").reset_for_replay();

        match serve(
            &config,
            protocol,
            group,
            &registry,
            &mut commands,
            &mut normalizer,
            stream,
        )
        .await
        {
            ConnectionEnd::Terminal => return,
            ConnectionEnd::Lost => {
                let empty = {
                    let mut guard = registry.lock().expect("registry lock");
                    guard.reset_for_replay();
                    guard.broadcast_closed();
                    guard.is_empty()
                };
                if empty {
                    debug!(correlation_id = %config.correlation_id, "no live subscriptions, session ends");
                    return;
                }
                warn!(correlation_id = %config.correlation_id, "connection lost, redialing");
            }
        }
    }
}

async fn serve(
    config: &OkxConfig,
    protocol: &'static dyn StreamingProtocol,
    group: ChannelGroup,
    registry: &Arc<Mutex<SubscriptionRegistry>>,
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    normalizer: &mut MessageNormalizer,
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> ConnectionEnd {
    let (mut write, mut read) = stream.split();

    let mut state = match (group, &config.credentials) {
        (ChannelGroup::Private, Some(credentials)) => {
            let timestamp = Utc::now().timestamp().to_string();
            let signature = match LoginSigner::new(&credentials.secret).sign_login(&timestamp) {
                Ok(signature) => signature,
                Err(err) => {
                    error!(correlation_id = %config.correlation_id, error = %err, "login signing failed");
                    registry.lock().expect("registry lock").broadcast_closed();
                    return ConnectionEnd::Terminal;
                }
            };
            let frame = protocol.login_frame(credentials, &timestamp, &signature);
            if write.send(WsMessage::text(frame)).await.is_err() {
                return ConnectionEnd::Lost;
            }
            SessionState::Authenticating
        }
        _ => {
            if flush_pending(&mut write, registry, protocol).await.is_err() {
                return ConnectionEnd::Lost;
            }
            SessionState::Ready
        }
    };

    let mut heartbeat = time::interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Sync) => {
                    if state == SessionState::Ready
                        && flush_pending(&mut write, registry, protocol).await.is_err()
                    {
                        return ConnectionEnd::Lost;
                    }
                }
                Some(SessionCommand::Unsubscribe(targets)) => {
                    if protocol.supports_unsubscribe() {
                        for (kind, instruments) in targets {
                            for frame in protocol.unsubscribe_frames(kind, &instruments) {
                                if write.send(WsMessage::text(frame)).await.is_err() {
                                    return ConnectionEnd::Lost;
                                }
                            }
                        }
                    } else if registry.lock().expect("registry lock").is_empty() {
                        // This generation cannot unsubscribe in place; once the
                        // last live subscription is gone the socket goes with it
                        let _ = write.send(WsMessage::Close(None)).await;
                        return ConnectionEnd::Terminal;
                    }
                }
                Some(SessionCommand::Shutdown) | None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    registry.lock().expect("registry lock").broadcast_closed();
                    return ConnectionEnd::Terminal;
                }
            },
            _ = heartbeat.tick() => {
                if state == SessionState::Ready
                    && write
                        .send(WsMessage::text(protocol.heartbeat().text()))
                        .await
                        .is_err()
                {
                    return ConnectionEnd::Lost;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return ConnectionEnd::Lost,
                Some(Ok(WsMessage::Ping(payload))) => {
                    if write.send(WsMessage::Pong(payload)).await.is_err() {
                        return ConnectionEnd::Lost;
                    }
                }
                Some(Ok(WsMessage::Pong(_))) => {}
                Some(Ok(message)) => {
                    let Some(DecodedFrame::Payload(value)) = decode_frame(&message, protocol)
                    else {
                        continue;
                    };
                    for inbound in protocol.classify(&value) {
                        match inbound {
                            InboundMessage::LoginOk => {
                                info!(correlation_id = %config.correlation_id, "login accepted");
                                state = SessionState::Ready;
                                if flush_pending(&mut write, registry, protocol).await.is_err() {
                                    return ConnectionEnd::Lost;
                                }
                            }
                            InboundMessage::LoginFailed { message } => {
                                error!(
                                    correlation_id = %config.correlation_id,
                                    message,
                                    "login rejected"
                                );
                                registry.lock().expect("registry lock").broadcast_closed();
                                return ConnectionEnd::Terminal;
                            }
                            InboundMessage::SubscribeAck { key } => {
                                registry.lock().expect("registry lock").mark_acked(&key);
                            }
                            InboundMessage::UnsubscribeAck { key } => {
                                debug!(key, "unsubscribe acknowledged");
                            }
                            InboundMessage::ServerError { code, message } => {
                                warn!(
                                    correlation_id = %config.correlation_id,
                                    code,
                                    message,
                                    "server error"
                                );
                            }
                            InboundMessage::Pong | InboundMessage::Ignored => {}
                            InboundMessage::Stream(payload) => {
                                let kind = payload.kind;
                                let events = normalizer.normalize(payload);
                                registry
                                    .lock()
                                    .expect("registry lock")
                                    .deliver(kind, &events);
                            }
                        }
                    }
                }
            },
        }
    }
}

fn endpoint_for(
    config: &OkxConfig,
    protocol: &dyn StreamingProtocol,
    group: ChannelGroup,
) -> String {
    let overridden = match group {
        ChannelGroup::Public => config.public_endpoint.as_deref(),
        ChannelGroup::Private => config.private_endpoint.as_deref(),
    };
    overridden
        .map(str::to_string)
        .unwrap_or_else(|| protocol.endpoint(group).to_string())
}

/// Send frames for every PENDING subscription. Frames are built under the
/// registry lock but sent after it is released.
async fn flush_pending<S>(
    write: &mut S,
    registry: &Arc<Mutex<SubscriptionRegistry>>,
    protocol: &dyn StreamingProtocol,
) -> Result<(), ()>
where
    S: SinkExt<WsMessage> + Unpin,
{
    let frames = registry
        .lock()
        .expect("registry lock")
        .take_pending_frames(protocol);
    for frame in frames {
        debug!(%frame, "subscribe frame sent");
        if write.send(WsMessage::text(frame)).await.is_err() {
            return Err(());
        }
    }
    Ok(())
}

/// Wait out the redial delay while still honouring shutdown. Returns true
/// when the session should end instead of redialing.
async fn drain_until_deadline(
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    delay: Duration,
) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        match time::timeout_at(deadline, commands.recv()).await {
            Ok(Some(SessionCommand::Shutdown)) | Ok(None) => return true,
            Ok(Some(_)) => continue,
            Err(_elapsed) => return false,
        }
    }
}

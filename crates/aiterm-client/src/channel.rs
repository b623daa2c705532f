//! Real-time event channel.
//!
//! One [`EventChannel`] owns at most one live [`ChannelSession`]. A session is a
//! background task that dials the Socket.IO endpoint, performs the Engine.IO
//! handshake, answers heartbeats and fans inbound events out to listeners.
//! When the socket drops it retries after a fixed delay, up to a bounded number
//! of consecutive failures, then gives up until the next `connect()`.
//!
//! Listeners are registered on the channel rather than on the session, so a
//! reconnect never re-registers them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use aiterm_types::{
    ChannelEvent, ConnectedPayload, ConnectionStatus, EventKind, ExecuteCommandEvent,
    ExecuteResponse, RemoteHistoryEntry,
};

use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::ChannelError;
use crate::socketio::{self, Packet};

// Engine.IO defaults, used until the server's open packet says otherwise.
const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

struct ListenerSlot {
    id: u64,
    kind: EventKind,
    callback: Listener,
}

#[derive(Default)]
struct ChannelState {
    session: Option<Arc<ChannelSession>>,
    status: ConnectionStatus,
    next_session_id: u64,
}

#[derive(Default)]
struct Shared {
    state: Mutex<ChannelState>,
    listeners: Mutex<Vec<ListenerSlot>>,
    next_listener_id: AtomicU64,
}

impl Shared {
    /// Record a status transition for `session_id`. Transitions from a session
    /// that is no longer current are dropped.
    fn transition(&self, session_id: u64, status: ConnectionStatus) {
        let changed = {
            let mut state = self.state.lock();
            let current = state.session.as_ref().map(|s| s.id);
            if current != Some(session_id) || state.status == status {
                false
            } else {
                state.status = status;
                true
            }
        };
        if changed {
            debug!(session_id, status = status.label(), "event channel status");
            self.dispatch(&ChannelEvent::Status(status));
        }
    }

    fn dispatch(&self, event: &ChannelEvent) {
        let kind = event.kind();
        // Snapshot so callbacks may subscribe or dispose without deadlocking.
        let callbacks: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|slot| slot.kind == kind)
            .map(|slot| slot.callback.clone())
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().retain(|slot| slot.id != id);
    }
}

/// A live connection attempt sequence. Cloned out of [`EventChannel::connect`].
pub struct ChannelSession {
    id: u64,
    outbound: mpsc::UnboundedSender<String>,
    finished: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once the session gave up reconnecting or was torn down.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn shutdown(&self) {
        self.finished.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

/// Listener registration. Dropping it (or calling [`Subscription::dispose`])
/// removes the listener.
#[must_use = "dropping a Subscription immediately unregisters the listener"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_listener(self.id);
        }
    }
}

pub struct EventChannel {
    endpoint: String,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
}

impl EventChannel {
    pub fn new(config: &ClientConfig) -> Result<Self, ChannelError> {
        Ok(Self::with_endpoint(
            config.channel_endpoint()?,
            config.reconnect,
        ))
    }

    /// Build against a full `ws://.../socket.io/?EIO=4&transport=websocket` URL.
    pub fn with_endpoint(endpoint: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Start a session, or return the live one. Must be called inside a tokio
    /// runtime.
    pub fn connect(&self) -> Arc<ChannelSession> {
        let (session, outbound_rx) = {
            let mut state = self.shared.state.lock();
            if let Some(existing) = state.session.as_ref().filter(|s| !s.is_finished()) {
                return existing.clone();
            }
            let (tx, rx) = mpsc::unbounded_channel();
            state.next_session_id += 1;
            let session = Arc::new(ChannelSession {
                id: state.next_session_id,
                outbound: tx,
                finished: AtomicBool::new(false),
                task: Mutex::new(None),
            });
            state.session = Some(session.clone());
            (session, rx)
        };

        info!(
            session_id = session.id,
            endpoint = %self.endpoint,
            "event channel connecting"
        );
        self.shared
            .transition(session.id, ConnectionStatus::Connecting);

        let handle = tokio::spawn(run_session(
            Arc::downgrade(&self.shared),
            self.endpoint.clone(),
            self.policy,
            session.clone(),
            outbound_rx,
        ));
        *session.task.lock() = Some(handle);
        session
    }

    /// Tear down the current session, if any. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let (session, changed) = {
            let mut state = self.shared.state.lock();
            let session = state.session.take();
            let changed = state.status != ConnectionStatus::Disconnected;
            state.status = ConnectionStatus::Disconnected;
            (session, changed)
        };
        if let Some(session) = session {
            session.shutdown();
            info!(session_id = session.id, "event channel disconnected");
        }
        if changed {
            self.shared
                .dispatch(&ChannelEvent::Status(ConnectionStatus::Disconnected));
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.state.lock().status
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn current_session(&self) -> Option<Arc<ChannelSession>> {
        self.shared.state.lock().session.clone()
    }

    /// Emit `execute_command`. Fails unless the channel is connected.
    pub fn send_command(&self, command: &str, is_voice: bool) -> Result<(), ChannelError> {
        let session = {
            let state = self.shared.state.lock();
            if !state.status.is_connected() {
                return Err(ChannelError::NotConnected);
            }
            state.session.clone().ok_or(ChannelError::NotConnected)?
        };
        let frame = socketio::encode_event(
            "execute_command",
            &ExecuteCommandEvent {
                command: command.to_string(),
                is_voice,
            },
        )?;
        session
            .outbound
            .send(frame)
            .map_err(|_| ChannelError::Closed)
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.shared.listeners.lock().push(ListenerSlot {
            id,
            kind,
            callback: Arc::new(callback),
        });
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn on_status<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Status, move |event| {
            if let ChannelEvent::Status(status) = event {
                callback(*status);
            }
        })
    }

    pub fn on_connected<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ConnectedPayload) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Connected, move |event| {
            if let ChannelEvent::Connected(payload) = event {
                callback(payload);
            }
        })
    }

    pub fn on_command_result<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ExecuteResponse) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::CommandResult, move |event| {
            if let ChannelEvent::CommandResult(result) = event {
                callback(result);
            }
        })
    }

    pub fn on_command_executed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RemoteHistoryEntry) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::CommandExecuted, move |event| {
            if let ChannelEvent::CommandExecuted(entry) = event {
                callback(entry);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        if let Some(session) = self.shared.state.lock().session.take() {
            session.shutdown();
        }
    }
}

async fn run_session(
    shared: Weak<Shared>,
    endpoint: String,
    policy: ReconnectPolicy,
    session: Arc<ChannelSession>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let mut failures: u32 = 0;
    loop {
        let mut established = false;
        let result = drive_connection(&shared, &endpoint, &session, &mut outbound, &mut established)
            .await;
        match &result {
            Ok(()) => info!(session_id = session.id, "event channel socket closed"),
            Err(e) => warn!(session_id = session.id, "event channel socket failed: {e}"),
        }

        if established {
            failures = 0;
        }
        failures += 1;

        let Some(shared) = shared.upgrade() else { return };
        if failures > policy.max_attempts {
            warn!(
                session_id = session.id,
                attempts = policy.max_attempts,
                "event channel giving up; next connect() will retry"
            );
            session.finished.store(true, Ordering::SeqCst);
            shared.transition(session.id, ConnectionStatus::GaveUp);
            return;
        }
        shared.transition(
            session.id,
            ConnectionStatus::Reconnecting { attempt: failures },
        );
        drop(shared);

        tokio::time::sleep(policy.delay).await;
    }
}

/// Run one socket until it closes. Sets `established` once the namespace
/// connect is acknowledged. A socket that stays silent for longer than
/// `pingInterval + pingTimeout` is treated as dropped.
async fn drive_connection(
    shared: &Weak<Shared>,
    endpoint: &str,
    session: &ChannelSession,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    established: &mut bool,
) -> Result<(), ChannelError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(endpoint).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut liveness = Duration::from_millis(DEFAULT_PING_INTERVAL_MS + DEFAULT_PING_TIMEOUT_MS);
    let deadline = tokio::time::sleep(liveness);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                return Err(ChannelError::HeartbeatTimeout(liveness));
            }
            frame = read.next() => {
                deadline.as_mut().reset(Instant::now() + liveness);
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                let packet = match socketio::decode(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!(session_id = session.id, "ignoring frame: {e}");
                        continue;
                    }
                };

                match packet {
                    Packet::Open(open) => {
                        debug!(
                            sid = %open.sid,
                            ping_interval = open.ping_interval,
                            ping_timeout = open.ping_timeout,
                            "engine.io open"
                        );
                        if open.ping_interval > 0 {
                            liveness = Duration::from_millis(open.ping_interval + open.ping_timeout);
                            deadline.as_mut().reset(Instant::now() + liveness);
                        }
                        write.send(Message::Text(socketio::encode_connect())).await?;
                    }
                    Packet::Ping => {
                        write.send(Message::Text(socketio::encode_pong())).await?;
                    }
                    Packet::Connect { .. } => {
                        *established = true;
                        let Some(shared) = shared.upgrade() else { return Ok(()) };
                        shared.transition(session.id, ConnectionStatus::Connected);
                    }
                    Packet::Event { name, payload, .. } => {
                        let Some(shared) = shared.upgrade() else { return Ok(()) };
                        deliver(&shared, &name, payload);
                    }
                    Packet::ConnectError(message) => return Err(ChannelError::Rejected(message)),
                    Packet::Disconnect | Packet::Close => return Ok(()),
                    Packet::Pong | Packet::Noop => {}
                }
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else { return Err(ChannelError::Closed) };
                if *established {
                    write.send(Message::Text(frame)).await?;
                } else {
                    warn!(session_id = session.id, "dropping outbound frame before connect");
                }
            }
        }
    }
}

fn deliver(shared: &Shared, name: &str, payload: Value) {
    match ChannelEvent::from_wire(name, payload) {
        Ok(Some(event)) => shared.dispatch(&event),
        Ok(None) => debug!(event = name, "unhandled channel event"),
        Err(e) => warn!(event = name, "malformed channel event payload: {e}"),
    }
}

//! WebSocket transport.
//!
//! [`Channel`] wraps exactly one connection attempt. [`ReconnectingChannel`]
//! owns a sequence of channels and reopens with backoff after each one drops.

use crate::error::SendError;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Callbacks fired from the transport runtime.
///
/// `on_packet` is called once per whole inbound message, in arrival order.
pub trait ChannelEvents: Send + Sync + 'static {
    fn on_status(&self, status: ConnectionStatus);
    fn on_packet(&self, payload: Vec<u8>);
}

/// Anything that can carry an encoded client event to the agent.
pub trait Outbound: Send + Sync {
    fn send(&self, payload: Vec<u8>) -> Result<(), SendError>;
}

struct StatusCell {
    tx: watch::Sender<ConnectionStatus>,
    events: Arc<dyn ChannelEvents>,
    closed: AtomicBool,
    reached_connected: AtomicBool,
}

impl StatusCell {
    fn set(&self, status: ConnectionStatus) {
        // Notify under the watch lock so observers see transitions in order.
        self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }

            if self.closed.load(Ordering::Acquire) && status != ConnectionStatus::Disconnected {
                return false;
            }

            if status == ConnectionStatus::Connected {
                self.reached_connected.store(true, Ordering::Release);
            }

            *current = status;
            self.events.on_status(status);
            true
        });
    }

    fn get(&self) -> ConnectionStatus {
        *self.tx.borrow()
    }
}

/// A single WebSocket connection. Reopening requires a new `Channel`.
pub struct Channel {
    cell: Arc<StatusCell>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    pub fn open(runtime: &Handle, endpoint: &str, events: Arc<dyn ChannelEvents>) -> Self {
        let (tx, _rx) = watch::channel(ConnectionStatus::Disconnected);
        let cell = Arc::new(StatusCell {
            tx,
            events,
            closed: AtomicBool::new(false),
            reached_connected: AtomicBool::new(false),
        });
        cell.set(ConnectionStatus::Connecting);

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(drive(endpoint.to_string(), cell.clone(), outbound_rx));

        Self {
            cell,
            outbound,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.cell.get()
    }

    /// Whether this channel was ever `connected`.
    pub fn reached_connected(&self) -> bool {
        self.cell.reached_connected.load(Ordering::Acquire)
    }

    /// Queues one payload for the writer. Refuses unless connected.
    pub fn send(&self, payload: Vec<u8>) -> Result<(), SendError> {
        if self.status() != ConnectionStatus::Connected {
            return Err(SendError::NotConnected);
        }

        self.outbound.send(payload).map_err(|_| SendError::Closed)
    }

    pub fn close(&self) {
        self.cell.closed.store(true, Ordering::Release);

        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }

        self.cell.set(ConnectionStatus::Disconnected);
    }

    /// Resolves once the channel reports `disconnected`.
    pub async fn closed(&self) {
        let mut rx = self.cell.tx.subscribe();
        let _ = rx
            .wait_for(|status| *status == ConnectionStatus::Disconnected)
            .await;
    }
}

impl Outbound for Channel {
    fn send(&self, payload: Vec<u8>) -> Result<(), SendError> {
        Channel::send(self, payload)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

async fn drive(
    endpoint: String,
    cell: Arc<StatusCell>,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            warn!(%endpoint, error = %err, "websocket connect failed");
            cell.set(ConnectionStatus::Disconnected);
            return;
        }
    };

    info!(%endpoint, "websocket connected");
    cell.set(ConnectionStatus::Connected);

    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => deliver(&cell, text.into_bytes()),
                Some(Ok(Message::Binary(bytes))) => deliver(&cell, bytes),
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "server closed websocket");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    break;
                }
                None => break,
            },
            outbound = outbound_rx.recv() => {
                let Some(payload) = outbound else {
                    break;
                };

                let message = match String::from_utf8(payload) {
                    Ok(text) => Message::Text(text),
                    Err(err) => Message::Binary(err.into_bytes()),
                };

                if let Err(err) = sink.send(message).await {
                    warn!(error = %err, "websocket write failed");
                    break;
                }
            }
        }
    }

    // Refuse new sends before the close handshake; nothing queued now is written.
    cell.set(ConnectionStatus::Disconnected);
    info!(%endpoint, "websocket disconnected");
    let _ = sink.close().await;
}

fn deliver(cell: &StatusCell, payload: Vec<u8>) {
    if cell.closed.load(Ordering::Acquire) {
        return;
    }

    debug!(bytes = payload.len(), "inbound packet");
    cell.events.on_packet(payload);
}

/// Exponential backoff with jitter between reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction in `[0, 1]`; each delay is scaled by a factor drawn from
    /// `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
            max_retries: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            max_retries: Some(0),
            ..Self::default()
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based), or `None` once the
    /// retry budget is spent.
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        if matches!(self.max_retries, Some(max_retries) if attempt > max_retries) {
            return None;
        }

        let exponent = attempt.saturating_sub(1).min(31);
        let base = self
            .initial_delay
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(self.max_delay);

        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            rng.gen_range((1.0 - jitter)..=(1.0 + jitter))
        } else {
            1.0
        };

        let delay = Duration::try_from_secs_f64(base.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        Some(delay)
    }
}

/// Keeps a [`Channel`] open to one endpoint, reopening it after drops.
pub struct ReconnectingChannel {
    current: Arc<Mutex<Option<Arc<Channel>>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    stopped: Arc<AtomicBool>,
}

impl ReconnectingChannel {
    pub fn spawn(
        runtime: &Handle,
        endpoint: impl Into<String>,
        policy: ReconnectPolicy,
        events: Arc<dyn ChannelEvents>,
    ) -> Self {
        let current = Arc::new(Mutex::new(None));
        let stopped = Arc::new(AtomicBool::new(false));
        let supervisor = runtime.spawn(supervise(
            endpoint.into(),
            policy,
            events,
            current.clone(),
            stopped.clone(),
        ));

        Self {
            current,
            supervisor: Mutex::new(Some(supervisor)),
            stopped,
        }
    }

    fn current(&self) -> Option<Arc<Channel>> {
        lock(&self.current).clone()
    }

    /// Status of the live channel, `disconnected` between attempts.
    pub fn status(&self) -> ConnectionStatus {
        self.current()
            .map(|channel| channel.status())
            .unwrap_or(ConnectionStatus::Disconnected)
    }

    /// Stops reconnecting and closes the live channel. Idempotent.
    pub fn close(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(task) = lock(&self.supervisor).take() {
            task.abort();
        }

        if let Some(channel) = lock(&self.current).take() {
            channel.close();
        }
    }
}

impl Outbound for ReconnectingChannel {
    fn send(&self, payload: Vec<u8>) -> Result<(), SendError> {
        match self.current() {
            Some(channel) => channel.send(payload),
            None => Err(SendError::NotConnected),
        }
    }
}

impl Drop for ReconnectingChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn supervise(
    endpoint: String,
    policy: ReconnectPolicy,
    events: Arc<dyn ChannelEvents>,
    current: Arc<Mutex<Option<Arc<Channel>>>>,
    stopped: Arc<AtomicBool>,
) {
    let runtime = Handle::current();
    let mut attempt: u32 = 0;

    loop {
        let channel = Arc::new(Channel::open(&runtime, &endpoint, events.clone()));
        *lock(&current) = Some(channel.clone());

        if stopped.load(Ordering::Acquire) {
            channel.close();
            return;
        }

        channel.closed().await;

        if stopped.load(Ordering::Acquire) {
            return;
        }

        if channel.reached_connected() {
            attempt = 0;
        }
        attempt = attempt.saturating_add(1);

        let delay = policy.delay_for(attempt, &mut rand::thread_rng());
        let Some(delay) = delay else {
            warn!(%endpoint, attempt, "reconnect budget exhausted; staying disconnected");
            return;
        };

        info!(
            %endpoint,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        tokio::time::sleep(delay).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

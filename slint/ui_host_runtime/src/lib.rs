pub mod config;
pub mod error;
pub mod protocol;
pub mod reducer;
pub mod render;
pub mod session;
pub mod store;
pub mod transport;

use crate::render::Widget;
use crate::store::{ChatMessage, ConnectionStatus, SessionStore, StoreSnapshot};
use crate::transport::{ChannelEvents, ReconnectingChannel};
use slint::ComponentHandle;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use crate::config::HostConfig;
pub use crate::error::{DecodeError, ForwardError, HostError, SendError};
pub use crate::protocol::{BackendPacket, ClientEvent, UiCommand};
pub use crate::reducer::{ClearScope, Schema};
pub use crate::render::WidgetEvent;
pub use crate::session::Session;

const TRANSPORT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// The seam between the runtime and a concrete, generated Slint window.
pub trait HostBindings: 'static {
    type Ui: ComponentHandle + 'static;

    fn new_ui() -> Result<Self::Ui, slint::PlatformError>;

    fn bind_send_message<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(String) + 'static;

    fn bind_widget_event<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(WidgetEvent) + Clone + 'static;

    fn set_connection_status(ui: &Self::Ui, status: ConnectionStatus);
    fn set_chat_history(ui: &Self::Ui, history: &[ChatMessage]);
    fn set_widgets(ui: &Self::Ui, widgets: &[Widget]);

    fn apply_snapshot(ui: &Self::Ui, snapshot: &StoreSnapshot) {
        Self::set_connection_status(ui, snapshot.connection_status);
        Self::set_chat_history(ui, &snapshot.chat_history);
        Self::set_widgets(ui, &render::render_schema(&snapshot.schema));
    }
}

pub fn run<B: HostBindings>(config: HostConfig) -> Result<(), HostError> {
    let ui = B::new_ui()?;
    let store = Arc::new(Mutex::new(SessionStore::new(config.clear_scope)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("agentui-transport")
        .enable_all()
        .build()?;

    let events = Arc::new(UiChannelEvents::<B> {
        ui: ui.as_weak(),
        store: store.clone(),
    });
    let channel = Arc::new(ReconnectingChannel::spawn(
        runtime.handle(),
        config.endpoint.as_str(),
        config.reconnect.clone(),
        events,
    ));
    let session = Session::new(store, channel.clone());

    install_callbacks::<B>(&ui, session.clone());
    B::apply_snapshot(&ui, &session.snapshot());

    info!(
        endpoint = %config.endpoint,
        clear_scope = ?config.clear_scope,
        "ui host started"
    );
    let run_result = ui.run();

    channel.close();
    drop(session);
    drop(ui);
    runtime.shutdown_timeout(TRANSPORT_SHUTDOWN_GRACE);
    info!("ui host stopped");

    run_result.map_err(HostError::from)
}

fn install_callbacks<B: HostBindings>(ui: &B::Ui, session: Session) {
    let chat_ui = ui.as_weak();
    let chat_session = session.clone();
    B::bind_send_message(ui, move |content| {
        let result = chat_session.submit_user_message(&content);

        if let Some(ui) = chat_ui.upgrade() {
            B::set_chat_history(&ui, chat_session.store().chat_history());
        }

        if let Err(err) = result {
            warn!(error = %err, "user message not delivered; kept in chat history");
        }
    });

    B::bind_widget_event(ui, move |event| {
        if let Err(err) = session.forward_widget_event(event) {
            warn!(error = %err, "dropping widget interaction");
        }
    });
}

/// Transport callbacks. Decoding runs on the transport thread; every store
/// mutation is marshalled onto the UI event loop, which preserves order.
struct UiChannelEvents<B: HostBindings> {
    ui: slint::Weak<B::Ui>,
    store: Arc<Mutex<SessionStore>>,
}

impl<B: HostBindings> ChannelEvents for UiChannelEvents<B> {
    fn on_status(&self, status: ConnectionStatus) {
        let store = self.store.clone();
        let result = self.ui.upgrade_in_event_loop(move |ui| {
            lock(&store).set_connection_status(status);
            B::set_connection_status(&ui, status);
        });

        if let Err(err) = result {
            debug!(error = %err, status = status.as_str(), "event loop gone; status dropped");
        }
    }

    fn on_packet(&self, payload: Vec<u8>) {
        let packet = match protocol::decode_backend_packet(&payload) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "dropping inbound packet");
                return;
            }
        };

        let store = self.store.clone();
        let result = self.ui.upgrade_in_event_loop(move |ui| {
            let snapshot = {
                let mut store = lock(&store);
                store.apply_backend_packet(packet);
                store.snapshot()
            };
            debug!(
                revision = snapshot.revision,
                elements = snapshot.schema.len(),
                "applied backend packet"
            );
            B::set_chat_history(&ui, &snapshot.chat_history);
            B::set_widgets(&ui, &render::render_schema(&snapshot.schema));
        });

        if let Err(err) = result {
            debug!(error = %err, "event loop gone; packet dropped");
        }
    }
}

fn lock(store: &Mutex<SessionStore>) -> MutexGuard<'_, SessionStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

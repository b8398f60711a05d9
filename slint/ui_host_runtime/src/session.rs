use crate::error::{ForwardError, SendError};
use crate::protocol::{self, ClientEvent};
use crate::render::WidgetEvent;
use crate::store::{SessionStore, StoreSnapshot};
use crate::transport::Outbound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Store plus outbound sink: the path by which user input reaches the agent.
#[derive(Clone)]
pub struct Session {
    store: Arc<Mutex<SessionStore>>,
    outbound: Arc<dyn Outbound>,
}

impl Session {
    pub fn new(store: Arc<Mutex<SessionStore>>, outbound: Arc<dyn Outbound>) -> Self {
        Self { store, outbound }
    }

    pub fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store().snapshot()
    }

    /// Appends the message to chat history, then sends it. The append stands
    /// even when the send fails. Blank input is ignored.
    pub fn submit_user_message(&self, content: &str) -> Result<(), SendError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        self.store().add_client_message(content);
        self.send(&ClientEvent::user_message(content))
    }

    pub fn forward_widget_event(&self, event: WidgetEvent) -> Result<(), ForwardError> {
        let event = event.into_client_event()?;
        match &event {
            ClientEvent::UiEvent { payload } if payload.event_type.is_extension() => debug!(
                event_type = ?payload.event_type,
                element_id = %payload.element_id,
                "sending ui event kind outside the stock agent's vocabulary"
            ),
            _ => {}
        }
        self.send(&event)?;
        Ok(())
    }

    fn send(&self, event: &ClientEvent) -> Result<(), SendError> {
        let payload = protocol::encode_client_event(event)?;
        let bytes = payload.len();
        self.outbound.send(payload)?;
        debug!(bytes, "client event sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::ClearScope;
    use crate::store::Role;
    use serde_json::Value;

    #[derive(Default)]
    struct RecordingOutbound {
        connected: bool,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl Outbound for RecordingOutbound {
        fn send(&self, payload: Vec<u8>) -> Result<(), SendError> {
            if !self.connected {
                return Err(SendError::NotConnected);
            }
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(payload);
            Ok(())
        }
    }

    fn session(connected: bool) -> (Session, Arc<RecordingOutbound>) {
        let outbound = Arc::new(RecordingOutbound {
            connected,
            ..RecordingOutbound::default()
        });
        let store = Arc::new(Mutex::new(SessionStore::new(ClearScope::Global)));
        (Session::new(store, outbound.clone()), outbound)
    }

    fn sent_json(outbound: &RecordingOutbound) -> Vec<Value> {
        outbound
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|payload| serde_json::from_slice(payload).expect("sent payload is json"))
            .collect()
    }

    #[test]
    fn user_message_is_appended_and_sent() {
        let (session, outbound) = session(true);
        session
            .submit_user_message("  Help me plan my trip to Japan. ")
            .expect("send succeeds");

        let last = session.store().chat_history().last().cloned().expect("appended");
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "Help me plan my trip to Japan.");

        let sent = sent_json(&outbound);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "user_message");
        assert_eq!(sent[0]["content"], "Help me plan my trip to Japan.");
    }

    #[test]
    fn user_message_stays_in_history_when_disconnected() {
        let (session, outbound) = session(false);
        let err = session.submit_user_message("q").expect_err("not connected");

        assert!(matches!(err, SendError::NotConnected));
        assert_eq!(session.store().chat_history().len(), 1);
        assert!(sent_json(&outbound).is_empty());
    }

    #[test]
    fn blank_message_is_ignored() {
        let (session, outbound) = session(true);
        session.submit_user_message("   ").expect("blank is a no-op");
        assert!(session.store().chat_history().is_empty());
        assert!(sent_json(&outbound).is_empty());
    }

    #[test]
    fn widget_event_is_forwarded() {
        let (session, outbound) = session(true);
        session
            .forward_widget_event(WidgetEvent::SliderChanged {
                slider_id: "budget".to_string(),
                value: 1500.0,
            })
            .expect("forwarded");

        let sent = sent_json(&outbound);
        assert_eq!(sent[0]["type"], "ui_event");
        assert_eq!(sent[0]["payload"]["element_id"], "budget");
        assert_eq!(sent[0]["payload"]["state"]["value"], 1500.0);
    }

    #[test]
    fn rejected_widget_event_is_not_sent() {
        let (session, outbound) = session(true);
        let err = session
            .forward_widget_event(WidgetEvent::TextSubmitted {
                input_id: "email".to_string(),
                value: String::new(),
                required: true,
                max_length: None,
            })
            .expect_err("rejected");

        assert!(matches!(err, ForwardError::Rejected(_)));
        assert!(sent_json(&outbound).is_empty());
    }
}

use crate::protocol::BackendPacket;
use crate::reducer::{self, ClearScope, Schema};
use tracing::debug;

pub use crate::transport::ConnectionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Everything the view needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub connection_status: ConnectionStatus,
    pub chat_history: Vec<ChatMessage>,
    pub schema: Schema,
    pub revision: u64,
}

/// The client's single source of truth.
///
/// The schema only changes through [`SessionStore::apply_backend_packet`],
/// which runs [`reducer::reduce`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    connection_status: ConnectionStatus,
    chat_history: Vec<ChatMessage>,
    schema: Schema,
    clear_scope: ClearScope,
    revision: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(ClearScope::default())
    }
}

impl SessionStore {
    pub fn new(clear_scope: ClearScope) -> Self {
        Self {
            connection_status: ConnectionStatus::Disconnected,
            chat_history: Vec::new(),
            schema: Schema::new(),
            clear_scope,
            revision: 0,
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            connection_status: self.connection_status,
            chat_history: self.chat_history.clone(),
            schema: self.schema.clone(),
            revision: self.revision,
        }
    }

    /// Overwrites the status; any status may follow any other.
    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        self.bump();
    }

    /// Optimistic append; never rolled back if the send later fails.
    pub fn add_client_message(&mut self, content: impl Into<String>) {
        self.chat_history.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
        self.bump();
    }

    /// Appends the assistant reply (empty text counts as absent), then folds
    /// the commands into the schema.
    pub fn apply_backend_packet(&mut self, packet: BackendPacket) {
        let BackendPacket {
            chat_message,
            ui_commands,
        } = packet;

        if let Some(content) = chat_message.filter(|content| !content.is_empty()) {
            self.chat_history.push(ChatMessage {
                role: Role::Assistant,
                content,
            });
        }

        let command_count = ui_commands.len();
        let schema = std::mem::take(&mut self.schema);
        self.schema = reducer::reduce(schema, ui_commands, self.clear_scope);
        self.bump();

        debug!(
            revision = self.revision,
            commands = command_count,
            schema_len = self.schema.len(),
            chat_len = self.chat_history.len(),
            "applied backend packet"
        );
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AddButton, AddText, ClearContainer, TextStyle, UiCommand};

    fn text(body: &str) -> UiCommand {
        UiCommand::AddText(AddText {
            container_id: "main_workspace".to_string(),
            text: body.to_string(),
            style: TextStyle::Body,
        })
    }

    #[test]
    fn starts_empty_and_disconnected() {
        let store = SessionStore::default();
        assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
        assert!(store.chat_history().is_empty());
        assert!(store.schema().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn status_is_overwritten_without_transition_checks() {
        let mut store = SessionStore::default();
        store.set_connection_status(ConnectionStatus::Connected);
        store.set_connection_status(ConnectionStatus::Connecting);
        assert_eq!(store.connection_status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn client_message_is_appended_immediately() {
        let mut store = SessionStore::default();
        store.add_client_message("q");

        let last = store.chat_history().last().expect("message appended");
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "q");
    }

    #[test]
    fn packet_updates_chat_and_schema_together() {
        let mut store = SessionStore::default();
        let before = store.revision();

        store.apply_backend_packet(BackendPacket {
            chat_message: Some("hi".to_string()),
            ui_commands: vec![text("x")],
        });

        assert_eq!(store.revision(), before + 1);
        assert_eq!(
            store.chat_history(),
            [ChatMessage {
                role: Role::Assistant,
                content: "hi".to_string()
            }]
        );
        assert_eq!(store.schema().elements(), [text("x")]);
    }

    #[test]
    fn chat_only_packet_keeps_schema() {
        let mut store = SessionStore::default();
        store.apply_backend_packet(BackendPacket {
            chat_message: None,
            ui_commands: vec![text("x")],
        });
        store.apply_backend_packet(BackendPacket {
            chat_message: Some("still here".to_string()),
            ui_commands: Vec::new(),
        });

        assert_eq!(store.schema().elements(), [text("x")]);
        assert_eq!(store.chat_history().len(), 1);
    }

    #[test]
    fn empty_chat_message_is_not_appended() {
        let mut store = SessionStore::default();
        store.apply_backend_packet(BackendPacket {
            chat_message: Some(String::new()),
            ui_commands: Vec::new(),
        });
        assert!(store.chat_history().is_empty());
    }

    #[test]
    fn clearing_schema_keeps_chat_history() {
        let mut store = SessionStore::default();
        store.add_client_message("hello");
        store.apply_backend_packet(BackendPacket {
            chat_message: None,
            ui_commands: vec![
                UiCommand::ClearContainer(ClearContainer {
                    container_id: Some("main_workspace".to_string()),
                }),
                UiCommand::AddButton(AddButton {
                    container_id: "main_workspace".to_string(),
                    button_id: "b1".to_string(),
                    text: "Ok".to_string(),
                }),
            ],
        });

        assert_eq!(store.chat_history().len(), 1);
        assert_eq!(store.schema().len(), 1);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut store = SessionStore::default();
        store.add_client_message("one");
        let snapshot = store.snapshot();
        store.add_client_message("two");

        assert_eq!(snapshot.chat_history.len(), 1);
        assert_eq!(store.chat_history().len(), 2);
        assert!(snapshot.revision < store.revision());
    }
}

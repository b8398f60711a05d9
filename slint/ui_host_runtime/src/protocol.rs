use crate::error::{DecodeError, SendError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// One structural instruction from the agent.
///
/// Elements that fail to decode are kept as [`UiCommand::Unknown`] so that a
/// single bad element never costs the rest of its packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiCommand {
    AddText(AddText),
    AddButton(AddButton),
    AddSlider(AddSlider),
    AddDropdown(AddDropdown),
    AddDatePicker(AddDatePicker),
    AddTextInput(AddTextInput),
    ClearContainer(ClearContainer),
    #[serde(skip)]
    Unknown(UnknownCommand),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddText {
    pub container_id: String,
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Header,
    #[default]
    Body,
    Code,
}

impl TextStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Code => "code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddButton {
    pub container_id: String,
    pub button_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddSlider {
    pub container_id: String,
    pub slider_id: String,
    pub label: String,
    pub min_val: f64,
    pub max_val: f64,
    pub default_val: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddDropdown {
    pub container_id: String,
    pub dropdown_id: String,
    pub label: Option<String>,
    pub options: Vec<DropdownOption>,
    pub default_value: Option<String>,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddDatePicker {
    pub container_id: String,
    pub date_picker_id: String,
    pub label: Option<String>,
    pub default_date: Option<String>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub date_format: Option<DateFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
}

impl DateFormat {
    /// chrono format string for this layout.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::YearMonthDay => "%Y-%m-%d",
            Self::MonthDayYear => "%m/%d/%Y",
            Self::DayMonthYear => "%d/%m/%Y",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::YearMonthDay => "YYYY-MM-DD",
            Self::MonthDayYear => "MM/DD/YYYY",
            Self::DayMonthYear => "DD/MM/YYYY",
        }
    }

    /// Inverse of [`DateFormat::label`], used when a toolkit hands the
    /// displayed format back with an interaction.
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::YearMonthDay, Self::MonthDayYear, Self::DayMonthYear]
            .into_iter()
            .find(|format| format.label() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddTextInput {
    pub container_id: String,
    pub input_id: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub default_value: Option<String>,
    pub input_type: Option<InputType>,
    #[serde(default)]
    pub required: bool,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Tel,
    Url,
}

/// A clear without a container id targets the whole schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClearContainer {
    #[serde(default)]
    pub container_id: Option<String>,
}

/// A packet element that did not match any known command shape.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCommand {
    pub command: Option<String>,
    pub reason: String,
    pub raw: Value,
}

impl UiCommand {
    pub fn container_id(&self) -> Option<&str> {
        match self {
            Self::AddText(cmd) => Some(&cmd.container_id),
            Self::AddButton(cmd) => Some(&cmd.container_id),
            Self::AddSlider(cmd) => Some(&cmd.container_id),
            Self::AddDropdown(cmd) => Some(&cmd.container_id),
            Self::AddDatePicker(cmd) => Some(&cmd.container_id),
            Self::AddTextInput(cmd) => Some(&cmd.container_id),
            Self::ClearContainer(cmd) => cmd.container_id.as_deref(),
            Self::Unknown(cmd) => cmd.raw.get("container_id").and_then(Value::as_str),
        }
    }

    /// Wire tag, as sent by the agent.
    pub fn tag(&self) -> &str {
        match self {
            Self::AddText(_) => "ADD_TEXT",
            Self::AddButton(_) => "ADD_BUTTON",
            Self::AddSlider(_) => "ADD_SLIDER",
            Self::AddDropdown(_) => "ADD_DROPDOWN",
            Self::AddDatePicker(_) => "ADD_DATE_PICKER",
            Self::AddTextInput(_) => "ADD_TEXT_INPUT",
            Self::ClearContainer(_) => "CLEAR_CONTAINER",
            Self::Unknown(cmd) => cmd.command.as_deref().unwrap_or(""),
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Self::ClearContainer(_))
    }
}

/// One unit of transmission from the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendPacket {
    pub chat_message: Option<String>,
    pub ui_commands: Vec<UiCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    UserMessage { content: String },
    UiEvent { payload: UiEventPayload },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiEventPayload {
    pub event_type: UiEventKind,
    pub element_id: String,
    pub state: Map<String, Value>,
}

/// `ButtonClick` and `SliderChange` are what the stock agent validates; the
/// rest are extensions it drops unless it is taught about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEventKind {
    ButtonClick,
    SliderChange,
    DropdownChange,
    DateChange,
    InputSubmit,
}

impl UiEventKind {
    pub fn is_extension(self) -> bool {
        !matches!(self, Self::ButtonClick | Self::SliderChange)
    }
}

impl ClientEvent {
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    pub fn ui_event(
        event_type: UiEventKind,
        element_id: impl Into<String>,
        state: Map<String, Value>,
    ) -> Self {
        Self::UiEvent {
            payload: UiEventPayload {
                event_type,
                element_id: element_id.into(),
                state,
            },
        }
    }
}

pub fn decode_backend_packet(payload: &[u8]) -> Result<BackendPacket, DecodeError> {
    let value: Value = serde_json::from_slice(payload)?;

    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DecodeError::malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )));
        }
    };

    let chat_message = match object.remove("chat_message") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => {
            return Err(DecodeError::malformed(format!(
                "chat_message must be a string, got {}",
                json_kind(&other)
            )));
        }
    };

    let ui_commands = match object.remove("ui_commands") {
        Some(Value::Array(items)) => items.into_iter().map(decode_command).collect(),
        Some(other) => {
            return Err(DecodeError::malformed(format!(
                "ui_commands must be an array, got {}",
                json_kind(&other)
            )));
        }
        None => return Err(DecodeError::malformed("missing ui_commands")),
    };

    let packet = BackendPacket {
        chat_message,
        ui_commands,
    };
    debug!(
        has_chat = packet.chat_message.is_some(),
        commands = packet.ui_commands.len(),
        "decoded backend packet"
    );

    Ok(packet)
}

pub fn encode_client_event(event: &ClientEvent) -> Result<Vec<u8>, SendError> {
    Ok(serde_json::to_vec(event)?)
}

fn decode_command(raw: Value) -> UiCommand {
    let decoded = UiCommand::deserialize(&raw);

    match decoded {
        Ok(command) => command,
        Err(err) => {
            let command = raw
                .get("command")
                .and_then(Value::as_str)
                .map(str::to_owned);
            warn!(
                command = command.as_deref().unwrap_or("<missing>"),
                error = %err,
                "keeping undecodable ui command as an unknown element"
            );
            UiCommand::Unknown(UnknownCommand {
                command,
                reason: err.to_string(),
                raw,
            })
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Schema element to widget mapping, and widget interactions back to client
//! events.
//!
//! Everything here is a pure function of its input. Widget-local state (a
//! slider mid-drag, half-typed text) lives in the toolkit and never reaches
//! the schema.

use crate::error::RejectedInput;
use crate::protocol::{
    AddDatePicker, AddDropdown, AddSlider, AddTextInput, ClientEvent, DateFormat, InputType,
    TextStyle, UiCommand, UiEventKind,
};
use crate::reducer::Schema;
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const ISO_DATE: &str = "%Y-%m-%d";
const DEFAULT_DROPDOWN_PLACEHOLDER: &str = "Select an option...";

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Text {
        text: String,
        style: TextStyle,
    },
    Button {
        button_id: String,
        text: String,
    },
    Slider {
        slider_id: String,
        label: String,
        min: f64,
        max: f64,
        value: f64,
    },
    Dropdown {
        dropdown_id: String,
        label: Option<String>,
        options: Vec<(String, String)>,
        selected: Option<usize>,
        placeholder: String,
    },
    DatePicker {
        date_picker_id: String,
        label: Option<String>,
        format: DateFormat,
        value: Option<String>,
        min: Option<String>,
        max: Option<String>,
    },
    TextInput {
        input_id: String,
        label: Option<String>,
        placeholder: String,
        value: String,
        input_type: InputType,
        masked: bool,
        required: bool,
        max_length: Option<usize>,
    },
}

/// Returns `None` for elements with no visual form.
pub fn render(command: &UiCommand) -> Option<Widget> {
    match command {
        UiCommand::AddText(text) => Some(Widget::Text {
            text: text.text.clone(),
            style: text.style,
        }),
        UiCommand::AddButton(button) => Some(Widget::Button {
            button_id: button.button_id.clone(),
            text: button.text.clone(),
        }),
        UiCommand::AddSlider(slider) => Some(render_slider(slider)),
        UiCommand::AddDropdown(dropdown) => Some(render_dropdown(dropdown)),
        UiCommand::AddDatePicker(picker) => Some(render_date_picker(picker)),
        UiCommand::AddTextInput(input) => Some(render_text_input(input)),
        UiCommand::ClearContainer(_) => None,
        UiCommand::Unknown(unknown) => {
            debug!(
                command = unknown.command.as_deref().unwrap_or("<missing>"),
                "no renderer for element"
            );
            None
        }
    }
}

pub fn render_schema(schema: &Schema) -> Vec<Widget> {
    schema.iter().filter_map(render).collect()
}

fn render_slider(slider: &AddSlider) -> Widget {
    let (min, max) = if slider.min_val <= slider.max_val {
        (slider.min_val, slider.max_val)
    } else {
        (slider.max_val, slider.min_val)
    };

    let value = if slider.default_val.is_nan() {
        min
    } else {
        slider.default_val.clamp(min, max)
    };

    Widget::Slider {
        slider_id: slider.slider_id.clone(),
        label: slider.label.clone(),
        min,
        max,
        value,
    }
}

fn render_dropdown(dropdown: &AddDropdown) -> Widget {
    let selected = dropdown.default_value.as_deref().and_then(|default_value| {
        dropdown
            .options
            .iter()
            .position(|option| option.value == default_value)
    });

    Widget::Dropdown {
        dropdown_id: dropdown.dropdown_id.clone(),
        label: dropdown.label.clone(),
        options: dropdown
            .options
            .iter()
            .map(|option| (option.value.clone(), option.label.clone()))
            .collect(),
        selected,
        placeholder: dropdown
            .placeholder
            .clone()
            .unwrap_or_else(|| DEFAULT_DROPDOWN_PLACEHOLDER.to_string()),
    }
}

fn render_date_picker(picker: &AddDatePicker) -> Widget {
    let format = picker.date_format.unwrap_or_default();
    let id = picker.date_picker_id.as_str();

    let min = parse_iso(id, "min_date", picker.min_date.as_deref());
    let max = parse_iso(id, "max_date", picker.max_date.as_deref());
    let value = parse_iso(id, "default_date", picker.default_date.as_deref())
        .map(|date| clamp_date(date, min, max));

    let display = |date: NaiveDate| date.format(format.pattern()).to_string();

    Widget::DatePicker {
        date_picker_id: picker.date_picker_id.clone(),
        label: picker.label.clone(),
        format,
        value: value.map(display),
        min: min.map(display),
        max: max.map(display),
    }
}

fn render_text_input(input: &AddTextInput) -> Widget {
    let input_type = input.input_type.unwrap_or_default();
    let value = input
        .default_value
        .as_deref()
        .map(|value| truncate_chars(value, input.max_length))
        .unwrap_or_default();

    Widget::TextInput {
        input_id: input.input_id.clone(),
        label: input.label.clone(),
        placeholder: input.placeholder.clone().unwrap_or_default(),
        value,
        input_type,
        masked: input_type == InputType::Password,
        required: input.required,
        max_length: input.max_length,
    }
}

fn parse_iso(id: &str, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;

    match NaiveDate::parse_from_str(raw, ISO_DATE) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(date_picker_id = id, field, value = raw, error = %err, "ignoring unparsable date");
            None
        }
    }
}

fn clamp_date(date: NaiveDate, min: Option<NaiveDate>, max: Option<NaiveDate>) -> NaiveDate {
    let date = min.map_or(date, |min| date.max(min));
    max.map_or(date, |max| date.min(max))
}

fn truncate_chars(value: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max_length) => value.chars().take(max_length).collect(),
        None => value.to_string(),
    }
}

/// A user interaction with a rendered widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    ButtonClicked {
        button_id: String,
    },
    SliderChanged {
        slider_id: String,
        value: f64,
    },
    DropdownSelected {
        dropdown_id: String,
        value: String,
    },
    /// `date` is in the widget's display `format`.
    DateSelected {
        date_picker_id: String,
        date: String,
        format: DateFormat,
    },
    TextSubmitted {
        input_id: String,
        value: String,
        required: bool,
        max_length: Option<usize>,
    },
}

impl WidgetEvent {
    pub fn into_client_event(self) -> Result<ClientEvent, RejectedInput> {
        let event = match self {
            Self::ButtonClicked { button_id } => {
                ClientEvent::ui_event(UiEventKind::ButtonClick, button_id, Map::new())
            }
            Self::SliderChanged { slider_id, value } => ClientEvent::ui_event(
                UiEventKind::SliderChange,
                slider_id,
                value_state(json!(value)),
            ),
            Self::DropdownSelected { dropdown_id, value } => ClientEvent::ui_event(
                UiEventKind::DropdownChange,
                dropdown_id,
                value_state(Value::String(value)),
            ),
            Self::DateSelected {
                date_picker_id,
                date,
                format,
            } => {
                let parsed = NaiveDate::parse_from_str(date.trim(), format.pattern()).map_err(
                    |_| RejectedInput::InvalidDate {
                        value: date.clone(),
                        format: format.label(),
                    },
                )?;

                ClientEvent::ui_event(
                    UiEventKind::DateChange,
                    date_picker_id,
                    value_state(Value::String(parsed.format(ISO_DATE).to_string())),
                )
            }
            Self::TextSubmitted {
                input_id,
                value,
                required,
                max_length,
            } => {
                if required && value.trim().is_empty() {
                    return Err(RejectedInput::MissingRequired { input_id });
                }

                let value = truncate_chars(&value, max_length);
                ClientEvent::ui_event(
                    UiEventKind::InputSubmit,
                    input_id,
                    value_state(Value::String(value)),
                )
            }
        };

        Ok(event)
    }
}

fn value_state(value: Value) -> Map<String, Value> {
    let mut state = Map::new();
    state.insert("value".to_string(), value);
    state
}

use crate::{AppWindow, ChatRow, WidgetRow};
use agentui_runtime::HostBindings;
use agentui_runtime::protocol::DateFormat;
use agentui_runtime::render::{Widget, WidgetEvent};
use agentui_runtime::store::{ChatMessage, ConnectionStatus};
use slint::{ModelRc, SharedString, VecModel};

pub struct AppBindings;

impl HostBindings for AppBindings {
    type Ui = AppWindow;

    fn new_ui() -> Result<Self::Ui, slint::PlatformError> {
        AppWindow::new()
    }

    fn bind_send_message<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(String) + 'static,
    {
        ui.on_send_message(move |content| handler(content.to_string()));
    }

    fn bind_widget_event<F>(ui: &Self::Ui, handler: F)
    where
        F: Fn(WidgetEvent) + Clone + 'static,
    {
        let on_button = handler.clone();
        ui.on_button_clicked(move |button_id| {
            on_button(WidgetEvent::ButtonClicked {
                button_id: button_id.to_string(),
            });
        });

        let on_slider = handler.clone();
        ui.on_slider_changed(move |slider_id, value| {
            on_slider(WidgetEvent::SliderChanged {
                slider_id: slider_id.to_string(),
                value: f64::from(value),
            });
        });

        let on_dropdown = handler.clone();
        ui.on_dropdown_selected(move |dropdown_id, value| {
            on_dropdown(WidgetEvent::DropdownSelected {
                dropdown_id: dropdown_id.to_string(),
                value: value.to_string(),
            });
        });

        let on_date = handler.clone();
        ui.on_date_entered(move |date_picker_id, date, format| {
            on_date(WidgetEvent::DateSelected {
                date_picker_id: date_picker_id.to_string(),
                date: date.to_string(),
                format: DateFormat::from_label(&format).unwrap_or_default(),
            });
        });

        ui.on_input_submitted(move |input_id, value, required, max_length| {
            handler(WidgetEvent::TextSubmitted {
                input_id: input_id.to_string(),
                value: value.to_string(),
                required,
                max_length: usize::try_from(max_length).ok(),
            });
        });
    }

    fn set_connection_status(ui: &Self::Ui, status: ConnectionStatus) {
        ui.set_connection_status(status.as_str().into());
    }

    fn set_chat_history(ui: &Self::Ui, history: &[ChatMessage]) {
        let rows: Vec<ChatRow> = history
            .iter()
            .map(|message| ChatRow {
                role: message.role.as_str().into(),
                content: message.content.as_str().into(),
            })
            .collect();
        ui.set_chat(ModelRc::new(VecModel::from(rows)));
    }

    fn set_widgets(ui: &Self::Ui, widgets: &[Widget]) {
        let rows: Vec<WidgetRow> = widgets.iter().map(widget_row).collect();
        ui.set_widgets(ModelRc::new(VecModel::from(rows)));
    }
}

fn widget_row(widget: &Widget) -> WidgetRow {
    match widget {
        Widget::Text { text, style } => WidgetRow {
            kind: "text".into(),
            text: text.as_str().into(),
            style: style.as_str().into(),
            ..WidgetRow::default()
        },
        Widget::Button { button_id, text } => WidgetRow {
            kind: "button".into(),
            id: button_id.as_str().into(),
            text: text.as_str().into(),
            ..WidgetRow::default()
        },
        Widget::Slider {
            slider_id,
            label,
            min,
            max,
            value,
        } => WidgetRow {
            kind: "slider".into(),
            id: slider_id.as_str().into(),
            label: label.as_str().into(),
            min: *min as f32,
            max: *max as f32,
            value: *value as f32,
            ..WidgetRow::default()
        },
        Widget::Dropdown {
            dropdown_id,
            label,
            options,
            selected,
            placeholder,
        } => WidgetRow {
            kind: "dropdown".into(),
            id: dropdown_id.as_str().into(),
            label: label.as_deref().unwrap_or_default().into(),
            option_values: string_model(options.iter().map(|(value, _)| value.as_str())),
            option_labels: string_model(options.iter().map(|(_, label)| label.as_str())),
            selected: selected
                .and_then(|index| i32::try_from(index).ok())
                .unwrap_or(-1),
            placeholder: placeholder.as_str().into(),
            ..WidgetRow::default()
        },
        Widget::DatePicker {
            date_picker_id,
            label,
            format,
            value,
            min,
            max,
        } => WidgetRow {
            kind: "date-picker".into(),
            id: date_picker_id.as_str().into(),
            label: label.as_deref().unwrap_or_default().into(),
            text: value.as_deref().unwrap_or_default().into(),
            format: format.label().into(),
            hint: date_range_hint(min.as_deref(), max.as_deref()).into(),
            ..WidgetRow::default()
        },
        Widget::TextInput {
            input_id,
            label,
            placeholder,
            value,
            masked,
            required,
            max_length,
            ..
        } => WidgetRow {
            kind: "text-input".into(),
            id: input_id.as_str().into(),
            label: label.as_deref().unwrap_or_default().into(),
            placeholder: placeholder.as_str().into(),
            text: value.as_str().into(),
            masked: *masked,
            required: *required,
            max_length: max_length
                .and_then(|limit| i32::try_from(limit).ok())
                .unwrap_or(-1),
            ..WidgetRow::default()
        },
    }
}

fn string_model<'a>(items: impl Iterator<Item = &'a str>) -> ModelRc<SharedString> {
    let items: Vec<SharedString> = items.map(SharedString::from).collect();
    ModelRc::new(VecModel::from(items))
}

fn date_range_hint(min: Option<&str>, max: Option<&str>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("Between {min} and {max}"),
        (Some(min), None) => format!("On or after {min}"),
        (None, Some(max)) => format!("On or before {max}"),
        (None, None) => String::new(),
    }
}

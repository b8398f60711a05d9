use agentui_runtime::protocol::{self, UiCommand};
use agentui_runtime::reducer::ClearScope;
use agentui_runtime::render::{self, Widget};
use agentui_runtime::store::{Role, SessionStore};
use serde_json::{Value, json};

fn receive(store: &mut SessionStore, packet: Value) {
    let bytes = serde_json::to_vec(&packet).expect("packet serializes");
    let packet = protocol::decode_backend_packet(&bytes).expect("packet decodes");
    store.apply_backend_packet(packet);
}

fn slider_ids(store: &SessionStore) -> Vec<String> {
    store
        .schema()
        .iter()
        .map(|command| match command {
            UiCommand::AddSlider(slider) => slider.slider_id.clone(),
            other => panic!("expected slider, got {other:?}"),
        })
        .collect()
}

#[test]
fn text_then_clear_leaves_empty_schema() {
    let mut store = SessionStore::default();

    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_TEXT", "container_id": "c1", "text": "Hello", "style": "body"}
        ]}),
    );
    assert_eq!(store.schema().len(), 1);
    match render::render_schema(store.schema()).as_slice() {
        [Widget::Text { text, .. }] => assert_eq!(text, "Hello"),
        other => panic!("expected one text widget, got {other:?}"),
    }

    receive(
        &mut store,
        json!({"ui_commands": [{"command": "CLEAR_CONTAINER", "container_id": "c1"}]}),
    );
    assert!(store.schema().is_empty());
}

#[test]
fn sliders_from_separate_packets_accumulate_in_order() {
    let mut store = SessionStore::default();

    for (id, label) in [("budget", "Budget"), ("nights", "Nights")] {
        receive(
            &mut store,
            json!({"ui_commands": [{
                "command": "ADD_SLIDER",
                "container_id": "trip",
                "slider_id": id,
                "label": label,
                "min_val": 0,
                "max_val": 100,
                "default_val": 10
            }]}),
        );
    }

    assert_eq!(slider_ids(&store), vec!["budget", "nights"]);
    assert_eq!(store.revision(), 2);
}

#[test]
fn unknown_tag_is_kept_but_renders_nothing() {
    let mut store = SessionStore::default();

    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_CAROUSEL", "container_id": "c1", "items": []},
            {"command": "ADD_BUTTON", "container_id": "c1", "button_id": "go", "text": "Go"}
        ]}),
    );

    assert_eq!(store.schema().len(), 2);
    match render::render_schema(store.schema()).as_slice() {
        [Widget::Button { button_id, text }] => {
            assert_eq!(button_id, "go");
            assert_eq!(text, "Go");
        }
        other => panic!("expected only the button, got {other:?}"),
    }
}

#[test]
fn clear_listed_after_additions_still_runs_first() {
    let mut store = SessionStore::default();
    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_TEXT", "container_id": "old", "text": "stale"}
        ]}),
    );

    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_TEXT", "container_id": "new", "text": "first"},
            {"command": "CLEAR_CONTAINER", "container_id": "old"},
            {"command": "ADD_TEXT", "container_id": "new", "text": "second"},
            {"command": "CLEAR_CONTAINER", "container_id": "old"}
        ]}),
    );

    let texts: Vec<&str> = store
        .schema()
        .iter()
        .map(|command| match command {
            UiCommand::AddText(text) => text.text.as_str(),
            other => panic!("expected text, got {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn clear_without_container_id_empties_the_schema() {
    let mut store = SessionStore::default();
    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_TEXT", "container_id": "c1", "text": "Hello"}
        ]}),
    );

    receive(&mut store, json!({"ui_commands": [{"command": "CLEAR_CONTAINER"}]}));

    assert!(store.schema().is_empty(), "{:?}", store.schema());
}

#[test]
fn container_scope_only_drops_the_named_container() {
    let mut store = SessionStore::new(ClearScope::Container);
    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_TEXT", "container_id": "left", "text": "keep"},
            {"command": "ADD_TEXT", "container_id": "right", "text": "drop"}
        ]}),
    );

    receive(
        &mut store,
        json!({"ui_commands": [{"command": "CLEAR_CONTAINER", "container_id": "right"}]}),
    );

    assert_eq!(store.schema().len(), 1);
    assert_eq!(store.schema().elements()[0].container_id(), Some("left"));
}

#[test]
fn chat_and_schema_land_in_one_snapshot() {
    let mut store = SessionStore::default();
    let before = store.snapshot();

    receive(
        &mut store,
        json!({
            "chat_message": "hi",
            "ui_commands": [
                {"command": "ADD_BUTTON", "container_id": "c1", "button_id": "x", "text": "X"}
            ]
        }),
    );
    let after = store.snapshot();

    assert!(before.chat_history.is_empty() && before.schema.is_empty());
    assert_eq!(after.revision, before.revision + 1);
    assert_eq!(after.chat_history.last().map(|m| m.role), Some(Role::Assistant));
    assert_eq!(after.chat_history.last().map(|m| m.content.as_str()), Some("hi"));
    assert_eq!(after.schema.len(), 1);
}

#[test]
fn chat_only_packet_leaves_schema_alone() {
    let mut store = SessionStore::default();
    receive(
        &mut store,
        json!({"ui_commands": [
            {"command": "ADD_BUTTON", "container_id": "c1", "button_id": "x", "text": "X"}
        ]}),
    );
    receive(&mut store, json!({"chat_message": "still here", "ui_commands": []}));

    assert_eq!(store.schema().len(), 1);
    assert_eq!(store.chat_history().len(), 1);
}

#[test]
fn malformed_payload_never_reaches_the_store() {
    let store = SessionStore::default();
    let err = protocol::decode_backend_packet(br#"{"chat_message": "no commands"}"#)
        .expect_err("ui_commands is required");

    assert!(err.to_string().contains("ui_commands"), "{err}");
    assert_eq!(store.revision(), 0);
}

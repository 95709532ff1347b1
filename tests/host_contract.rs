use serde_json::json;
use updraft::host::contract::{
    ContractErrorKind, EventEnvelope, GatewayResponse, HostMessage, Operation, PROTOCOL_VERSION,
    RequestEnvelope, ResponseEnvelope,
};
use updraft::update::{MenuAction, MenuItemState, UpdateNotification, UserDialog};

#[test]
fn operation_parse_known_and_unknown() {
    assert_eq!(Operation::parse("check"), Some(Operation::Check));
    assert_eq!(Operation::parse("download"), Some(Operation::Download));
    assert_eq!(Operation::parse("install"), Some(Operation::Install));
    assert_eq!(Operation::parse("open-release"), Some(Operation::OpenRelease));

    assert!(Operation::parse("open_release").is_none());
    assert!(Operation::parse("Check").is_none());
    assert!(Operation::parse("quit").is_none());

    for op in Operation::ALL {
        assert_eq!(Operation::parse(op.as_str()), Some(op));
        assert_eq!(op.to_string(), op.as_str());
    }
}

#[test]
fn request_envelope_validation() {
    let valid = RequestEnvelope::new("req-1", "check");
    assert_eq!(valid.v, PROTOCOL_VERSION);
    assert!(valid.validate().is_ok());

    let mut wrong_version = valid.clone();
    wrong_version.v = 99;
    let err = wrong_version.validate().err();
    assert!(matches!(
        err.map(|e| e.kind),
        Some(ContractErrorKind::UnsupportedVersion)
    ));

    let empty_id = RequestEnvelope::new("  ", "check");
    let err = empty_id.validate().err();
    assert!(matches!(
        err.map(|e| e.kind),
        Some(ContractErrorKind::InvalidEnvelope)
    ));

    // Unknown operations are the gateway's business, not the envelope's.
    assert!(RequestEnvelope::new("req-2", "format-disk").validate().is_ok());
}

#[test]
fn request_envelope_wire_shape() {
    let parsed: Result<RequestEnvelope, _> = serde_json::from_value(json!({
        "v": 1,
        "request_id": "abc",
        "operation": "open-release"
    }));
    match parsed {
        Ok(envelope) => {
            assert_eq!(envelope.request_id, "abc");
            assert_eq!(envelope.operation, "open-release");
        }
        Err(e) => panic!("request envelope should parse: {e}"),
    }
}

#[test]
fn response_envelope_flattens_gateway_response() {
    let ok = ResponseEnvelope::new("r1", GatewayResponse::ok(Some(json!("1.2.0"))));
    let value = serde_json::to_value(&ok).unwrap_or_default();
    assert_eq!(value["v"], 1);
    assert_eq!(value["request_id"], "r1");
    assert_eq!(value["success"], true);
    assert_eq!(value["value"], "1.2.0");
    assert!(value.get("error").is_none());

    let failed = ResponseEnvelope::error("r2", "invalid channel: quit");
    let value = serde_json::to_value(&failed).unwrap_or_default();
    assert_eq!(value["success"], false);
    assert_eq!(value["error"], "invalid channel: quit");
    assert!(value.get("value").is_none());
}

#[test]
fn event_envelope_from_notification() {
    let notification = UpdateNotification::Downloaded {
        version: "1.2.0".into(),
    };
    let envelope = EventEnvelope::from(&notification);
    assert_eq!(envelope.v, PROTOCOL_VERSION);
    assert_eq!(envelope.event, "update:downloaded");
    assert_eq!(envelope.payload, json!({"version": "1.2.0"}));
    assert!(!envelope.event_id.is_empty());

    let other = EventEnvelope::from(&notification);
    assert_ne!(envelope.event_id, other.event_id);
}

#[test]
fn host_message_type_tags() {
    let menu = HostMessage::Menu(MenuItemState::enabled(
        "Check for Updates...",
        MenuAction::CheckForUpdates,
    ));
    let value = serde_json::to_value(&menu).unwrap_or_default();
    assert_eq!(value["type"], "menu");
    assert_eq!(value["label"], "Check for Updates...");
    assert_eq!(value["action"], "check_for_updates");

    let dialog = HostMessage::Dialog(UserDialog::up_to_date("1.0.0"));
    let value = serde_json::to_value(&dialog).unwrap_or_default();
    assert_eq!(value["type"], "dialog");
    assert_eq!(value["kind"], "info");

    let notification = HostMessage::Notification(EventEnvelope::from(
        &UpdateNotification::Error {
            message: "boom".into(),
        },
    ));
    let value = serde_json::to_value(&notification).unwrap_or_default();
    assert_eq!(value["type"], "notification");
    assert_eq!(value["payload"]["message"], "boom");
}

#[test]
fn only_fixed_notification_names_are_forwardable() {
    for name in [
        "update:available",
        "update:download-progress",
        "update:downloaded",
        "update:error",
    ] {
        let message = HostMessage::Notification(EventEnvelope::new("e", name, json!({})));
        assert!(message.is_forwardable(), "{name} should be forwardable");
    }
    for name in ["update:checking", "update:not-available", "menu:update", ""] {
        let message = HostMessage::Notification(EventEnvelope::new("e", name, json!({})));
        assert!(!message.is_forwardable(), "{name} should be dropped");
    }
    let response = HostMessage::Response(ResponseEnvelope::error("r", "x"));
    assert!(response.is_forwardable());
}

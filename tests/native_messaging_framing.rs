use integritywatch::native_messaging::framing;
use integritywatch::native_messaging::ExtensionMessage;

#[tokio::test]
async fn a_length_prefixed_frame_round_trips_through_the_wire_codec() {
    let payload = serde_json::json!({"type": "EXTENSION_READY"});
    let bytes = serde_json::to_vec(&payload).unwrap();

    let mut buffer = Vec::new();
    framing::write_message(&mut buffer, &bytes).await.unwrap();

    let mut reader: &[u8] = buffer.as_slice();
    let frame = framing::read_message(&mut reader).await.unwrap().expect("a frame");
    let message: ExtensionMessage = serde_json::from_slice(&frame).unwrap();
    assert!(matches!(message, ExtensionMessage::ExtensionReady));
}

#[test]
fn unrecognized_discriminators_deserialize_to_unknown_instead_of_failing() {
    let json = r#"{"type": "SOME_FUTURE_MESSAGE", "payload": 1}"#;
    let message: ExtensionMessage = serde_json::from_str(json).unwrap();
    assert!(matches!(message, ExtensionMessage::Unknown));
}

#[test]
fn violation_messages_carry_through_their_type_and_details() {
    let json = r#"{"type":"VIOLATION","violationType":"MALICIOUS_EXTENSION_DETECTED","timestamp":1700000000000,"details":{"extensionName":"Evil"}}"#;
    let message: ExtensionMessage = serde_json::from_str(json).unwrap();
    match message {
        ExtensionMessage::Violation { violation_type, timestamp, details } => {
            assert_eq!(violation_type, "MALICIOUS_EXTENSION_DETECTED");
            assert_eq!(timestamp, 1_700_000_000_000);
            assert_eq!(details.get("extensionName").and_then(|v| v.as_str()), Some("Evil"));
        }
        other => panic!("expected Violation, got {:?}", other),
    }
}

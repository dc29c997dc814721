use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hearth::audio::codec::encode_frame;
use hearth::live::protocol::{realtime_input_message, setup_message, ServerMessage};
use hearth::session::event::{Speaker, StreamEvent};

#[test]
fn test_setup_message_shape() {
    let setup = setup_message("live-model", "Puck", "Be helpful.");
    let json = serde_json::to_value(&setup).unwrap();

    assert_eq!(json["setup"]["model"], "models/live-model");
    assert_eq!(
        json["setup"]["generationConfig"]["responseModalities"][0],
        "AUDIO"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
            ["voiceName"],
        "Puck"
    );
    assert_eq!(
        json["setup"]["systemInstruction"]["parts"][0]["text"],
        "Be helpful."
    );
    // Presence of the empty transcription objects switches transcription on
    // for both directions.
    assert!(json["setup"]["inputAudioTranscription"].is_object());
    assert!(json["setup"]["outputAudioTranscription"].is_object());
}

#[test]
fn test_realtime_input_wraps_frame_as_base64() {
    let frame = encode_frame(&[0.0, 0.5, -0.5]);
    let msg = realtime_input_message(&frame);
    let json = serde_json::to_value(&msg).unwrap();

    let chunk = &json["realtimeInput"]["mediaChunks"][0];
    assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
    let decoded = BASE64
        .decode(chunk["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, frame.data);
}

#[test]
fn test_server_content_expands_in_protocol_order() {
    // Transcript fragments, then the turn boundary, then audio.
    let raw = format!(
        r#"{{
            "serverContent": {{
                "inputTranscription": {{"text": "Hi"}},
                "outputTranscription": {{"text": "Hello"}},
                "turnComplete": true,
                "modelTurn": {{"parts": [{{"inlineData": {{"mimeType": "audio/pcm;rate=24000", "data": "{}"}}}}]}}
            }}
        }}"#,
        BASE64.encode([0u8, 64])
    );
    let msg: ServerMessage = serde_json::from_str(&raw).unwrap();
    let events = msg.into_events();

    assert_eq!(events.len(), 4);
    assert!(matches!(
        &events[0],
        StreamEvent::PartialTranscript { speaker: Speaker::Guest, text } if text == "Hi"
    ));
    assert!(matches!(
        &events[1],
        StreamEvent::PartialTranscript { speaker: Speaker::Concierge, text } if text == "Hello"
    ));
    assert!(matches!(&events[2], StreamEvent::TurnComplete));
    assert!(matches!(
        &events[3],
        StreamEvent::AudioChunk { mime_type, .. } if mime_type == "audio/pcm;rate=24000"
    ));
}

#[test]
fn test_audio_only_message() {
    let raw = format!(
        r#"{{"serverContent": {{"modelTurn": {{"parts": [{{"inlineData": {{"mimeType": "audio/pcm;rate=24000", "data": "{}"}}}}]}}}}}}"#,
        BASE64.encode([1u8, 2, 3, 4])
    );
    let msg: ServerMessage = serde_json::from_str(&raw).unwrap();
    let events = msg.into_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::AudioChunk { .. }));
}

#[test]
fn test_unrelated_server_message_yields_no_events() {
    let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
    assert!(msg.setup_complete.is_some());
    assert!(msg.into_events().is_empty());
}

#[test]
fn test_unknown_fields_are_tolerated() {
    let raw = r#"{"serverContent": {"turnComplete": true, "groundingMetadata": {"x": 1}}, "usageMetadata": {}}"#;
    let msg: ServerMessage = serde_json::from_str(raw).unwrap();
    let events = msg.into_events();
    assert!(matches!(&events[..], [StreamEvent::TurnComplete]));
}

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hearth::session::controller::{Action, SessionController, SessionEvent, SessionState};
use hearth::session::event::{Speaker, StreamEvent};

/// Drive a controller to Active the way the driver would.
fn active_controller() -> SessionController {
    let mut ctl = SessionController::new();
    let actions = ctl.handle(SessionEvent::StartRequested);
    assert!(matches!(actions[..], [Action::PrepareAudio]));
    let actions = ctl.handle(SessionEvent::AudioReady);
    assert!(matches!(actions[..], [Action::OpenTransport]));
    let actions = ctl.handle(SessionEvent::TransportOpened);
    assert!(matches!(actions[..], [Action::BeginStreaming]));
    assert_eq!(ctl.state(), SessionState::Active);
    ctl
}

fn audio_chunk(bytes: &[u8]) -> StreamEvent {
    StreamEvent::AudioChunk {
        payload: BASE64.encode(bytes),
        mime_type: "audio/pcm;rate=24000".to_string(),
    }
}

#[test]
fn test_start_begins_with_audio_acquisition() {
    let mut ctl = SessionController::new();
    assert_eq!(ctl.state(), SessionState::Idle);
    let actions = ctl.handle(SessionEvent::StartRequested);
    assert!(matches!(actions[..], [Action::PrepareAudio]));
    assert_eq!(ctl.state(), SessionState::Connecting);
}

#[test]
fn test_start_ignored_while_active() {
    let mut ctl = active_controller();
    assert!(ctl.handle(SessionEvent::StartRequested).is_empty());
    assert_eq!(ctl.state(), SessionState::Active);
}

#[test]
fn test_capture_denied_never_opens_transport() {
    // Denied microphone: Idle -> Connecting -> (teardown) -> Idle, with the
    // error surfaced and no transport open attempted.
    let mut ctl = SessionController::new();
    ctl.handle(SessionEvent::StartRequested);

    let actions = ctl.handle(SessionEvent::AudioFailed("microphone denied".to_string()));
    assert!(matches!(actions[..], [Action::Teardown]));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, Action::OpenTransport)));

    assert!(ctl.handle(SessionEvent::TornDown).is_empty());
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.last_error(), Some("microphone denied"));
}

#[test]
fn test_transport_failure_tears_down() {
    let mut ctl = SessionController::new();
    ctl.handle(SessionEvent::StartRequested);
    ctl.handle(SessionEvent::AudioReady);

    let actions = ctl.handle(SessionEvent::TransportFailed("refused".to_string()));
    assert!(matches!(actions[..], [Action::Teardown]));
    assert_eq!(ctl.state(), SessionState::Error);

    ctl.handle(SessionEvent::TornDown);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.last_error(), Some("refused"));
}

#[test]
fn test_stop_twice_never_panics_and_ends_idle() {
    let mut ctl = active_controller();

    let actions = ctl.handle(SessionEvent::StopRequested);
    assert!(actions.iter().any(|a| matches!(a, Action::Teardown)));
    assert_eq!(ctl.state(), SessionState::Idle);
    // Clean stop: no error indicator.
    assert_eq!(ctl.last_error(), None);

    // Second stop is a no-op.
    assert!(ctl.handle(SessionEvent::StopRequested).is_empty());
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn test_stop_before_audio_resolves_aborts_on_resolution() {
    // Stop lands while acquisition is in flight: mark intent, then release
    // immediately when the acquisition resolves instead of advancing.
    let mut ctl = SessionController::new();
    ctl.handle(SessionEvent::StartRequested);

    assert!(ctl.handle(SessionEvent::StopRequested).is_empty());
    assert_eq!(ctl.state(), SessionState::Connecting);

    let actions = ctl.handle(SessionEvent::AudioReady);
    assert!(matches!(actions[..], [Action::Teardown]));
    assert!(!actions.iter().any(|a| matches!(a, Action::OpenTransport)));
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn test_stop_before_open_resolves_aborts_on_resolution() {
    let mut ctl = SessionController::new();
    ctl.handle(SessionEvent::StartRequested);
    ctl.handle(SessionEvent::AudioReady);

    ctl.handle(SessionEvent::StopRequested);
    let actions = ctl.handle(SessionEvent::TransportOpened);
    assert!(matches!(actions[..], [Action::Teardown]));
    assert!(!actions.iter().any(|a| matches!(a, Action::BeginStreaming)));
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn test_malformed_chunk_skipped_session_continues() {
    let mut ctl = active_controller();

    // Malformed base64: dropped, no panic, still Active.
    let actions = ctl.handle(SessionEvent::Stream(StreamEvent::AudioChunk {
        payload: "!!!not base64!!!".to_string(),
        mime_type: "audio/pcm;rate=24000".to_string(),
    }));
    assert!(actions.is_empty());
    assert_eq!(ctl.state(), SessionState::Active);

    // Unaligned payload likewise.
    let actions = ctl.handle(SessionEvent::Stream(audio_chunk(&[1u8, 2, 3])));
    assert!(actions.is_empty());

    // The next well-formed chunk still schedules.
    let actions = ctl.handle(SessionEvent::Stream(audio_chunk(&[0u8, 64, 0, 64])));
    match &actions[..] {
        [Action::Play(buffer)] => {
            assert_eq!(buffer.samples.len(), 2);
            assert_eq!(buffer.sample_rate, 24_000);
        }
        other => panic!("expected one Play action, got {:?}", other),
    }
}

#[test]
fn test_turn_complete_publishes_finalized_pair() {
    let mut ctl = active_controller();
    ctl.handle(SessionEvent::Stream(StreamEvent::PartialTranscript {
        speaker: Speaker::Guest,
        text: "Hi ".to_string(),
    }));
    ctl.handle(SessionEvent::Stream(StreamEvent::PartialTranscript {
        speaker: Speaker::Guest,
        text: "there".to_string(),
    }));
    ctl.handle(SessionEvent::Stream(StreamEvent::PartialTranscript {
        speaker: Speaker::Concierge,
        text: "Hello!".to_string(),
    }));

    let actions = ctl.handle(SessionEvent::Stream(StreamEvent::TurnComplete));
    match &actions[..] {
        [Action::Publish(guest), Action::Publish(concierge)] => {
            assert_eq!(guest.speaker, Speaker::Guest);
            assert_eq!(guest.text, "Hi there");
            assert_eq!(concierge.speaker, Speaker::Concierge);
            assert_eq!(concierge.text, "Hello!");
        }
        other => panic!("expected two Publish actions, got {:?}", other),
    }

    // Buffers are empty again: the next turn boundary emits nothing.
    assert!(ctl
        .handle(SessionEvent::Stream(StreamEvent::TurnComplete))
        .is_empty());
}

#[test]
fn test_session_error_event_is_fatal_and_flushes_transcript() {
    let mut ctl = active_controller();
    ctl.handle(SessionEvent::Stream(StreamEvent::PartialTranscript {
        speaker: Speaker::Concierge,
        text: "as I was say".to_string(),
    }));

    let actions = ctl.handle(SessionEvent::Stream(StreamEvent::SessionError {
        message: "connection reset".to_string(),
    }));
    assert!(matches!(
        actions[..],
        [Action::Publish(_), Action::Teardown]
    ));
    assert_eq!(ctl.state(), SessionState::Error);

    ctl.handle(SessionEvent::TornDown);
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.last_error(), Some("connection reset"));
}

#[test]
fn test_remote_close_is_clean_hangup() {
    let mut ctl = active_controller();
    let actions = ctl.handle(SessionEvent::Stream(StreamEvent::SessionClosed));
    assert!(matches!(actions[..], [Action::Teardown]));
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(ctl.last_error(), None);
}

#[test]
fn test_late_events_after_teardown_are_ignored() {
    let mut ctl = active_controller();
    ctl.handle(SessionEvent::StopRequested);

    // Events already queued when the session ended must not disturb Idle.
    assert!(ctl
        .handle(SessionEvent::Stream(audio_chunk(&[0u8, 64])))
        .is_empty());
    assert!(ctl
        .handle(SessionEvent::Stream(StreamEvent::TurnComplete))
        .is_empty());
    assert_eq!(ctl.state(), SessionState::Idle);
}

#[test]
fn test_restart_after_failure_clears_error() {
    let mut ctl = SessionController::new();
    ctl.handle(SessionEvent::StartRequested);
    ctl.handle(SessionEvent::AudioFailed("denied".to_string()));
    ctl.handle(SessionEvent::TornDown);
    assert_eq!(ctl.last_error(), Some("denied"));

    let actions = ctl.handle(SessionEvent::StartRequested);
    assert!(matches!(actions[..], [Action::PrepareAudio]));
    assert_eq!(ctl.state(), SessionState::Connecting);
    assert_eq!(ctl.last_error(), None);
}

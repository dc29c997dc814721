use hearth::session::event::Speaker;
use hearth::session::transcript::TranscriptAggregator;

#[test]
fn test_turn_finalizes_guest_then_concierge() {
    // "Hi " + "there" from the guest, "Hello!" from the model, one turn:
    // exactly two messages, guest first, fragments concatenated in order.
    let mut agg = TranscriptAggregator::new();
    agg.append(Speaker::Guest, "Hi ");
    agg.append(Speaker::Guest, "there");
    agg.append(Speaker::Concierge, "Hello!");

    let messages = agg.complete_turn();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].speaker, Speaker::Guest);
    assert_eq!(messages[0].text, "Hi there");
    assert_eq!(messages[1].speaker, Speaker::Concierge);
    assert_eq!(messages[1].text, "Hello!");
}

#[test]
fn test_empty_turn_emits_nothing() {
    let mut agg = TranscriptAggregator::new();
    assert!(agg.complete_turn().is_empty());
}

#[test]
fn test_one_sided_turn() {
    let mut agg = TranscriptAggregator::new();
    agg.append(Speaker::Concierge, "Anything else?");
    let messages = agg.complete_turn();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].speaker, Speaker::Concierge);
}

#[test]
fn test_buffers_reset_after_every_turn() {
    let mut agg = TranscriptAggregator::new();
    agg.append(Speaker::Guest, "first turn");
    agg.complete_turn();
    assert!(agg.is_empty());

    // The second turn must not carry anything over.
    agg.append(Speaker::Guest, "second");
    let messages = agg.complete_turn();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "second");
    assert!(agg.is_empty());
}

#[test]
fn test_no_deduplication_or_trimming() {
    let mut agg = TranscriptAggregator::new();
    agg.append(Speaker::Guest, "echo ");
    agg.append(Speaker::Guest, "echo ");
    let messages = agg.complete_turn();
    assert_eq!(messages[0].text, "echo echo ");
}

#[test]
fn test_runaway_turn_is_capped_keeping_newest_text() {
    // A turn the remote never closes cannot grow without bound; the oldest
    // text is shed and the tail survives.
    let mut agg = TranscriptAggregator::new();
    for _ in 0..2_000 {
        agg.append(Speaker::Guest, "0123456789");
    }
    agg.append(Speaker::Guest, "THE END");

    let messages = agg.complete_turn();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.len() <= 16 * 1024);
    assert!(messages[0].text.ends_with("THE END"));
}

#[test]
fn test_flush_surfaces_mid_turn_speech() {
    let mut agg = TranscriptAggregator::new();
    agg.append(Speaker::Guest, "cut off mid-");
    let messages = agg.flush();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "cut off mid-");
    assert!(agg.is_empty());
}

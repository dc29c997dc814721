use hearth::audio::playback::PlaybackScheduler;

#[test]
fn test_burst_schedules_back_to_back() {
    // Three 0.5s chunks (12000 frames at 24kHz) arriving faster than real
    // time: starts must be 0.0 / 0.5 / 1.0 relative to first arrival.
    let mut sched = PlaybackScheduler::new();
    let s1 = sched.schedule(vec![0.0; 12_000]);
    let s2 = sched.schedule(vec![0.0; 12_000]);
    let s3 = sched.schedule(vec![0.0; 12_000]);
    assert_eq!((s1, s2, s3), (0, 12_000, 24_000));
    assert_eq!(sched.active_sources(), 3);
}

#[test]
fn test_start_times_monotone_no_gap_no_overlap() {
    let mut sched = PlaybackScheduler::new();
    let lengths = [4_800u64, 1_200, 9_600, 2_400, 7_200];
    let mut prev_start = 0;
    let mut prev_len = 0;
    for (i, &len) in lengths.iter().enumerate() {
        let start = sched.schedule(vec![0.0; len as usize]);
        if i > 0 {
            // No overlap: each start is at least the previous end.
            assert!(start >= prev_start + prev_len);
            // No gap when delivered without delay (clock never caught up).
            assert_eq!(start, prev_start + prev_len);
        }
        prev_start = start;
        prev_len = len;
    }
}

#[test]
fn test_clock_ahead_schedules_at_clock() {
    // If the timeline clock has passed the cursor (silence between turns),
    // the next chunk starts now, not in the past.
    let mut sched = PlaybackScheduler::new();
    sched.schedule(vec![0.0; 100]);

    let mut sink = vec![0.0f32; 500];
    sched.mix_into(&mut sink);
    assert_eq!(sched.clock(), 500);

    let start = sched.schedule(vec![0.0; 100]);
    assert_eq!(start, 500);
}

#[test]
fn test_sources_self_remove_when_rendered_past_end() {
    let mut sched = PlaybackScheduler::new();
    sched.schedule(vec![1.0; 100]);
    assert_eq!(sched.active_sources(), 1);

    let mut sink = vec![0.0f32; 64];
    sched.mix_into(&mut sink);
    // Partially rendered: still active.
    assert_eq!(sched.active_sources(), 1);
    assert!(sink.iter().all(|&s| (s - 1.0).abs() < 1e-6));

    sched.mix_into(&mut sink);
    // End passed: removed without any external polling.
    assert_eq!(sched.active_sources(), 0);
    // Frames 64..100 are ones, the rest silence.
    assert!(sink[..36].iter().all(|&s| (s - 1.0).abs() < 1e-6));
    assert!(sink[36..].iter().all(|&s| s.abs() < 1e-6));
}

#[test]
fn test_chunk_renders_at_scheduled_offset() {
    let mut sched = PlaybackScheduler::new();
    sched.schedule(vec![0.25; 10]);
    sched.schedule(vec![0.75; 10]);

    let mut sink = vec![0.0f32; 30];
    sched.mix_into(&mut sink);
    assert!(sink[..10].iter().all(|&s| (s - 0.25).abs() < 1e-6));
    assert!(sink[10..20].iter().all(|&s| (s - 0.75).abs() < 1e-6));
    assert!(sink[20..].iter().all(|&s| s.abs() < 1e-6));
}

#[test]
fn test_forced_stop_clears_set_and_resets_cursor() {
    let mut sched = PlaybackScheduler::new();
    sched.schedule(vec![0.5; 10_000]);
    sched.schedule(vec![0.5; 10_000]);

    let mut sink = vec![0.0f32; 1_000];
    sched.mix_into(&mut sink);

    sched.stop_all();
    assert_eq!(sched.active_sources(), 0);

    // Nothing left to render.
    sched.mix_into(&mut sink);
    assert!(sink.iter().all(|&s| s.abs() < 1e-6));

    // A new session schedules cleanly from the current clock, not from the
    // stale cursor of the torn-down burst.
    let start = sched.schedule(vec![0.5; 100]);
    assert_eq!(start, sched.clock());
}

#[test]
fn test_stop_all_idempotent() {
    let mut sched = PlaybackScheduler::new();
    sched.schedule(vec![0.0; 100]);
    sched.stop_all();
    sched.stop_all();
    assert_eq!(sched.active_sources(), 0);
}

//! End-to-end render tests
//!
//! Exercise the full path from job submission through planning, blending,
//! loudness normalization and WAV encoding, using synthetic in-memory
//! audio.

use std::collections::HashMap;
use std::sync::Arc;

use mixdown_common::config::EngineConfig;
use mixdown_common::{JobStatus, MixdownEvent, SectionLabel, StructureSection, TrackAnalysis};
use uuid::Uuid;

use mixdown_engine::audio::buffer::CHANNELS;
use mixdown_engine::audio::{AudioBuffer, TARGET_SAMPLE_RATE};
use mixdown_engine::error::Error;
use mixdown_engine::job::{spawn_render, JobRequest};
use mixdown_engine::render::stems::{Stem, StemSet, StemStatus, StemTransitionStyle, StemType};
use mixdown_engine::render::{MixMode, RenderEngine, TrackAudio};

/// Stereo sine at the given frequency and amplitude
fn tone(frequency: f64, amplitude: f32, seconds: f64) -> AudioBuffer {
    let frames = (seconds * TARGET_SAMPLE_RATE as f64) as usize;
    let mut samples = Vec::with_capacity(frames * CHANNELS);
    for i in 0..frames {
        let t = i as f64 / TARGET_SAMPLE_RATE as f64;
        let v = amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32;
        samples.push(v);
        samples.push(v);
    }
    AudioBuffer::new(samples, TARGET_SAMPLE_RATE)
}

fn analysis(id: Uuid, bpm: f64, duration: f64) -> TrackAnalysis {
    let interval = 60.0 / bpm;
    let beats = (duration / interval) as usize;
    TrackAnalysis {
        track_id: id,
        bpm: Some(bpm),
        camelot_key: None,
        beat_grid: (0..beats).map(|i| i as f64 * interval).collect(),
        structure: vec![
            StructureSection {
                label: SectionLabel::Intro,
                start: 0.0,
                end: duration * 0.2,
                confidence: 0.9,
            },
            StructureSection {
                label: SectionLabel::Verse,
                start: duration * 0.2,
                end: duration,
                confidence: 0.9,
            },
        ],
        duration_seconds: duration,
        waveform_envelope: Vec::new(),
        drop_moments: Vec::new(),
    }
}

fn request(track_ids: Vec<Uuid>) -> JobRequest {
    JobRequest {
        mashup_id: Uuid::new_v4(),
        track_ids,
        target_duration_seconds: None,
        mix_mode: MixMode::Standard,
        transition_style: None,
        event_type: None,
        overlap_seconds: Some(2.0),
        crossfade_curve: None,
        beat_align: None,
        beat_align_mode: None,
        target_lufs: None,
        pitch_shift_semitones: None,
        target_bpm: None,
    }
}

fn full_stems(amplitude: f32, seconds: f64) -> StemSet {
    let mut set = StemSet::default();
    for (i, kind) in StemType::ALL.into_iter().enumerate() {
        set.insert(
            kind,
            Stem::completed(tone(110.0 * (i + 1) as f64, amplitude, seconds)),
        );
    }
    set
}

#[tokio::test]
async fn full_mix_job_completes_with_wav_output() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let analyses: HashMap<_, _> = [
        (a, analysis(a, 128.0, 20.0)),
        (b, analysis(b, 126.0, 20.0)),
    ]
    .into();

    let handle = spawn_render(
        Arc::new(RenderEngine::new()),
        request(vec![a, b]),
        EngineConfig::default(),
        analyses,
        vec![
            TrackAudio::Full(tone(220.0, 0.4, 20.0)),
            TrackAudio::Full(tone(330.0, 0.4, 20.0)),
        ],
    );

    let output = handle.wait().await.unwrap();
    assert_eq!(output.mime_type, "audio/wav");
    // RIFF header
    assert_eq!(&output.bytes[0..4], b"RIFF");
    assert_eq!(output.metrics.transitions_applied, 1);
    assert!(output.metrics.output_size_bytes > 44);
}

#[tokio::test]
async fn zero_overlap_style_concatenates() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let analyses: HashMap<_, _> = [
        (a, analysis(a, 120.0, 10.0)),
        (b, analysis(b, 120.0, 10.0)),
    ]
    .into();

    // Cut style with the minimum overlap approximates concatenation:
    // total length ~ sum of windows minus the half-second blend
    let mut req = request(vec![a, b]);
    req.overlap_seconds = Some(0.5);
    req.beat_align = Some(false);
    let handle = spawn_render(
        Arc::new(RenderEngine::new()),
        req,
        EngineConfig::default(),
        analyses,
        vec![
            TrackAudio::Full(tone(220.0, 0.4, 10.0)),
            TrackAudio::Full(tone(330.0, 0.4, 10.0)),
        ],
    );
    let output = handle.wait().await.unwrap();

    // 32-bit float stereo WAV: 8 bytes per frame plus headers.
    // 10s + 10s - 0.5s overlap = 19.5s of audio.
    let expected_frames = (19.5 * TARGET_SAMPLE_RATE as f64) as usize;
    let data_bytes = expected_frames * CHANNELS * 4;
    assert!(output.metrics.output_size_bytes >= data_bytes);
    assert!(output.metrics.output_size_bytes < data_bytes + 1024);
}

#[tokio::test]
async fn per_stem_job_with_failed_stem_still_completes() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let analyses: HashMap<_, _> = [
        (a, analysis(a, 128.0, 12.0)),
        (b, analysis(b, 128.0, 12.0)),
    ]
    .into();

    let mut stems_b = full_stems(0.2, 12.0);
    stems_b.insert(
        StemType::Bass,
        Stem {
            audio: None,
            status: StemStatus::Failed,
            volume: 1.0,
            enabled: true,
        },
    );

    let mut req = request(vec![a, b]);
    req.mix_mode = MixMode::PerStem {
        style: StemTransitionStyle::DrumSwap,
    };
    let handle = spawn_render(
        Arc::new(RenderEngine::new()),
        req,
        EngineConfig::default(),
        analyses,
        vec![
            TrackAudio::Stems(full_stems(0.2, 12.0)),
            TrackAudio::Stems(stems_b),
        ],
    );

    let output = handle.wait().await.unwrap();
    // 4 usable stems on track a, 3 on track b
    assert_eq!(output.metrics.stems_processed, 7);
    assert!(output.metrics.output_size_bytes > 0);
}

#[tokio::test]
async fn cancelled_job_ends_cancelled_not_failed() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let analyses: HashMap<_, _> = [
        (a, analysis(a, 128.0, 30.0)),
        (b, analysis(b, 128.0, 30.0)),
    ]
    .into();

    let engine = Arc::new(RenderEngine::new());
    let handle = spawn_render(
        engine,
        request(vec![a, b]),
        EngineConfig::default(),
        analyses,
        vec![
            TrackAudio::Full(tone(220.0, 0.4, 30.0)),
            TrackAudio::Full(tone(330.0, 0.4, 30.0)),
        ],
    );

    // Cancel immediately; the job observes it at its next checkpoint
    handle.cancel();
    let result = handle.wait().await;
    match result {
        Err(Error::Cancelled) => {}
        Ok(_) => {
            // The render may already have passed its last checkpoint;
            // completion is legal, silent data loss is not
        }
        Err(other) => panic!("expected Cancelled, got {other}"),
    }
}

#[tokio::test]
async fn invalid_job_fails_before_rendering() {
    let known = Uuid::new_v4();
    let analyses: HashMap<_, _> = [(known, analysis(known, 128.0, 10.0))].into();

    let mut req = request(vec![known]);
    req.pitch_shift_semitones = Some(3.0);

    let handle = spawn_render(
        Arc::new(RenderEngine::new()),
        req,
        EngineConfig::default(),
        analyses,
        vec![TrackAudio::Full(tone(220.0, 0.4, 10.0))],
    );

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("not supported"));
}

#[tokio::test]
async fn job_status_moves_forward_through_the_state_machine() {
    let a = Uuid::new_v4();
    let analyses: HashMap<_, _> = [(a, analysis(a, 120.0, 5.0))].into();

    let mut handle = spawn_render(
        Arc::new(RenderEngine::new()),
        request(vec![a]),
        EngineConfig::default(),
        analyses,
        vec![TrackAudio::Full(tone(220.0, 0.4, 5.0))],
    );

    // Statuses may be observed coalesced, but never out of order:
    // queued, then rendering, then exactly one terminal state
    let rank = |s: JobStatus| match s {
        JobStatus::Queued => 0,
        JobStatus::Rendering => 1,
        _ => 2,
    };
    let mut last = handle.status();
    while !last.is_terminal() {
        let next = handle.status_changed().await;
        assert!(rank(next) >= rank(last), "{last:?} -> {next:?}");
        last = next;
    }
    assert_eq!(last, JobStatus::Completed);
    handle.wait().await.unwrap();
}

#[tokio::test]
async fn failed_job_emits_render_failed_event() {
    let known = Uuid::new_v4();
    let analyses: HashMap<_, _> = [(known, analysis(known, 128.0, 10.0))].into();

    let engine = Arc::new(RenderEngine::new());
    let mut events = engine.subscribe();

    let mut req = request(vec![known]);
    req.target_bpm = Some(140.0);
    let mashup_id = req.mashup_id;

    let handle = spawn_render(
        engine,
        req,
        EngineConfig::default(),
        analyses,
        vec![TrackAudio::Full(tone(220.0, 0.4, 10.0))],
    );
    handle.wait().await.unwrap_err();

    let mut failure_reason = None;
    while let Ok(event) = events.try_recv() {
        if let MixdownEvent::RenderFailed {
            mashup_id: id,
            reason,
            ..
        } = event
        {
            assert_eq!(id, mashup_id);
            failure_reason = Some(reason);
        }
    }
    let reason = failure_reason.expect("no RenderFailed event seen");
    assert!(reason.contains("not supported"), "{reason}");
}

#[tokio::test]
async fn render_events_cover_the_job_lifecycle() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let analyses: HashMap<_, _> = [
        (a, analysis(a, 128.0, 8.0)),
        (b, analysis(b, 128.0, 8.0)),
    ]
    .into();

    let engine = Arc::new(RenderEngine::new());
    let mut events = engine.subscribe();
    let req = request(vec![a, b]);
    let mashup_id = req.mashup_id;

    let handle = spawn_render(
        engine,
        req,
        EngineConfig::default(),
        analyses,
        vec![
            TrackAudio::Full(tone(220.0, 0.4, 8.0)),
            TrackAudio::Full(tone(330.0, 0.4, 8.0)),
        ],
    );
    handle.wait().await.unwrap();

    let mut saw_started = false;
    let mut saw_transition = false;
    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.mashup_id(), mashup_id);
        match event {
            MixdownEvent::RenderStarted { track_count, .. } => {
                assert_eq!(track_count, 2);
                saw_started = true;
            }
            MixdownEvent::TransitionApplied {
                from_track_id,
                to_track_id,
                ..
            } => {
                assert_eq!((from_track_id, to_track_id), (a, b));
                saw_transition = true;
            }
            MixdownEvent::RenderCompleted { .. } => saw_completed = true,
            _ => {}
        }
    }
    assert!(saw_started && saw_transition && saw_completed);
}

#[test]
fn job_status_terminal_contract() {
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Rendering.is_terminal());
}

//! End-to-end pipeline scenarios with test doubles at every boundary.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use signwatch::{
    Annotator, Announcer, DebouncePolicy, DisplaySink, Frame, FramePipeline, FrameSource,
    PipelineState, RecordingSink, RegionProposer, ScriptedBackend, SignClassifier, SourceStats,
    StubSynthesizer,
};

/// Serves a fixed list of frames, then fails like an unplugged camera.
struct SceneSource {
    frames: VecDeque<RgbImage>,
    served: u64,
}

impl SceneSource {
    fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
            served: 0,
        }
    }
}

impl FrameSource for SceneSource {
    fn next_frame(&mut self) -> Result<Frame> {
        let image = self
            .frames
            .pop_front()
            .ok_or_else(|| anyhow!("camera unplugged"))?;
        let index = self.served;
        self.served += 1;
        Ok(Frame::new(image, index))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.served,
            device: "test://scene".to_string(),
        }
    }
}

/// Dark road scene with one bright rectangle of the given size.
fn scene_with_rect(width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(320, 240, Rgb([16, 16, 16]));
    draw_filled_rect_mut(
        &mut image,
        Rect::at(100, 80).of_size(width, height),
        Rgb([235, 235, 235]),
    );
    image
}

fn green_pixels(image: &RgbImage) -> usize {
    image
        .pixels()
        .filter(|pixel| **pixel == Rgb([0, 255, 0]))
        .count()
}

fn build_pipeline(
    source: SceneSource,
    backend: ScriptedBackend,
    synth: StubSynthesizer,
    sink: RecordingSink,
) -> FramePipeline<SceneSource, RecordingSink> {
    FramePipeline::new(
        source,
        RegionProposer::default(),
        SignClassifier::new(Box::new(backend)),
        DebouncePolicy::default(),
        Announcer::spawn(Box::new(synth), 8),
        Annotator::new(),
        sink,
        Arc::new(AtomicBool::new(false)),
    )
}

#[test]
fn stop_sign_is_announced_and_annotated() {
    // One frame with a ~1500 px^2 candidate, classifier certain it is a
    // stop sign, empty debounce state.
    let source = SceneSource::new(vec![scene_with_rect(50, 30)]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::constant(15, 0.9),
        synth,
        RecordingSink::new(),
    );

    let stats = pipeline.run().unwrap();

    assert_eq!(stats.frames, 1);
    assert!(stats.regions >= 1);
    assert_eq!(stats.announcements, 1);
    assert_eq!(stats.spoken, 1);
    assert_eq!(*spoken.lock().unwrap(), vec!["Stop"]);

    // Debounce memory now holds the announced sign.
    assert_eq!(pipeline.announce_state().last_sign(), Some("Stop"));
    assert!(pipeline.announce_state().last_at().is_some());

    // The presented frame carries the green box.
    let presented = &pipeline.sink().frames[0];
    assert!(green_pixels(presented) > 50, "expected an annotated box");
}

#[test]
fn undersized_region_is_never_classified() {
    // ~576 px^2 stays below the 1000 px^2 proposal floor even after
    // smoothing widens the contour: no region, no classification, no
    // annotation, no announcement.
    let source = SceneSource::new(vec![scene_with_rect(24, 24)]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::constant(15, 0.9),
        synth,
        RecordingSink::new(),
    );

    let stats = pipeline.run().unwrap();

    assert_eq!(stats.frames, 1);
    assert_eq!(stats.regions, 0);
    assert_eq!(stats.detections, 0);
    assert_eq!(stats.announcements, 0);
    assert!(spoken.lock().unwrap().is_empty());
    assert_eq!(green_pixels(&pipeline.sink().frames[0]), 0);
    assert_eq!(pipeline.announce_state().last_sign(), None);
}

#[test]
fn same_sign_two_seconds_apart_is_announced_once() {
    // Two consecutive frames showing "Yield" at 0.8, two seconds apart:
    // the first announces, the second sits inside the cooldown.
    let source = SceneSource::new(vec![]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::constant(14, 0.8),
        synth,
        RecordingSink::new(),
    );

    let t0 = Instant::now();
    let mut first = Frame::new(scene_with_rect(60, 40), 0);
    pipeline.process_frame(&mut first, t0);
    let mut second = Frame::new(scene_with_rect(60, 40), 1);
    pipeline.process_frame(&mut second, t0 + Duration::from_secs(2));
    pipeline.finish().unwrap();

    let stats = pipeline.stats();
    assert!(stats.detections >= 2);
    assert_eq!(stats.announcements, 1);
    assert_eq!(*spoken.lock().unwrap(), vec!["Yield"]);

    // Only the first frame was annotated.
    assert!(green_pixels(&first.image) > 0);
    assert_eq!(green_pixels(&second.image), 0);
}

#[test]
fn different_sign_is_announced_with_no_delay() {
    let source = SceneSource::new(vec![]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();

    let mut backend = ScriptedBackend::new();
    backend.push_class(15, 0.9);
    backend.push_class(14, 0.9);
    let mut pipeline = build_pipeline(source, backend, synth, RecordingSink::new());

    // Zero elapsed time between the two detections.
    let t0 = Instant::now();
    let mut first = Frame::new(scene_with_rect(60, 40), 0);
    pipeline.process_frame(&mut first, t0);
    let mut second = Frame::new(scene_with_rect(60, 40), 1);
    pipeline.process_frame(&mut second, t0);
    pipeline.finish().unwrap();

    assert_eq!(pipeline.stats().announcements, 2);
    assert_eq!(*spoken.lock().unwrap(), vec!["Stop", "Yield"]);
    assert_eq!(pipeline.announce_state().last_sign(), Some("Yield"));
}

#[test]
fn low_confidence_leaves_frame_and_state_untouched() {
    let source = SceneSource::new(vec![scene_with_rect(60, 40)]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::constant(15, 0.5),
        synth,
        RecordingSink::new(),
    );

    let stats = pipeline.run().unwrap();

    assert!(stats.regions >= 1);
    assert_eq!(stats.detections, 0);
    assert_eq!(stats.below_threshold, stats.regions);
    assert_eq!(stats.announcements, 0);
    assert!(spoken.lock().unwrap().is_empty());
    assert_eq!(pipeline.announce_state().last_sign(), None);
    assert_eq!(green_pixels(&pipeline.sink().frames[0]), 0);
}

#[test]
fn capture_failure_goes_straight_to_stopped() {
    // The source fails on iteration one: no proposal, no classification,
    // no display.
    let source = SceneSource::new(vec![]);
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::constant(15, 0.9),
        StubSynthesizer::new(),
        RecordingSink::new(),
    );

    let stats = pipeline.run().unwrap();

    assert_eq!(pipeline.stage(), PipelineState::Stopped);
    assert_eq!(stats.frames, 0);
    assert_eq!(stats.regions, 0);
    assert!(pipeline.sink().frames.is_empty());
}

#[test]
fn malformed_model_output_skips_only_that_region() {
    let source = SceneSource::new(vec![scene_with_rect(60, 40), scene_with_rect(60, 40)]);
    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();

    // First frame's region gets a malformed score vector; the second
    // frame classifies normally.
    let mut backend = ScriptedBackend::new();
    backend.push_scores(vec![0.9; 7]);
    backend.push_class(15, 0.9);
    let mut pipeline = build_pipeline(source, backend, synth, RecordingSink::new());

    let stats = pipeline.run().unwrap();

    assert_eq!(stats.frames, 2);
    assert_eq!(stats.classification_failures, 1);
    assert_eq!(stats.announcements, 1);
    assert_eq!(*spoken.lock().unwrap(), vec!["Stop"]);
}

#[test]
fn pipeline_respects_quit_key_from_the_sink() {
    let frames = (0..10).map(|_| scene_with_rect(60, 40)).collect();
    let source = SceneSource::new(frames);
    let mut pipeline = build_pipeline(
        source,
        ScriptedBackend::new(),
        StubSynthesizer::new(),
        RecordingSink::quit_after(4),
    );

    let stats = pipeline.run().unwrap();
    assert_eq!(stats.frames, 4);
    assert_eq!(pipeline.stage(), PipelineState::Stopped);
}

#[test]
fn recording_sink_poll_contract() {
    // DisplaySink is an object-safe boundary; double-check the test double
    // honors it through a trait object.
    let mut sink: Box<dyn DisplaySink> = Box::new(RecordingSink::new());
    let frame = Frame::new(scene_with_rect(40, 40), 0);
    sink.present(&frame).unwrap();
    assert_eq!(sink.poll_key(Duration::from_millis(1)), None);
}

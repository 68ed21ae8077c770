//! Per-frame orchestration.
//!
//! The pipeline runs a single-threaded cooperative loop:
//! capture -> propose -> classify each region -> debounce -> annotate ->
//! display, then back to capture. The only other thread in the process is
//! the announcer's worker. A capture failure or the quit key moves the
//! pipeline to its terminal `Stopped` state after an orderly shutdown of
//! the announcer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::announce::Announcer;
use crate::classify::SignClassifier;
use crate::debounce::{AnnounceState, DebouncePolicy};
use crate::display::{DisplaySink, QUIT_KEY};
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::labels;
use crate::overlay::Annotator;
use crate::propose::RegionProposer;

/// Budget for the per-iteration keypress poll.
pub const KEY_POLL_TIMEOUT: Duration = Duration::from_millis(1);

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Pipeline progression; `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Capturing,
    Proposing,
    Classifying,
    Annotating,
    Displaying,
    Stopped,
}

/// Counters accumulated over one run.
#[derive(Clone, Debug, Default)]
pub struct PipelineStats {
    pub frames: u64,
    pub regions: u64,
    pub classification_failures: u64,
    pub below_threshold: u64,
    pub detections: u64,
    pub announcements: u64,
    pub dropped_announcements: u64,
    /// Announcements actually spoken to completion (known after shutdown).
    pub spoken: u64,
}

/// The frame-processing loop and everything it owns.
pub struct FramePipeline<S: FrameSource, D: DisplaySink> {
    source: S,
    proposer: RegionProposer,
    classifier: SignClassifier,
    policy: DebouncePolicy,
    state: AnnounceState,
    announcer: Option<Announcer>,
    annotator: Annotator,
    sink: D,
    shutdown: Arc<AtomicBool>,
    stage: PipelineState,
    stats: PipelineStats,
}

impl<S: FrameSource, D: DisplaySink> FramePipeline<S, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        proposer: RegionProposer,
        classifier: SignClassifier,
        policy: DebouncePolicy,
        announcer: Announcer,
        annotator: Annotator,
        sink: D,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            proposer,
            classifier,
            policy,
            state: AnnounceState::new(),
            announcer: Some(announcer),
            annotator,
            sink,
            shutdown,
            stage: PipelineState::Capturing,
            stats: PipelineStats::default(),
        }
    }

    pub fn stage(&self) -> PipelineState {
        self.stage
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn announce_state(&self) -> &AnnounceState {
        &self.state
    }

    /// Run until capture failure, the quit key, or the shutdown flag.
    pub fn run(&mut self) -> Result<PipelineStats> {
        let mut last_health_log = Instant::now();
        let mut fatal: Option<anyhow::Error> = None;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                log::info!("shutdown requested, stopping pipeline");
                break;
            }

            self.stage = PipelineState::Capturing;
            let mut frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::error!("capture failed, stopping pipeline: {:#}", err);
                    break;
                }
            };

            self.process_frame(&mut frame, Instant::now());

            self.stage = PipelineState::Displaying;
            if let Err(err) = self.sink.present(&frame) {
                fatal = Some(err.context("display sink failed"));
                break;
            }
            self.stats.frames += 1;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "capture health={} frames={} device={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.device
                );
                last_health_log = Instant::now();
            }

            if self.sink.poll_key(KEY_POLL_TIMEOUT) == Some(QUIT_KEY) {
                log::info!("quit key pressed, stopping pipeline");
                break;
            }
        }

        self.finish()?;
        if let Some(err) = fatal {
            return Err(err);
        }
        Ok(self.stats.clone())
    }

    /// Process one frame: propose regions, classify each independently,
    /// debounce, annotate novel detections in place and dispatch their
    /// announcements.
    ///
    /// `now` is the detection timestamp handed to the debounce policy;
    /// `run` passes the wall clock, tests may pass anything.
    pub fn process_frame(&mut self, frame: &mut Frame, now: Instant) {
        self.stage = PipelineState::Proposing;
        for region in self.proposer.propose(&frame.image) {
            self.stats.regions += 1;

            self.stage = PipelineState::Classifying;
            let crop = region.crop(&frame.image);
            let (class_id, confidence) = match self.classifier.classify(&crop) {
                Ok(result) => result,
                Err(err) => {
                    // Recovered locally: this region only, the frame goes on.
                    self.stats.classification_failures += 1;
                    log::debug!("classification failed for {:?}: {:#}", region, err);
                    continue;
                }
            };

            if confidence < self.policy.confidence_threshold() {
                self.stats.below_threshold += 1;
                continue;
            }

            let Some(sign_name) = labels::sign_name(class_id) else {
                self.stats.classification_failures += 1;
                log::debug!("model produced unknown class id {}", class_id);
                continue;
            };
            self.stats.detections += 1;

            if self
                .policy
                .should_announce(&mut self.state, sign_name, confidence, now)
            {
                self.stage = PipelineState::Annotating;
                self.annotator.annotate(&mut frame.image, &region, sign_name);

                let dispatched = self
                    .announcer
                    .as_ref()
                    .map(|announcer| announcer.announce(sign_name))
                    .unwrap_or(false);
                if dispatched {
                    self.stats.announcements += 1;
                } else {
                    self.stats.dropped_announcements += 1;
                }
                log::info!(
                    "sign '{}' (class {}, conf {:.2}) at {:?}",
                    sign_name,
                    class_id,
                    confidence,
                    region
                );
            }
        }
    }

    /// Orderly shutdown: stop the announcer, letting already queued
    /// announcements finish. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        self.stage = PipelineState::Stopped;
        if let Some(announcer) = self.announcer.take() {
            self.stats.spoken = announcer.stop()?;
        }
        Ok(())
    }
}

//! signwatch - live traffic sign detection with spoken announcements.
//!
//! This crate watches a video stream for traffic-sign-shaped regions,
//! classifies each candidate against a fixed 43-class label set, overlays
//! recognized signs on the frame and announces new ones via speech.
//!
//! # Architecture
//!
//! One frame flows through the pipeline at a time:
//!
//! capture -> region proposal -> classification -> debounce ->
//! (announce, annotate) -> display
//!
//! The loop is single-threaded; speech synthesis runs on a separate worker
//! fed through a bounded queue so synthesis latency never throttles
//! capture. The debounce policy remembers exactly one sign: the most
//! recently announced one.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (V4L2 devices, synthetic stub scenes)
//! - `propose`: edge/contour candidate region extraction
//! - `classify`: model adapter and inference backends
//! - `labels`: the fixed sign class table
//! - `debounce`: repeat-announcement suppression
//! - `announce`: non-blocking speech dispatch
//! - `overlay`: in-place frame annotation
//! - `display`: presentation sinks and the quit key
//! - `pipeline`: the per-frame orchestration loop
//! - `config`: file + environment configuration

pub mod announce;
pub mod classify;
pub mod config;
pub mod debounce;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod labels;
pub mod overlay;
pub mod pipeline;
pub mod propose;

pub use announce::{Announcer, SpeechSynthesizer, StubSynthesizer, DEFAULT_QUEUE_DEPTH};
pub use classify::{ClassifierBackend, ScriptedBackend, SignClassifier};
pub use config::WatchConfig;
pub use debounce::{AnnounceState, DebouncePolicy};
pub use display::{DisplaySink, HeadlessSink, RecordingSink, QUIT_KEY};
pub use frame::{Frame, Region};
pub use ingest::{CameraConfig, CameraSource, FrameSource, SourceStats};
pub use labels::{sign_name, CLASS_COUNT};
pub use overlay::Annotator;
pub use pipeline::{FramePipeline, PipelineState, PipelineStats};
pub use propose::RegionProposer;

#[cfg(feature = "backend-tract")]
pub use classify::TractBackend;

#[cfg(feature = "speech-tts")]
pub use announce::TtsSynthesizer;

//! signwatchd - traffic sign watch daemon
//!
//! This daemon:
//! 1. Captures frames from the configured camera (or a synthetic stub)
//! 2. Proposes sign-shaped regions per frame
//! 3. Classifies each region against the fixed 43-class table
//! 4. Debounces announcements so a sign in view is spoken once
//! 5. Annotates novel detections onto the frame and presents it
//! 6. Dispatches speech through a bounded queue worker

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use signwatch::{
    Annotator, Announcer, CameraConfig, CameraSource, ClassifierBackend, DebouncePolicy,
    FramePipeline, HeadlessSink, RegionProposer, ScriptedBackend, SignClassifier,
    SpeechSynthesizer, WatchConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (falls back to the SIGNWATCH_CONFIG env var).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Capture device override (e.g. /dev/video0 or stub://front_camera).
    #[arg(long)]
    device: Option<String>,
    /// ONNX model path override.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Stop after this many frames (synthetic sources only; 0 = unlimited).
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => WatchConfig::load_path(path)?,
        None => WatchConfig::load()?,
    };
    if let Some(device) = args.device {
        cfg.capture.device = device;
    }
    if let Some(model) = args.model {
        cfg.detect.model_path = Some(model);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })
    .context("failed to install interrupt handler")?;

    let mut source = CameraSource::new(CameraConfig {
        device: cfg.capture.device.clone(),
        target_fps: cfg.capture.target_fps,
        width: cfg.capture.width,
        height: cfg.capture.height,
        frame_budget: (args.frames > 0).then_some(args.frames),
    })?;
    source.connect()?;

    let classifier = SignClassifier::new(build_backend(&cfg)?);
    let announcer = Announcer::spawn(build_synthesizer()?, cfg.announce.queue_depth);
    let annotator = Annotator::from_font_path(cfg.overlay.font_path.as_deref())?;
    let sink = match &cfg.overlay.preview_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create preview dir {}", dir.display()))?;
            HeadlessSink::with_preview(dir.clone(), cfg.overlay.preview_every)
        }
        None => HeadlessSink::new(),
    };

    let proposer = RegionProposer::new(
        cfg.detect.min_region_area,
        cfg.detect.canny_low,
        cfg.detect.canny_high,
        cfg.detect.blur_sigma,
    );
    let policy = DebouncePolicy::new(cfg.announce.confidence_threshold, cfg.announce.cooldown);

    log::info!(
        "signwatchd running: device={} classifier={} cooldown={:.1}s threshold={:.2}",
        cfg.capture.device,
        classifier.backend_name(),
        cfg.announce.cooldown.as_secs_f64(),
        cfg.announce.confidence_threshold
    );

    let mut pipeline = FramePipeline::new(
        source, proposer, classifier, policy, announcer, annotator, sink, shutdown,
    );
    let stats = pipeline.run()?;

    log::info!(
        "stopped after {} frames: {} regions, {} detections, {} announced ({} spoken, {} dropped), {} classification failures",
        stats.frames,
        stats.regions,
        stats.detections,
        stats.announcements,
        stats.spoken,
        stats.dropped_announcements,
        stats.classification_failures
    );
    Ok(())
}

#[cfg(feature = "backend-tract")]
fn build_backend(cfg: &WatchConfig) -> Result<Box<dyn ClassifierBackend>> {
    use signwatch::TractBackend;

    match &cfg.detect.model_path {
        Some(path) => Ok(Box::new(TractBackend::new(path)?)),
        None => {
            log::warn!("no model configured; scripted stub classifier recognizes nothing");
            Ok(Box::new(ScriptedBackend::new()))
        }
    }
}

#[cfg(not(feature = "backend-tract"))]
fn build_backend(cfg: &WatchConfig) -> Result<Box<dyn ClassifierBackend>> {
    use anyhow::anyhow;

    match &cfg.detect.model_path {
        Some(path) => Err(anyhow!(
            "model {} configured, but this build lacks the backend-tract feature",
            path.display()
        )),
        None => {
            log::warn!("no model configured; scripted stub classifier recognizes nothing");
            Ok(Box::new(ScriptedBackend::new()))
        }
    }
}

#[cfg(feature = "speech-tts")]
fn build_synthesizer() -> Result<Box<dyn SpeechSynthesizer>> {
    use signwatch::TtsSynthesizer;

    Ok(Box::new(TtsSynthesizer::new()?))
}

#[cfg(not(feature = "speech-tts"))]
fn build_synthesizer() -> Result<Box<dyn SpeechSynthesizer>> {
    use signwatch::StubSynthesizer;

    log::info!("built without speech-tts; announcements are logged, not spoken");
    Ok(Box::new(StubSynthesizer::new()))
}

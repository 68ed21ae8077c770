//! demo - end-to-end synthetic run of the sign watch pipeline
//!
//! Runs the real pipeline against the built-in synthetic scene with a
//! scripted classifier and a recording synthesizer, so the full
//! capture -> propose -> classify -> debounce -> announce path is
//! exercised without a camera, a model file, or an audio device.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;

use signwatch::{
    sign_name, Annotator, Announcer, CameraConfig, CameraSource, DebouncePolicy, FramePipeline,
    HeadlessSink, RegionProposer, ScriptedBackend, SignClassifier, StubSynthesizer,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to run.
    #[arg(long, default_value_t = 40)]
    frames: u64,
    /// Class id the scripted classifier keeps recognizing.
    #[arg(long, default_value_t = 15)]
    class_id: u8,
    /// Confidence the scripted classifier reports.
    #[arg(long, default_value_t = 0.9)]
    confidence: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }
    let label = sign_name(args.class_id)
        .ok_or_else(|| anyhow!("class id {} is outside 1..=43", args.class_id))?;

    stage("assemble pipeline");
    let mut source = CameraSource::new(CameraConfig {
        device: "stub://demo".to_string(),
        frame_budget: Some(args.frames),
        ..CameraConfig::default()
    })?;
    source.connect()?;
    println!(
        "synthetic scene, {} frames, classifier scripted to '{}' at {:.2}",
        args.frames, label, args.confidence
    );

    let synth = StubSynthesizer::new();
    let spoken = synth.spoken();

    let mut pipeline = FramePipeline::new(
        source,
        RegionProposer::default(),
        SignClassifier::new(Box::new(ScriptedBackend::constant(
            args.class_id,
            args.confidence,
        ))),
        DebouncePolicy::default(),
        Announcer::spawn(Box::new(synth), 8),
        Annotator::new(),
        HeadlessSink::new(),
        Arc::new(AtomicBool::new(false)),
    );

    stage("run until the synthetic capture budget is spent");
    let stats = pipeline.run()?;

    stage("summary");
    println!("frames processed:        {}", stats.frames);
    println!("regions proposed:        {}", stats.regions);
    println!("confident detections:    {}", stats.detections);
    println!("announcements dispatched: {}", stats.announcements);
    println!("announcements spoken:     {}", stats.spoken);
    let spoken = spoken
        .lock()
        .map_err(|_| anyhow!("utterance log poisoned"))?;
    println!("spoken: {:?}", *spoken);

    if stats.detections > 0 && stats.announcements == 0 {
        return Err(anyhow!("detections never produced an announcement"));
    }
    Ok(())
}

fn stage(name: &str) {
    println!("\n=== {} ===", name);
}

//! Display boundary.
//!
//! The pipeline hands every processed frame to a `DisplaySink` and polls
//! it for the quit key once per iteration. The crate assumes headless
//! operation: the default sink counts frames and can drop periodic JPEG
//! previews on disk instead of opening a window.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use image::RgbImage;

use crate::frame::Frame;

/// The keypress that stops the pipeline.
pub const QUIT_KEY: char = 'q';

/// Presentation sink for annotated frames.
pub trait DisplaySink {
    /// Present one frame. Expected to return promptly.
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Poll for a pending keypress, waiting at most `timeout`.
    fn poll_key(&mut self, timeout: Duration) -> Option<char>;
}

/// Headless sink: counts frames, optionally writes every Nth as a JPEG.
pub struct HeadlessSink {
    presented: u64,
    preview_dir: Option<PathBuf>,
    preview_every: u64,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self {
            presented: 0,
            preview_dir: None,
            preview_every: 1,
        }
    }

    /// Sink that writes every `every`th frame into `dir`.
    pub fn with_preview(dir: PathBuf, every: u64) -> Self {
        Self {
            presented: 0,
            preview_dir: Some(dir),
            preview_every: every.max(1),
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for HeadlessSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.presented += 1;
        if let Some(dir) = &self.preview_dir {
            if frame.index % self.preview_every == 0 {
                let path = dir.join(format!("frame_{:06}.jpg", frame.index));
                frame
                    .image
                    .save(&path)
                    .with_context(|| format!("failed to write preview {}", path.display()))?;
            }
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<char> {
        // No keyboard attached; spend the poll budget like a real window
        // event loop would.
        std::thread::sleep(timeout);
        None
    }
}

/// Recording sink for tests: keeps a copy of every presented frame and can
/// report the quit key after a fixed number of frames.
pub struct RecordingSink {
    pub frames: Vec<RgbImage>,
    quit_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            quit_after: None,
        }
    }

    /// Report `'q'` once `count` frames have been presented.
    pub fn quit_after(count: usize) -> Self {
        Self {
            frames: Vec::new(),
            quit_after: Some(count),
        }
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.image.clone());
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Option<char> {
        match self.quit_after {
            Some(count) if self.frames.len() >= count => Some(QUIT_KEY),
            _ => None,
        }
    }
}

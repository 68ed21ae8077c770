//! Frame capture sources.
//!
//! Sources produce owned RGB `Frame`s one at a time. The first capture
//! error is fatal to the caller's loop; sources do not retry.
//!
//! Backends:
//! - Synthetic scenes for `stub://` device paths (tests, demos)
//! - Local V4L2 devices (feature: ingest-v4l2)
//!
//! The capture layer MUST NOT buffer frames beyond the one being handed
//! over, and never writes pixels to disk.

mod camera;

pub use camera::{CameraConfig, CameraSource};

use anyhow::Result;

use crate::frame::Frame;

/// Pollable source of frames.
pub trait FrameSource {
    /// Capture the next frame. An error means the source is exhausted or
    /// broken; callers treat it as fatal.
    fn next_frame(&mut self) -> Result<Frame>;

    /// True while the source is delivering frames at a plausible rate.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Capture statistics for the health log.
    fn stats(&self) -> SourceStats;
}

/// Statistics reported by a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DEVICE: &str = "stub://front_camera";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_MIN_REGION_AREA: f64 = 1000.0;
const DEFAULT_CANNY_LOW: f32 = 50.0;
const DEFAULT_CANNY_HIGH: f32 = 150.0;
const DEFAULT_BLUR_SIGMA: f32 = 1.1;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.75;
const DEFAULT_COOLDOWN_SECS: f64 = 5.0;
const DEFAULT_QUEUE_DEPTH: usize = 4;
const DEFAULT_PREVIEW_EVERY: u64 = 30;

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    capture: Option<CaptureConfigFile>,
    detect: Option<DetectConfigFile>,
    announce: Option<AnnounceConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectConfigFile {
    min_region_area: Option<f64>,
    canny_low: Option<f32>,
    canny_high: Option<f32>,
    blur_sigma: Option<f32>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnounceConfigFile {
    confidence_threshold: Option<f32>,
    cooldown_secs: Option<f64>,
    queue_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    font_path: Option<PathBuf>,
    preview_dir: Option<PathBuf>,
    preview_every: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub capture: CaptureSettings,
    pub detect: DetectSettings,
    pub announce: AnnounceSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub min_region_area: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub blur_sigma: f32,
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AnnounceSettings {
    pub confidence_threshold: f32,
    pub cooldown: Duration,
    pub queue_depth: usize,
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub font_path: Option<PathBuf>,
    pub preview_dir: Option<PathBuf>,
    pub preview_every: u64,
}

impl WatchConfig {
    /// Load from the file named by `SIGNWATCH_CONFIG` (if set), then apply
    /// env overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGNWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit config file path (env overrides still apply).
    pub fn load_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Result<Self> {
        let capture = CaptureSettings {
            device: file
                .capture
                .as_ref()
                .and_then(|capture| capture.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            target_fps: file
                .capture
                .as_ref()
                .and_then(|capture| capture.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .capture
                .as_ref()
                .and_then(|capture| capture.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .capture
                .as_ref()
                .and_then(|capture| capture.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let detect = DetectSettings {
            min_region_area: file
                .detect
                .as_ref()
                .and_then(|detect| detect.min_region_area)
                .unwrap_or(DEFAULT_MIN_REGION_AREA),
            canny_low: file
                .detect
                .as_ref()
                .and_then(|detect| detect.canny_low)
                .unwrap_or(DEFAULT_CANNY_LOW),
            canny_high: file
                .detect
                .as_ref()
                .and_then(|detect| detect.canny_high)
                .unwrap_or(DEFAULT_CANNY_HIGH),
            blur_sigma: file
                .detect
                .as_ref()
                .and_then(|detect| detect.blur_sigma)
                .unwrap_or(DEFAULT_BLUR_SIGMA),
            model_path: file.detect.and_then(|detect| detect.model_path),
        };
        let cooldown_secs = file
            .announce
            .as_ref()
            .and_then(|announce| announce.cooldown_secs)
            .unwrap_or(DEFAULT_COOLDOWN_SECS);
        if !cooldown_secs.is_finite() || cooldown_secs < 0.0 {
            return Err(anyhow!("announce cooldown_secs must be non-negative"));
        }
        let announce = AnnounceSettings {
            confidence_threshold: file
                .announce
                .as_ref()
                .and_then(|announce| announce.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            cooldown: Duration::from_secs_f64(cooldown_secs),
            queue_depth: file
                .announce
                .and_then(|announce| announce.queue_depth)
                .unwrap_or(DEFAULT_QUEUE_DEPTH),
        };
        let overlay = OverlaySettings {
            font_path: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.font_path.clone()),
            preview_dir: file
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.preview_dir.clone()),
            preview_every: file
                .overlay
                .and_then(|overlay| overlay.preview_every)
                .unwrap_or(DEFAULT_PREVIEW_EVERY),
        };
        Ok(Self {
            capture,
            detect,
            announce,
            overlay,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("SIGNWATCH_DEVICE") {
            if !device.trim().is_empty() {
                self.capture.device = device;
            }
        }
        if let Ok(path) = std::env::var("SIGNWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detect.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("SIGNWATCH_FONT_PATH") {
            if !path.trim().is_empty() {
                self.overlay.font_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("SIGNWATCH_PREVIEW_DIR") {
            if !path.trim().is_empty() {
                self.overlay.preview_dir = Some(PathBuf::from(path));
            }
        }
        if let Ok(cooldown) = std::env::var("SIGNWATCH_COOLDOWN_SECS") {
            let seconds: f64 = cooldown.parse().map_err(|_| {
                anyhow!("SIGNWATCH_COOLDOWN_SECS must be a number of seconds")
            })?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(anyhow!("SIGNWATCH_COOLDOWN_SECS must be non-negative"));
            }
            self.announce.cooldown = Duration::from_secs_f64(seconds);
        }
        if let Ok(confidence) = std::env::var("SIGNWATCH_CONFIDENCE") {
            let value: f32 = confidence
                .parse()
                .map_err(|_| anyhow!("SIGNWATCH_CONFIDENCE must be a number in (0, 1]"))?;
            self.announce.confidence_threshold = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.capture.target_fps == 0 {
            return Err(anyhow!("capture target_fps must be >= 1"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture dimensions must be non-zero"));
        }
        if !(self.detect.min_region_area > 0.0) {
            return Err(anyhow!("detect min_region_area must be > 0"));
        }
        if self.detect.canny_low <= 0.0 || self.detect.canny_high <= self.detect.canny_low {
            return Err(anyhow!(
                "canny thresholds must satisfy 0 < low < high (got {} / {})",
                self.detect.canny_low,
                self.detect.canny_high
            ));
        }
        if !(self.detect.blur_sigma > 0.0) {
            return Err(anyhow!("detect blur_sigma must be > 0"));
        }
        if !(self.announce.confidence_threshold > 0.0)
            || self.announce.confidence_threshold > 1.0
        {
            return Err(anyhow!(
                "announce confidence_threshold must be in (0, 1], got {}",
                self.announce.confidence_threshold
            ));
        }
        if self.announce.cooldown.is_zero() {
            return Err(anyhow!("announce cooldown must be greater than zero"));
        }
        if self.announce.queue_depth == 0 {
            return Err(anyhow!("announce queue_depth must be >= 1"));
        }
        if self.overlay.preview_every == 0 {
            return Err(anyhow!("overlay preview_every must be >= 1"));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            capture: CaptureSettings {
                device: DEFAULT_DEVICE.to_string(),
                target_fps: DEFAULT_TARGET_FPS,
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
            },
            detect: DetectSettings {
                min_region_area: DEFAULT_MIN_REGION_AREA,
                canny_low: DEFAULT_CANNY_LOW,
                canny_high: DEFAULT_CANNY_HIGH,
                blur_sigma: DEFAULT_BLUR_SIGMA,
                model_path: None,
            },
            announce: AnnounceSettings {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                cooldown: Duration::from_secs_f64(DEFAULT_COOLDOWN_SECS),
                queue_depth: DEFAULT_QUEUE_DEPTH,
            },
            overlay: OverlaySettings {
                font_path: None,
                preview_dir: None,
                preview_every: DEFAULT_PREVIEW_EVERY,
            },
        }
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{ModelInputSpec, OutputShape};
use crate::region::DEFAULT_REAR_REGION_FRACTION;

const DEFAULT_SEQUENCE_LENGTH: usize = 20;
const DEFAULT_FRAME_SIZE: (u32, u32) = (112, 112);
const DEFAULT_VIOLENCE_THRESHOLD: f32 = 0.7;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_MODEL_PATH: &str = "models/violence.onnx";
const DEFAULT_ALERT_LOG_PATH: &str = "alerts.log";
const DEFAULT_SOURCE_URL: &str = "stub://cabin";
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_FPS: u32 = 15;
const DEFAULT_API_ADDR: &str = "127.0.0.1:8797";

/// Largest accepted source width or height.
pub const MAX_SOURCE_DIM: u32 = 8192;

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    sequence_length: Option<usize>,
    frame_size: Option<[u32; 2]>,
    violence_threshold: Option<f32>,
    confidence_threshold: Option<f32>,
    rear_region_fraction: Option<f64>,
    alert_log_path: Option<PathBuf>,
    model: Option<ModelConfigFile>,
    source: Option<SourceConfigFile>,
    api: Option<ApiConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    output: Option<OutputShape>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub sequence_length: usize,
    pub frame_size: (u32, u32),
    pub violence_threshold: f32,
    /// Passed through to the region detector.
    pub confidence_threshold: f32,
    pub rear_region_fraction: f64,
    pub alert_log_path: PathBuf,
    pub model: ModelSettings,
    pub source: SourceSettings,
    pub api_addr: String,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    /// Expected output shape; inferred from the model when unset.
    pub output: Option<OutputShape>,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::from_file(WatchConfigFile::default())
    }
}

impl WatchConfig {
    /// Load from `WATCH_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WATCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => WatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Input contract the window, normalizer and sequence model must share.
    pub fn model_input_spec(&self) -> ModelInputSpec {
        ModelInputSpec {
            sequence_length: self.sequence_length,
            frame_width: self.frame_size.0,
            frame_height: self.frame_size.1,
        }
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|model| model.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            output: file.model.as_ref().and_then(|model| model.output),
        };
        let source = SourceSettings {
            url: file
                .source
                .as_ref()
                .and_then(|source| source.url.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
            target_fps: file
                .source
                .as_ref()
                .and_then(|source| source.target_fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
        };
        Self {
            sequence_length: file.sequence_length.unwrap_or(DEFAULT_SEQUENCE_LENGTH),
            frame_size: file
                .frame_size
                .map(|[w, h]| (w, h))
                .unwrap_or(DEFAULT_FRAME_SIZE),
            violence_threshold: file
                .violence_threshold
                .unwrap_or(DEFAULT_VIOLENCE_THRESHOLD),
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            rear_region_fraction: file
                .rear_region_fraction
                .unwrap_or(DEFAULT_REAR_REGION_FRACTION),
            alert_log_path: file
                .alert_log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ALERT_LOG_PATH)),
            model,
            source,
            api_addr: file
                .api
                .and_then(|api| api.addr)
                .unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("WATCH_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("WATCH_ALERT_LOG") {
            self.alert_log_path = PathBuf::from(path);
        }
        if let Some(url) = non_empty_env("WATCH_SOURCE_URL") {
            self.source.url = url;
        }
        if let Some(addr) = non_empty_env("WATCH_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(value) = non_empty_env("WATCH_VIOLENCE_THRESHOLD") {
            self.violence_threshold = value
                .parse()
                .map_err(|_| anyhow!("WATCH_VIOLENCE_THRESHOLD must be a number"))?;
        }
        if let Some(value) = non_empty_env("WATCH_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = value
                .parse()
                .map_err(|_| anyhow!("WATCH_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("violence_threshold", self.violence_threshold),
            ("confidence_threshold", self.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if !(0.0..=1.0).contains(&self.rear_region_fraction) {
            return Err(anyhow!(
                "rear_region_fraction must be within [0, 1], got {}",
                self.rear_region_fraction
            ));
        }
        if self.sequence_length < 2 {
            return Err(anyhow!("sequence_length must be at least 2"));
        }
        if self.frame_size.0 == 0 || self.frame_size.1 == 0 {
            return Err(anyhow!("frame_size must be non-zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.source.width > MAX_SOURCE_DIM || self.source.height > MAX_SOURCE_DIM {
            return Err(anyhow!(
                "source dimensions {}x{} exceed {}x{}",
                self.source.width,
                self.source.height,
                MAX_SOURCE_DIM,
                MAX_SOURCE_DIM
            ));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be >= 1"));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

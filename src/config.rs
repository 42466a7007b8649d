use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_CREDENTIALS_PATH: &str = "service-account.json";
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";
const DEFAULT_OUTPUT_DIR: &str = ".";

pub const CAPTURE_FILE_NAME: &str = "captura.jpg";
pub const ANNOTATED_FILE_NAME: &str = "captura_anotada.jpg";

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    credentials_path: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    vision: Option<VisionConfigFile>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub credentials_path: PathBuf,
    pub camera: CameraSettings,
    pub vision_endpoint: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        // An empty file layer yields the built-in defaults.
        Self::from_file(DetectorConfigFile::default())
    }
}

impl DetectorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DETECTOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Where the raw capture is written and re-read from.
    pub fn capture_path(&self) -> PathBuf {
        self.output_dir.join(CAPTURE_FILE_NAME)
    }

    /// Where the annotated copy is written.
    pub fn annotated_path(&self) -> PathBuf {
        self.output_dir.join(ANNOTATED_FILE_NAME)
    }

    fn from_file(file: DetectorConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        Self {
            credentials_path: file
                .credentials_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            camera: CameraSettings {
                device: camera
                    .device
                    .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            },
            vision_endpoint: file
                .vision
                .and_then(|vision| vision.endpoint)
                .unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string()),
            output_dir: file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("DETECTOR_CREDENTIALS") {
            if !path.trim().is_empty() {
                self.credentials_path = PathBuf::from(path);
            }
        }
        if let Ok(device) = std::env::var("DETECTOR_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(endpoint) = std::env::var("DETECTOR_VISION_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.vision_endpoint = endpoint;
            }
        }
        if let Ok(dir) = std::env::var("DETECTOR_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        let endpoint = Url::parse(&self.vision_endpoint)
            .map_err(|e| anyhow!("invalid vision endpoint {}: {}", self.vision_endpoint, e))?;
        match endpoint.scheme() {
            "http" | "https" => Ok(()),
            other => Err(anyhow!(
                "unsupported vision endpoint scheme '{}'; expected http(s)",
                other
            )),
        }
    }
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

//! Person detector
//!
//! Captures one still from a camera, asks Google Cloud Vision what is in it,
//! and reports whether a person is present.
//!
//! # Module Structure
//!
//! - `config`: layered configuration (JSON file, environment, CLI)
//! - `credentials`: credential file gate
//! - `transport`: Cloud Vision REST client and service-account auth
//! - `ingest`: camera sources (V4L2 devices, `stub://` synthetic)
//! - `preview`: windowed or terminal display and key input
//! - `detect`: detection types and the person keyword rule
//! - `report`, `annotate`: textual and visual presentation
//! - `pipeline`: the stage sequence, with `error::StageError` at its boundaries

pub mod annotate;
pub mod config;
pub mod credentials;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod preview;
pub mod report;
pub mod transport;
pub mod ui;

pub use config::{CameraSettings, DetectorConfig};
pub use detect::{
    is_person_keyword, person_detected, Analysis, AnnotationService, BoundingPoly, DetectedLabel,
    DetectedObject, NormalizedVertex, PixelRect, PERSON_KEYWORDS,
};
pub use error::{Stage, StageError};
pub use ingest::{V4l2Config, V4l2Source};
pub use pipeline::{analyze, capture_frame, CaptureOutcome, Pipeline, RunOutcome};
#[cfg(feature = "preview")]
pub use preview::WindowDisplay;
pub use preview::{FrameDisplay, KeyPress, TerminalDisplay};
pub use report::Report;
pub use transport::VisionClient;

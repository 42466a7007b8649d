//! Camera ingestion.
//!
//! The capture stage reads frames from a `V4l2Source`:
//! - Local V4L2 device nodes (feature: ingest-v4l2)
//! - `stub://` synthetic cameras (tests, demos)
//!
//! Device buffers are normalized to packed RGB before they leave this module,
//! whatever fourcc the device negotiated.

#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;
pub mod v4l2;

pub use v4l2::{V4l2Config, V4l2Source, V4l2Stats};

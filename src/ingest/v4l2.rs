//! V4L2 camera source.
//!
//! `V4l2Source` owns the capture device for as long as it lives. Dropping it
//! stops streaming and closes the device node, so every path out of the
//! capture stage releases the camera.
//!
//! Device paths starting with `stub://` produce synthetic frames and never
//! touch hardware. `stub://fail-after/<n>` yields `n` frames and then fails
//! every read.

use anyhow::Result;
use image::RgbImage;

#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;

#[cfg(feature = "ingest-v4l2")]
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::config::CameraSettings;

/// Camera selection and requested mode.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device node, or `stub://<name>`.
    pub device: String,
    /// Requested frame rate; the device may pick another.
    pub target_fps: u32,
    /// Requested width; the driver may round it.
    pub width: u32,
    /// Requested height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

impl From<&CameraSettings> for V4l2Config {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            device: settings.device.clone(),
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
        }
    }
}

/// V4L2 frame source.
pub struct V4l2Source {
    backend: V4l2Backend,
}

enum V4l2Backend {
    Synthetic(SyntheticV4l2Source),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceV4l2Source),
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: V4l2Backend::Synthetic(SyntheticV4l2Source::new(config)?),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: V4l2Backend::Device(DeviceV4l2Source::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow::anyhow!(
                "camera {} unavailable: built without the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Open the device and start streaming.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.connect(),
        }
    }

    /// Read the next frame as RGB.
    pub fn next_frame(&mut self) -> Result<RgbImage> {
        match &mut self.backend {
            V4l2Backend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.next_frame(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> V4l2Stats {
        match &self.backend {
            V4l2Backend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            V4l2Backend::Device(source) => source.stats(),
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        let stats = self.stats();
        log::info!(
            "camera {}: released after {} frame(s)",
            stats.device,
            stats.frames_captured
        );
    }
}

/// Frame counters reported when the camera is released.
#[derive(Clone, Debug)]
pub struct V4l2Stats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

struct SyntheticV4l2Source {
    config: V4l2Config,
    frame_count: u64,
    fail_after: Option<u64>,
}

impl SyntheticV4l2Source {
    fn new(config: V4l2Config) -> Result<Self> {
        let fail_after = match config.device.strip_prefix("stub://fail-after/") {
            Some(count) => Some(count.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("camera {}: invalid frame count", config.device)
            })?),
            None => None,
        };
        Ok(Self {
            config,
            frame_count: 0,
            fail_after,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "camera {}: synthetic frames",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        if self.fail_after.is_some_and(|limit| self.frame_count >= limit) {
            return Err(anyhow::anyhow!(
                "camera {}: no frame after {} read(s)",
                self.config.device,
                self.frame_count
            ));
        }
        self.frame_count += 1;
        let shift = self.frame_count;
        Ok(RgbImage::from_fn(
            self.config.width,
            self.config.height,
            |x, y| {
                // Diagonal gradient that drifts one step per frame.
                let v = ((x as u64 + y as u64 + shift) % 256) as u8;
                image::Rgb([v, v.wrapping_mul(3), 255 - v])
            },
        ))
    }

    fn stats(&self) -> V4l2Stats {
        V4l2Stats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Capture device
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceV4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceV4l2Source {
    fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            active_format: PixelFormat::Rgb24,
            config,
            state: None,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open camera {}", self.config.device))?;
        let mut format = device.format().context("query camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "camera {}: RGB3 rejected, keeping device format ({})",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("query active camera format")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "camera {}: frame rate not applied ({})",
                    self.config.device,
                    err
                );
            }
        }

        self.active_format = PixelFormat::from_fourcc(&format.fourcc.repr)
            .with_context(|| format!("camera {}", self.config.device))?;
        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceV4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("map camera buffers"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "camera {}: streaming {}x{} {:?}",
            self.config.device,
            self.active_width,
            self.active_height,
            self.active_format
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RgbImage> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera not connected")?;
        let (width, height, format) = (self.active_width, self.active_height, self.active_format);
        let rgb = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, meta) = fields.stream.next().context("read camera frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize_to_rgb(&buf[..used], width, height, format)
        })?;

        self.frame_count += 1;
        RgbImage::from_raw(width, height, rgb).context("camera frame size mismatch")
    }

    fn stats(&self) -> V4l2Stats {
        V4l2Stats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> V4l2Config {
        V4l2Config {
            device: "stub://test".to_string(),
            target_fps: 30,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn v4l2_source_produces_frames() -> Result<()> {
        let mut source = V4l2Source::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(source.stats().frames_captured, 1);

        Ok(())
    }

    #[test]
    fn synthetic_frames_change_over_time() -> Result<()> {
        let mut source = V4l2Source::new(stub_config())?;
        source.connect()?;

        let first = source.next_frame()?;
        let second = source.next_frame()?;
        assert_ne!(first, second);

        Ok(())
    }

    #[test]
    fn failing_stub_stops_after_count() -> Result<()> {
        let mut source = V4l2Source::new(V4l2Config {
            device: "stub://fail-after/2".to_string(),
            ..stub_config()
        })?;
        source.connect()?;

        source.next_frame()?;
        source.next_frame()?;
        assert!(source.next_frame().is_err());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn failing_stub_needs_numeric_count() {
        let config = V4l2Config {
            device: "stub://fail-after/soon".to_string(),
            ..stub_config()
        };
        assert!(V4l2Source::new(config).is_err());
    }

    #[cfg(feature = "ingest-v4l2")]
    #[test]
    fn missing_device_node_fails_on_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let device = dir.path().join("video9");
        let mut source = V4l2Source::new(V4l2Config {
            device: device.display().to_string(),
            ..stub_config()
        })?;
        let err = source.connect().unwrap_err();
        assert!(format!("{err:#}").contains("open camera"));
        Ok(())
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn real_device_needs_feature() {
        let config = V4l2Config {
            device: "/dev/video0".to_string(),
            ..stub_config()
        };
        let err = V4l2Source::new(config).err().expect("device must be unavailable");
        assert!(err.to_string().contains("/dev/video0"));
    }
}

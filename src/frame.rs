//! Still-frame persistence.
//!
//! Frames live in memory as `RgbImage` and touch disk exactly twice per run:
//! the raw capture and the annotated copy. Both are overwritten in place.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encoder quality for written stills.
pub const JPEG_QUALITY: u8 = 95;

/// Encode `frame` as JPEG and write it to `path`, replacing any previous file.
pub fn write_jpeg(frame: &RgbImage, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create image file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode_image(frame)
        .with_context(|| format!("encode jpeg {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("write jpeg {}", path.display()))?;
    Ok(())
}

/// Decode an image file from disk into RGB pixels.
pub fn read_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("decode image {}", path.display()))?;
    Ok(image.into_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn written_frame_reads_back_with_same_size() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("still.jpg");
        let frame = RgbImage::from_pixel(64, 48, Rgb([40, 120, 200]));

        write_jpeg(&frame, &path)?;
        let decoded = read_rgb(&path)?;

        assert_eq!(decoded.dimensions(), (64, 48));
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn short_write_is_reported() {
        let err = write_jpeg(&RgbImage::new(8, 8), Path::new("/dev/full")).unwrap_err();
        assert!(format!("{err:#}").contains("/dev/full"));
    }

    #[test]
    fn reading_missing_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_rgb(&dir.path().join("absent.jpg")).is_err());
    }
}

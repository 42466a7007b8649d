//! Detection overlay.
//!
//! Boxes and captions are drawn with `embedded-graphics` through a draw target
//! that writes straight into an `RgbImage`. Pixels outside the image are
//! clipped, so boxes that spill past the frame edge are still drawn.

use anyhow::{Context, Result};
use embedded_graphics::{
    mono_font::{ascii::FONT_9X15_BOLD, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::Text,
};
use image::{Rgb, RgbImage};
use std::path::Path;

use crate::detect::{is_person_keyword, DetectedObject};
use crate::frame::{read_rgb, write_jpeg};

pub const PERSON_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const OTHER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const STROKE_WIDTH: u32 = 2;
const CAPTION_OFFSET: i32 = 10;

/// Box color for an object name.
pub fn box_color(name: &str) -> Rgb<u8> {
    if is_person_keyword(name) {
        PERSON_COLOR
    } else {
        OTHER_COLOR
    }
}

/// Draw one rectangle and caption per object onto `image`.
///
/// Fails on the first object whose bounding polygon is malformed; objects
/// before it stay drawn.
pub fn annotate(image: &mut RgbImage, objects: &[DetectedObject]) -> Result<()> {
    let (width, height) = image.dimensions();
    let mut target = ImageDrawTarget::new(image);
    for obj in objects {
        let rect = obj
            .bounding
            .to_pixel_rect(width, height)
            .with_context(|| format!("bounding box for '{}'", obj.name))?;
        let Rgb([r, g, b]) = box_color(&obj.name);
        let color = Rgb888::new(r, g, b);

        let _ = Rectangle::with_corners(Point::new(rect.x1, rect.y1), Point::new(rect.x2, rect.y2))
            .into_styled(PrimitiveStyle::with_stroke(color, STROKE_WIDTH))
            .draw(&mut target);

        let caption = format!("{}: {:.2}", obj.name, obj.confidence);
        let style = MonoTextStyle::new(&FONT_9X15_BOLD, color);
        let _ = Text::new(
            &caption,
            Point::new(rect.x1, rect.y1 - CAPTION_OFFSET),
            style,
        )
        .draw(&mut target);
    }
    Ok(())
}

/// Re-read the capture from disk, annotate it, and write the copy.
pub fn annotate_file(
    capture_path: &Path,
    annotated_path: &Path,
    objects: &[DetectedObject],
) -> Result<RgbImage> {
    let mut image = read_rgb(capture_path)?;
    annotate(&mut image, objects)?;
    write_jpeg(&image, annotated_path)?;
    log::info!(
        "annotated {} object(s) into {}",
        objects.len(),
        annotated_path.display()
    );
    Ok(image)
}

struct ImageDrawTarget<'a> {
    image: &'a mut RgbImage,
}

impl<'a> ImageDrawTarget<'a> {
    fn new(image: &'a mut RgbImage) -> Self {
        Self { image }
    }
}

impl OriginDimensions for ImageDrawTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for ImageDrawTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;
        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.y < 0 || coord.x >= width || coord.y >= height {
                continue;
            }
            self.image.put_pixel(
                coord.x as u32,
                coord.y as u32,
                Rgb([color.r(), color.g(), color.b()]),
            );
        }
        Ok(())
    }
}

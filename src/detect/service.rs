use anyhow::Result;

use super::{DetectedLabel, DetectedObject};

/// Remote image annotation service.
///
/// Both calls take the encoded image file bytes and block until the service
/// answers. An empty result is a valid answer, not an error.
pub trait AnnotationService {
    /// Service identifier for logs.
    fn name(&self) -> &'static str;

    /// Objects with normalized bounding polygons.
    fn object_localization(&self, image: &[u8]) -> Result<Vec<DetectedObject>>;

    /// Scene labels without spatial data.
    fn label_detection(&self, image: &[u8]) -> Result<Vec<DetectedLabel>>;
}

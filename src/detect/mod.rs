mod person;
mod result;
mod service;

pub use person::{is_person_keyword, person_detected, PERSON_KEYWORDS};
pub use result::{
    Analysis, BoundingPoly, DetectedLabel, DetectedObject, NormalizedVertex, PixelRect,
};
pub use service::AnnotationService;

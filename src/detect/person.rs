use super::{DetectedLabel, DetectedObject};

/// Names the service uses for people, in English and Spanish.
pub const PERSON_KEYWORDS: [&str; 4] = ["person", "human", "persona", "humano"];

/// Case-insensitive membership in `PERSON_KEYWORDS`.
pub fn is_person_keyword(text: &str) -> bool {
    let text = text.to_lowercase();
    PERSON_KEYWORDS.iter().any(|keyword| *keyword == text)
}

/// Decide whether a person is present.
///
/// Object names are checked first; labels are only consulted when no object
/// matched.
pub fn person_detected(objects: &[DetectedObject], labels: &[DetectedLabel]) -> bool {
    objects.iter().any(|obj| is_person_keyword(&obj.name))
        || labels.iter().any(|label| is_person_keyword(&label.description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingPoly;

    fn object(name: &str) -> DetectedObject {
        DetectedObject {
            name: name.to_string(),
            confidence: 0.8,
            bounding: BoundingPoly::default(),
        }
    }

    fn label(description: &str) -> DetectedLabel {
        DetectedLabel {
            description: description.to_string(),
            confidence: 0.7,
        }
    }

    #[test]
    fn keywords_match_ignoring_case() {
        assert!(is_person_keyword("Person"));
        assert!(is_person_keyword("HUMANO"));
        assert!(is_person_keyword("persona"));
        assert!(!is_person_keyword("personal"));
        assert!(!is_person_keyword("Human face"));
    }

    #[test]
    fn object_match_wins() {
        assert!(person_detected(&[object("Chair"), object("Person")], &[]));
    }

    #[test]
    fn labels_are_a_fallback() {
        assert!(person_detected(&[object("Chair")], &[label("PERSONA")]));
    }

    #[test]
    fn nothing_matches() {
        assert!(!person_detected(&[object("Chair")], &[label("Furniture")]));
        assert!(!person_detected(&[], &[]));
    }
}

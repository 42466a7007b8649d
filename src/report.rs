//! Textual summary printed after analysis.

use std::fmt::Write;

use crate::detect::{person_detected, Analysis};

const VERDICT_DETECTED: &str = "✅ Persona detectada en la imagen.";
const VERDICT_NOT_DETECTED: &str = "❌ No se detectó ninguna persona en la imagen.";

#[derive(Clone, Debug)]
pub struct Report {
    pub person_detected: bool,
    pub analysis: Analysis,
}

impl Report {
    pub fn new(analysis: Analysis) -> Self {
        Self {
            person_detected: person_detected(&analysis.objects, &analysis.labels),
            analysis,
        }
    }

    /// Verdict, then numbered objects, then numbered labels.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let verdict = if self.person_detected {
            VERDICT_DETECTED
        } else {
            VERDICT_NOT_DETECTED
        };
        let _ = writeln!(out, "{verdict}");

        let _ = writeln!(out, "\n--- Objetos Detectados ---");
        if self.analysis.objects.is_empty() {
            let _ = writeln!(out, "No se detectaron objetos.");
        }
        for (i, obj) in self.analysis.objects.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} (Confianza: {:.2})",
                i + 1,
                obj.name,
                obj.confidence
            );
        }

        let _ = writeln!(out, "\n--- Etiquetas Detectadas ---");
        if self.analysis.labels.is_empty() {
            let _ = writeln!(out, "No se detectaron etiquetas.");
        }
        for (i, label) in self.analysis.labels.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} (Confianza: {:.2})",
                i + 1,
                label.description,
                label.confidence
            );
        }
        out
    }
}

//! Stage-tagged errors.
//!
//! Every stage of a run returns `anyhow::Result` internally. At the stage
//! boundary the error is wrapped in a `StageError` so the caller can decide
//! whether the run stops or carries on.

use std::fmt;

/// Pipeline stage an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Credentials,
    Client,
    Capture,
    Analysis,
    Annotation,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Credentials => "credentials",
            Stage::Client => "client",
            Stage::Capture => "capture",
            Stage::Analysis => "analysis",
            Stage::Annotation => "annotation",
        }
    }

    /// Annotation runs after the report is printed, so it never fails the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Stage::Annotation)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised at a stage boundary.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self { stage, cause }
    }

    pub fn is_fatal(&self) -> bool {
        self.stage.is_fatal()
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {:#}", self.stage, self.cause)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Attaches a stage to a fallible step.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageExt<T> for anyhow::Result<T> {
    fn stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|cause| StageError::new(stage, cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn only_annotation_is_recoverable() {
        for stage in [
            Stage::Credentials,
            Stage::Client,
            Stage::Capture,
            Stage::Analysis,
        ] {
            assert!(stage.is_fatal(), "{stage} must be fatal");
        }
        assert!(!Stage::Annotation.is_fatal());
    }

    #[test]
    fn display_names_stage_and_cause() {
        let err: anyhow::Result<()> = Err(anyhow!("device busy"));
        let err = err.stage(Stage::Capture).unwrap_err();
        assert_eq!(err.to_string(), "capture stage failed: device busy");
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::error::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Stage progress on stderr; stdout carries only the report.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    enabled: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self {
            mode,
            is_tty,
            enabled: true,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    /// Silent UI for tests and embedding.
    pub fn quiet() -> Self {
        Self {
            enabled: false,
            ..Self::new(UiMode::Plain, false)
        }
    }

    fn pretty(&self) -> bool {
        self.enabled && self.is_tty && self.mode != UiMode::Plain
    }

    /// Announce a stage. Interactive stages get a plain line, never a spinner.
    pub fn stage(&self, stage: Stage, message: &str) -> StageGuard {
        let interactive = matches!(stage, Stage::Capture | Stage::Annotation);
        if self.pretty() && !interactive {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{message}…"));
            StageGuard::new(stage, message, Some(spinner), true)
        } else {
            if self.enabled {
                eprintln!("==> {}", message);
            }
            StageGuard::new(stage, message, None, self.enabled)
        }
    }
}

pub struct StageGuard {
    stage: Stage,
    message: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
    visible: bool,
}

impl StageGuard {
    fn new(stage: Stage, message: &str, spinner: Option<ProgressBar>, visible: bool) -> Self {
        Self {
            stage,
            message: message.to_string(),
            start: Instant::now(),
            spinner,
            failed: false,
            visible,
        }
    }

    /// Mark the stage as failed; the closing line says so.
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::debug!(
            "stage {} finished in {} (failed: {})",
            self.stage,
            format_duration(elapsed),
            self.failed
        );
        if !self.visible {
            return;
        }
        let mark = if self.failed { "✘" } else { "✔" };
        let line = format!("{} {} ({})", mark, self.message, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(line);
        } else {
            eprintln!("{line}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

//! Single-run detection pipeline.
//!
//! Stages run strictly in order, each wrapped in a `StageError` on failure:
//!
//! 1. Credentials: the configured key file must exist
//! 2. Client: the service handle is built from that file
//! 3. Capture: live preview until Space (keep frame) or Escape (stop)
//! 4. Analysis: object localization, then label detection, on the saved JPEG
//! 5. Annotation: boxes drawn on a re-read copy, saved and shown
//!
//! Annotation failures are logged and the run still completes, since the
//! report is already out. Everything earlier is fatal.

use anyhow::{Context, Result};
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotate::annotate_file;
use crate::config::{CameraSettings, DetectorConfig};
use crate::credentials::check_credentials;
use crate::detect::{Analysis, AnnotationService};
use crate::error::{Stage, StageError, StageExt};
use crate::frame::write_jpeg;
use crate::ingest::{V4l2Config, V4l2Source};
use crate::preview::{FrameDisplay, KeyPress};
use crate::report::Report;
use crate::ui::Ui;

pub const PREVIEW_TITLE: &str = "Presiona ESPACIO para capturar, ESC para salir";
pub const RESULT_TITLE: &str = "Resultado del Análisis";

/// Per-iteration key poll during the live preview.
const KEY_POLL: Duration = Duration::from_millis(1);

/// How a run ended when no fatal error occurred.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Report),
    Cancelled,
}

/// Terminal states of the capture loop.
#[derive(Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured(PathBuf),
    Cancelled,
}

pub struct Pipeline<D, W> {
    config: DetectorConfig,
    display: D,
    out: W,
    ui: Ui,
}

impl<D: FrameDisplay, W: Write> Pipeline<D, W> {
    pub fn new(config: DetectorConfig, display: D, out: W) -> Self {
        Self {
            config,
            display,
            out,
            ui: Ui::quiet(),
        }
    }

    pub fn with_ui(mut self, ui: Ui) -> Self {
        self.ui = ui;
        self
    }

    pub fn into_parts(self) -> (D, W) {
        (self.display, self.out)
    }

    /// Run every stage once.
    ///
    /// `connect` builds the service from the checked credential path; it is
    /// not called when the credential file is missing.
    pub fn run<S, F>(&mut self, connect: F) -> Result<RunOutcome, StageError>
    where
        S: AnnotationService,
        F: FnOnce(&Path) -> Result<S>,
    {
        let credentials = {
            let mut guard = self.ui.stage(Stage::Credentials, "check credentials");
            check_credentials(&self.config.credentials_path)
                .stage(Stage::Credentials)
                .inspect_err(|_| guard.fail())?
        };

        let service = {
            let mut guard = self.ui.stage(Stage::Client, "initialize vision client");
            connect(credentials.as_path())
                .stage(Stage::Client)
                .inspect_err(|_| guard.fail())?
        };
        self.say("Cliente de Vision API inicializado correctamente.")
            .stage(Stage::Client)?;

        let capture_path = self.config.capture_path();
        let captured = {
            let mut guard = self.ui.stage(Stage::Capture, "capture frame");
            capture_frame(
                &self.config.camera,
                &mut self.display,
                &mut self.out,
                &capture_path,
            )
                .stage(Stage::Capture)
                .inspect_err(|_| guard.fail())?
        };
        let capture_path = match captured {
            CaptureOutcome::Captured(path) => {
                self.say(&format!(
                    "Imagen capturada y guardada como '{}'",
                    path.display()
                ))
                .stage(Stage::Capture)?;
                path
            }
            CaptureOutcome::Cancelled => {
                self.say("Captura cancelada.").stage(Stage::Capture)?;
                return Ok(RunOutcome::Cancelled);
            }
        };

        self.say("Analizando imagen con Google Cloud Vision API...")
            .stage(Stage::Analysis)?;
        let analysis = {
            let mut guard = self.ui.stage(Stage::Analysis, "analyze image");
            analyze(&service, &capture_path)
                .stage(Stage::Analysis)
                .inspect_err(|_| guard.fail())?
        };

        let report = Report::new(analysis);
        log::info!(
            "{}: {} object(s), {} label(s), person detected: {}",
            service.name(),
            report.analysis.objects.len(),
            report.analysis.labels.len(),
            report.person_detected
        );
        self.say(&format!("\n{}", report.render()))
            .stage(Stage::Analysis)?;

        let presented = {
            let mut guard = self.ui.stage(Stage::Annotation, "annotate image");
            self.present(&report, &capture_path)
                .stage(Stage::Annotation)
                .inspect_err(|_| guard.fail())
        };
        if let Err(err) = presented {
            if err.is_fatal() {
                return Err(err);
            }
            log::error!("{}", err);
            if let Err(write_err) = self.say(&format!("Error al anotar imagen: {:#}", err.cause)) {
                log::warn!("annotation error not shown: {:#}", write_err);
            }
        }

        Ok(RunOutcome::Completed(report))
    }

    fn present(&mut self, report: &Report, capture_path: &Path) -> Result<()> {
        let annotated_path = self.config.annotated_path();
        let image = annotate_file(capture_path, &annotated_path, &report.analysis.objects)?;

        let mut display = CloseOnDrop::new(&mut self.display);
        display.show(RESULT_TITLE, &image)?;
        writeln!(
            self.out,
            "\nImagen anotada guardada como '{}'",
            annotated_path.display()
        )?;
        writeln!(self.out, "Presiona cualquier tecla para finalizar...")?;
        self.out.flush()?;
        display.wait_key(None)?;
        Ok(())
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").context("write to output")?;
        self.out.flush().context("flush output")
    }
}

/// Preview the camera until the user keeps a frame or cancels.
///
/// The camera is owned by this function and released on return; the window
/// is closed on every path out, errors included. Progress lines go to `out`;
/// no image file is written on cancellation.
pub fn capture_frame<D: FrameDisplay, W: Write>(
    camera: &CameraSettings,
    display: &mut D,
    out: &mut W,
    capture_path: &Path,
) -> Result<CaptureOutcome> {
    writeln!(out, "Inicializando cámara web...")?;
    let mut source = V4l2Source::new(V4l2Config::from(camera))
        .context("No se pudo acceder a la cámara web")?;
    source
        .connect()
        .context("No se pudo acceder a la cámara web")?;
    writeln!(
        out,
        "Cámara inicializada. Presiona ESPACIO para capturar o ESC para salir."
    )?;
    out.flush()?;

    let mut display = CloseOnDrop::new(display);
    loop {
        let frame = source
            .next_frame()
            .context("Error al leer frame desde la cámara")?;
        display.show(PREVIEW_TITLE, &frame)?;

        match display.wait_key(Some(KEY_POLL))? {
            Some(KeyPress::Space) => {
                write_jpeg(&frame, capture_path)?;
                log::info!(
                    "captured {}x{} frame to {}",
                    frame.width(),
                    frame.height(),
                    capture_path.display()
                );
                return Ok(CaptureOutcome::Captured(capture_path.to_path_buf()));
            }
            Some(KeyPress::Escape) => {
                log::info!("capture cancelled");
                return Ok(CaptureOutcome::Cancelled);
            }
            Some(KeyPress::Other) | None => {}
        }
    }
}

/// Send the saved frame for object localization, then label detection.
pub fn analyze<S: AnnotationService + ?Sized>(service: &S, capture_path: &Path) -> Result<Analysis> {
    let content = std::fs::read(capture_path)
        .with_context(|| format!("read captured frame {}", capture_path.display()))?;
    let objects = service
        .object_localization(&content)
        .context("object localization")?;
    let labels = service
        .label_detection(&content)
        .context("label detection")?;
    Ok(Analysis { objects, labels })
}

struct CloseOnDrop<'a, D: FrameDisplay> {
    display: &'a mut D,
}

impl<'a, D: FrameDisplay> CloseOnDrop<'a, D> {
    fn new(display: &'a mut D) -> Self {
        Self { display }
    }
}

impl<D: FrameDisplay> Deref for CloseOnDrop<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.display
    }
}

impl<D: FrameDisplay> DerefMut for CloseOnDrop<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.display
    }
}

impl<D: FrameDisplay> Drop for CloseOnDrop<'_, D> {
    fn drop(&mut self) {
        self.display.close();
    }
}

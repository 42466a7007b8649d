//! person_detector - capture one webcam still and report whether a person is in it.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use person_detector::config::DetectorConfig;
use person_detector::preview::{FrameDisplay, TerminalDisplay};
use person_detector::ui::Ui;
use person_detector::{Pipeline, RunOutcome, Stage, VisionClient};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture a webcam still and ask Cloud Vision whether a person is in it"
)]
struct Args {
    /// Service-account key file (overrides DETECTOR_CREDENTIALS).
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Camera device node, or stub://<name> for a synthetic camera.
    #[arg(long)]
    device: Option<String>,

    /// Directory for captura.jpg and captura_anotada.jpg.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Read keys from the terminal instead of opening a window.
    #[arg(long)]
    no_window: bool,

    /// Progress style: plain or pretty.
    #[arg(long, env = "DETECTOR_UI")]
    ui: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Usando archivo de credenciales: {}",
        config.credentials_path.display()
    );

    let ui = Ui::from_args(args.ui.as_deref(), std::io::stderr().is_terminal());
    let display = open_display(args.no_window);

    let endpoint = config.vision_endpoint.clone();
    let mut pipeline = Pipeline::new(config, display, std::io::stdout()).with_ui(ui);
    match pipeline.run(|credentials| VisionClient::from_service_account_file(&endpoint, credentials)) {
        Ok(RunOutcome::Completed(report)) => {
            log::info!("run complete (person detected: {})", report.person_detected);
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err.cause);
            if err.stage == Stage::Credentials {
                eprintln!("Set --credentials or DETECTOR_CREDENTIALS to the service-account key file.");
            }
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = DetectorConfig::load()?;
    if let Some(path) = &args.credentials {
        config.credentials_path = path.clone();
    }
    if let Some(device) = &args.device {
        config.camera.device = device.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "preview")]
fn open_display(no_window: bool) -> Box<dyn FrameDisplay> {
    if no_window {
        return Box::new(TerminalDisplay::stdin());
    }
    match person_detector::WindowDisplay::new() {
        Ok(window) => Box::new(window),
        Err(err) => {
            log::warn!("{:#}; reading keys from the terminal", err);
            Box::new(TerminalDisplay::stdin())
        }
    }
}

#[cfg(not(feature = "preview"))]
fn open_display(no_window: bool) -> Box<dyn FrameDisplay> {
    if !no_window {
        log::warn!("built without the preview feature; reading keys from the terminal");
    }
    Box::new(TerminalDisplay::stdin())
}

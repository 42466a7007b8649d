//! The `person_detector` binary on a host without a window system.

use std::process::{Command, Stdio};

#[test]
fn missing_credentials_are_reported_without_a_display() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent-key.json");

    let output = Command::new(env!("CARGO_BIN_EXE_person_detector"))
        .arg("--credentials")
        .arg(&missing)
        .arg("--device")
        .arg("stub://cli")
        .arg("--output-dir")
        .arg(dir.path())
        .env_remove("DISPLAY")
        .env_remove("WAYLAND_DISPLAY")
        .env_remove("DETECTOR_CONFIG")
        .env_remove("DETECTOR_UI")
        .env("RUST_LOG", "off")
        .stdin(Stdio::null())
        .output()
        .expect("run person_detector");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(
        stderr.contains("No se encontró el archivo de credenciales en:"),
        "{stderr}"
    );
    assert!(stderr.contains("absent-key.json"), "{stderr}");
    assert!(!dir.path().join("captura.jpg").exists());
}

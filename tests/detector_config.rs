use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use person_detector::config::DetectorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DETECTOR_CONFIG",
        "DETECTOR_CREDENTIALS",
        "DETECTOR_CAMERA_DEVICE",
        "DETECTOR_VISION_ENDPOINT",
        "DETECTOR_OUTPUT_DIR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "credentials_path": "/etc/detector/key.json",
        "camera": {
            "device": "/dev/video2",
            "target_fps": 15,
            "width": 1280,
            "height": 720
        },
        "vision": {
            "endpoint": "https://eu-vision.googleapis.com"
        },
        "output_dir": "/var/tmp/detector"
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("DETECTOR_CONFIG", file.path());
    std::env::set_var("DETECTOR_CAMERA_DEVICE", "stub://desk");
    std::env::set_var("DETECTOR_OUTPUT_DIR", "/tmp/shots");

    let cfg = DetectorConfig::load().expect("load config");

    assert_eq!(cfg.credentials_path, PathBuf::from("/etc/detector/key.json"));
    assert_eq!(cfg.camera.device, "stub://desk");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(cfg.vision_endpoint, "https://eu-vision.googleapis.com");
    assert_eq!(cfg.capture_path(), PathBuf::from("/tmp/shots/captura.jpg"));
    assert_eq!(
        cfg.annotated_path(),
        PathBuf::from("/tmp/shots/captura_anotada.jpg")
    );

    clear_env();
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DetectorConfig::load().expect("load defaults");
    assert_eq!(cfg.credentials_path, PathBuf::from("service-account.json"));
    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!(cfg.vision_endpoint, "https://vision.googleapis.com");
}

#[test]
fn invalid_endpoint_from_env_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECTOR_VISION_ENDPOINT", "not a url");
    assert!(DetectorConfig::load().is_err());

    clear_env();
}

#[test]
fn unreadable_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    std::env::set_var("DETECTOR_CONFIG", file.path());

    let err = DetectorConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}

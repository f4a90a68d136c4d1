//! Configuration file handling

use face_tracker::{
    config::{Config, EXAMPLE_CONFIG},
    Error, Margins,
};
use std::{fs, path::PathBuf};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("face_tracker_{}_{}", std::process::id(), name))
}

#[test]
fn test_file_round_trip() {
    let path = temp_path("round_trip.yaml");
    let mut config = Config::default();
    config.tracking.upsize = Margins::new(0.1, 0.15, 0.35, 0.05);
    config.tracking.track_z = 0.5;
    config.control.kp = 1.5;
    config.detection.interval = 1.0;
    config.debug.faces = true;

    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
}

#[test]
fn test_example_config_loads() {
    let path = temp_path("example.yaml");
    fs::write(&path, EXAMPLE_CONFIG).unwrap();
    let loaded = Config::from_file(&path);
    fs::remove_file(&path).ok();

    let config = loaded.unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Config::from_file(temp_path("does_not_exist.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_out_of_range_file_fails_validation() {
    let path = temp_path("bad.yaml");
    fs::write(&path, "tracking:\n  scale_max: 50.0\n").unwrap();
    let loaded = Config::from_file(&path);
    fs::remove_file(&path).ok();

    let config = loaded.unwrap();
    assert_eq!(config.tracking.scale_max, 50.0);
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
}

use clipwright::config::{
    load_settings, save_settings, validate_settings, ConfigError, Settings,
};
use clipwright::tools::ToolRegistry;
use std::fs;
use tempfile::tempdir;

#[test]
fn config_module_applies_defaults_to_minimal_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "state_root: /var/lib/clipwright\n").expect("write config");

    let settings = load_settings(&path).expect("load");
    assert_eq!(settings.state_root.display().to_string(), "/var/lib/clipwright");
    assert_eq!(settings.public_root, None);
    assert_eq!(settings.step_timeout_seconds, 300);
    assert_eq!(settings.planner.api_base, "https://api.openai.com/v1");
    assert!(settings.tool_binaries.is_empty());
}

#[test]
fn config_module_round_trips_settings() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested/config.yaml");

    let mut settings = Settings::with_state_root("/srv/clipwright");
    settings.public_root = Some("/srv/public".into());
    settings.step_timeout_seconds = 120;
    settings
        .tool_binaries
        .insert("ffmpeg".to_string(), "/opt/ffmpeg/bin/ffmpeg".to_string());

    save_settings(&path, &settings).expect("save");
    let loaded = load_settings(&path).expect("load");
    assert_eq!(loaded, settings);
}

#[test]
fn config_module_validation_rejects_bad_settings() {
    let registry = ToolRegistry::builtin();

    let mut unknown_tool = Settings::with_state_root("/srv/clipwright");
    unknown_tool
        .tool_binaries
        .insert("meltdown".to_string(), "/bin/meltdown".to_string());
    let err = validate_settings(&unknown_tool, &registry).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref reason) if reason.contains("meltdown")));

    let mut zero_timeout = Settings::with_state_root("/srv/clipwright");
    zero_timeout.step_timeout_seconds = 0;
    assert!(validate_settings(&zero_timeout, &registry).is_err());

    let empty_root = Settings::with_state_root("");
    assert!(validate_settings(&empty_root, &registry).is_err());

    let valid = Settings::with_state_root("/srv/clipwright");
    assert!(validate_settings(&valid, &registry).is_ok());
}

#[test]
fn config_module_parse_failure_names_the_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "state_root: [unclosed\n").expect("write config");

    let err = load_settings(&path).unwrap_err();
    assert!(err.to_string().contains("config.yaml"));
}

//! Layered loading, atomic saves, and debounced persistence.

use crate::integration::test_utils::with_env;
use shift_automator::config::{
    AutomatorConfig, ConfigLoader, ConfigStore, DebouncedSaver, CONFIG_DIR_ENV,
};
use shift_automator::types::ShiftKind;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn saved_user_settings_are_loaded_back() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("user");
    let config_dir_str = config_dir.to_string_lossy().into_owned();

    with_env(&[(CONFIG_DIR_ENV, config_dir_str.as_str())], || {
        let mut config = AutomatorConfig::default();
        config.templates.day_folder = PathBuf::from("/srv/templates/day");
        config.templates.night_folder = PathBuf::from("/srv/templates/night");
        config.printer.name = "Ward 3 Laser".to_string();
        config.processing.headers_footers_only = true;
        config.processing.shifts = vec![ShiftKind::Night];
        ConfigStore::user().save(&config).unwrap();

        assert!(config_dir.join("config.toml").is_file());
        let loaded = ConfigLoader::load(None).unwrap();
        assert_eq!(loaded.templates, config.templates);
        assert_eq!(loaded.printer.name, "Ward 3 Laser");
        assert!(loaded.processing.headers_footers_only);
        assert_eq!(loaded.processing.shifts, vec![ShiftKind::Night]);
    });
}

#[test]
fn environment_overrides_the_files() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().to_string_lossy().into_owned();
    let explicit = temp.path().join("site.toml");
    std::fs::write(&explicit, "[retry]\nmax_attempts = 4\ninitial_delay_ms = 500\n").unwrap();

    with_env(
        &[
            (CONFIG_DIR_ENV, config_dir.as_str()),
            ("SHIFT_AUTOMATOR__RETRY__MAX_ATTEMPTS", "6"),
            ("SHIFT_AUTOMATOR__PRINTER__NAME", "Env Printer"),
        ],
        || {
            let config = ConfigLoader::load(Some(&explicit)).unwrap();
            assert_eq!(config.retry.max_attempts, 6);
            assert_eq!(config.retry.initial_delay_ms, 500);
            assert_eq!(config.printer.name, "Env Printer");
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
fn corrupt_user_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().to_string_lossy().into_owned();
    std::fs::write(temp.path().join("config.toml"), "printer = [unterminated").unwrap();

    with_env(&[(CONFIG_DIR_ENV, config_dir.as_str())], || {
        let config = ConfigLoader::load(None).unwrap();
        assert_eq!(config, AutomatorConfig::default());
    });
}

#[test]
fn debounced_saver_keeps_only_the_latest_snapshot() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::new(temp.path().join("config.toml"));
    let saver = DebouncedSaver::new(store.clone(), Duration::from_millis(150));

    let mut config = AutomatorConfig::default();
    for (i, printer) in ["First", "Second", "Third"].iter().enumerate() {
        config.printer.name = printer.to_string();
        config.host.call_timeout_ms = 1_000 * (i as u64 + 1);
        saver.schedule(config.clone());
        std::thread::sleep(Duration::from_millis(50));
    }
    // Each schedule pushed the deadline out; nothing has been written yet.
    assert!(!store.path().exists());

    drop(saver);
    let saved = store.load();
    assert_eq!(saved.printer.name, "Third");
    assert_eq!(saved.host.call_timeout_ms, 3_000);
}

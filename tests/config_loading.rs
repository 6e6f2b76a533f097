use serial_test::serial;
use synthsense::FusionConfig;
use synthsense::config::CONFIG_ENV;

#[test]
#[serial]
fn load_reads_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[calibration]\nconflict_margin = 0.3\n\n[fusion.base_weights]\nsemantic_vision = 0.5\n",
    )
    .unwrap();

    temp_env::with_var(CONFIG_ENV, Some(path.as_os_str()), || {
        let config = FusionConfig::load();
        assert_eq!(config.calibration.conflict_margin, 0.3);
        assert_eq!(config.fusion.base_weight("semantic_vision"), 0.5);
        assert_eq!(
            config.spatial,
            FusionConfig::default().spatial,
            "untouched sections keep defaults"
        );
    });
}

#[test]
#[serial]
fn load_ignores_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[calibration]\nshrinkage = \"lots\"\n").unwrap();

    temp_env::with_var(CONFIG_ENV, Some(path.as_os_str()), || {
        assert_eq!(FusionConfig::load(), FusionConfig::default());
    });
}

#[test]
#[serial]
fn load_without_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    temp_env::with_var(CONFIG_ENV, Some(path.as_os_str()), || {
        assert_eq!(FusionConfig::load(), FusionConfig::default());
    });
}

#[test]
#[serial]
fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    temp_env::with_var(CONFIG_ENV, Some(path.as_os_str()), || {
        let mut config = FusionConfig::default();
        config.calibration.shrinkage = 0.3;
        config.spatial.rows = 5;
        let written = config.save().unwrap();
        assert_eq!(written, path);
        assert_eq!(FusionConfig::load(), config);
    });
}

#[test]
fn rejects_out_of_range_values() {
    let err = FusionConfig::from_toml_str("[spatial]\nrows = 1\n").unwrap_err();
    assert!(err.to_string().contains("spatial"));
}

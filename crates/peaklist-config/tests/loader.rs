use std::fs;

use peaklist_config::{Config, ConfigError, ConfigSource, LoadOptions};
use tempfile::tempdir;

const FULL_CONFIG: &str = r#"
[project]
name = "peak lists"
data-dir = "data"

[[list]]
code = "SPS"
name = "Sierra Peaks Section"
file = "sps.html"
peaks = 247
sections = 24
country = "US"
state = "CA"
rank = 1

[[list]]
code = "DPS"
name = "Desert Peaks Section"
file = "dps.html"
peaks = 99
sections = 9
extra-column = true
rank = 2

[check]
datum-shift-feet = 6.2

[scans]
file = "scans.json"
"#;

#[test]
fn loads_typed_settings_from_working_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".peaklists.toml"), FULL_CONFIG).unwrap();

    let config = Config::load(LoadOptions::default().with_working_dir(dir.path())).unwrap();

    assert_eq!(config.project.name.as_deref(), Some("peak lists"));
    assert_eq!(config.lists.len(), 2);

    let sps = config.list("SPS").unwrap();
    assert_eq!(sps.name, "Sierra Peaks Section");
    assert_eq!(sps.peaks, 247);
    assert_eq!(sps.sections, 24);
    assert_eq!(sps.state, "CA");
    assert!(!sps.extra_column);
    assert!(sps
        .document_path(&config.project)
        .ends_with("data/sps.html"));

    let dps = config.list("DPS").unwrap();
    assert!(dps.extra_column);
    assert_eq!(dps.country, "US");

    assert!((config.check.datum_shift_feet - 6.2).abs() < f64::EPSILON);
    assert!(config.scans.is_some());
    assert!(matches!(config.source, ConfigSource::File { .. }));
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(LoadOptions::default().with_working_dir(dir.path())).unwrap();

    assert!(config.lists.is_empty());
    assert!(matches!(config.source, ConfigSource::Defaults { .. }));
}

#[test]
fn override_path_must_exist() {
    let dir = tempdir().unwrap();
    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(dir.path())
            .with_override_path(dir.path().join("missing.toml")),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}

#[test]
fn rejects_duplicate_codes_and_bad_counts() {
    let dir = tempdir().unwrap();
    let config = r#"
[[list]]
code = "SPS"
name = "One"
file = "one.html"
peaks = 10
sections = 2

[[list]]
code = "SPS"
name = "Two"
file = "two.html"
peaks = 0
sections = 2
"#;
    fs::write(dir.path().join(".peaklists.toml"), config).unwrap();

    let err = Config::load(LoadOptions::default().with_working_dir(dir.path())).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("duplicate code"));
    assert!(rendered.contains("'peaks' must be positive"));
}

#[test]
fn rejects_lowercase_list_codes() {
    let dir = tempdir().unwrap();
    let config = r#"
[[list]]
code = "sps"
name = "One"
file = "one.html"
peaks = 10
sections = 2
"#;
    fs::write(dir.path().join(".peaklists.toml"), config).unwrap();

    let err = Config::load(LoadOptions::default().with_working_dir(dir.path())).unwrap_err();
    assert!(err.to_string().contains("uppercase"));
}

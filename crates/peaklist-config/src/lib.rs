//! Configuration primitives and loader for the peak-list toolkit.
//!
//! The loader resolves `.peaklists.toml` using a short precedence stack:
//! override flag → working directory → built-in defaults. Parsed settings
//! are normalised into typed structures so downstream crates never touch
//! raw TOML.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".peaklists.toml";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub project: ProjectSettings,
    pub lists: Vec<ListSettings>,
    pub check: CheckSettings,
    pub scans: Option<ScanSettings>,
    pub source: ConfigSource,
}

/// Project-level settings anchoring relative paths.
#[derive(Clone, Debug)]
pub struct ProjectSettings {
    pub name: Option<String>,
    pub root: PathBuf,
    pub data_dir: PathBuf,
}

/// One configured peak list and its per-list policies.
#[derive(Clone, Debug)]
pub struct ListSettings {
    pub code: String,
    pub name: String,
    pub file: PathBuf,
    /// Expected totals, used only as a parse-completion check.
    pub peaks: usize,
    pub sections: usize,
    pub country: String,
    pub state: String,
    pub extra_column: bool,
    /// Ordering rank used when serialising alias peer annotations.
    pub rank: u32,
}

impl ListSettings {
    /// Absolute path of the list document.
    pub fn document_path(&self, project: &ProjectSettings) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            project.root.join(&project.data_dir).join(&self.file)
        }
    }
}

/// Settings consumed by check-mode reconciliation.
#[derive(Clone, Debug)]
pub struct CheckSettings {
    /// Constant NGVD29→NAVD88 shift in feet, the fallback when no grid
    /// interpolator is wired in.
    pub datum_shift_feet: f64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        CheckSettings {
            datum_shift_feet: 0.0,
        }
    }
}

/// Location of the topo scan-id table used by the export format.
#[derive(Clone, Debug)]
pub struct ScanSettings {
    pub file: PathBuf,
}

impl ScanSettings {
    pub fn table_path(&self, project: &ProjectSettings) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            project.root.join(&self.file)
        }
    }
}

/// Where the resolved configuration came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigSource {
    Defaults { working_dir: PathBuf },
    File { path: PathBuf },
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Defaults { .. } => "built-in defaults".to_owned(),
            ConfigSource::File { path } => format!("config at {}", path.display()),
        }
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ValidationErrors),
}

/// Collection of validation failures reported together.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, message) in self.messages.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {message}")?;
        }
        Ok(())
    }
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed
    /// settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;

        let config_path = match options.override_path {
            Some(path) => {
                let absolute = make_absolute(&path, &working_dir);
                if !absolute.exists() {
                    return Err(ConfigError::OverrideNotFound { path: absolute });
                }
                Some(absolute)
            }
            None => {
                let candidate = working_dir.join(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        match config_path {
            Some(path) => {
                let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                let parsed: RawConfig =
                    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| working_dir.clone());
                Config::from_raw(parsed, root, ConfigSource::File { path })
            }
            None => Ok(Config::defaults(working_dir)),
        }
    }

    /// Built-in defaults: no lists, working directory as root.
    pub fn defaults(working_dir: PathBuf) -> Self {
        Config {
            project: ProjectSettings {
                name: None,
                root: working_dir.clone(),
                data_dir: PathBuf::from("."),
            },
            lists: Vec::new(),
            check: CheckSettings::default(),
            scans: None,
            source: ConfigSource::Defaults { working_dir },
        }
    }

    /// Look up a configured list by its code.
    pub fn list(&self, code: &str) -> Option<&ListSettings> {
        self.lists.iter().find(|list| list.code == code)
    }

    fn from_raw(raw: RawConfig, root: PathBuf, source: ConfigSource) -> Result<Self, ConfigError> {
        let mut errors = ValidationErrors::default();

        let project = ProjectSettings {
            name: raw.project.as_ref().and_then(|p| p.name.clone()),
            root,
            data_dir: raw
                .project
                .as_ref()
                .and_then(|p| p.data_dir.clone())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let mut seen_codes: HashSet<String> = HashSet::new();
        let mut lists = Vec::with_capacity(raw.list.len());
        for (idx, entry) in raw.list.into_iter().enumerate() {
            match validate_list(entry, idx, &mut seen_codes) {
                Ok(list) => lists.push(list),
                Err(message) => errors.push(message),
            }
        }

        let check = CheckSettings {
            datum_shift_feet: raw
                .check
                .as_ref()
                .and_then(|c| c.datum_shift_feet)
                .unwrap_or(0.0),
        };

        let scans = raw.scans.and_then(|s| s.file).map(|file| ScanSettings {
            file: PathBuf::from(file),
        });

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(Config {
            project,
            lists,
            check,
            scans,
            source,
        })
    }
}

fn validate_list(
    entry: RawList,
    idx: usize,
    seen_codes: &mut HashSet<String>,
) -> Result<ListSettings, String> {
    let code = entry
        .code
        .ok_or_else(|| format!("list #{}: missing 'code'", idx + 1))?;
    if code.is_empty() || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(format!(
            "list '{code}': code must be one or more uppercase ASCII letters"
        ));
    }
    if !seen_codes.insert(code.clone()) {
        return Err(format!("list '{code}': duplicate code"));
    }

    let name = entry
        .name
        .ok_or_else(|| format!("list '{code}': missing 'name'"))?;
    let file = entry
        .file
        .ok_or_else(|| format!("list '{code}': missing 'file'"))?;

    let peaks = entry.peaks.unwrap_or(0);
    let sections = entry.sections.unwrap_or(0);
    if peaks == 0 {
        return Err(format!("list '{code}': 'peaks' must be positive"));
    }
    if sections == 0 {
        return Err(format!("list '{code}': 'sections' must be positive"));
    }

    let country = entry.country.unwrap_or_else(|| "US".to_owned());
    if country.len() != 2 || !country.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(format!(
            "list '{code}': country must be a two-letter code, got '{country}'"
        ));
    }
    let state = entry.state.unwrap_or_default();
    if !state.is_empty() && (state.len() != 2 || !state.chars().all(|ch| ch.is_ascii_uppercase())) {
        return Err(format!(
            "list '{code}': state must be a two-letter code, got '{state}'"
        ));
    }

    Ok(ListSettings {
        code,
        name,
        file: PathBuf::from(file),
        peaks,
        sections,
        country,
        state,
        extra_column: entry.extra_column.unwrap_or(false),
        rank: entry.rank.unwrap_or(u32::MAX),
    })
}

fn resolve_working_dir(requested: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let dir = match requested {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        })?,
    };
    dir.canonicalize()
        .map_err(|source| ConfigError::WorkingDirectory {
            attempted: dir.clone(),
            source,
        })
}

fn make_absolute(path: &Path, working_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    project: Option<RawProject>,
    #[serde(default)]
    list: Vec<RawList>,
    check: Option<RawCheck>,
    scans: Option<RawScans>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProject {
    name: Option<String>,
    #[serde(rename = "data-dir")]
    data_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawList {
    code: Option<String>,
    name: Option<String>,
    file: Option<String>,
    peaks: Option<usize>,
    sections: Option<usize>,
    country: Option<String>,
    state: Option<String>,
    #[serde(rename = "extra-column")]
    extra_column: Option<bool>,
    rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCheck {
    #[serde(rename = "datum-shift-feet")]
    datum_shift_feet: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScans {
    file: Option<String>,
}

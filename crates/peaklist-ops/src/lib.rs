//! High-level operations shared by peaklist commands: batch loading,
//! alias resolution, round-trip rewriting, check-mode reconciliation,
//! export, statistics, and climb history.

mod check;
mod diff;
mod export;
mod resolve;
mod stats;

pub use check::{
    run_check, ConstantShift, DatumShift, ExternalRecord, RecordSource, UnknownRecordTarget,
};
pub use export::{build_features, NoScans, ScanResolver, ScanTable};
pub use resolve::{resolve_aliases, ResolveError};
pub use stats::{build_history, build_stats};

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use peaklist_config::{Config, ListSettings};
use peaklist_format::{
    render_check_report, render_geojson, render_history, render_stats,
};
use peaklist_model::RunContext;
use peaklist_parser::{parse_document, write_document, Document, ParseError};

/// Operation bundle constructed once from resolved configuration.
pub struct Operations {
    config: Config,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{path}: {source}")]
    Parse { path: PathBuf, source: ParseError },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("unknown list '{code}'{}", suggestion_text(.suggestion))]
    UnknownList {
        code: String,
        suggestion: Option<String>,
    },
    #[error("failed to parse records {path}: {source}")]
    Records {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to parse scan table {path}: {source}")]
    ScanTable {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] UnknownRecordTarget),
}

/// Every configured document parsed into its own entity graph, plus the
/// run-wide registries they share.
pub struct LoadedLists {
    pub documents: Vec<Document>,
    pub ctx: RunContext,
}

#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub code: String,
    /// Compare only; report a diff instead of writing.
    pub check: bool,
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Restrict findings to these lists; empty means all.
    pub codes: Vec<String>,
    pub records: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub code: String,
    pub output: Option<PathBuf>,
}

pub struct ParseOutcome {
    pub rendered: String,
}

pub struct RewriteOutcome {
    pub rendered: String,
    pub changed: bool,
    pub exit_code: i32,
}

pub struct CheckOutcome {
    pub rendered: String,
    pub findings: usize,
    pub exit_code: i32,
}

pub struct ExportOutcome {
    pub rendered: String,
    pub features: usize,
}

pub struct StatsOutcome {
    pub rendered: String,
}

pub struct HistoryOutcome {
    pub rendered: String,
}

impl Operations {
    pub fn new(config: Config) -> Self {
        Operations { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and validate the named lists (all configured lists when empty).
    pub fn parse(&self, codes: &[String]) -> Result<ParseOutcome, OperationError> {
        let settings = self.select_lists(codes)?;

        let mut ctx = RunContext::new();
        let mut rendered = String::new();
        for list in settings {
            let document = self.load_document(list, &mut ctx)?;
            rendered.push_str(&format!(
                "{}: {} peaks in {} sections ok\n",
                list.code,
                document.list.total_peaks(),
                document.list.sections.len()
            ));
        }

        Ok(ParseOutcome { rendered })
    }

    /// Round-trip one list document. In check mode the regenerated text is
    /// compared against the source and a unified diff is reported on any
    /// difference; otherwise the regenerated text is written back.
    pub fn rewrite(&self, options: RewriteOptions) -> Result<RewriteOutcome, OperationError> {
        let list = self.settings(&options.code)?;
        let path = list.document_path(&self.config.project);

        let mut ctx = RunContext::new();
        let contents = read_file(&path)?;
        let document = parse_document(&contents, list, &mut ctx)
            .map_err(|source| OperationError::Parse {
                path: path.clone(),
                source,
            })?;
        let regenerated = write_document(&document, &ctx);

        let diff = diff::build_unified_diff(&contents, &regenerated, &path.to_string_lossy());
        let changed = diff.is_some();

        if options.check {
            return Ok(RewriteOutcome {
                rendered: diff.unwrap_or_default(),
                changed,
                exit_code: i32::from(changed),
            });
        }

        std::fs::write(&path, &regenerated).map_err(|source| OperationError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), changed, "rewrote document");

        Ok(RewriteOutcome {
            rendered: format!("rewrote {}\n", path.display()),
            changed,
            exit_code: 0,
        })
    }

    /// Resolve aliases across all lists, then reconcile the model against
    /// the externally fetched records file.
    pub fn check(&self, options: CheckOptions) -> Result<CheckOutcome, OperationError> {
        for code in &options.codes {
            self.settings(code)?;
        }

        let mut loaded = self.load_all()?;
        resolve_aliases(&mut loaded.documents)?;

        let raw = read_file(&options.records)?;
        let records: Vec<ExternalRecord> =
            serde_json::from_str(&raw).map_err(|source| OperationError::Records {
                path: options.records.clone(),
                source,
            })?;
        let records: Vec<ExternalRecord> = if options.codes.is_empty() {
            records
        } else {
            records
                .into_iter()
                .filter(|record| options.codes.contains(&record.list))
                .collect()
        };

        let shift = ConstantShift(self.config.check.datum_shift_feet);
        let findings = check::run_check(&loaded.documents, &loaded.ctx, &records, &shift)?;
        let rendered = render_check_report(&findings, records.len());

        Ok(CheckOutcome {
            exit_code: i32::from(!findings.is_empty()),
            findings: findings.len(),
            rendered,
        })
    }

    /// Resolve aliases, then emit the canonical feature output for one
    /// list.
    pub fn export(&self, options: ExportOptions) -> Result<ExportOutcome, OperationError> {
        self.settings(&options.code)?;

        let mut loaded = self.load_all()?;
        resolve_aliases(&mut loaded.documents)?;

        let scans: Box<dyn ScanResolver> = match &self.config.scans {
            Some(settings) => Box::new(ScanTable::from_path(
                &settings.table_path(&self.config.project),
            )?),
            None => Box::new(NoScans),
        };

        let collection =
            export::build_features(&loaded.documents, &options.code, &loaded.ctx, scans.as_ref());
        let features = collection.features.len();
        let rendered = render_geojson(&collection);

        if let Some(output) = &options.output {
            std::fs::write(output, &rendered).map_err(|source| OperationError::Io {
                path: output.clone(),
                source,
            })?;
        }

        Ok(ExportOutcome { rendered, features })
    }

    pub fn stats(&self) -> Result<StatsOutcome, OperationError> {
        let loaded = self.load_all()?;
        Ok(StatsOutcome {
            rendered: render_stats(&stats::build_stats(&loaded.documents)),
        })
    }

    pub fn history(&self) -> Result<HistoryOutcome, OperationError> {
        let loaded = self.load_all()?;
        Ok(HistoryOutcome {
            rendered: render_history(&stats::build_history(&loaded.documents)),
        })
    }

    /// Parse every configured list, sharing one set of registries.
    pub fn load_all(&self) -> Result<LoadedLists, OperationError> {
        let mut ctx = RunContext::new();
        let mut documents = Vec::with_capacity(self.config.lists.len());
        for list in &self.config.lists {
            documents.push(self.load_document(list, &mut ctx)?);
        }
        Ok(LoadedLists { documents, ctx })
    }

    fn load_document(
        &self,
        list: &ListSettings,
        ctx: &mut RunContext,
    ) -> Result<Document, OperationError> {
        let path = list.document_path(&self.config.project);
        info!(list = %list.code, path = %path.display(), "parsing document");
        let contents = read_file(&path)?;
        parse_document(&contents, list, ctx).map_err(|source| OperationError::Parse {
            path,
            source,
        })
    }

    fn settings(&self, code: &str) -> Result<&ListSettings, OperationError> {
        self.config.list(code).ok_or_else(|| {
            let codes: Vec<String> = self
                .config
                .lists
                .iter()
                .map(|list| list.code.clone())
                .collect();
            OperationError::UnknownList {
                code: code.to_owned(),
                suggestion: resolve::suggest_code(code, codes.iter()),
            }
        })
    }

    fn select_lists(&self, codes: &[String]) -> Result<Vec<&ListSettings>, OperationError> {
        if codes.is_empty() {
            return Ok(self.config.lists.iter().collect());
        }
        codes.iter().map(|code| self.settings(code)).collect()
    }
}

fn read_file(path: &PathBuf) -> Result<String, OperationError> {
    std::fs::read_to_string(path).map_err(|source| OperationError::Io {
        path: path.clone(),
        source,
    })
}

fn suggestion_text(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(candidate) => format!("; did you mean '{candidate}'?"),
        None => String::new(),
    }
}

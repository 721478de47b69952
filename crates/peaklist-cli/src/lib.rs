use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use peaklist_config::{Config, LoadOptions};
use peaklist_ops::{CheckOptions, ExportOptions, Operations, RewriteOptions};

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    init_tracing();
    let cli = Cli::parse();

    let mut load = LoadOptions::default();
    if let Some(path) = cli.config {
        load = load.with_override_path(path);
    }
    let config = Config::load(load)?;
    let ops = Operations::new(config);

    match cli.command {
        Command::Parse(args) => handle_parse(&ops, args),
        Command::Rewrite(args) => handle_rewrite(&ops, args),
        Command::Check(args) => handle_check(&ops, args),
        Command::Export(args) => handle_export(&ops, args),
        Command::Stats => handle_stats(&ops),
        Command::History => handle_history(&ops),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_parse(ops: &Operations, args: ParseArgs) -> Result<i32> {
    let outcome = ops.parse(&args.lists)?;
    emit(&outcome.rendered)?;
    Ok(0)
}

fn handle_rewrite(ops: &Operations, args: RewriteArgs) -> Result<i32> {
    let outcome = ops.rewrite(RewriteOptions {
        code: args.list,
        check: args.check,
    })?;
    if !outcome.rendered.is_empty() {
        emit(&outcome.rendered)?;
    }
    Ok(outcome.exit_code)
}

fn handle_check(ops: &Operations, args: CheckArgs) -> Result<i32> {
    let outcome = ops.check(CheckOptions {
        codes: args.lists,
        records: args.records,
    })?;
    emit(&outcome.rendered)?;
    Ok(outcome.exit_code)
}

fn handle_export(ops: &Operations, args: ExportArgs) -> Result<i32> {
    let outcome = ops.export(ExportOptions {
        code: args.list,
        output: args.output.clone(),
    })?;
    match &args.output {
        Some(path) => emit(&format!(
            "wrote {} features to {}\n",
            outcome.features,
            path.display()
        ))?,
        None => emit(&outcome.rendered)?,
    }
    Ok(0)
}

fn handle_stats(ops: &Operations) -> Result<i32> {
    emit(&ops.stats()?.rendered)?;
    Ok(0)
}

fn handle_history(ops: &Operations) -> Result<i32> {
    emit(&ops.history()?.rendered)?;
    Ok(0)
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') && !content.is_empty() {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "peaklist",
    about = "Parse, validate, and regenerate peak-register documents",
    version
)]
struct Cli {
    /// Path to a .peaklists.toml overriding discovery
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate list documents
    Parse(ParseArgs),
    /// Regenerate a list document from its parsed model
    Rewrite(RewriteArgs),
    /// Resolve aliases and reconcile against external records
    Check(CheckArgs),
    /// Emit the canonical feature output for one list
    Export(ExportArgs),
    /// Per-list summary statistics
    Stats,
    /// All climbs across lists, chronological
    History,
}

#[derive(Args)]
struct ParseArgs {
    /// List codes to parse; all configured lists when omitted
    #[arg(value_name = "LIST")]
    lists: Vec<String>,
}

#[derive(Args)]
struct RewriteArgs {
    /// List code to rewrite
    #[arg(value_name = "LIST")]
    list: String,
    /// Compare only; print a unified diff instead of writing
    #[arg(long)]
    check: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Restrict checking to these lists
    #[arg(value_name = "LIST")]
    lists: Vec<String>,
    /// JSON file of externally fetched records
    #[arg(long, value_name = "FILE")]
    records: PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    /// List code to export
    #[arg(value_name = "LIST")]
    list: String,
    /// Write the output here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

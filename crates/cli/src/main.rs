//! Docs gatekeeper command-line tool.
//!
//! Offline inspection of the inputs a synchronization run works from:
//! configuration files, the contents index of a docs directory, a saved
//! server index page, and three-way merges of page content.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gatekeeper_core::config::GatekeeperConfig;
use gatekeeper_core::contents::{self, FsDocsTree};
use gatekeeper_core::models::{RowKind, TableRow};
use gatekeeper_core::navigation_table;
use gatekeeper_core::Merger;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Docs gatekeeper command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "gatekeeper",
    version,
    about = "Inspect the inputs of a docs gatekeeper synchronization"
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration file.
    Validate {
        /// Path to the TOML configuration file.
        #[arg(short, long, default_value = "./gatekeeper.toml")]
        config: PathBuf,
    },

    /// Parse and check the contents index of a docs directory.
    Contents {
        /// Documentation directory holding the index file.
        docs_dir: PathBuf,

        /// Index file name inside the docs directory.
        #[arg(long, default_value = "index.md")]
        index_file: String,

        /// Hostname of the document server; links to it are rejected.
        #[arg(long)]
        host: String,
    },

    /// Parse the navigation table of a saved server index page.
    Table {
        /// File holding the index page content.
        file: PathBuf,

        /// Hostname of the document server.
        #[arg(long)]
        host: String,

        /// Print the canonical rendering of the table instead of the rows.
        #[arg(long)]
        render: bool,
    },

    /// Three-way merge of page content.
    Merge {
        /// Content at the last synchronization.
        base: PathBuf,
        /// Content on the server.
        theirs: PathBuf,
        /// Local content.
        ours: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Validate { config } => cmd_validate(&config, cli.json),
        Commands::Contents {
            docs_dir,
            index_file,
            host,
        } => cmd_contents(&docs_dir, &index_file, &host, cli.json),
        Commands::Table { file, host, render } => cmd_table(&file, &host, render, cli.json),
        Commands::Merge { base, theirs, ours } => cmd_merge(&base, &theirs, &ours),
    }
}

fn read(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "reading input file");
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_validate(config_path: &Path, json: bool) -> Result<ExitCode> {
    let mut config =
        GatekeeperConfig::load_from_file(config_path).context("failed to parse configuration")?;

    // Missing credentials are reported, not fatal: offline commands never
    // talk to the server.
    let env_result = config.resolve_env_vars();
    let validation = config.validate();

    if json {
        let report = serde_json::json!({
            "config": config_path.display().to_string(),
            "valid": validation.is_ok(),
            "error": validation.as_ref().err().map(ToString::to_string),
            "log_level": config.log_level,
            "host": config.discourse.host,
            "category_id": config.discourse.category_id,
            "credentials": config.discourse.api_username.is_some() && config.discourse.api_key.is_some(),
            "docs_dir": config.docs.dir,
            "index_file": config.docs.index_file,
            "name": config.docs.name,
            "dry_run": config.sync.dry_run,
            "delete_topics": config.sync.delete_topics,
            "base_tag": config.sync.base_tag,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if validation.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    println!("Validating configuration: {}", config_path.display());
    println!();
    println!("  {}", style::success("TOML structure is valid"));
    match &env_result {
        Ok(()) => println!("  {}", style::success("Environment variable references processed")),
        Err(e) => println!("  {}", style::warn(&e.to_string())),
    }
    if let Err(e) = &validation {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  Host          : {}", config.discourse.host);
    println!(
        "  Category      : {}",
        config
            .discourse
            .category_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  API username  : {}",
        style::presence(config.discourse.api_username.as_ref())
    );
    println!(
        "  API key       : {}",
        style::presence(config.discourse.api_key.as_ref())
    );
    println!("  Docs directory: {}", config.docs.dir.display());
    println!("  Index file    : {}", config.docs.index_file);
    println!(
        "  Project name  : {}",
        if config.docs.name.is_empty() {
            style::dim("(none)")
        } else {
            config.docs.name.clone()
        }
    );
    println!("  Dry run       : {}", config.sync.dry_run);
    println!("  Delete topics : {}", config.sync.delete_topics);
    println!("  Base tag      : {}", config.sync.base_tag);
    println!("  Log level     : {}", config.log_level);
    println!();
    println!("Configuration is valid.");

    Ok(ExitCode::SUCCESS)
}

fn cmd_contents(docs_dir: &Path, index_file: &str, host: &str, json: bool) -> Result<ExitCode> {
    let index_path = docs_dir.join(index_file);
    let content = read(&index_path)?;

    if !contents::has_contents_section(&content) {
        println!(
            "{}",
            style::warn(&format!("{} has no contents section", index_path.display()))
        );
        return Ok(ExitCode::SUCCESS);
    }

    let items = contents::from_index(&content, &FsDocsTree::new(docs_dir), host)
        .with_context(|| format!("invalid contents index in {}", index_path.display()))?;

    if json {
        let items: Vec<_> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "rank": item.rank,
                    "hierarchy": item.hierarchy,
                    "title": item.reference_title,
                    "value": item.reference_value,
                    "hidden": item.hidden,
                    "table_path": item.table_path.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!("{}", style::header(&format!("Contents of {}", index_path.display())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Level", "Title", "Reference", "Table path", "Hidden"]);

    for item in &items {
        let title = format!("{}{}", "  ".repeat(item.hierarchy - 1), item.reference_title);
        let reference = if item.is_external(host) {
            Cell::new(&item.reference_value).fg(Color::Blue)
        } else {
            Cell::new(&item.reference_value)
        };
        table.add_row(vec![
            Cell::new(item.rank),
            Cell::new(item.hierarchy),
            Cell::new(title),
            reference,
            Cell::new(item.table_path.to_string()),
            Cell::new(if item.hidden { "yes" } else { "" }).fg(Color::Yellow),
        ]);
    }

    println!("{}", table);
    println!();
    println!("{} item(s)", items.len());

    Ok(ExitCode::SUCCESS)
}

fn cmd_table(file: &Path, host: &str, render: bool, json: bool) -> Result<ExitCode> {
    let content = read(file)?;
    debug!(host, render, "parsing navigation table");
    let rows = navigation_table::parse_rows(&content, host)
        .with_context(|| format!("invalid navigation table in {}", file.display()))?;

    if render {
        println!("{}", navigation_table::render(&rows, host));
        return Ok(ExitCode::SUCCESS);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    if rows.is_empty() {
        println!("No navigation rows found.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Level", "Path", "Title", "Kind", "Link", "Hidden"]);

    for row in &rows {
        table.add_row(vec![
            Cell::new(row.level),
            Cell::new(row.path.to_string()),
            Cell::new(&row.navlink.title),
            kind_cell(row, host),
            Cell::new(row.navlink.target.link().unwrap_or("")),
            Cell::new(if row.navlink.hidden { "yes" } else { "" }).fg(Color::Yellow),
        ]);
    }

    println!("{}", table);
    println!();
    println!("{} row(s)", rows.len());

    Ok(ExitCode::SUCCESS)
}

fn kind_cell(row: &TableRow, host: &str) -> Cell {
    match row.kind(host) {
        RowKind::Group => Cell::new("group").fg(Color::Cyan),
        RowKind::ExternalRef => Cell::new("external").fg(Color::Blue),
        RowKind::Page => Cell::new("page").fg(Color::Green),
    }
}

fn cmd_merge(base: &Path, theirs: &Path, ours: &Path) -> Result<ExitCode> {
    let base = read(base)?;
    let theirs = read(theirs)?;
    let ours = read(ours)?;

    match Merger::merge(&base, &theirs, &ours) {
        Ok(merged) => {
            print!("{}", merged);
            Ok(ExitCode::SUCCESS)
        }
        Err(conflict) => {
            print!("{}", conflict.diff);
            eprintln!("{}", style::error("merge has conflicts"));
            Ok(ExitCode::FAILURE)
        }
    }
}

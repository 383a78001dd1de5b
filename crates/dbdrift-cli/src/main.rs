use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dbdrift_catalog::{adapter_for, Credentials, ExtractScope, SnapshotFileAdapter};
use dbdrift_core::{
    digest, record_digest, ComparisonReport, Config, DiffValue, EndpointConfig, EndpointInfo, ObjectType,
    Snapshot, TypeDiffReport,
};
use dbdrift_engine::DiffEngine;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "dbdrift.toml";

/// Where the JSON report goes when neither the config nor `--output` says
const DEFAULT_REPORT_PATH: &str = "reports/dbdrift-report.json";

/// Process status for detected drift; fatal errors exit with 1
const DRIFT_EXIT_CODE: i32 = 2;

/// dbdrift - Metadata drift detection between two databases
#[derive(Parser)]
#[command(name = "dbdrift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbdrift.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare source and destination metadata
    Compare {
        /// Output file for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Object types to compare (default: everything both sides have)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<ObjectType>,

        /// Attribute path whose sequences are compared by position (repeatable)
        #[arg(long = "ordered")]
        ordered: Vec<String>,

        /// Read the source side from a snapshot file instead of [source]
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Read the destination side from a snapshot file instead of [destination]
        #[arg(long)]
        destination_file: Option<PathBuf>,

        /// Exit with status 2 when any difference is found
        #[arg(long)]
        fail_on_diff: bool,
    },

    /// Extract one endpoint into a snapshot file
    Snapshot {
        /// Which configured endpoint to extract
        #[arg(value_enum, default_value_t = Side::Source)]
        side: Side,

        /// Output file for the snapshot
        #[arg(short, long, default_value = "snapshot.json")]
        output: PathBuf,

        /// Object types to extract (default: all the adapter supports)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<ObjectType>,
    },

    /// Print the definition digest of a file's contents
    Digest {
        /// File to digest
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    Source,
    Destination,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Passwords may live in .env; a missing file is fine.
    let _ = dotenvy::dotenv();

    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Compare {
            output,
            markdown,
            types,
            ordered,
            source_file,
            destination_file,
            fail_on_diff,
        } => {
            let options = CompareOptions {
                output,
                markdown,
                types,
                ordered,
                source_file,
                destination_file,
                fail_on_diff,
            };
            compare_command(&config, options, cli.verbose).await
        }
        Commands::Snapshot { side, output, types } => {
            snapshot_command(&config, side, &output, &types, cli.verbose).await
        }
        Commands::Digest { file } => digest_command(&file),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(config_path) = path {
        return Config::from_file(config_path).with_context(|| format!("loading {}", config_path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return Config::from_file(default_path).with_context(|| format!("loading {}", DEFAULT_CONFIG_FILE));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Command-line overrides for `compare`
struct CompareOptions {
    output: Option<PathBuf>,
    markdown: Option<PathBuf>,
    types: Vec<ObjectType>,
    ordered: Vec<String>,
    source_file: Option<PathBuf>,
    destination_file: Option<PathBuf>,
    fail_on_diff: bool,
}

/// Compare command - extract both sides concurrently and diff them
async fn compare_command(config: &Config, options: CompareOptions, verbose: bool) -> Result<()> {
    let mut compare_config = config.compare.clone();
    if !options.types.is_empty() {
        compare_config = compare_config.with_enabled_types(options.types.iter().copied());
    }
    for pattern in &options.ordered {
        compare_config = compare_config.with_ordered_path(pattern.clone());
    }

    // Validate before touching any database.
    let engine = DiffEngine::new(compare_config)?;

    let source = endpoint_for(config, Side::Source, options.source_file.as_deref())?;
    let destination = endpoint_for(config, Side::Destination, options.destination_file.as_deref())?;

    if verbose {
        eprintln!("{} {}", "Source:".cyan(), source.label());
        eprintln!("{} {}", "Destination:".cyan(), destination.label());
        eprintln!("{}", "Extracting metadata...".cyan());
    }

    let object_types = engine.config().enabled_object_types.as_ref();
    let (source_result, destination_result) = tokio::join!(
        extract(config, &source, object_types),
        extract(config, &destination, object_types),
    );
    let (source_info, source_snapshot) = source_result.context("extracting source metadata")?;
    let (destination_info, destination_snapshot) =
        destination_result.context("extracting destination metadata")?;

    if verbose {
        eprintln!(
            "{} {} source objects, {} destination objects",
            "Extracted".green(),
            source_info.objects,
            destination_info.objects
        );
    }

    let diff = engine.compare(&source_snapshot, &destination_snapshot)?;
    let report = ComparisonReport::new(source_info, destination_info, diff);

    let json_path = options
        .output
        .or_else(|| config.output.json.clone())
        .map(|p| config.resolve_path(&p))
        .unwrap_or_else(|| config.resolve_path(Path::new(DEFAULT_REPORT_PATH)));
    report
        .save_to_file(&json_path)
        .with_context(|| format!("writing {}", json_path.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), json_path.display());
    }

    let markdown_path = options
        .markdown
        .or_else(|| config.output.markdown.clone())
        .map(|p| config.resolve_path(&p));
    if let Some(md_path) = markdown_path {
        if let Some(parent) = md_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&md_path, generate_markdown_report(&report))
            .with_context(|| format!("writing {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_comparison_summary(&report);

    if let Some(code) = drift_exit_code(&report, options.fail_on_diff || config.output.fail_on_diff) {
        std::process::exit(code);
    }

    Ok(())
}

/// Endpoint for one side: a snapshot-file override or the configured section
fn endpoint_for(config: &Config, side: Side, file: Option<&Path>) -> Result<EndpointConfig> {
    if let Some(file) = file {
        let path = std::env::current_dir()?.join(file);
        return Ok(EndpointConfig::new("snapshot").with_setting("path", path.to_string_lossy()));
    }

    let configured = match side {
        Side::Source => config.source.as_ref(),
        Side::Destination => config.destination.as_ref(),
    };

    configured.cloned().ok_or_else(|| {
        let section = match side {
            Side::Source => "source",
            Side::Destination => "destination",
        };
        anyhow::anyhow!(
            "No [{}] section in {}. Add one with a type and connection settings, \
             or pass --{}-file.",
            section,
            DEFAULT_CONFIG_FILE,
            section
        )
    })
}

/// Connect, extract and close one endpoint
///
/// The connection is closed whether or not extraction succeeded.
async fn extract(
    config: &Config,
    endpoint: &EndpointConfig,
    object_types: Option<&BTreeSet<ObjectType>>,
) -> Result<(EndpointInfo, Snapshot)> {
    let mut endpoint = endpoint.clone();
    if let Some(path) = endpoint.setting("path").map(PathBuf::from) {
        let resolved = config.resolve_path(&path);
        endpoint.settings.insert("path".to_string(), resolved.to_string_lossy().into_owned());
    }

    let adapter = adapter_for(&endpoint)?;
    let credentials = Credentials::from_endpoint(&endpoint)?;
    let scope = ExtractScope::for_endpoint(&endpoint, object_types);

    let mut connection = adapter
        .connect(&credentials)
        .await
        .with_context(|| format!("connecting to {}", endpoint.label()))?;
    let result = connection.extract(&scope).await;
    connection.close().await;

    let snapshot = result.with_context(|| format!("reading {}", endpoint.label()))?;
    tracing::info!(
        endpoint = %endpoint.label(),
        objects = snapshot.object_count(),
        "extracted metadata"
    );

    let info = EndpointInfo::new(adapter.engine(), endpoint.label(), snapshot.object_count());
    Ok((info, snapshot))
}

/// Snapshot command - freeze one endpoint into a file
async fn snapshot_command(
    config: &Config,
    side: Side,
    output: &Path,
    types: &[ObjectType],
    verbose: bool,
) -> Result<()> {
    let endpoint = endpoint_for(config, side, None)?;
    let object_types: Option<BTreeSet<ObjectType>> =
        (!types.is_empty()).then(|| types.iter().copied().collect());

    if verbose {
        eprintln!("{} {}...", "Extracting".cyan(), endpoint.label());
    }

    let (info, snapshot) = extract(config, &endpoint, object_types.as_ref()).await?;
    SnapshotFileAdapter::write(output, &snapshot).await?;

    if verbose {
        for (object_type, objects) in &snapshot.objects {
            for (key, record) in objects {
                eprintln!("  {} {:<12} {}", record_digest(record)?.dimmed(), object_type, key);
            }
        }
    }

    println!(
        "{} {} objects from {} to {}",
        "✓ Saved".green(),
        info.objects,
        info.label,
        output.display()
    );
    Ok(())
}

/// Digest command - print `<sha256>  <file>`
fn digest_command(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    println!("{}  {}", digest(&text), file.display());
    Ok(())
}

fn count(n: usize, colour: fn(String) -> colored::ColoredString) -> colored::ColoredString {
    if n > 0 {
        colour(n.to_string())
    } else {
        n.to_string().green()
    }
}

/// Print report summary to stdout
fn print_comparison_summary(report: &ComparisonReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Metadata Drift Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Source:      {} ({} objects)", report.source.label, report.source.objects);
    println!("Destination: {} ({} objects)", report.destination.label, report.destination.objects);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Object types compared: {}", summary.object_types);
    println!(
        "  Missing in destination: {}",
        count(summary.missing_in_destination, |s| s.red().bold())
    );
    println!(
        "  Extra in destination:   {}",
        count(summary.extra_in_destination, |s| s.yellow())
    );
    println!("  Mismatched objects:     {}", count(summary.mismatched, |s| s.red().bold()));
    if summary.skipped > 0 {
        println!("  Skipped (limits):       {}", summary.skipped.to_string().yellow());
    }
    println!();

    if report.diff.is_clean() {
        println!("{}", "✓ No drift detected!".green().bold());
    } else {
        println!("{}", "Drift Details:".bold());
        for (object_type, type_report) in report.diff.iter() {
            if !type_report.is_clean() {
                print_type_details(*object_type, type_report);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_type_details(object_type: ObjectType, type_report: &TypeDiffReport) {
    println!("  {}", object_type.to_string().bold());

    for key in &type_report.missing_in_destination {
        println!("    {} {} {}", "-".red().bold(), key, "(missing in destination)".dimmed());
    }
    for key in &type_report.extra_in_destination {
        println!("    {} {} {}", "+".yellow().bold(), key, "(extra in destination)".dimmed());
    }
    for object in &type_report.mismatched {
        println!("    {} {}", "~".cyan().bold(), object.object);
        if let Some(marker) = &object.skipped {
            println!("        {}", marker.to_string().yellow());
        }
        for entry in &object.diffs {
            println!("        {}", entry.path.bold());
            println!("          source:      {}", entry.source_value);
            println!("          destination: {}", entry.destination_value);
        }
    }
}

/// Status to exit with once the reports are written, if any
fn drift_exit_code(report: &ComparisonReport, fail_on_diff: bool) -> Option<i32> {
    (fail_on_diff && report.has_differences()).then_some(DRIFT_EXIT_CODE)
}

/// Inline code span whose fence is longer than any backtick run in `text`
fn md_code(text: &str) -> String {
    let longest = text.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    if longest > 0 {
        format!("{} {} {}", fence, text, fence)
    } else {
        format!("{}{}{}", fence, text, fence)
    }
}

/// Markdown table cells cannot hold pipes or newlines
fn md_table_code(text: &str) -> String {
    md_code(&text.replace('|', "\\|").replace('\n', " "))
}

fn md_cell(value: &DiffValue) -> String {
    match value {
        DiffValue::Absent => format!("_{}_", value),
        DiffValue::Present(_) => md_table_code(&value.to_string()),
    }
}

/// Generate markdown report
fn generate_markdown_report(report: &ComparisonReport) -> String {
    let mut md = String::new();

    md.push_str("# Metadata Drift Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));
    md.push_str(&format!(
        "**Source:** {} ({}, {} objects)\n\n",
        report.source.label, report.source.engine, report.source.objects
    ));
    md.push_str(&format!(
        "**Destination:** {} ({}, {} objects)\n\n",
        report.destination.label, report.destination.engine, report.destination.objects
    ));

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Object types compared: {}\n", summary.object_types));
    md.push_str(&format!("- Missing in destination: {}\n", summary.missing_in_destination));
    md.push_str(&format!("- Extra in destination: {}\n", summary.extra_in_destination));
    md.push_str(&format!("- Mismatched objects: {}\n", summary.mismatched));
    md.push_str(&format!("- Skipped (limits): {}\n", summary.skipped));
    md.push_str(&format!("- Attribute differences: {}\n", summary.attribute_diffs));
    md.push('\n');

    if report.diff.is_clean() {
        md.push_str("✅ **No drift detected!**\n");
        return md;
    }

    for (object_type, type_report) in report.diff.iter() {
        if type_report.is_clean() {
            continue;
        }

        md.push_str(&format!("## {}\n\n", object_type));

        if !type_report.missing_in_destination.is_empty() {
            md.push_str("**Missing in destination:**\n\n");
            for key in &type_report.missing_in_destination {
                md.push_str(&format!("- {}\n", md_code(&key.to_string())));
            }
            md.push('\n');
        }

        if !type_report.extra_in_destination.is_empty() {
            md.push_str("**Extra in destination:**\n\n");
            for key in &type_report.extra_in_destination {
                md.push_str(&format!("- {}\n", md_code(&key.to_string())));
            }
            md.push('\n');
        }

        for object in &type_report.mismatched {
            md.push_str(&format!("### {}\n\n", md_code(&object.object.to_string())));

            if let Some(marker) = &object.skipped {
                md.push_str(&format!("⚠️ {}\n\n", marker));
                continue;
            }

            md.push_str("| Path | Source | Destination |\n");
            md.push_str("|------|--------|-------------|\n");
            for entry in &object.diffs {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    md_table_code(&entry.path),
                    md_cell(&entry.source_value),
                    md_cell(&entry.destination_value)
                ));
            }
            md.push('\n');
        }
    }

    md
}

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

// Import from cct-core
use cct_core::{
    BatchReport, ClauseTable, DocumentOutcome, DocumentProcessor, ExtractionConfig,
    ExtractionProfile, NoopSummarizer, PipelineStages, PlainTextSource, Summarizer,
};

// Import CLI utilities
use cct_extractor::{logging, OpenAiSummarizer, UserSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Native,
    Ocr,
}

impl From<ProfileArg> for ExtractionProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Native => ExtractionProfile::Native,
            ProfileArg::Ocr => ExtractionProfile::Ocr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummarizerArg {
    /// Extractive summary only
    None,
    /// OpenAI-compatible chat completions
    Openai,
}

#[derive(Parser)]
#[command(name = "cct-extractor")]
#[command(about = "Extracts clauses from collective bargaining agreements (CCTs) into a table")]
struct Args {
    /// Text files extracted from the agreement PDFs
    #[arg(required_unless_present_any = ["show_config", "set_api_key"])]
    inputs: Vec<PathBuf>,

    /// Output file (default: <stem>_extraido.csv, or CCTs_Extraidas.csv for several inputs)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Master table to merge the extracted rows into (backed up first)
    #[arg(short, long)]
    master: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in preset: native text layer or OCR output
    #[arg(short, long, value_enum, default_value = "native")]
    profile: ProfileArg,

    /// Summary source
    #[arg(long, value_enum, default_value = "none")]
    summarizer: SummarizerArg,

    /// Model for the openai summarizer (overrides saved settings)
    #[arg(long)]
    model: Option<String>,

    /// Base URL for the openai summarizer (overrides saved settings)
    #[arg(long)]
    api_base: Option<String>,

    /// Save the API key to the user settings file and exit
    #[arg(long)]
    set_api_key: Option<String>,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    show_config: bool,

    /// Print per-step timings for every document
    #[arg(long)]
    timing: bool,

    /// Dump intermediate pipeline outputs per input instead of writing a table
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Some(key) = &args.set_api_key {
        let settings_path = UserSettings::default_path()?;
        let mut settings = UserSettings::load_from(&settings_path)?;
        settings.api_key = Some(key.trim().to_string());
        settings.save_to(&settings_path)?;
        println!(
            "🔑 API key {} saved to: {}",
            UserSettings::masked_key(key.trim()),
            settings_path.display()
        );
        return Ok(());
    }

    let profile = ExtractionProfile::from(args.profile);
    let (config, config_source) = load_config(args.config.as_deref(), profile);

    if args.show_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    println!("📜 CCT Clause Extractor");
    match config_source {
        ConfigSource::File(path) => println!("📋 Loaded config from: {path}"),
        ConfigSource::Fallback(path) => {
            println!("⚠️  Could not load config from: {path}");
            println!("📋 Using {profile} defaults");
        }
        ConfigSource::Defaults => println!("📋 Using {profile} defaults"),
    }

    let summarizer = create_summarizer(&args)?;
    let processor = DocumentProcessor::new(&config, Box::new(PlainTextSource::new()), summarizer)
        .context("Invalid extraction config")?
        .with_profiling(args.timing);
    println!("📝 Summaries: {}", processor.summarizer_name());

    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        return dump_stages(&processor, &args.inputs, &args.stages_dir);
    }

    println!("📄 Processing {} file(s)", args.inputs.len());
    let report = processor.process_batch(&args.inputs);
    print_report(&report);

    if report.all_failed() {
        eprintln!("❌ No document could be processed");
        std::process::exit(1);
    }

    let records = report.into_records();
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.inputs, args.format));
    let table = ClauseTable::from_records(records.clone());
    save_table(&table, &output_path, args.format)?;

    if let Some(master) = &args.master {
        let summary = ClauseTable::merge_into_file(master, records)
            .with_context(|| format!("Failed to merge into master table {}", master.display()))?;
        if let Some(backup) = &summary.backup {
            println!("🗄️  Backup saved to: {}", backup.display());
        }
        println!(
            "🔗 Master table {}: {} existing + {} new -> {} rows",
            master.display(),
            summary.existing_rows,
            summary.new_rows,
            summary.total_rows
        );
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ConfigSource<'a> {
    File(&'a str),
    Fallback(&'a str),
    Defaults,
}

/// A config file that fails to load falls back to the profile preset.
fn load_config(path: Option<&str>, profile: ExtractionProfile) -> (ExtractionConfig, ConfigSource<'_>) {
    match path {
        Some(path) => match ExtractionConfig::load_from_file(path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to load config, using {profile} defaults");
                (ExtractionConfig::for_profile(profile), ConfigSource::Fallback(path))
            }
        },
        None => (ExtractionConfig::for_profile(profile), ConfigSource::Defaults),
    }
}

/// User settings are only read when the openai summarizer needs them.
fn create_summarizer(args: &Args) -> Result<Box<dyn Summarizer>> {
    match args.summarizer {
        SummarizerArg::None => Ok(Box::new(NoopSummarizer)),
        SummarizerArg::Openai => {
            let settings = UserSettings::load_or_default();
            let Some(api_key) = settings.resolve_api_key() else {
                bail!(
                    "The openai summarizer needs an API key: set OPENAI_API_KEY or run with --set-api-key <key>"
                );
            };
            let model = args.model.as_deref().unwrap_or(&settings.model);
            let api_base = args.api_base.as_deref().unwrap_or(&settings.api_base);
            let summarizer = OpenAiSummarizer::new(api_key, model, api_base);
            println!("🤖 Using model {} at {}", summarizer.model(), summarizer.endpoint());
            Ok(Box::new(summarizer))
        }
    }
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match outcome {
            DocumentOutcome::Extracted { path, extraction } => {
                println!("✅ {}", path.display());
                println!("   - Union: {}", extraction.metadata.union_name);
                println!("   - Period: {}", extraction.metadata.period);
                println!(
                    "   - Clauses: {} ({} empty dropped)",
                    extraction.records.len(),
                    extraction.spans_dropped
                );
            }
            DocumentOutcome::Failed { path, error } => {
                eprintln!("❌ {}: {error}", path.display());
            }
        }
    }
    println!(
        "📊 {} succeeded, {} failed, {} clauses",
        report.succeeded(),
        report.failed(),
        report.records().count()
    );
}

/// `<stem>_extraido.<ext>` for a single input, `CCTs_Extraidas.<ext>` otherwise.
fn default_output_path(inputs: &[PathBuf], format: OutputFormat) -> PathBuf {
    let extension = match format {
        OutputFormat::Csv => "csv",
        OutputFormat::Json => "json",
    };
    match inputs {
        [single] => {
            let stem = single
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            single.with_file_name(format!("{stem}_extraido.{extension}"))
        }
        _ => PathBuf::from(format!("CCTs_Extraidas.{extension}")),
    }
}

fn save_table(table: &ClauseTable, output_path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => table.save(output_path)?,
        OutputFormat::Json => fs::write(output_path, table.to_json()?)?,
    }
    println!("💾 {} rows saved to: {}", table.len(), output_path.display());
    Ok(())
}

fn dump_stages(processor: &DocumentProcessor, inputs: &[PathBuf], stages_dir: &Path) -> Result<()> {
    let mut failures = 0;
    for input in inputs {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        match processor.load_document(input) {
            Ok(document) => {
                let stages = processor.capture_stages(&document);
                save_stages(&stages, &stages_dir.join(stem))?;
            }
            Err(e) => {
                eprintln!("❌ Stage dump failed for {}: {e}", input.display());
                failures += 1;
            }
        }
    }

    if !inputs.is_empty() && failures == inputs.len() {
        std::process::exit(1);
    }
    println!("\n✅ All stages dumped to: {}", stages_dir.display());
    Ok(())
}

fn save_stages(stages: &PipelineStages, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    // Stage 1: Entities
    let metadata_path = output_dir.join("stage1_metadata.json");
    fs::write(&metadata_path, serde_json::to_string_pretty(&stages.metadata)?)?;
    println!("  💾 {}", metadata_path.display());

    // Stage 2: Clause spans with their raw content
    let spans_path = output_dir.join("stage2_spans.json");
    fs::write(&spans_path, serde_json::to_string_pretty(&stages.spans)?)?;
    println!("  💾 {} ({} spans)", spans_path.display(), stages.spans.len());

    // Stage 3: Final records
    let records_path = output_dir.join("stage3_records.json");
    fs::write(&records_path, serde_json::to_string_pretty(&stages.records)?)?;
    println!("  💾 {} ({} records)", records_path.display(), stages.records.len());

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "source": stages.source,
        "captured_at": stages.captured_at.to_rfc3339(),
        "union_name": stages.metadata.union_name,
        "period": stages.metadata.period,
        "stage_counts": {
            "spans": stages.spans.len(),
            "records": stages.records.len(),
        }
    });
    let summary_path = output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path.display());

    Ok(())
}

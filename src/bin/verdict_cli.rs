use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use verdict::{
    analysis::AnalysisService,
    config::Config,
    extraction::{DocumentFormat, DocumentUpload},
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "verdict-cli",
    about = "Classify and summarize documents without running the HTTP server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the ranked emotions of a message or a document.
    Classify {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Summarize a document with the configured backend.
    Summarize {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        question: Option<String>,
    },
    /// Classify every supported document under a directory, one JSON line each.
    Scan {
        #[arg(long)]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("failed to load configuration")?;
    let service =
        AnalysisService::from_config(&config).context("failed to initialize analysis service")?;

    match cli.command {
        Command::Classify { text, file } => classify(&service, text, file).await,
        Command::Summarize { file, question } => summarize(&service, &file, question).await,
        Command::Scan { dir } => scan(&service, &dir).await,
    }
}

async fn classify(
    service: &AnalysisService,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let ranked = match (text, file) {
        (Some(text), _) => service.analyze_text(&text).await?,
        (None, Some(path)) => service.analyze_document(read_upload(&path)?).await?,
        (None, None) => bail!("either --text or --file is required"),
    };
    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}

async fn summarize(service: &AnalysisService, file: &Path, question: Option<String>) -> Result<()> {
    let result = service
        .summarize_document(read_upload(file)?, question)
        .await
        .with_context(|| format!("failed to summarize {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn scan(service: &AnalysisService, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut failures = 0usize;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }

        let path = entry.path();
        let line = match classify_path(service, path).await {
            Ok(value) => value,
            Err(err) => {
                failures += 1;
                json!({ "file": path.display().to_string(), "error": format!("{err:#}") })
            }
        };
        println!("{line}");
    }

    if failures > 0 {
        eprintln!("{failures} document(s) could not be classified");
    }
    Ok(())
}

async fn classify_path(service: &AnalysisService, path: &Path) -> Result<serde_json::Value> {
    let ranked = service.analyze_document(read_upload(path)?).await?;
    Ok(json!({
        "file": path.display().to_string(),
        "primary": ranked.primary,
        "primary_score": ranked.primary_score,
        "emotions": ranked.filtered,
    }))
}

fn is_supported(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| DocumentFormat::from_file_name(name) != DocumentFormat::Unsupported)
        .unwrap_or(false)
}

fn read_upload(path: &Path) -> Result<DocumentUpload> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(DocumentUpload::new(file_name, bytes))
}

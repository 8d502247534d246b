use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use docsum::{
    config,
    extraction::{ContentType, DocumentPayload},
    logging,
    pipeline::SummaryPipeline,
};
use serde_json::json;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Summarize a local PDF, text or Word document"
)]
struct Cli {
    /// Document to summarize.
    file: PathBuf,
    /// MIME type to declare instead of guessing from the extension.
    #[arg(long)]
    content_type: Option<String>,
    /// Override the per-chunk word budget.
    #[arg(long)]
    max_words: Option<usize>,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the pipeline reported a failure.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init_cli_tracing();

    let mut config = config::load_config().context("Failed to load configuration")?;
    if let Some(max_words) = cli.max_words {
        config.chunk_max_words = max_words.max(1);
    }

    let bytes = fs::read(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = cli
        .content_type
        .unwrap_or_else(|| guess_content_type(&cli.file).to_string());

    let pipeline =
        SummaryPipeline::from_config(&config).context("Failed to build summarization pipeline")?;

    match pipeline
        .run(DocumentPayload::new(filename, content_type, bytes))
        .await
    {
        Ok(outcome) => {
            println!("{}", outcome.summary.as_str());
            Ok(true)
        }
        Err(failure) => {
            let mut body = json!({ "error": failure.to_string() });
            if let Some(raw) = failure.raw_response() {
                body["raw_response"] = raw.clone();
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(false)
        }
    }
}

fn guess_content_type(path: &std::path::Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .map(|content_type| content_type.as_mime())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::guess_content_type;
    use std::path::Path;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type(Path::new("report.PDF")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            guess_content_type(Path::new("letter.docx")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(
            guess_content_type(Path::new("photo.png")),
            "application/octet-stream"
        );
        assert_eq!(guess_content_type(Path::new("README")), "application/octet-stream");
    }
}

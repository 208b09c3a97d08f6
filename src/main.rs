// src/main.rs
use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_autotag::config::LlmSettings;
use notion_autotag::{
    AppError, BackendKind, ChatCompletionBackend, ClipProcessor, CommandLineInput,
    CompletionBackend, DatabaseTarget, LlmClient, NotionHttpClient, NotionRepository,
    OllamaBackend, PageOutcome, PagePipeline, RetryPolicy, RunConfig, RunTarget, Stage,
};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Exit code when neither a page nor a database was given.
const EXIT_NO_TARGET: u8 = 2;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("notion_autotag.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stdout", Box::new(stdout_appender)),
        )
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Builds the model client for the configured backend.
fn build_llm_client(
    settings: &LlmSettings,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<LlmClient, AppError> {
    let backend: Box<dyn CompletionBackend> = match (settings.backend, &settings.api_key) {
        (BackendKind::Chat, Some(key)) => Box::new(ChatCompletionBackend::new(
            key,
            settings.url.clone(),
            settings.model.clone(),
            timeout,
            retry,
        )?),
        (BackendKind::Chat, None) => {
            return Err(AppError::MissingConfiguration(
                "the chat backend needs an API key".to_string(),
            ))
        }
        (BackendKind::Ollama, _) => Box::new(OllamaBackend::new(
            settings.url.clone(),
            settings.model.clone(),
            timeout,
            retry,
        )?),
    };
    let client = LlmClient::new(backend);
    log::info!(
        "Using {} model {} at {}",
        client.backend_name(),
        settings.model,
        settings.url
    );
    Ok(client)
}

/// Wires the clients together and runs the target.
async fn execute(config: RunConfig, target: RunTarget) -> anyhow::Result<()> {
    let notion = Arc::new(NotionHttpClient::new(
        &config.notion_token,
        config.timeout,
        config.retry.clone(),
    )?);
    let llm = build_llm_client(&config.llm, config.timeout, config.retry.clone())?;

    match &config.stage {
        Stage::Tag => log::info!("Classifying into {} categories", config.catalog.len()),
        Stage::Summarize { category: None } => log::info!("Summarizing unmarked pages"),
        Stage::Summarize {
            category: Some(label),
        } => log::info!("Re-summarizing every page filed under {}", label),
    }

    let repository: Arc<dyn NotionRepository> = notion.clone();
    let pipeline = PagePipeline::new(repository, llm, config.catalog, config.properties);
    let mut processor = ClipProcessor::new(pipeline)
        .stage(config.stage)
        .keep_going(config.keep_going);

    match target {
        RunTarget::Page(id) => {
            let outcome = processor
                .process_single_page(&id)
                .await
                .with_context(|| format!("processing page {}", id))?;
            match outcome {
                PageOutcome::Updated { tags, category } => {
                    log::info!("Page {} updated: [{}] / {}", id, tags.join(", "), category)
                }
                PageOutcome::Summarized { summary } => {
                    log::info!("Page {} summarized ({} characters)", id, summary.chars().count())
                }
                PageOutcome::Skipped(reason) => log::info!("Page {} skipped: {}", id, reason),
            }
        }
        RunTarget::Database {
            target,
            start_cursor,
        } => {
            let query_url = match target {
                DatabaseTarget::QueryUrl(url) => url,
                DatabaseTarget::Id(id) => notion.database_query_url(&id),
            };
            let summary = processor
                .process_database(&query_url, start_cursor)
                .await
                .with_context(|| format!("processing database {}", query_url))?;
            if summary.failed > 0 {
                log::warn!("{} pages could not be processed", summary.failed);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CommandLineInput::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    let mut config = match RunConfig::resolve(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(target) = config.target.take() else {
        log::error!(
            "No page or database given: pass a database URL or --page-id, or set NOTION_DATABASE_URL / NOTION_PAGE_ID"
        );
        return ExitCode::from(EXIT_NO_TARGET);
    };

    match execute(config, target).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Processing failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

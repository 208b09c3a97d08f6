// src/config.rs
use crate::classifier::CategoryCatalog;
use crate::constants::{
    DEFAULT_CATEGORY_PROPERTY, DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_MARKED_PROPERTY, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_PROCESSED_PROPERTY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SUMMARY_PROPERTY, DEFAULT_TAGS_PROPERTY,
    DEFAULT_TITLE_PROPERTY,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::model::PropertyNames;
use crate::pipeline::Stage;
use crate::types::{ApiKey, DatabaseId, NotionToken, PageId, ValidatedUrl};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Database query endpoint, database URL or database ID (defaults to NOTION_DATABASE_URL)
    pub database_url: Option<String>,

    /// Environment file loaded before anything else
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Process a single page instead of a database (defaults to NOTION_PAGE_ID)
    #[arg(long)]
    pub page_id: Option<String>,

    /// Pagination cursor to resume a previous run from
    #[arg(long)]
    pub start_cursor: Option<String>,

    /// Summarize page bodies into the summary property instead of tagging
    #[arg(long, default_value_t = false)]
    pub summarize: bool,

    /// Re-summarize every page filed under this category, summarized or not
    #[arg(long, requires = "summarize")]
    pub category: Option<String>,

    /// Model backend used for tagging and classification
    #[arg(long, value_enum, default_value_t = BackendKind::Chat)]
    pub backend: BackendKind,

    /// Model name (defaults to LLM_MODEL, then the backend's default)
    #[arg(long)]
    pub model: Option<String>,

    /// Model endpoint (defaults to LLM_BASE_URL, then the backend's default)
    #[arg(long)]
    pub llm_url: Option<String>,

    /// Retry a request at most this many times after a network failure (default: retry forever)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// File with one category label per line, replacing the built-in list
    #[arg(long)]
    pub categories_file: Option<PathBuf>,

    /// Log failed page updates and continue with the next page
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    /// Title property name
    #[arg(long, default_value = DEFAULT_TITLE_PROPERTY)]
    pub title_property: String,

    /// Summary property name
    #[arg(long, default_value = DEFAULT_SUMMARY_PROPERTY)]
    pub summary_property: String,

    /// Tags property name
    #[arg(long, default_value = DEFAULT_TAGS_PROPERTY)]
    pub tags_property: String,

    /// Category (select) property name
    #[arg(long, default_value = DEFAULT_CATEGORY_PROPERTY)]
    pub category_property: String,

    /// Processed (checkbox) property name
    #[arg(long, default_value = DEFAULT_PROCESSED_PROPERTY)]
    pub processed_property: String,

    /// Summarized (checkbox) property name
    #[arg(long, default_value = DEFAULT_MARKED_PROPERTY)]
    pub marked_property: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Which model API answers the prompts.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenAI-compatible chat completions (GLM by default)
    Chat,
    /// Local Ollama server
    Ollama,
}

/// Resolved model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: BackendKind,
    /// Present whenever the chat backend is selected.
    pub api_key: Option<ApiKey>,
    pub url: ValidatedUrl,
    pub model: String,
}

/// Where the database pages come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseTarget {
    /// A full query endpoint, used as given.
    QueryUrl(String),
    /// A database id; the query endpoint is built from the API base.
    Id(DatabaseId),
}

/// What a run works on.
#[derive(Debug, Clone, PartialEq)]
pub enum RunTarget {
    Page(PageId),
    Database {
        target: DatabaseTarget,
        start_cursor: Option<String>,
    },
}

/// Resolved run configuration, validated and ready to build the clients.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub notion_token: NotionToken,
    pub llm: LlmSettings,
    /// `None` when neither a page nor a database was given.
    pub target: Option<RunTarget>,
    pub stage: Stage,
    pub catalog: CategoryCatalog,
    pub properties: PropertyNames,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub keep_going: bool,
    pub verbose: bool,
}

impl RunConfig {
    /// Loads the env file, then resolves CLI input against the process environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        load_env_file(&cli.env_file);
        Self::from_sources(cli, |name| std::env::var(name).ok())
    }

    /// Resolves CLI input against an arbitrary variable lookup.
    ///
    /// Credentials are checked before the target, so a missing token is
    /// reported even when there is nothing to do.
    pub fn from_sources<F>(cli: CommandLineInput, env: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let token = var("NOTION_TOKEN").ok_or_else(|| {
            AppError::MissingConfiguration("NOTION_TOKEN environment variable not set".to_string())
        })?;
        let notion_token = NotionToken::new(token)?;

        let llm = resolve_llm(&cli, &var)?;

        let target = match cli.page_id.or_else(|| var("NOTION_PAGE_ID")) {
            Some(page) => Some(RunTarget::Page(PageId::parse(&page)?)),
            None => match cli.database_url.or_else(|| var("NOTION_DATABASE_URL")) {
                Some(database) => Some(RunTarget::Database {
                    target: parse_database_target(&database)?,
                    start_cursor: cli.start_cursor,
                }),
                None => None,
            },
        };

        let catalog = match &cli.categories_file {
            Some(path) => CategoryCatalog::from_file(path)?,
            None => CategoryCatalog::default(),
        };

        let stage = if cli.summarize {
            Stage::Summarize {
                category: cli.category.filter(|c| !c.trim().is_empty()),
            }
        } else {
            Stage::Tag
        };

        let retry = match cli.max_retries {
            Some(retries) => RetryPolicy::bounded(retries.saturating_add(1)),
            None => RetryPolicy::default(),
        };

        Ok(RunConfig {
            notion_token,
            llm,
            target,
            stage,
            catalog,
            properties: PropertyNames {
                title: cli.title_property,
                summary: cli.summary_property,
                tags: cli.tags_property,
                category: cli.category_property,
                processed: cli.processed_property,
                marked: cli.marked_property,
            },
            retry,
            timeout: Duration::from_secs(cli.timeout.max(1)),
            keep_going: cli.keep_going,
            verbose: cli.verbose,
        })
    }
}

fn resolve_llm<F>(cli: &CommandLineInput, var: &F) -> Result<LlmSettings, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let (default_url, default_model) = match cli.backend {
        BackendKind::Chat => (DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_CHAT_MODEL),
        BackendKind::Ollama => (DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL),
    };

    let api_key = match cli.backend {
        BackendKind::Chat => {
            let key = var("GLM_API_KEY")
                .or_else(|| var("LLM_API_KEY"))
                .ok_or_else(|| {
                    AppError::MissingConfiguration(
                        "GLM_API_KEY (or LLM_API_KEY) environment variable not set".to_string(),
                    )
                })?;
            Some(ApiKey::new(key)?)
        }
        BackendKind::Ollama => None,
    };

    let url = cli
        .llm_url
        .clone()
        .or_else(|| var("LLM_BASE_URL"))
        .unwrap_or_else(|| default_url.to_string());
    let model = cli
        .model
        .clone()
        .or_else(|| var("LLM_MODEL"))
        .unwrap_or_else(|| default_model.to_string());

    Ok(LlmSettings {
        backend: cli.backend,
        api_key,
        url: ValidatedUrl::parse(&url)?,
        model,
    })
}

/// A `.../query` endpoint is used as given; anything else must name a database.
pub fn parse_database_target(input: &str) -> Result<DatabaseTarget, AppError> {
    let input = input.trim();
    if input.starts_with("http") && input.trim_end_matches('/').ends_with("/query") {
        let url = ValidatedUrl::parse(input.trim_end_matches('/'))?;
        return Ok(DatabaseTarget::QueryUrl(url.trimmed().to_string()));
    }
    Ok(DatabaseTarget::Id(DatabaseId::parse(input)?))
}

fn load_env_file(path: &Path) {
    match dotenv::from_path(path) {
        Ok(()) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) => log::debug!("No environment file loaded from {}: {}", path.display(), e),
    }
}

// src/pipeline.rs
//! Page processing: tag generation, classification, body summaries and the
//! write-back, driven page by page over a paginated database query.

use crate::api::types::{category_filter, unticked_filter};
use crate::api::{NotionRepository, QueryPager};
use crate::classifier::{CategoryCatalog, CategoryClassifier};
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::model::{paragraph_text, ClipPage, PageUpdate, PropertyNames, SummaryUpdate};
use crate::types::PageId;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Why a page was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The processed checkbox is already ticked.
    AlreadyProcessed,
    /// The page was already handled earlier in this run.
    AlreadyVisited,
    /// There is no summary text to analyze.
    MissingSummary,
    /// Neither tags nor a category could be produced.
    NothingGenerated,
    /// The marked checkbox is already ticked.
    AlreadySummarized,
    /// The page body has no paragraph text.
    EmptyBody,
    /// The model gave no usable summary.
    NoSummaryGenerated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::AlreadyProcessed => "already processed",
            SkipReason::AlreadyVisited => "already visited in this run",
            SkipReason::MissingSummary => "no summary",
            SkipReason::NothingGenerated => "no tags or category generated",
            SkipReason::AlreadySummarized => "already summarized",
            SkipReason::EmptyBody => "no paragraph text",
            SkipReason::NoSummaryGenerated => "no summary generated",
        };
        f.write_str(text)
    }
}

/// What happened to a single page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Updated { tags: Vec<String>, category: String },
    Summarized { summary: String },
    Skipped(SkipReason),
}

/// The work a run does on each page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stage {
    /// Tags and a category derived from the summary property.
    #[default]
    Tag,
    /// A summary of the page body. With a category, every page filed under
    /// it is summarized again, marked or not.
    Summarize { category: Option<String> },
}

impl Stage {
    /// Query filter selecting the pages this stage works on.
    fn filter(&self, names: &PropertyNames) -> Value {
        match self {
            Stage::Tag => unticked_filter(&names.processed),
            Stage::Summarize { category: None } => unticked_filter(&names.marked),
            Stage::Summarize {
                category: Some(label),
            } => category_filter(&names.category, label),
        }
    }
}

/// Totals for one run over a database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub batches: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Cursor of the last batch fetched; hand it to `--start-cursor` to resume.
    pub last_cursor: Option<String>,
}

impl RunSummary {
    fn record(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Updated { .. } | PageOutcome::Summarized { .. } => self.updated += 1,
            PageOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Takes one page from "fetched" to "written" (or skipped).
pub struct PagePipeline {
    notion: Arc<dyn NotionRepository>,
    llm: LlmClient,
    catalog: CategoryCatalog,
    names: PropertyNames,
}

impl PagePipeline {
    pub fn new(
        notion: Arc<dyn NotionRepository>,
        llm: LlmClient,
        catalog: CategoryCatalog,
        names: PropertyNames,
    ) -> Self {
        Self {
            notion,
            llm,
            catalog,
            names,
        }
    }

    /// Runs the page through generation and classification and writes the
    /// result back in a single update.
    ///
    /// Model failures only degrade the result; the returned error is always
    /// a failed Notion write.
    pub async fn process_page(&self, page: &ClipPage) -> Result<PageOutcome, AppError> {
        let name = page.display_name();

        if page.processed {
            log::info!("{} already processed, skipping", name);
            return Ok(PageOutcome::Skipped(SkipReason::AlreadyProcessed));
        }
        if page.summary.is_empty() {
            log::info!("{} has no summary, skipping", name);
            return Ok(PageOutcome::Skipped(SkipReason::MissingSummary));
        }

        let (tags, summary) = self.generate_tags(name, &page.summary).await;
        let category = CategoryClassifier::new(&self.llm, &self.catalog)
            .classify(&summary, &tags)
            .await;

        if tags.is_empty() && category.is_empty() {
            log::info!("{}: no tags or category generated, skipping", name);
            return Ok(PageOutcome::Skipped(SkipReason::NothingGenerated));
        }

        let update = PageUpdate::new(tags, &category);
        log::info!(
            "Updating {} (tags: [{}], category: {})",
            name,
            update.tags.join(", "),
            update.category
        );
        self.notion
            .update_page(&page.id, &update.to_request_body(&self.names))
            .await?;

        Ok(PageOutcome::Updated {
            tags: update.tags,
            category: update.category,
        })
    }

    /// Tags plus the summary to classify with. On failure the tags are empty
    /// and the page's own summary is used.
    async fn generate_tags(&self, name: &str, text: &str) -> (Vec<String>, String) {
        match self.llm.generate_summary_and_tags(text).await {
            Ok(tagged) => (tagged.tags, tagged.summary),
            Err(e) => {
                log_model_failure(name, "tag generation", &e);
                (Vec::new(), text.to_string())
            }
        }
    }

    /// Summarizes the paragraph text of the page body and writes the summary
    /// together with the marked flag.
    ///
    /// Marked pages are skipped unless `resummarize` is set. Model failures
    /// skip the page; the returned error is always a failed Notion call.
    pub async fn summarize_page(
        &self,
        page: &ClipPage,
        resummarize: bool,
    ) -> Result<PageOutcome, AppError> {
        let name = page.display_name();

        if page.marked && !resummarize {
            log::info!("{} already summarized, skipping", name);
            return Ok(PageOutcome::Skipped(SkipReason::AlreadySummarized));
        }

        let blocks = self.notion.block_children(&page.id).await?;
        let text = paragraph_text(&blocks);
        if text.trim().is_empty() {
            log::info!("{} has no paragraph text, skipping", name);
            return Ok(PageOutcome::Skipped(SkipReason::EmptyBody));
        }

        log::info!("Summarizing {} ({} characters)", name, text.chars().count());
        let summary = match self.llm.summarize(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                log_model_failure(name, "summarization", &e);
                return Ok(PageOutcome::Skipped(SkipReason::NoSummaryGenerated));
            }
        };

        let update = SummaryUpdate::new(summary);
        self.notion
            .update_page(&page.id, &update.to_request_body(&self.names))
            .await?;

        Ok(PageOutcome::Summarized {
            summary: update.summary,
        })
    }

    /// Runs the given stage on one page.
    pub async fn run_stage(&self, stage: &Stage, page: &ClipPage) -> Result<PageOutcome, AppError> {
        match stage {
            Stage::Tag => self.process_page(page).await,
            Stage::Summarize { category } => self.summarize_page(page, category.is_some()).await,
        }
    }
}

fn log_model_failure(name: &str, step: &str, error: &AppError) {
    if error.is_model_data_error() {
        log::warn!("{}: {} gave an unusable answer: {}", name, step, error);
    } else {
        log::warn!("{}: {} failed: {}", name, step, error);
    }
}

/// Walks a database query and feeds every selected page to the pipeline.
pub struct ClipProcessor {
    pipeline: PagePipeline,
    stage: Stage,
    keep_going: bool,
    visited: HashSet<PageId>,
}

impl ClipProcessor {
    pub fn new(pipeline: PagePipeline) -> Self {
        Self {
            pipeline,
            stage: Stage::default(),
            keep_going: false,
            visited: HashSet::new(),
        }
    }

    /// Selects what the run does to each page.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Log failed Notion calls for a page and carry on instead of stopping the run.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Processes every page the stage selects, batch by batch.
    ///
    /// # Arguments
    ///
    /// * `query_url` - The database query endpoint
    /// * `start_cursor` - Cursor to resume from, `None` for the beginning
    ///
    /// # Returns
    ///
    /// Run totals, or the first Notion error when not keeping going.
    pub async fn process_database(
        &mut self,
        query_url: &str,
        start_cursor: Option<String>,
    ) -> Result<RunSummary, AppError> {
        let filter = self.stage.filter(&self.pipeline.names);
        let mut pager = QueryPager::new(
            self.pipeline.notion.as_ref(),
            query_url,
            filter,
            start_cursor,
        );
        let mut summary = RunSummary::default();

        while let Some(batch) = pager.next_batch().await? {
            if batch.pages.is_empty() {
                if summary.batches == 0 {
                    log::info!("Nothing to process");
                }
                break;
            }

            summary.batches += 1;
            summary.last_cursor = batch.cursor.clone();
            log::info!(
                "Batch {}: {} pages (cursor: {}, more to come: {})",
                summary.batches,
                batch.pages.len(),
                batch.cursor.as_deref().unwrap_or("start"),
                batch.has_more
            );

            for raw in batch.pages {
                match Self::process_raw(&self.pipeline, &self.stage, &mut self.visited, raw).await
                {
                    Ok(outcome) => summary.record(&outcome),
                    Err(PageFailure::Unreadable) => summary.failed += 1,
                    Err(PageFailure::Notion(e)) if self.keep_going => {
                        summary.failed += 1;
                        log::error!("{}", e);
                    }
                    Err(PageFailure::Notion(e)) => {
                        if let Some(cursor) = &batch.cursor {
                            log::error!("Stopping; resume with --start-cursor {}", cursor);
                        }
                        return Err(e);
                    }
                }
            }
        }

        log::info!(
            "Done: {} updated, {} skipped, {} failed over {} batches",
            summary.updated,
            summary.skipped,
            summary.failed,
            summary.batches
        );
        Ok(summary)
    }

    async fn process_raw(
        pipeline: &PagePipeline,
        stage: &Stage,
        visited: &mut HashSet<PageId>,
        raw: Value,
    ) -> Result<PageOutcome, PageFailure> {
        let hint = ClipPage::display_name_hint(&raw, &pipeline.names);
        let page = match ClipPage::from_value(raw, &pipeline.names) {
            Ok(page) => page,
            Err(e) => {
                log::error!("Skipping unreadable page {}: {}", hint, e);
                return Err(PageFailure::Unreadable);
            }
        };

        if !visited.insert(page.id.clone()) {
            log::info!("{} already handled in this run, skipping", page.display_name());
            return Ok(PageOutcome::Skipped(SkipReason::AlreadyVisited));
        }

        pipeline.run_stage(stage, &page).await.map_err(|e| {
            log::error!("Failed to update {}", page.display_name());
            PageFailure::Notion(e)
        })
    }

    /// Fetches one page by id and processes it.
    pub async fn process_single_page(&mut self, id: &PageId) -> Result<PageOutcome, AppError> {
        let raw = self
            .pipeline
            .notion
            .retrieve_page(id)
            .await?
            .ok_or_else(|| AppError::PageNotFound(id.to_string()))?;

        let page = ClipPage::from_value(raw, &self.pipeline.names)?;
        self.visited.insert(page.id.clone());
        self.pipeline.run_stage(&self.stage, &page).await
    }
}

enum PageFailure {
    /// The page object could not be read; the run continues.
    Unreadable,
    /// A Notion read or write for the page failed.
    Notion(AppError),
}

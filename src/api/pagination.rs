// src/api/pagination.rs
//! Iterative, resumable walk over a filtered database query.

use super::types::QueryBatch;
use super::NotionRepository;
use crate::error::AppError;
use serde_json::Value;

/// Yields query results one batch at a time, following `next_cursor`
/// until `has_more` is false.
///
/// A failed fetch leaves the pager where it was, so the same batch can be
/// requested again, and [`QueryPager::cursor`] can be handed to a later run.
pub struct QueryPager<'a> {
    repo: &'a dyn NotionRepository,
    query_url: String,
    filter: Value,
    cursor: Option<String>,
    finished: bool,
}

impl<'a> QueryPager<'a> {
    pub fn new(
        repo: &'a dyn NotionRepository,
        query_url: impl Into<String>,
        filter: Value,
        start_cursor: Option<String>,
    ) -> Self {
        Self {
            repo,
            query_url: query_url.into(),
            filter,
            cursor: start_cursor,
            finished: false,
        }
    }

    /// Cursor the next batch will be fetched with.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Fetches the next batch, or `None` once the query is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<QueryBatch>, AppError> {
        if self.finished {
            return Ok(None);
        }

        let response = self
            .repo
            .query_database(&self.query_url, &self.filter, self.cursor.as_deref())
            .await?;

        let batch = QueryBatch {
            cursor: self.cursor.take(),
            pages: response.results,
            has_more: response.has_more,
        };

        match (response.has_more, response.next_cursor) {
            (true, Some(next)) => self.cursor = Some(next),
            (true, None) => {
                log::warn!("Query reported more results but no cursor, stopping");
                self.finished = true;
            }
            (false, _) => self.finished = true,
        }

        Ok(Some(batch))
    }
}

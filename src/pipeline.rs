//! Row pipeline driver shared by both sheet schemas.
//!
//! Per record: keywords -> queries -> proxied search -> URL dedup -> per-URL
//! download, relevance gate, publish-or-delete. A single item's failure is
//! logged and skipped; the row always runs to completion.

use crate::drive::{Publisher, RemoteStore};
use crate::error::Result;
use crate::fetcher;
use crate::queries;
use crate::relevance::{self, GeminiClient};
use crate::search::{self, DispatchMode, SearchClient, SerpResponse};
use crate::sheet::Record;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Aggregate search payload collected for one processed row.
#[derive(Debug, Serialize)]
pub struct RowResult {
    pub category: String,
    pub results: Vec<SerpResponse>,
    pub kept: usize,
    pub dropped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub mode: DispatchMode,
    /// Whether kept pest images go to Drive. Deficiency images always do.
    pub upload_pests: bool,
}

pub struct Pipeline<'a, S> {
    search: &'a SearchClient,
    gemini: &'a GeminiClient,
    publisher: &'a Publisher<S>,
    /// Plain client for candidate downloads; images are fetched directly,
    /// not through the SERP proxy.
    download_http: reqwest::Client,
    image_base_dir: PathBuf,
    snapshot_path: PathBuf,
    options: PipelineOptions,
}

impl<'a, S: RemoteStore> Pipeline<'a, S> {
    pub fn new(
        search: &'a SearchClient,
        gemini: &'a GeminiClient,
        publisher: &'a Publisher<S>,
        image_base_dir: PathBuf,
        snapshot_path: PathBuf,
        options: PipelineOptions,
    ) -> Self {
        Self {
            search,
            gemini,
            publisher,
            download_http: reqwest::Client::new(),
            image_base_dir,
            snapshot_path,
            options,
        }
    }

    /// Drive one record to completion and report its aggregate payload.
    pub async fn run_record(&self, record: &Record) -> Result<RowResult> {
        let keywords = record.keywords();
        let row_queries = queries::generate_queries(queries::templates_for(record), &keywords);

        let snapshot = matches!(self.options.mode, DispatchMode::Sequential)
            .then_some(self.snapshot_path.as_path());
        let results =
            search::get_search_results(self.search, &row_queries, self.options.mode, snapshot)
                .await;
        let urls = search::unique_image_urls(&results);
        info!(
            "'{}': {} unique image urls across {} query results",
            record.file_stem(),
            urls.len(),
            results.len()
        );

        let folder = self.image_base_dir.join(record.file_stem());
        std::fs::create_dir_all(&folder)?;

        let drive_folder_id = if self.should_upload(record) {
            self.publisher.ensure_folder(record.drive_category()).await
        } else {
            None
        };

        let prompt = relevance::prompt_for(record);
        let mut kept = 0;
        let mut dropped = 0;
        let mut failed = 0;

        for (count, url) in urls.iter().enumerate() {
            let file_path = folder.join(format!("{}_image_{}.jpg", record.file_stem(), count));

            if let Err(e) = fetcher::save_image(&self.download_http, url, &file_path).await {
                warn!("error saving image from {url}: {e}");
                failed += 1;
                continue;
            }

            if self.gemini.check_image_relevance(&prompt, &file_path).await {
                kept += 1;
                if let Some(folder_id) = drive_folder_id.as_deref() {
                    self.publisher.upload(&file_path, folder_id).await;
                }
            } else {
                dropped += 1;
                match std::fs::remove_file(&file_path) {
                    Ok(()) => info!("irrelevant image removed: {}", file_path.display()),
                    Err(e) => warn!("error removing {}: {e}", file_path.display()),
                }
            }
        }

        info!(
            "'{}' finished: {kept} kept, {dropped} dropped, {failed} failed",
            record.file_stem()
        );

        Ok(RowResult {
            category: record.file_stem().to_string(),
            results,
            kept,
            dropped,
            failed,
        })
    }

    fn should_upload(&self, record: &Record) -> bool {
        match record {
            Record::Pest(_) => self.options.upload_pests,
            Record::Deficiency(_) => true,
        }
    }
}

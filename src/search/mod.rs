//! Query fan-out, result pooling and URL deduplication.

mod client;

pub use client::{SearchClient, SerpImage, SerpResponse};

use futures_util::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use tracing::error;

/// How the queries of one row hit the SERP endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One query at a time; each batch is snapshotted to `response.json`.
    Sequential,
    /// All queries for the row launched at once over the shared client and
    /// awaited together.
    #[default]
    Concurrent,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "sync" => Ok(DispatchMode::Sequential),
            "concurrent" | "async" => Ok(DispatchMode::Concurrent),
            _ => Err(format!("Unknown mode: {}. Use sequential or concurrent", s)),
        }
    }
}

/// Retrieve SERP results for all queries of one row. Failed queries are
/// dropped from the batch, not surfaced individually.
pub async fn get_search_results(
    client: &SearchClient,
    queries: &[String],
    mode: DispatchMode,
    snapshot_path: Option<&Path>,
) -> Vec<SerpResponse> {
    let results: Vec<SerpResponse> = match mode {
        DispatchMode::Sequential => {
            let mut results = Vec::new();
            for query in queries {
                if let Some(result) = client.fetch_query(query).await {
                    results.push(result);
                }
            }
            results
        }
        DispatchMode::Concurrent => join_all(queries.iter().map(|q| client.fetch_query(q)))
            .await
            .into_iter()
            .flatten()
            .collect(),
    };

    // Sequential runs keep the legacy verbatim snapshot, overwritten per batch.
    if mode == DispatchMode::Sequential {
        if let Some(path) = snapshot_path {
            if let Err(e) = write_snapshot(path, &results) {
                error!("error writing snapshot {}: {e}", path.display());
            }
        }
    }

    results
}

fn write_snapshot(path: &Path, results: &[SerpResponse]) -> crate::error::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Pool the unique image URLs across all of a row's query results, so the
/// same image surfaced by two query phrasings is downloaded once.
pub fn unique_image_urls(results: &[SerpResponse]) -> HashSet<String> {
    results
        .iter()
        .flat_map(|result| result.images.iter())
        .map(|img| img.image.clone())
        .collect()
}

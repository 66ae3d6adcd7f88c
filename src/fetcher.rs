//! Candidate image download / inline data-URI decode.

use crate::error::{DatasetError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tracing::info;

/// Write one candidate image to `file_path`.
///
/// SERP results mix plain URLs with inline `data:image/...` thumbnails; the
/// latter are decoded directly, the former fetched with a plain (unproxied)
/// GET. On failure nothing is written and the caller must skip the URL.
pub async fn save_image(http: &reqwest::Client, image_url: &str, file_path: &Path) -> Result<()> {
    if image_url.starts_with("data:image") {
        let (_, payload) = image_url
            .split_once(',')
            .ok_or_else(|| DatasetError::InvalidDataUri(image_url.to_string()))?;
        let bytes = STANDARD.decode(payload)?;
        std::fs::write(file_path, bytes)?;
    } else {
        let response = http.get(image_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        std::fs::write(file_path, bytes)?;
    }

    info!("image saved at {}", file_path.display());
    Ok(())
}

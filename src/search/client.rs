//! Proxied Google Images SERP client.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const SEARCH_URL: &str = "https://www.google.es/search";
/// Encoded "Spain" geolocation token.
const UULE_SPAIN: &str = "w+CAIQICIFU3BhaW4";
const RESULT_COUNT: &str = "100";

/// One image descriptor out of the SERP envelope. Only `image` is
/// load-bearing; the rest of the object rides along so snapshots stay close
/// to the raw response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpImage {
    pub image: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One parsed JSON response per query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerpResponse {
    #[serde(default)]
    pub images: Vec<SerpImage>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct SearchClient {
    http: reqwest::Client,
}

impl SearchClient {
    /// Client routed through the authenticated forward proxy. Certificate
    /// verification is off: the scraping proxy terminates TLS itself.
    pub fn new(proxy_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(proxy_url)?)
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http })
    }

    /// Exactly one GET per query. Any transport error, timeout or non-200
    /// status collapses to `None` for that query; the batch carries on.
    pub async fn fetch_query(&self, query: &str) -> Option<SerpResponse> {
        info!("fetching results for '{query}'");
        let request = self.http.get(SEARCH_URL).query(&[
            ("q", query),
            ("gl", "es"),
            ("tbm", "isch"),
            ("num", RESULT_COUNT),
            ("location", "Spain"),
            ("uule", UULE_SPAIN),
            ("brd_json", "1"),
        ]);

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    error!("search for '{query}' returned status {status}");
                    return None;
                }
                match response.json::<SerpResponse>().await {
                    Ok(body) => Some(body),
                    Err(e) => {
                        error!("error parsing search response for '{query}': {e}");
                        None
                    }
                }
            }
            Err(e) => {
                error!("error fetching search results for '{query}': {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serp_response_deserialize_envelope() {
        let json = r#"{
            "general": {"search_engine": "google", "query": "pulgón"},
            "images": [
                {"image": "https://example.com/a.jpg", "title": "a"},
                {"image": "data:image/jpeg;base64,/9j/4AAQ", "rank": 2}
            ]
        }"#;
        let response: SerpResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.images.len(), 2);
        assert_eq!(response.images[0].image, "https://example.com/a.jpg");
        assert!(response.extra.contains_key("general"));
        assert_eq!(response.images[1].extra["rank"], 2);
    }

    #[test]
    fn test_serp_response_without_images_list() {
        let response: SerpResponse = serde_json::from_str(r#"{"general": {}}"#).unwrap();
        assert!(response.images.is_empty());
    }

    #[test]
    fn test_serp_response_roundtrip_keeps_envelope() {
        let json = r#"{"images":[{"image":"u","title":"t"}],"general":{"q":"x"}}"#;
        let response: SerpResponse = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&response).unwrap();
        assert_eq!(back["images"][0]["title"], "t");
        assert_eq!(back["general"]["q"], "x");
    }
}

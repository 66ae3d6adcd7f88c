//! Gemini relevance gate.
//!
//! Each downloaded candidate goes to Gemini inline with a JSON-constrained
//! prompt naming the expected category. The gate is fail-closed: any
//! transport or parse failure drops the image.

use crate::error::{DatasetError, Result};
use crate::sheet::Record;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::error;

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Keep threshold: the parsed score must be strictly above this.
const SCORE_THRESHOLD: i64 = 7;

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Keep decision for one downloaded image. Fail-closed.
    pub async fn check_image_relevance(&self, prompt: &str, image_path: &Path) -> bool {
        match self.score_image(prompt, image_path).await {
            Ok(keep) => keep,
            Err(e) => {
                error!(
                    "error checking image relevance for {}: {e}",
                    image_path.display()
                );
                false
            }
        }
    }

    async fn score_image(&self, prompt: &str, image_path: &Path) -> Result<bool> {
        let bytes = std::fs::read(image_path)?;
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 1.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 8192,
                response_mime_type: "application/json".to_string(),
            },
        };

        let text = self.generate(&request).await?;
        parse_verdict(&text)
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{GEMINI_API_URL}?key={}", self.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::ApiCall(format!(
                "Gemini returned status {status}"
            )));
        }

        let body: GeminiResponse = response.json().await?;
        body.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| DatasetError::ApiParse("empty Gemini response".into()))
    }
}

/// Parse the `{score_1_to_10, Final_Verdict}` completion and apply the keep
/// rule: score strictly above 7 AND verdict "Y". The score may arrive as a
/// JSON number or a numeric string; missing fields count as score 0 / no.
pub fn parse_verdict(text: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let score = parse_score(value.get("score_1_to_10"))?;
    let verdict = value
        .get("Final_Verdict")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(score > SCORE_THRESHOLD && verdict == "Y")
}

fn parse_score(value: Option<&serde_json::Value>) -> Result<i64> {
    match value {
        None => Ok(0),
        Some(serde_json::Value::Number(n)) => Ok(n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0)),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DatasetError::ApiParse(format!("non-numeric score: {s}"))),
        Some(other) => Err(DatasetError::ApiParse(format!(
            "unexpected score value: {other}"
        ))),
    }
}

/// Relevance prompt embedding the expected category names of one record.
pub fn prompt_for(record: &Record) -> String {
    match record {
        Record::Pest(p) => format!(
            r#"Please tell me whether the image given is of this or not check thourghly ,
common name: {}
scientific name: {}
Based on your assessment give relevancy score on the scale of 1 to 10."
Return the response strictly in json format:
{{
"score_1_to_10":"numberscore_out_of_10_here",
"Final_Verdict":"Y/N"
}}"#,
            p.common_name, p.scientific_name
        ),
        Record::Deficiency(d) => format!(
            r#"Please tell me whether the image given is of this or not check thourghly ,
characteristics: {}
disorder: {}
Based on your assessment give relevancy score on the scale of 1 to 10."
Return the response strictly in json format:
{{
"score_1_to_10":"numberscore_out_of_10_here",
"Final_Verdict":"Y/N"
}}"#,
            d.characteristic, d.disorder
        ),
    }
}

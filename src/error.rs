use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("sheet name '{0}' not recognized")]
    UnknownSheet(String),

    #[error("column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Excel read error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data URI: {0}")]
    InvalidDataUri(String),

    #[error("API call failed: {0}")]
    ApiCall(String),

    #[error("API response parse failed: {0}")]
    ApiParse(String),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

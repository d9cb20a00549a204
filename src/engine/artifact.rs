//! Model artifact location and retrieval.
//!
//! A model is either a local file or an `http(s)` URL. Both are read fully into
//! memory; the session is created from the bytes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::PredictError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Path(PathBuf),
    Url(String),
}

impl FromStr for ModelSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("model location must not be empty".to_string());
        }
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(ModelSource::Url(s.to_string()))
        } else {
            Ok(ModelSource::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Url(url) => f.write_str(url),
        }
    }
}

impl ModelSource {
    /// Read the artifact bytes.
    pub async fn fetch(&self) -> Result<Vec<u8>, PredictError> {
        let bytes = match self {
            ModelSource::Path(path) => tokio::fs::read(path).await.map_err(|e| {
                PredictError::ModelLoad(format!("failed to read '{}': {e}", path.display()))
            })?,
            ModelSource::Url(url) => {
                let response = reqwest::get(url)
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| PredictError::ModelLoad(format!("failed to fetch '{url}': {e}")))?;
                response
                    .bytes()
                    .await
                    .map_err(|e| PredictError::ModelLoad(format!("failed to download '{url}': {e}")))?
                    .to_vec()
            }
        };

        if bytes.is_empty() {
            return Err(PredictError::ModelLoad(format!("model artifact '{self}' is empty")));
        }
        debug!(model = %self, size = bytes.len(), "fetched model artifact");
        Ok(bytes)
    }
}

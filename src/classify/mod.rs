//! Waste classification against the hosted generative model.
//!
//! The image is sent inline with a fixed prompt; the model answers as a
//! `text/event-stream` whose text fragments are accumulated by
//! [`SseDecoder`] and parsed into a [`ClassificationRecord`].

pub mod extract;
pub mod request;
mod sse_parser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::media::ImageAsset;

pub use extract::parse_response;
pub use sse_parser::{decode_stream, SseDecoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteType {
    CoconutShell,
    BananaStem,
    RiceHusk,
    Unknown,
}

impl WasteType {
    /// Map a model token onto the known types; anything else is `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "coconut_shell" => WasteType::CoconutShell,
            "banana_stem" => WasteType::BananaStem,
            "rice_husk" => WasteType::RiceHusk,
            _ => WasteType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::CoconutShell => "coconut_shell",
            WasteType::BananaStem => "banana_stem",
            WasteType::RiceHusk => "rice_husk",
            WasteType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Result of one classification call. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub detected_type: WasteType,
    pub confidence: Confidence,
    pub guidance: String,
    pub full_response: String,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, asset: &ImageAsset) -> Result<ClassificationRecord>;
}

/// Streams classifications from the configured `streamGenerateContent`
/// endpoint.
pub struct GeminiClassifier {
    http: reqwest::Client,
    endpoint: String,
    app_id: Option<String>,
}

impl GeminiClassifier {
    pub fn new(endpoint: impl Into<String>, app_id: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, app_id)
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        app_id: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            app_id,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ai_endpoint.clone(), config.app_id.clone())
    }

    async fn send(&self, asset: &ImageAsset) -> Result<reqwest::Response> {
        let body = request::build_body(asset);
        debug!(
            endpoint = %self.endpoint,
            media_type = %asset.media_type,
            image_bytes = asset.bytes.len(),
            "Sending classification request"
        );

        let mut req_builder = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(app_id) = &self.app_id {
            req_builder = req_builder.header("X-App-Id", app_id);
        }

        Ok(req_builder.send().await?)
    }

    async fn request_record(&self, asset: &ImageAsset) -> Result<ClassificationRecord> {
        let response = self.send(asset).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<body unreadable: {e}>"));
            return Err(Error::StreamRead(format!(
                "AI API error ({status}): {body}"
            )));
        }

        let record = decode_stream(response.bytes_stream()).await?;
        info!(
            detected_type = record.detected_type.as_str(),
            confidence = record.confidence.as_str(),
            "Waste classified"
        );
        Ok(record)
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, asset: &ImageAsset) -> Result<ClassificationRecord> {
        let result = self.request_record(asset).await;
        if let Err(e) = &result {
            error!(error = %e, endpoint = %self.endpoint, "Classification request failed");
        }
        result
    }
}

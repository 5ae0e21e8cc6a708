//! Shapes that cross into the hosted database and object storage, plus the
//! client-side checks applied before anything is sent there.

mod browse;
mod forms;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::ClassificationRecord;
use crate::error::Result;

pub use browse::{Product, ProductFilter, ALL_MATERIALS};
pub use forms::{FeedbackForm, ListingForm};

pub const DEFAULT_MATERIAL_TYPE: &str = "other";

/// Row inserted into `waste_classifications`; `created_at` is set by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWasteClassification {
    pub farmer_id: String,
    pub image_url: String,
    pub detected_type: String,
    pub confidence: String,
    pub ai_response: String,
}

impl NewWasteClassification {
    pub fn from_record(farmer_id: &str, image_url: &str, record: &ClassificationRecord) -> Self {
        Self {
            farmer_id: farmer_id.to_string(),
            image_url: image_url.to_string(),
            detected_type: record.detected_type.as_str().to_string(),
            confidence: record.confidence.as_str().to_string(),
            ai_response: record.full_response.clone(),
        }
    }
}

/// Row inserted into `products`; status and timestamps are set by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub farmer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub price: f64,
    pub material_type: String,
    pub farmer_phone: String,
}

/// Row inserted into `feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
}

/// Object name for an uploaded image: `{prefix}_{user}_{millis}.{ext}`.
pub fn upload_path(prefix: &str, user_id: &str, timestamp_millis: i64, extension: &str) -> String {
    format!("{prefix}_{user_id}_{timestamp_millis}.{extension}")
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` at `path` and return a publicly resolvable URL.
    async fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Result<String>;
}

#[async_trait]
pub trait ClassificationStore: Send + Sync {
    async fn insert_classification(&self, row: NewWasteClassification) -> Result<()>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, row: NewProduct) -> Result<()>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, row: NewFeedback) -> Result<()>;
}

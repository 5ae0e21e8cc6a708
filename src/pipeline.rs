//! Upload flows: validate, shrink to budget, store, then classify or list.
//!
//! Each step must succeed before the next starts, so a failed upload or
//! classification never leaves a row behind.

use chrono::Utc;
use garde::Validate;
use tracing::info;

use crate::classify::{ClassificationRecord, Classifier};
use crate::error::Result;
use crate::marketplace::{
    upload_path, ClassificationStore, FeedbackForm, FeedbackStore, ImageStore, ListingForm,
    NewFeedback, NewProduct, NewWasteClassification, ProductStore,
};
use crate::media::{
    needs_compression, validate_image_file, CompressionBudget, Compressor, ImageAsset,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Sizes before and after compression, for the user-facing summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressionReport {
    pub fn summary(&self) -> String {
        format!(
            "Image size reduced from {:.2}MB to {:.2}MB",
            self.original_size as f64 / BYTES_PER_MB,
            self.compressed_size as f64 / BYTES_PER_MB
        )
    }
}

/// An asset that passed validation and fits the budget (or hit the floor).
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub asset: ImageAsset,
    pub compression: Option<CompressionReport>,
}

#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub record: ClassificationRecord,
    pub image_url: String,
    pub compression: Option<CompressionReport>,
}

pub struct UploadPipeline<S, C> {
    compressor: Compressor,
    store: S,
    classifier: C,
}

impl<S, C> UploadPipeline<S, C>
where
    S: ImageStore,
    C: Classifier,
{
    pub fn new(budget: CompressionBudget, store: S, classifier: C) -> Self {
        Self {
            compressor: Compressor::new(budget),
            store,
            classifier,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Validate the selection and compress it only when over budget.
    ///
    /// Decoding and the quality ladder run on the blocking pool.
    pub async fn prepare(&self, asset: ImageAsset) -> Result<PreparedImage> {
        validate_image_file(&asset)?;

        if !needs_compression(&asset, self.compressor.budget()) {
            return Ok(PreparedImage {
                asset,
                compression: None,
            });
        }

        let original_size = asset.size();
        let compressor = self.compressor.clone();
        let asset = tokio::task::spawn_blocking(move || compressor.compress(asset)).await??;
        let compression = CompressionReport {
            original_size,
            compressed_size: asset.size(),
        };
        Ok(PreparedImage {
            asset,
            compression: Some(compression),
        })
    }

    /// Upload a waste photo, classify it, and record the result.
    pub async fn classify_waste<R>(
        &self,
        farmer_id: &str,
        asset: ImageAsset,
        rows: &R,
    ) -> Result<ClassificationOutcome>
    where
        R: ClassificationStore,
    {
        let prepared = self.prepare(asset).await?;
        let image_url = self.upload(&prepared.asset, "waste", farmer_id).await?;

        let record = self.classifier.classify(&prepared.asset).await?;
        rows.insert_classification(NewWasteClassification::from_record(
            farmer_id, &image_url, &record,
        ))
        .await?;

        info!(
            %farmer_id,
            %image_url,
            detected_type = record.detected_type.as_str(),
            "Waste classification stored"
        );

        Ok(ClassificationOutcome {
            record,
            image_url,
            compression: prepared.compression,
        })
    }

    /// Validate a listing form, upload its image, and insert the product.
    pub async fn create_listing<R>(
        &self,
        farmer_id: &str,
        form: ListingForm,
        asset: ImageAsset,
        rows: &R,
    ) -> Result<NewProduct>
    where
        R: ProductStore,
    {
        form.validate()?;
        let prepared = self.prepare(asset).await?;
        let image_url = self.upload(&prepared.asset, "product", farmer_id).await?;

        let product = form.into_product(farmer_id, &image_url)?;
        rows.insert_product(product.clone()).await?;

        info!(%farmer_id, title = %product.title, "Product listed");
        Ok(product)
    }

    async fn upload(&self, asset: &ImageAsset, prefix: &str, user_id: &str) -> Result<String> {
        let path = upload_path(
            prefix,
            user_id,
            Utc::now().timestamp_millis(),
            asset.extension(),
        );
        self.store
            .upload(&asset.bytes, &path, &asset.media_type)
            .await
    }
}

/// Validate a feedback form and store it.
pub async fn submit_feedback<R>(
    user_id: Option<&str>,
    form: FeedbackForm,
    rows: &R,
) -> Result<NewFeedback>
where
    R: FeedbackStore,
{
    let feedback = form.into_feedback(user_id)?;
    rows.insert_feedback(feedback.clone()).await?;

    info!(anonymous = user_id.is_none(), "Feedback submitted");
    Ok(feedback)
}

use agricraft_lib::classify::{ClassificationRecord, Classifier, Confidence, WasteType};
use agricraft_lib::marketplace::{
    ClassificationStore, FeedbackForm, FeedbackStore, ImageStore, ListingForm, NewFeedback,
    NewProduct, NewWasteClassification, ProductStore,
};
use agricraft_lib::media::{CompressionBudget, ImageAsset};
use agricraft_lib::pipeline::{submit_feedback, UploadPipeline};
use agricraft_lib::{Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;
use std::io::Cursor;
use std::sync::Mutex;

#[derive(Default)]
struct MemoryStore {
    uploads: Mutex<Vec<(String, String, usize)>>,
    fail: bool,
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Result<String> {
        if self.fail {
            return Err(Error::Storage("bucket unavailable".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://cdn.example/{path}"))
    }
}

struct FixedClassifier {
    result: std::result::Result<ClassificationRecord, String>,
    seen: Mutex<Vec<String>>,
}

impl FixedClassifier {
    fn answering(detected_type: WasteType) -> Self {
        Self {
            result: Ok(ClassificationRecord {
                detected_type,
                confidence: Confidence::High,
                guidance: "Clean and dry.".to_string(),
                full_response: format!("DETECTED TYPE: {}", detected_type.as_str()),
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            result: Err("connection reset".to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, asset: &ImageAsset) -> Result<ClassificationRecord> {
        self.seen.lock().unwrap().push(asset.media_type.clone());
        self.result.clone().map_err(Error::StreamRead)
    }
}

#[derive(Default)]
struct MemoryRows {
    classifications: Mutex<Vec<NewWasteClassification>>,
    products: Mutex<Vec<NewProduct>>,
    feedback: Mutex<Vec<NewFeedback>>,
}

#[async_trait]
impl ClassificationStore for MemoryRows {
    async fn insert_classification(&self, row: NewWasteClassification) -> Result<()> {
        self.classifications.lock().unwrap().push(row);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryRows {
    async fn insert_product(&self, row: NewProduct) -> Result<()> {
        self.products.lock().unwrap().push(row);
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for MemoryRows {
    async fn insert_feedback(&self, row: NewFeedback) -> Result<()> {
        self.feedback.lock().unwrap().push(row);
        Ok(())
    }
}

fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let img = RgbImage::from_fn(width, height, |_, _| Rgb(rng.gen::<[u8; 3]>()));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn small_budget() -> CompressionBudget {
    CompressionBudget {
        max_bytes: 8_000,
        max_dimension: 64,
    }
}

fn listing_form() -> ListingForm {
    ListingForm {
        title: "Rice husk coaster".to_string(),
        description: None,
        price: "120".to_string(),
        phone: "9876543210".to_string(),
        material_type: Some("rice_husk".to_string()),
    }
}

#[tokio::test]
async fn test_small_image_uploaded_as_is() {
    let pipeline = UploadPipeline::new(
        CompressionBudget::default(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::RiceHusk),
    );
    let rows = MemoryRows::default();
    let bytes = noise_png(16, 16);
    let asset = ImageAsset::new("husk.png", "image/png", bytes.clone());

    let outcome = pipeline.classify_waste("farmer-1", asset, &rows).await.unwrap();

    assert!(outcome.compression.is_none());
    assert_eq!(outcome.record.detected_type, WasteType::RiceHusk);
    assert!(outcome.image_url.starts_with("https://cdn.example/waste_farmer-1_"));
    assert!(outcome.image_url.ends_with(".png"));

    let rows = rows.classifications.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].farmer_id, "farmer-1");
    assert_eq!(rows[0].detected_type, "rice_husk");
    assert_eq!(rows[0].confidence, "high");
    assert_eq!(rows[0].image_url, outcome.image_url);
}

#[tokio::test]
async fn test_oversized_image_compressed_before_upload_and_classify() {
    let store = MemoryStore::default();
    let classifier = FixedClassifier::answering(WasteType::CoconutShell);
    let pipeline = UploadPipeline::new(small_budget(), store, classifier);
    let rows = MemoryRows::default();
    let asset = ImageAsset::new("shell photo.png", "image/png", noise_png(200, 100));
    let original_size = asset.size();

    let outcome = pipeline.classify_waste("f2", asset, &rows).await.unwrap();

    let report = outcome.compression.expect("image should have been compressed");
    assert_eq!(report.original_size, original_size);
    assert!(report.compressed_size < original_size);
    assert!(outcome.image_url.ends_with(".jpg"));
    assert_eq!(rows.classifications.lock().unwrap().len(), 1);

    // Storage and the classifier both receive the compressed asset.
    assert_eq!(*pipeline.classifier().seen.lock().unwrap(), ["image/jpeg"]);
    let uploads = pipeline.store().uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let (path, content_type, len) = &uploads[0];
    assert!(path.starts_with("waste_f2_") && path.ends_with(".jpg"), "{path}");
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(*len as u64, report.compressed_size);
}

#[tokio::test]
async fn test_invalid_file_stops_before_upload() {
    let pipeline = UploadPipeline::new(
        CompressionBudget::default(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::RiceHusk),
    );
    let rows = MemoryRows::default();
    let asset = ImageAsset::new("scan.tiff", "image/tiff", vec![0; 10]);

    let err = pipeline
        .classify_waste("f3", asset, &rows)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(rows.classifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_classification_failure_persists_nothing() {
    let pipeline = UploadPipeline::new(
        CompressionBudget::default(),
        MemoryStore::default(),
        FixedClassifier::failing(),
    );
    let rows = MemoryRows::default();
    let asset = ImageAsset::new("husk.png", "image/png", noise_png(8, 8));

    let err = pipeline
        .classify_waste("f4", asset, &rows)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Failed to classify waste. Please try again.");
    assert!(rows.classifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_skips_classification() {
    let store = MemoryStore {
        fail: true,
        ..Default::default()
    };
    let classifier = FixedClassifier::answering(WasteType::BananaStem);
    let pipeline = UploadPipeline::new(CompressionBudget::default(), store, classifier);
    let rows = MemoryRows::default();
    let asset = ImageAsset::new("stem.png", "image/png", noise_png(8, 8));

    let err = pipeline
        .classify_waste("f5", asset, &rows)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert!(rows.classifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_listing() {
    let pipeline = UploadPipeline::new(
        small_budget(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::Unknown),
    );
    let rows = MemoryRows::default();
    let asset = ImageAsset::new("coaster.png", "image/png", noise_png(120, 120));

    let product = pipeline
        .create_listing("farmer-9", listing_form(), asset, &rows)
        .await
        .unwrap();

    assert_eq!(product.price, 120.0);
    assert_eq!(product.material_type, "rice_husk");
    assert!(product.image_url.contains("/product_farmer-9_"));
    assert!(product.image_url.ends_with(".jpg"));
    assert_eq!(rows.products.lock().unwrap().as_slice(), &[product]);
}

#[tokio::test]
async fn test_invalid_listing_uploads_nothing() {
    let pipeline = UploadPipeline::new(
        CompressionBudget::default(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::Unknown),
    );
    let rows = MemoryRows::default();
    let mut form = listing_form();
    form.phone = "not a phone".to_string();
    let asset = ImageAsset::new("coaster.png", "image/png", noise_png(8, 8));

    let err = pipeline
        .create_listing("farmer-9", form, asset, &rows)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Please enter a valid phone number.");
    assert!(rows.products.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_prepare_reports_no_compression_under_budget() {
    let pipeline = UploadPipeline::new(
        CompressionBudget::default(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::Unknown),
    );
    let asset = ImageAsset::new("husk.png", "image/png", noise_png(8, 8));

    let prepared = pipeline.prepare(asset.clone()).await.unwrap();
    assert_eq!(prepared.asset, asset);
    assert!(prepared.compression.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn test_prepare_compresses_on_single_threaded_runtime() {
    let pipeline = UploadPipeline::new(
        small_budget(),
        MemoryStore::default(),
        FixedClassifier::answering(WasteType::Unknown),
    );
    let asset = ImageAsset::new("husk.png", "image/png", noise_png(200, 100));

    let prepared = pipeline.prepare(asset).await.unwrap();
    assert_eq!(prepared.asset.media_type, "image/jpeg");
    assert_eq!(prepared.asset.name, "husk.jpg");
    let report = prepared.compression.unwrap();
    assert_eq!(report.compressed_size, prepared.asset.size());
}

#[tokio::test]
async fn test_submit_feedback() {
    let rows = MemoryRows::default();
    let form = FeedbackForm {
        name: Some("Ravi".to_string()),
        email: None,
        message: "Please add jute".to_string(),
    };

    let feedback = submit_feedback(None, form, &rows).await.unwrap();

    assert_eq!(feedback.user_id, None);
    assert_eq!(rows.feedback.lock().unwrap().as_slice(), &[feedback]);
}

#[tokio::test]
async fn test_blank_feedback_is_not_stored() {
    let rows = MemoryRows::default();
    let form = FeedbackForm {
        message: "   ".to_string(),
        ..Default::default()
    };

    let err = submit_feedback(Some("user-3"), form, &rows).await.unwrap_err();

    assert_eq!(err.to_string(), "Please enter your feedback message.");
    assert!(rows.feedback.lock().unwrap().is_empty());
}

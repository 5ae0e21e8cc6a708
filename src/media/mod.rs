//! Image assets selected for upload: validation and size-budget compression.

mod compress;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};

pub use compress::{
    compress, needs_compression, scaled_dimensions, CompressionBudget, Compressor, JpegQuality,
    QualityEncoder, QUALITY_LADDER,
};
pub use validate::{validate_image_file, ACCEPTED_MEDIA_TYPES};

/// An image selected by the user: raw bytes plus declared media type and
/// display name. Never mutated; compression produces a new asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Image path has no file name")?
            .to_string();
        let media_type = guess_media_type(&name).to_string();
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension used when naming the uploaded object. Falls back to the
    /// whole name when there is no dot.
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

fn guess_media_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Replace the trailing extension of `name` with `ext`, or append it when
/// the name has none.
pub(crate) fn replace_extension(name: &str, ext: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx + 1..].contains('/') => {
            format!("{}.{ext}", &name[..idx])
        }
        _ => format!("{name}.{ext}"),
    }
}

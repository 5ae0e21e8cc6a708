use garde::Validate;

use super::ImageAsset;
use crate::error::Result;

pub const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Borrowed view of the fields checked before an upload is attempted.
#[derive(Validate)]
struct UploadCandidate<'a> {
    #[garde(custom(accepted_media_type))]
    media_type: &'a str,
    #[garde(custom(plain_file_name))]
    name: &'a str,
}

/// Check the media type and file name charset of a selected image.
pub fn validate_image_file(asset: &ImageAsset) -> Result<()> {
    UploadCandidate {
        media_type: &asset.media_type,
        name: &asset.name,
    }
    .validate()?;
    Ok(())
}

fn accepted_media_type(value: &str, _ctx: &()) -> garde::Result {
    if ACCEPTED_MEDIA_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "Invalid file type. Please upload JPEG, PNG, GIF, WEBP, or AVIF images.",
        ))
    }
}

fn plain_file_name(value: &str, _ctx: &()) -> garde::Result {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ');
    if !value.is_empty() && value.chars().all(allowed) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "Filename must contain only English letters and numbers.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn asset(name: &str, media_type: &str) -> ImageAsset {
        ImageAsset::new(name, media_type, vec![1, 2, 3])
    }

    #[test]
    fn test_accepts_supported_types() {
        for media_type in ACCEPTED_MEDIA_TYPES {
            assert!(validate_image_file(&asset("coconut shell_01.jpg", media_type)).is_ok());
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = validate_image_file(&asset("scan.bmp", "image/bmp")).unwrap_err();
        match err {
            Error::Validation(msg) => assert!(msg.starts_with("Invalid file type")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_ascii_name() {
        let err = validate_image_file(&asset("नारियल.jpg", "image/jpeg")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Filename must contain only English letters and numbers."
        );
    }

    #[test]
    fn test_rejects_path_separators() {
        assert!(validate_image_file(&asset("../etc/passwd.png", "image/png")).is_err());
    }

    #[test]
    fn test_type_checked_before_name() {
        let err = validate_image_file(&asset("bad/name.txt", "text/plain")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid file type"));
    }
}

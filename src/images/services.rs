use std::path::PathBuf;

use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error};

use crate::error::{ApiError, ApiResult};

/// Multipart field the analysis endpoint reads the photo from.
pub const IMAGE_FIELD: &str = "image";

/// Photo picked by the user: a local path or a `file://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub uri: String,
}

impl ImageSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn local_path(&self) -> PathBuf {
        let raw = self.uri.strip_prefix("file://").unwrap_or(&self.uri);
        let raw = raw.split('?').next().unwrap_or(raw);
        PathBuf::from(raw)
    }

    pub fn upload_meta(&self) -> UploadMeta {
        UploadMeta::from_uri(&self.uri)
    }
}

/// File name and MIME type declared for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMeta {
    pub file_name: String,
    pub mime: &'static str,
}

impl UploadMeta {
    pub fn from_uri(uri: &str) -> Self {
        let (ext, mime) = match ext_from_uri(uri).as_deref() {
            Some("jpg") => ("jpg", "image/jpeg"),
            Some("jpeg") => ("jpeg", "image/jpeg"),
            Some("png") => ("png", "image/png"),
            Some("gif") => ("gif", "image/gif"),
            Some("webp") => ("webp", "image/webp"),
            _ => ("jpg", "image/jpeg"),
        };
        Self {
            file_name: format!("image.{ext}"),
            mime,
        }
    }
}

/// Lower-cased extension at the end of the URI path (before any query).
fn ext_from_uri(uri: &str) -> Option<String> {
    lazy_static! {
        static ref EXT_RE: Regex = Regex::new(r"\.([a-zA-Z0-9]+)(?:\?|$)").unwrap();
    }
    EXT_RE
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

pub async fn read_image(source: &ImageSource) -> ApiResult<Bytes> {
    let path = source.local_path();
    match tokio::fs::read(&path).await {
        Ok(body) => {
            debug!(path = %path.display(), size = body.len(), "image loaded");
            Ok(Bytes::from(body))
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "reading image failed");
            Err(ApiError::validation("Unable to read the selected image"))
        }
    }
}

pub fn image_form(body: Bytes, meta: &UploadMeta) -> ApiResult<Form> {
    let part = Part::bytes(body.to_vec())
        .file_name(meta.file_name.clone())
        .mime_str(meta.mime)
        .map_err(|e| {
            error!(error = %e, mime = meta.mime, "invalid mime type");
            ApiError::Unknown
        })?;
    Ok(Form::new().part(IMAGE_FIELD, part))
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        let m = UploadMeta::from_uri("file:///tmp/photo.png");
        assert_eq!(m.mime, "image/png");
        assert_eq!(m.file_name, "image.png");
        assert_eq!(UploadMeta::from_uri("/a/b.JPG").mime, "image/jpeg");
        assert_eq!(UploadMeta::from_uri("/a/b.jpeg").file_name, "image.jpeg");
        assert_eq!(UploadMeta::from_uri("/a/b.gif").mime, "image/gif");
        assert_eq!(UploadMeta::from_uri("/a/b.webp?w=200").mime, "image/webp");
    }

    #[test]
    fn unknown_extension_defaults_to_jpeg() {
        let m = UploadMeta::from_uri("ph://ABC-123");
        assert_eq!(m.mime, "image/jpeg");
        assert_eq!(m.file_name, "image.jpg");
        let m = UploadMeta::from_uri("/tmp/scan.heic");
        assert_eq!(m.mime, "image/jpeg");
        assert_eq!(m.file_name, "image.jpg");
    }

    #[test]
    fn local_path_strips_scheme_and_query() {
        let src = ImageSource::new("file:///tmp/meal.png?v=2");
        assert_eq!(src.local_path(), PathBuf::from("/tmp/meal.png"));
        assert_eq!(ImageSource::new("/x/y.jpg").local_path(), PathBuf::from("/x/y.jpg"));
    }

    #[tokio::test]
    async fn missing_file_is_a_validation_error() {
        let err = read_image(&ImageSource::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}

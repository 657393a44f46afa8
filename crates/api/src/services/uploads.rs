//! Local storage for merchant uploads (store logos and KYB documents).
//!
//! Files land in a bucket chosen by form field name under the upload root and
//! are served read-only from `/uploads`. Stored paths are relative to the root
//! so the root can move without rewriting rows.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use chrono::Utc;
use rand::Rng;
use thiserror::Error;

/// Maximum accepted size of one uploaded file.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Errors from storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large, maximum size is {} MB", MAX_UPLOAD_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("{0}")]
    InvalidType(&'static str),

    #[error("failed to read upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Bucket a form field's files are stored in.
#[must_use]
pub fn bucket_for(field: &str) -> &'static str {
    match field {
        "image" => "store-logos",
        "kybDocument" => "kyb-documents",
        _ => "others",
    }
}

/// Check the declared MIME type against what the field accepts.
///
/// # Errors
///
/// Returns [`UploadError::InvalidType`] when the type is not allowed.
pub fn check_content_type(field: &str, content_type: Option<&str>) -> Result<(), UploadError> {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let is_image = content_type.starts_with("image/");
    match field {
        "image" if !is_image => Err(UploadError::InvalidType("Only image files are allowed!")),
        "kybDocument" if !is_image && content_type != "application/pdf" => Err(
            UploadError::InvalidType("Only image and PDF files are allowed for KYB documents!"),
        ),
        _ => Ok(()),
    }
}

/// `.ext` from the client's file name, lowercased; empty when absent or odd.
fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn stored_name(field: &str, file_name: Option<&str>) -> String {
    let field: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{field}-{}-{random}{}",
        Utc::now().timestamp_millis(),
        extension_of(file_name)
    )
}

/// Upload storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and store one multipart file field.
    ///
    /// The body is read chunk by chunk and rejected as soon as it passes
    /// [`MAX_UPLOAD_BYTES`]. Returns the path relative to the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidType`, `TooLarge`, or a read/write failure.
    pub async fn save_field(&self, mut field: Field<'_>) -> Result<String, UploadError> {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        check_content_type(&name, field.content_type())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(UploadError::TooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        self.write(&name, file_name.as_deref(), &bytes).await
    }

    /// Store already-read bytes for `field`.
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` or a write failure.
    pub async fn write(
        &self,
        field: &str,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        let bucket = bucket_for(field);
        tokio::fs::create_dir_all(self.root.join(bucket)).await?;

        let relative = format!("{bucket}/{}", stored_name(field, file_name));
        tokio::fs::write(self.root.join(&relative), bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Delete stored files, logging failures.
    pub async fn remove(&self, relative_paths: &[String]) {
        for relative in relative_paths {
            if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
                tracing::warn!(path = %relative, error = %e, "Failed to remove upload");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> UploadStore {
        UploadStore::new(std::env::temp_dir().join(format!("dm-uploads-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_buckets() {
        assert_eq!(bucket_for("image"), "store-logos");
        assert_eq!(bucket_for("kybDocument"), "kyb-documents");
        assert_eq!(bucket_for("banner"), "others");
    }

    #[test]
    fn test_content_type_rules() {
        assert!(check_content_type("image", Some("image/png")).is_ok());
        assert!(check_content_type("image", Some("application/pdf")).is_err());
        assert!(check_content_type("image", None).is_err());
        assert!(check_content_type("kybDocument", Some("application/pdf")).is_ok());
        assert!(check_content_type("kybDocument", Some("image/jpeg")).is_ok());
        assert!(check_content_type("kybDocument", Some("text/plain")).is_err());
        assert!(check_content_type("banner", Some("text/plain")).is_ok());
    }

    #[test]
    fn test_stored_name_shape() {
        let name = stored_name("image", Some("Logo.PNG"));
        let parts: Vec<&str> = name.splitn(3, '-').collect();
        assert_eq!(parts[0], "image");
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(name.ends_with(".png"));

        assert!(!stored_name("image", Some("../../etc/passwd")).contains('/'));
        assert!(!stored_name("image", None).contains('.'));
    }

    #[tokio::test]
    async fn test_write_and_remove() {
        let store = temp_store();
        let path = store
            .write("kybDocument", Some("kyb.pdf"), b"%PDF-1.4")
            .await
            .unwrap();
        assert!(path.starts_with("kyb-documents/kybDocument-"));
        assert!(store.root().join(&path).exists());

        store.remove(std::slice::from_ref(&path)).await;
        assert!(!store.root().join(&path).exists());
    }

    #[tokio::test]
    async fn test_write_rejects_oversized() {
        let store = temp_store();
        let big = vec![0_u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            store.write("image", Some("big.png"), &big).await,
            Err(UploadError::TooLarge)
        ));
    }
}

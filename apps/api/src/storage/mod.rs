//! Object storage for uploaded resume files.
//!
//! `AppState` holds an `Arc<dyn FileStore>`; production uses S3/MinIO, tests
//! use the in-memory store.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub const ALLOWED_EXTENSIONS: [&str; 5] = [".pdf", ".doc", ".docx", ".txt", ".rtf"];

/// A stored file together with the metadata recorded at upload time.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub data: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str, filename: &str)
        -> Result<(), AppError>;

    /// Missing objects are reported as `NotFound("File not found")`.
    async fn get(&self, key: &str) -> Result<StoredFile, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3FileStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        filename: &str,
    ) -> Result<(), AppError> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .metadata("original-filename", ascii_metadata(filename))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {} bytes to s3://{}/{}", size, self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredFile, AppError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    AppError::NotFound("File not found".to_string())
                } else {
                    AppError::Storage(format!("S3 download failed: {e}"))
                }
            })?;

        let content_type = output
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("S3 body read failed: {e}")))?
            .into_bytes();

        Ok(StoredFile { data, content_type })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// S3 user metadata must be plain ASCII.
fn ascii_metadata(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect()
}

/// Lower-cased extension including the dot, e.g. `.pdf`.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Checks type and size of an upload and returns its normalized extension.
pub fn validate_upload(filename: &str, size: usize, max_bytes: usize) -> Result<String, AppError> {
    let ext = file_extension(filename)
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid file type. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size: {}MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(ext)
}

pub fn object_key(user_id: Uuid, file_id: Uuid, ext: &str) -> String {
    format!("resumes/{user_id}/{file_id}{ext}")
}

/// Content type to record for an extension when the client sent none.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".txt" => "text/plain",
        ".rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryFileStore {
        files: Mutex<HashMap<String, StoredFile>>,
    }

    impl MemoryFileStore {
        pub async fn contains(&self, key: &str) -> bool {
            self.files.lock().await.contains_key(key)
        }
    }

    #[async_trait]
    impl FileStore for MemoryFileStore {
        async fn put(
            &self,
            key: &str,
            data: Bytes,
            content_type: &str,
            _filename: &str,
        ) -> Result<(), AppError> {
            self.files.lock().await.insert(
                key.to_string(),
                StoredFile {
                    data,
                    content_type: content_type.to_string(),
                },
            );
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<StoredFile, AppError> {
            self.files
                .lock()
                .await
                .get(key)
                .cloned()
                .ok_or_else(|| AppError::NotFound("File not found".to_string()))
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.files.lock().await.remove(key);
            Ok(())
        }
    }
}

//! Multipart form reading for upload endpoints.

use axum::body::Bytes;
use axum::extract::Multipart;
use sigflow_core::job::JobParameters;

use crate::error::{AppError, AppResult};

/// Name of the multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// The uploaded file part of a form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// A parsed multipart form: text fields plus at most one file.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: JobParameters,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// Drain every multipart field. Text fields are collected by name (the
    /// last occurrence wins); the `file` field is kept as raw bytes.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some(UploadedFile { file_name, data });
            } else if !name.is_empty() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Take the uploaded file or reject the request.
    pub fn require_file(&mut self) -> AppResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest(format!("Missing required '{FILE_FIELD}' field")))
    }
}

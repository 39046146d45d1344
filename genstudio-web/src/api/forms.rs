//! Multipart form collection

use crate::error::{ApiError, ApiResult};
use crate::services::uploads::{has_allowed_extension, TempUpload};
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use std::path::Path;

/// One uploaded file held in memory
#[derive(Debug, Clone)]
pub struct FormFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FormFile {
    /// Reject files whose extension is not in `allowed`
    pub fn ensure_extension(&self, allowed: &[&str]) -> ApiResult<()> {
        if has_allowed_extension(&self.file_name, allowed) {
            Ok(())
        } else {
            Err(ApiError::BadRequest(format!(
                "Invalid file type for '{}'. Allowed: {}",
                self.file_name,
                allowed.join(", ")
            )))
        }
    }

    /// Save into `dir`; the copy is removed when the returned guard drops
    pub async fn persist(&self, dir: &Path) -> ApiResult<TempUpload> {
        Ok(TempUpload::save(dir, &self.file_name, &self.bytes).await?)
    }
}

/// Text fields and files of a multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: Vec<FormFile>,
}

impl UploadForm {
    /// Drain the request body; file parts without a file name are ignored
    pub async fn collect(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if file_name.is_empty() {
                        continue;
                    }
                    form.files.push(FormFile {
                        field: name,
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Non-blank text field, trimmed
    pub fn required_text(&self, name: &str) -> ApiResult<String> {
        match self.text(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ApiError::BadRequest(format!("Missing required field '{}'", name))),
        }
    }

    /// First file sent under `field`
    pub fn take_file(&mut self, field: &str) -> ApiResult<FormFile> {
        let position = self
            .files
            .iter()
            .position(|f| f.field == field)
            .ok_or_else(|| ApiError::BadRequest(format!("No file selected for '{}'", field)))?;
        Ok(self.files.remove(position))
    }

    /// All files sent under `field`, in upload order
    pub fn take_files(&mut self, field: &str) -> Vec<FormFile> {
        let (taken, rest): (Vec<FormFile>, Vec<FormFile>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == field);
        self.files = rest;
        taken
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

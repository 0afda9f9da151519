use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;

use crate::errors::AppError;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn ensure_image(&self) -> Result<(), AppError> {
        match &self.content_type {
            Some(mime) if mime.starts_with("image/") => Ok(()),
            _ => Err(AppError::BadRequest("Only image uploads are accepted.".into())),
        }
    }
}

/// A fully buffered `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut payload: Multipart, max_file_bytes: usize) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(mut field) = payload.try_next().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_owned);
            let content_type = field.content_type().map(|mime| mime.essence_str().to_owned());
            let limit = if file_name.is_some() {
                max_file_bytes
            } else {
                MAX_TEXT_FIELD_BYTES
            };

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await? {
                if bytes.len() + chunk.len() > limit {
                    return Err(AppError::PayloadTooLarge(limit));
                }
                bytes.extend_from_slice(&chunk);
            }

            match file_name {
                // an empty file input still sends a part with no name and no bytes
                Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
                Some(file_name) => {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = String::from_utf8(bytes).map_err(|_| {
                        AppError::BadRequest(format!("Field {name} is not valid UTF-8"))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text value, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(|v| v.trim()).unwrap_or("")
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

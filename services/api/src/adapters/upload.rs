//! services/api/src/adapters/upload.rs
//!
//! Turns a `multipart/form-data` body into a prompt plus the uploaded images,
//! each already base64-encoded for the provider.

use axum::extract::Multipart;
use bytes::Bytes;
use nayra_core::domain::ImageUpload;
use nayra_core::ports::{PortError, PortResult};
use tracing::debug;

/// One uploaded image and the form field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedUpload {
    pub field: String,
    pub upload: ImageUpload,
}

/// The decoded parts of an image form.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub prompt: Option<String>,
    /// Files in the order they appeared in the body.
    pub files: Vec<NamedUpload>,
}

impl ImageForm {
    /// The trimmed, non-empty prompt.
    pub fn require_prompt(&self) -> PortResult<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PortError::InvalidInput("A prompt is required".to_string()))
    }

    /// The first file uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&ImageUpload> {
        self.files
            .iter()
            .find(|f| f.field == field)
            .map(|f| &f.upload)
    }

    /// Every file uploaded under `field`, in order.
    pub fn files(&self, field: &str) -> Vec<ImageUpload> {
        self.files
            .iter()
            .filter(|f| f.field == field)
            .map(|f| f.upload.clone())
            .collect()
    }

    /// Adds one field. Text fields named `prompt` set the prompt, fields with
    /// a content type are treated as image files, anything else is ignored.
    pub fn push_field(
        &mut self,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
        max_bytes: usize,
    ) -> PortResult<()> {
        if data.len() > max_bytes {
            return Err(PortError::InvalidInput(format!(
                "Field '{}' is larger than the {} byte limit",
                name, max_bytes
            )));
        }

        match content_type {
            Some(mime) if !mime.starts_with("text/plain") => {
                let upload = ImageUpload::from_bytes(mime, &data)?;
                debug!("Accepted {} upload of {} bytes for '{}'", upload.mime_type, data.len(), name);
                self.files.push(NamedUpload {
                    field: name.to_string(),
                    upload,
                });
            }
            _ if name == "prompt" => {
                let text = String::from_utf8(data.to_vec()).map_err(|e| {
                    PortError::InvalidInput(format!("Prompt is not valid UTF-8 text: {}", e))
                })?;
                self.prompt = Some(text);
            }
            _ => debug!("Ignoring unexpected form field '{}'", name),
        }
        Ok(())
    }
}

/// Reads every field of `multipart` into an `ImageForm`.
pub async fn read_image_form(mut multipart: Multipart, max_bytes: usize) -> PortResult<ImageForm> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortError::InvalidInput(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| PortError::InvalidInput(format!("Failed to read field '{}': {}", name, e)))?;
        form.push_field(&name, content_type.as_deref(), data, max_bytes)?;
    }

    Ok(form)
}

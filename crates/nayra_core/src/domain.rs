//! crates/nayra_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::str::FromStr;

use crate::ports::PortError;

/// The signed-up user. Trust-on-first-use: no password, no server-side check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// A snapshot of the provider credential.
///
/// `is_valid` is `None` while unchecked, `Some(false)` when absent or rejected,
/// and `Some(true)` once a key has been adopted. `Some(true)` implies `api_key`
/// is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub api_key: Option<String>,
    pub is_valid: Option<bool>,
}

impl Credential {
    pub fn is_usable(&self) -> bool {
        self.is_valid == Some(true) && self.api_key.is_some()
    }
}

/// How a history artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryItemType {
    Generated,
    Edited,
    Combined,
}

impl HistoryItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryItemType::Generated => "Generated",
            HistoryItemType::Edited => "Edited",
            HistoryItemType::Combined => "Combined",
        }
    }
}

impl fmt::Display for HistoryItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryItemType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Generated" => Ok(HistoryItemType::Generated),
            "Edited" => Ok(HistoryItemType::Edited),
            "Combined" => Ok(HistoryItemType::Combined),
            other => Err(PortError::InvalidInput(format!(
                "Unknown history item type: {}",
                other
            ))),
        }
    }
}

/// One past generate/edit/combine result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub id: String,
    pub kind: HistoryItemType,
    /// Self-contained image reference, normally a base64 data URL.
    pub image: String,
    pub prompt: String,
    /// Creation instant in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// The caller-supplied part of a history item; id and timestamp are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryItem {
    pub kind: HistoryItemType,
    pub image: String,
    pub prompt: String,
}

/// An uploaded image converted to base64, ready to be sent inline to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub mime_type: String,
    pub base64_data: String,
}

impl ImageUpload {
    /// Encodes raw file bytes. Only `image/*` MIME types are accepted.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self, PortError> {
        let mime_type = normalize_image_mime(mime_type)?;
        if bytes.is_empty() {
            return Err(PortError::InvalidInput("Uploaded image is empty".to_string()));
        }
        Ok(Self {
            mime_type,
            base64_data: STANDARD.encode(bytes),
        })
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, PortError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PortError::InvalidInput("Not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| PortError::InvalidInput("Data URL has no payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| PortError::InvalidInput("Data URL is not base64 encoded".to_string()))?;
        let mime_type = normalize_image_mime(mime_type)?;

        STANDARD
            .decode(payload)
            .map_err(|e| PortError::InvalidInput(format!("Invalid base64 payload: {}", e)))?;

        Ok(Self {
            mime_type,
            base64_data: payload.to_string(),
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }

    /// The raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, PortError> {
        STANDARD
            .decode(&self.base64_data)
            .map_err(|e| PortError::InvalidInput(format!("Invalid base64 payload: {}", e)))
    }
}

fn normalize_image_mime(mime_type: &str) -> Result<String, PortError> {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    match mime_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(mime_type),
        _ => Err(PortError::InvalidInput(format!(
            "Unsupported upload type '{}'; expected an image",
            mime_type
        ))),
    }
}

/// The result of an edit: the new image plus whatever text the model returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    pub image: String,
    pub text: String,
}

/// Which top-level screen the UI shell should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Stores are still loading from durable storage.
    Loading,
    SignUp,
    KeySetup,
    Workspace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_from_bytes_encodes_base64() {
        let upload = ImageUpload::from_bytes("image/PNG", b"hello").unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.base64_data, "aGVsbG8=");
        assert_eq!(upload.to_data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn upload_rejects_non_image_types() {
        let err = ImageUpload::from_bytes("text/plain", b"hello").unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[test]
    fn upload_rejects_empty_files() {
        assert!(ImageUpload::from_bytes("image/png", b"").is_err());
    }

    #[test]
    fn data_url_is_parsed_back_into_an_upload() {
        let upload = ImageUpload::from_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.base64_data, "aGVsbG8=");
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        assert!(ImageUpload::from_data_url("https://example.com/cat.png").is_err());
        assert!(ImageUpload::from_data_url("data:image/png,raw").is_err());
        assert!(ImageUpload::from_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn data_url_payload_decodes_to_the_original_bytes() {
        let upload = ImageUpload::from_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(upload.decode().unwrap(), b"hello");
    }

    #[test]
    fn history_item_type_parses_its_own_names() {
        for kind in [
            HistoryItemType::Generated,
            HistoryItemType::Edited,
            HistoryItemType::Combined,
        ] {
            assert_eq!(kind.as_str().parse::<HistoryItemType>().unwrap(), kind);
        }
        assert!("Painted".parse::<HistoryItemType>().is_err());
    }

    #[test]
    fn credential_usable_requires_key_and_validity() {
        let mut credential = Credential::default();
        assert!(!credential.is_usable());
        credential.is_valid = Some(true);
        assert!(!credential.is_usable());
        credential.api_key = Some("key".to_string());
        assert!(credential.is_usable());
    }
}

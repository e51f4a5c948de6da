use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ImageError;

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Parse a base64 data URL.
    ///
    /// Only the base64 form is accepted; percent-encoded payloads are never
    /// produced by browsers for binary image data.
    pub fn parse(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing `data:` scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUrl("missing `,` separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUrl("payload is not base64".to_string()))?;

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| ImageError::InvalidDataUrl(e.to_string()))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// The base64 payload without the `data:` header, as sent in inline-data parts.
    pub fn base64_payload(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_payload())
    }
}

impl std::fmt::Display for DataUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_url())
    }
}

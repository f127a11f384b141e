use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Image bytes carried inline in a request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Decode a provider payload given as base64 text
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Option<Self> {
        let bytes = STANDARD.decode(data.trim()).ok()?;
        Some(Self::new(mime_type, bytes))
    }

    /// Parse `data:<mime>;base64,<data>`. Anything else yields `None`.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if mime_type.is_empty() {
            return None;
        }
        Self::from_base64(mime_type, data)
    }

    pub fn base64_data(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data())
    }
}

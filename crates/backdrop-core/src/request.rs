//! Caller-side request types.
//!
//! `ReplaceBackgroundRequest` is the JSON body accepted at the boundary;
//! `CallRequest` is the decoded, immutable value one invocation consumes.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// JSON body of a background replacement request.
///
/// All fields are optional at the serde level so that a missing field turns
/// into a `VALIDATION` failure instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceBackgroundRequest {
    /// Car photograph, base64 without a data-URL header
    pub car_image_b64: Option<String>,
    /// Optional reference image for the new background
    pub background_image_b64: Option<String>,
    /// Description of the desired background
    pub prompt: Option<String>,
}

/// Raw image bytes plus the MIME type sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImagePayload {
    /// Wrap raw bytes, sniffing the MIME type from the magic number.
    ///
    /// Unknown formats fall back to `image/png`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let media_type = sniff_media_type(&bytes).to_string();
        Self { bytes, media_type }
    }

    /// Decode a base64 payload, tolerating a leading `data:<mime>;base64,` header.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let (declared, data) = split_data_url(encoded.trim());
        let bytes = decode_base64(data)?;
        let mut payload = Self::from_bytes(bytes);
        if let Some(mime) = declared {
            if sniff_media_type(&payload.bytes) == FALLBACK_MEDIA_TYPE {
                payload.media_type = mime.to_string();
            }
        }
        Ok(payload)
    }

    /// Base64 encoding of the bytes.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

const FALLBACK_MEDIA_TYPE: &str = "image/png";

/// Standard alphabet, padding optional on decode.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode base64 that may be unpadded or wrapped across lines.
pub(crate) fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT.decode(compact)
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

fn split_data_url(value: &str) -> (Option<&str>, &str) {
    if let Some(rest) = value.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            return (mime, data);
        }
    }
    (None, value)
}

/// One background replacement call, as consumed by the invoker.
///
/// Required parts may be empty here; the invoker rejects such requests
/// before any upstream call is made.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// The car photograph to edit
    pub primary_image: ImagePayload,
    /// Optional reference for the new background
    pub reference_image: Option<ImagePayload>,
    /// Description of the new background
    pub instruction: String,
}

impl CallRequest {
    pub fn new(
        primary_image: ImagePayload,
        reference_image: Option<ImagePayload>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            primary_image,
            reference_image,
            instruction: instruction.into(),
        }
    }

    /// Decode a boundary request.
    ///
    /// Missing fields become empty values; only undecodable base64 is an
    /// error here.
    pub fn from_boundary(request: ReplaceBackgroundRequest) -> Result<Self, String> {
        let primary_image = match request.car_image_b64.as_deref() {
            Some(data) if !data.trim().is_empty() => ImagePayload::from_base64(data)
                .map_err(|e| format!("carImageB64 is not valid base64: {e}"))?,
            _ => ImagePayload::from_bytes(Vec::new()),
        };

        let reference_image = match request.background_image_b64.as_deref() {
            Some(data) if !data.trim().is_empty() => Some(
                ImagePayload::from_base64(data)
                    .map_err(|e| format!("backgroundImageB64 is not valid base64: {e}"))?,
            ),
            _ => None,
        };

        Ok(Self {
            primary_image,
            reference_image,
            instruction: request.prompt.unwrap_or_default(),
        })
    }

    /// Check that the required parts are present.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_image.is_empty() || self.instruction.trim().is_empty() {
            return Err(
                "Missing required fields: carImageB64 and prompt are required".to_string(),
            );
        }
        Ok(())
    }
}

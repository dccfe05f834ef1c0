use base64::{Engine as _, engine::general_purpose};

use crate::errors::AppError;

pub fn encode_no_pad(bytes: &[u8]) -> String {
    general_purpose::STANDARD_NO_PAD.encode(bytes)
}

pub fn encode_with_pad(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

pub fn decode_no_pad(encoded: &[u8]) -> Result<Vec<u8>, AppError> {
    Ok(general_purpose::STANDARD_NO_PAD.decode::<&[u8]>(encoded)?)
}

/// Accepts keys pasted with or without trailing padding.
pub fn decode_lenient(encoded: &str) -> Result<Vec<u8>, AppError> {
    decode_no_pad(encoded.trim().trim_end_matches('=').as_bytes())
}

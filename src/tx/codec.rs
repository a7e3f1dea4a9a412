use crate::tx::Tx;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to encode transaction: {0}")]
    EncodeError(String),

    #[error("Failed to decode transaction: {0}")]
    DecodeError(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Wire codec for transaction envelopes
pub struct TxCodec;

impl TxCodec {
    /// Encode a transaction to postcard bytes
    pub fn encode(tx: &Tx) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(tx).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Tx, CodecError> {
        postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }

    pub fn encode_hex(tx: &Tx) -> Result<String, CodecError> {
        Ok(hex::encode(Self::encode(tx)?))
    }

    pub fn decode_hex(hex_str: &str) -> Result<Tx, CodecError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// URL-safe, no padding
    pub fn encode_base64(tx: &Tx) -> Result<String, CodecError> {
        Ok(URL_SAFE_NO_PAD.encode(Self::encode(tx)?))
    }

    pub fn decode_base64(b64_str: &str) -> Result<Tx, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str.trim())
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}

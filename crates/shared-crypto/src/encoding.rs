//! Base58 text encoding for signatures carried in transaction details.

use crate::CryptoError;

/// Encode bytes as base58 (bitcoin alphabet).
pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode base58 text.
pub fn decode_base58(text: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

//! HMAC-SHA256 helpers shared by password hashing, access tokens and
//! notification signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

fn keyed(key: &[u8]) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(key)
        .map_err(|err| AppError::Internal(format!("HMAC key rejected: {err}")))
}

/// Hex-encoded HMAC-SHA256 of `data` under `key`.
pub fn sign(key: &[u8], data: &[u8]) -> Result<String, AppError> {
    let mut mac = keyed(key)?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex-encoded signature.
pub fn verify(key: &[u8], data: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = keyed(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&signature).is_ok()
}

/// `len` random bytes, hex encoded.
pub fn random_hex(len: usize) -> String {
    let bytes: Vec<u8> = (0..len).map(|_| rand::random::<u8>()).collect();
    hex::encode(bytes)
}

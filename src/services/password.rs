//! Password hashing.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`. The
//! digest is one PBKDF2-HMAC-SHA256 block (32 bytes) of the password over a
//! per-password random salt. The iteration count travels with the hash so it
//! can be raised without invalidating stored passwords.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{error::AppError, services::signing};

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 10_000;
const SALT_BYTES: usize = 16;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = signing::random_hex(SALT_BYTES);
    let digest = derive(password.as_bytes(), salt.as_bytes(), ITERATIONS)?;
    Ok(format!("{SCHEME}${ITERATIONS}${salt}${}", hex::encode(digest)))
}

/// Whether `password` matches `stored`. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(digest)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    match derive(password.as_bytes(), salt.as_bytes(), iterations) {
        Ok(actual) => constant_time_eq(&actual, &expected),
        Err(_) => false,
    }
}

/// First PBKDF2-HMAC-SHA256 output block.
fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32], AppError> {
    let keyed = HmacSha256::new_from_slice(password)
        .map_err(|err| AppError::Internal(format!("HMAC key rejected: {err}")))?;

    let mut mac = keyed.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block = [0u8; 32];
    block.copy_from_slice(&mac.finalize().into_bytes());
    let mut output = block;

    for _ in 1..iterations {
        let mut mac = keyed.clone();
        mac.update(&block);
        block.copy_from_slice(&mac.finalize().into_bytes());
        output.iter_mut().zip(block.iter()).for_each(|(o, b)| *o ^= b);
    }
    Ok(output)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

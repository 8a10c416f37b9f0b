//! Authentication plugin scrambles.
//!
//! - `mysql_native_password`: `SHA1(password) XOR SHA1(scramble + SHA1(SHA1(password)))`
//! - `caching_sha2_password` (fast path):
//!   `SHA256(password) XOR SHA256(SHA256(SHA256(password)) + scramble)`
//!
//! An empty password always produces an empty auth response.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Authentication plugin names.
pub mod plugin {
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
}

/// Single-byte requests and replies of the `caching_sha2_password` exchange.
pub mod caching_sha2 {
    /// Client asks for the server's RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    /// Server: scramble matched the cache
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// Server: send the password over a secure channel
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// Length of the scramble used by both plugins.
pub const SCRAMBLE_LEN: usize = 20;

fn scramble_seed(scramble: &[u8]) -> Result<&[u8]> {
    // Servers may append a NUL to the 20-byte scramble
    match scramble.get(..SCRAMBLE_LEN) {
        Some(seed) => Ok(seed),
        None => Err(Error::Protocol(format!(
            "Scramble too short: {} < {}",
            scramble.len(),
            SCRAMBLE_LEN
        ))),
    }
}

fn xor_into(mut lhs: Vec<u8>, rhs: &[u8]) -> Vec<u8> {
    for (a, b) in lhs.iter_mut().zip(rhs) {
        *a ^= b;
    }
    lhs
}

/// Compute the `mysql_native_password` response.
pub fn native_password(password: &str, scramble: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    let seed = scramble_seed(scramble)?;

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);
    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let stage3 = hasher.finalize();

    Ok(xor_into(stage1.to_vec(), &stage3))
}

/// Compute the `caching_sha2_password` fast-auth response.
pub fn caching_sha2_password(password: &str, scramble: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    let seed = scramble_seed(scramble)?;

    let hash1 = Sha256::digest(password.as_bytes());
    let hash2 = Sha256::digest(hash1);
    let mut hasher = Sha256::new();
    hasher.update(hash2);
    hasher.update(seed);
    let hash3 = hasher.finalize();

    Ok(xor_into(hash1.to_vec(), &hash3))
}

/// Compute the auth response for the named plugin.
pub fn compute_auth_response(
    plugin_name: &str,
    password: &str,
    scramble: &[u8],
) -> Result<Vec<u8>> {
    match plugin_name {
        plugin::MYSQL_NATIVE_PASSWORD => native_password(password, scramble),
        plugin::CACHING_SHA2_PASSWORD => caching_sha2_password(password, scramble),
        _ => Err(Error::Unsupported(format!(
            "Unsupported authentication plugin: {plugin_name}"
        ))),
    }
}

/// Password sent in the clear during full `caching_sha2_password` auth.
///
/// Only valid over TLS. The password is NUL-terminated.
pub fn cleartext_password(password: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(password.len() + 1);
    data.extend_from_slice(password.as_bytes());
    data.push(0);
    data
}

//! Credential hashing.
//!
//! Salted SHA-256 behind a two-function boundary so the scheme can be
//! swapped without touching callers. Plaintext passwords exist only in
//! the arguments here and in the login path.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

fn digest(salt: &[u8], pass: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(pass.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a password with a fresh random salt. Returns (salt, hash).
pub fn hash_pass(pass: &str) -> (Vec<u8>, Vec<u8>) {
    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = digest(&salt, pass);
    (salt, hash)
}

/// Verify a password against stored salt and hash.
pub fn verify_pass(pass: &str, salt: &[u8], hash: &[u8]) -> bool {
    digest(salt, pass) == hash
}

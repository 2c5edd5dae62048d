//! Salted PBKDF2-HMAC-SHA512 password credentials.
//!
//! Hashes and salts are stored as lower-case hex. The hex salt string itself
//! is the KDF salt input, so stored credentials can be re-derived from the
//! two text columns alone.

use password_hash::rand_core::{OsRng, RngCore};
use sha2::Sha512;
use subtle::ConstantTimeEq;

pub const ITERATIONS: u32 = 100_000;
pub const KEY_LEN: usize = 64;
pub const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredentials {
    pub hash: String,
    pub salt: String,
}

/// Derive a hash for `password`, generating a fresh salt when none is given.
pub fn derive(password: &str, salt: Option<&str>) -> PasswordCredentials {
    let salt = match salt {
        Some(s) => s.to_string(),
        None => generate_salt(),
    };

    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut key);

    PasswordCredentials {
        hash: hex::encode(key),
        salt,
    }
}

/// Check `password` against stored credentials.
///
/// Returns `false` for malformed or wrong-length stored hashes without
/// comparing; matching lengths are compared in constant time.
pub fn verify(password: &str, stored_hash: &str, stored_salt: &str) -> bool {
    let Ok(expected) = hex::decode(stored_hash) else {
        return false;
    };
    if expected.len() != KEY_LEN {
        return false;
    }

    let mut actual = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        stored_salt.as_bytes(),
        ITERATIONS,
        &mut actual,
    );

    actual.as_slice().ct_eq(expected.as_slice()).into()
}

fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

//! Password hashing for the user directory, using Argon2id PHC strings.

use crate::error::{GlassError, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};

/// Salt size for Argon2 (128 bits)
const SALT_SIZE: usize = 16;

/// Parameters for Argon2id password hashing
const ARGON2_PARAMS: argon2::Params = match argon2::Params::new(
    19 * 1024, // 19 MiB memory cost
    2,         // 2 iterations
    1,         // 1 thread
    Some(32),  // 32-byte output length
) {
    Ok(params) => params,
    Err(_) => panic!("Invalid Argon2 parameters"),
};

fn argon2() -> Argon2<'static> {
    Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ARGON2_PARAMS,
    )
}

/// Hashes `password` with a fresh random salt. Returns a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let salt_string = SaltString::encode_b64(&salt)
        .map_err(|e| GlassError::password(format!("Invalid salt: {}", e)))?;

    let hash = argon2()
        .hash_password(password.as_bytes(), &salt_string)
        .map_err(|e| GlassError::password(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC string produced by [`hash_password`].
pub fn verify_password(password: &str, expected_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(expected_hash)
        .map_err(|e| GlassError::password(format!("Invalid password hash: {}", e)))?;

    match argon2().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(GlassError::password(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("user").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("user", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(matches!(
            verify_password("user", "not a phc string"),
            Err(GlassError::Password(_))
        ));
    }
}

// ==============================================================================
// security.rs - Security Primitives (Session Identifiers, Password Hashing)
// ==============================================================================
// Description: Session identifier generation and Argon2id hashing/verification
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

// ==============================================================================
// CONSTANTS
// ==============================================================================

/// Session identifier length in bytes (32 bytes = 256 bits)
const SESSION_ID_BYTES: usize = 32;

// ==============================================================================
// SESSION IDENTIFIERS
// ==============================================================================

/// Generates a cryptographically secure random session identifier
///
/// Returns a URL-safe base64-encoded string of 32 random bytes (256 bits of
/// entropy), 43 characters long. The value is safe to place in a cookie
/// without further encoding.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rng.fill(&mut bytes);

    URL_SAFE_NO_PAD.encode(bytes)
}

// ==============================================================================
// PASSWORD HASHING (ARGON2ID)
// ==============================================================================

/// Hashes a password using Argon2id with secure parameters
///
/// - Memory: 47104 KiB (46 MiB)
/// - Iterations: 3
/// - Parallelism: 4
/// - Salt: 16 bytes (cryptographically random)
///
/// The returned hash string is in PHC format and contains the algorithm,
/// parameters, salt, and hash.
///
/// # Errors
///
/// Returns an error if parameter construction or hashing fails (extremely rare)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(47104, 3, 4, None)
        .context("Failed to create Argon2 parameters")?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .context("Failed to hash password")?
        .to_string();

    Ok(password_hash)
}

/// Hashes a password with the algorithm, version and cost parameters of an
/// existing PHC hash
///
/// Used for the unknown-account hash, which has to cost exactly as much to
/// verify as the configured account hashes.
///
/// # Errors
///
/// Returns an error if the reference hash cannot be parsed or carries
/// parameters Argon2 rejects
pub fn hash_password_like(password: &str, reference: &str) -> Result<String> {
    let reference = PasswordHash::new(reference)
        .context("Failed to parse reference hash")?;
    let params = Params::try_from(&reference)
        .context("Reference hash has invalid Argon2 parameters")?;
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password_customized(
            password.as_bytes(),
            Some(reference.algorithm),
            reference.version,
            params,
            &salt,
        )
        .context("Failed to hash password")?
        .to_string();

    Ok(password_hash)
}

/// Verifies a password against an Argon2id hash
///
/// Parameters are read from the PHC string, so hashes produced with other
/// Argon2 settings still verify.
///
/// # Errors
///
/// Returns an error if the hash string is malformed or verification fails
/// for a reason other than a password mismatch
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .context("Failed to parse password hash")?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification error: {}", e)),
    }
}

// ==============================================================================
// TESTS
// ==============================================================================

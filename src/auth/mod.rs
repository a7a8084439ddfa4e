//! Credential primitives: password hashing and opaque token generation.
//!
//! Passwords are stored as salted Argon2 PHC strings. Tokens are random
//! hex strings with no relation to the user they identify.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::Rng;

use crate::db::User;

/// Number of random bytes in a bearer token (40 hex characters)
const TOKEN_BYTES: usize = 20;

lazy_static! {
    /// Hash checked when the username is unknown, so that a failed login
    /// costs the same whether or not the account exists.
    static ref DUMMY_HASH: String = hash_password("dummy-password").unwrap_or_default();
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Check a login attempt. `user` is `None` when the username is unknown.
pub fn verify_credentials(user: Option<&User>, password: &str) -> bool {
    match user {
        Some(user) => verify_password(password, &user.password_hash),
        None => {
            verify_password(password, &DUMMY_HASH);
            false
        }
    }
}

/// Generate a random bearer token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();
    hex::encode(bytes)
}

/// Generate a session identifier for the session cookie
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

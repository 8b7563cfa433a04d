//! bcrypt password hashes
//!
//! New hashes use the `$2b$` prefix; `$2a$` and `$2y$` hashes written by
//! other bcrypt implementations verify as well.

use crate::error::{ChatbookError, Result};

/// Lowest work factor bcrypt accepts
pub const MIN_COST: u32 = 4;

/// Highest work factor bcrypt accepts
pub const MAX_COST: u32 = 31;

/// Hash `password` with a fresh random salt at the given work factor
///
/// # Errors
///
/// Returns [`ChatbookError::Config`] when `cost` is outside
/// [`MIN_COST`]..=[`MAX_COST`]
///
/// # Examples
///
/// ```
/// use chatbook::auth::password::{hash_password, verify_password};
///
/// let encoded = hash_password("hunter2", 4).unwrap();
/// assert!(encoded.starts_with("$2b$04$"));
/// assert!(verify_password("hunter2", &encoded));
/// assert!(!verify_password("hunter3", &encoded));
/// ```
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| ChatbookError::Config(format!("Failed to hash password: {}", e)).into())
}

/// Check `password` against a stored bcrypt hash
///
/// Malformed hashes never match.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    match bcrypt::verify(password, encoded) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash is unusable: {}", e);
            false
        }
    }
}

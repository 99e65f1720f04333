//! Authentication: password hashing, bearer tokens, request identity and
//! approval signatures.

pub mod extract;
pub mod signature;
pub mod token;

pub use extract::CurrentUser;
pub use token::{Claims, TokenError, TokenService};

use crate::error::{TrackerError, TrackerResult};

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> TrackerResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| TrackerError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| TrackerError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash. A malformed hash never matches.
pub async fn verify_password(password: String, hash: String) -> TrackerResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| TrackerError::Internal(format!("verification task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_verify_only_their_password() {
        let hash = hash_password("password123".into(), 4).await.unwrap();
        assert!(verify_password("password123".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("password124".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_never_matches() {
        assert!(!verify_password("x".into(), "not-a-hash".into()).await.unwrap());
    }
}

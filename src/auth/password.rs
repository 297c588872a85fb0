//! Password Hashing
//!
//! Security-critical path. Hashes are bcrypt (per-hash random salt, cost
//! encoded in the hash string). Verification re-derives the hash from the
//! supplied password with the stored salt and cost, then compares the two
//! digests in constant time inside `bcrypt::verify`. Plain string equality
//! on hashes must never be used here.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use anyhow::{Context, Result};

/// bcrypt ignores input past 72 bytes. Registration rejects longer passwords
/// and verification never matches them.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")
}

/// An oversized password still pays for a full bcrypt run, then fails.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let oversized = password.len() > MAX_PASSWORD_BYTES;
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")?;
    Ok(matched && !oversized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("pw123!", TEST_COST).await.unwrap();
        assert_ne!(hash, "pw123!");
        assert!(verify_password("pw123!", &hash).await.unwrap());
        assert!(!verify_password("pw123?", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let a = hash_password("pw123!", TEST_COST).await.unwrap();
        let b = hash_password("pw123!", TEST_COST).await.unwrap();
        assert_ne!(a, b);
        assert!(verify_password("pw123!", &a).await.unwrap());
        assert!(verify_password("pw123!", &b).await.unwrap());
    }

    #[tokio::test]
    async fn test_input_past_72_bytes_never_matches() {
        let stored = "p".repeat(MAX_PASSWORD_BYTES);
        let hash = hash_password(&stored, TEST_COST).await.unwrap();
        assert!(verify_password(&stored, &hash).await.unwrap());

        let extended = format!("{}WRONG-SUFFIX", stored);
        assert!(!verify_password(&extended, &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_garbage_hash_is_an_error() {
        assert!(verify_password("pw123!", "not-a-bcrypt-hash").await.is_err());
    }
}

use std::str::FromStr;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// How passwords are persisted and checked. Swapping the strategy does not
/// change the account service's contract.
pub trait CredentialStrategy: Send + Sync {
    /// Value to persist for a newly registered password.
    fn store(&self, password: &str) -> anyhow::Result<String>;

    /// Whether `candidate` matches the persisted value.
    fn verify(&self, candidate: &str, stored: &str) -> bool;
}

/// Stores and compares passwords verbatim.
pub struct Plaintext;

impl CredentialStrategy for Plaintext {
    fn store(&self, password: &str) -> anyhow::Result<String> {
        Ok(password.to_string())
    }

    fn verify(&self, candidate: &str, stored: &str) -> bool {
        candidate == stored
    }
}

/// Argon2id PHC strings.
pub struct Argon2Hashed;

impl CredentialStrategy for Argon2Hashed {
    fn store(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
        Ok(hash.to_string())
    }

    fn verify(&self, candidate: &str, stored: &str) -> bool {
        // A stored value that is not a PHC string never matches.
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMode {
    Plaintext,
    Argon2,
}

impl PasswordMode {
    pub fn strategy(self) -> Arc<dyn CredentialStrategy> {
        match self {
            Self::Plaintext => Arc::new(Plaintext),
            Self::Argon2 => Arc::new(Argon2Hashed),
        }
    }
}

impl FromStr for PasswordMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plaintext" => Ok(Self::Plaintext),
            "argon2" => Ok(Self::Argon2),
            other => anyhow::bail!("Unknown password mode '{}' (expected plaintext or argon2)", other),
        }
    }
}

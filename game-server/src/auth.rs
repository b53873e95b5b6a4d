use sha2::{Digest, Sha256};

/// The single static key that gates session creation and joining.
///
/// Only a SHA-256 digest is kept; candidates are hashed and compared
/// without short-circuiting on the first differing byte.
pub struct SharedSecret {
    digest: Vec<u8>,
}

impl SharedSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).to_vec(),
        }
    }

    pub fn verify(&self, candidate: Option<&str>) -> Result<(), AuthError> {
        let candidate = match candidate {
            Some(candidate) if !candidate.is_empty() => candidate,
            _ => return Err(AuthError::MissingKey),
        };

        let digest = Sha256::digest(candidate.as_bytes());
        let difference = self
            .digest
            .iter()
            .zip(digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        if difference == 0 {
            Ok(())
        } else {
            tracing::warn!("Rejected request with an invalid API key");
            Err(AuthError::InvalidKey)
        }
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API key required")]
    MissingKey,
    #[error("Invalid API key")]
    InvalidKey,
}

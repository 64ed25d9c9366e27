//! Argon2id password digests.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`), so
//! the salt and cost parameters travel with the hash and verification needs
//! nothing else.

use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash,
    PasswordHasher as _, PasswordVerifier, Version,
};
use rand::rngs::OsRng;

use super::error::Error;

#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("algorithm", &Algorithm::Argon2id)
            .finish()
    }
}

impl PasswordHasher {
    /// Argon2id v0x13 with the given cost parameters. Parameters only affect
    /// new digests; verification uses whatever the digest carries.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash `plaintext` with a fresh random salt.
    ///
    /// # Errors
    /// Returns [`Error::Hashing`] if the Argon2 primitive rejects the input.
    pub fn hash(&self, plaintext: &str) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| Error::Hashing)?;
        Ok(digest.to_string())
    }

    /// Check `plaintext` against a stored digest. Malformed digests are a
    /// mismatch, not an error.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

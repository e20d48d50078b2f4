//! Salted password hashing
//!
//! Passwords are stored as Argon2id PHC strings
//! (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`) with a fresh random salt per
//! hash. The server pepper is passed to Argon2 as its secret and never touches
//! the database, so a leaked `users` table alone cannot be brute-forced.

use crate::config::SecurityConfig;
use crate::{Error, Result};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier, Version};
use zeroize::Zeroize;

const PEPPER_LEN: usize = 32;

/// Hashes and verifies user passwords
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: [u8; PEPPER_LEN],
    params: Params,
}

impl Drop for PasswordHasher {
    fn drop(&mut self) {
        self.pepper.zeroize();
    }
}

impl PasswordHasher {
    /// Build a hasher from the configured pepper with Argon2's default cost
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let mut bytes = config.pepper_bytes()?;
        let pepper: [u8; PEPPER_LEN] = bytes
            .get(..PEPPER_LEN)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| Error::internal("Password pepper must be at least 32 bytes"))?;
        bytes.zeroize();

        Ok(Self {
            pepper,
            params: Params::default(),
        })
    }

    /// Create for testing with a random pepper and a minimal work factor
    pub fn for_testing() -> Self {
        let params = Params::new(Params::MIN_M_COST * 4, 1, 1, None).unwrap_or_default();

        Self {
            pepper: rand::random(),
            params,
        }
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string. The cost parameters are
    /// read from the stored hash, so hashes made with older settings still verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };

        self.argon2()
            .is_ok_and(|argon2| argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }

    fn argon2(&self) -> Result<Argon2<'_>> {
        Argon2::new_with_secret(
            &self.pepper,
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| Error::internal(format!("Invalid password hashing setup: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::for_testing();
        let stored = hasher.hash("correct horse").unwrap();

        assert!(hasher.verify("correct horse", &stored));
        assert!(!hasher.verify("wrong horse", &stored));
        assert!(!stored.contains("correct horse"));
    }

    #[test]
    fn test_stored_form_is_argon2id_phc() {
        let stored = PasswordHasher::for_testing().hash("secret1").unwrap();

        assert!(stored.starts_with("$argon2id$v=19$"));
        let parsed = PasswordHash::new(&stored).unwrap();
        assert!(parsed.salt.is_some());
        assert!(parsed.hash.is_some());
    }

    #[test]
    fn test_salts_differ_per_hash() {
        let hasher = PasswordHasher::for_testing();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_pepper_binds_hash() {
        let stored = PasswordHasher::for_testing().hash("secret1").unwrap();
        assert!(!PasswordHasher::for_testing().verify("secret1", &stored));
    }

    #[test]
    fn test_configured_hasher_has_work_factor() {
        let hasher = PasswordHasher::from_config(&SecurityConfig::for_testing()).unwrap();
        let stored = hasher.hash("secret1").unwrap();

        let parsed = PasswordHash::new(&stored).unwrap();
        let params = Params::try_from(&parsed).unwrap();
        assert!(params.m_cost() >= Params::DEFAULT_M_COST);
        assert!(params.t_cost() >= Params::DEFAULT_T_COST);
        assert!(hasher.verify("secret1", &stored));
    }

    #[test]
    fn test_malformed_stored_hash() {
        let hasher = PasswordHasher::for_testing();
        assert!(!hasher.verify("secret1", "no-separator"));
        assert!(!hasher.verify("secret1", "zz$zz"));
        assert!(!hasher.verify("secret1", ""));
    }
}

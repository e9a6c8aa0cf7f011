//! Password hashing with Argon2id.

use crate::config::AuthConfig;
use crate::error::ApiError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// One-way hashing of stored credentials
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    min_length: usize,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, ApiError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| ApiError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            params,
            min_length: config.min_password_length,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password; every call uses a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored PHC string.
    ///
    /// A digest that does not parse is a mismatch, not an error. The parameters
    /// embedded in the digest win over the configured ones, so hashes created
    /// under older settings keep verifying.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Validate password strength
    pub fn validate_strength(&self, password: &str) -> Result<(), ApiError> {
        if password.chars().count() < self.min_length {
            return Err(ApiError::BadRequest(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }

        // Check for at least one uppercase, lowercase, and digit
        let has_upper = password.chars().any(|c| c.is_uppercase());
        let has_lower = password.chars().any(|c| c.is_lowercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());

        if !has_upper || !has_lower || !has_digit {
            return Err(ApiError::BadRequest(
                "Password must contain an uppercase letter, a lowercase letter and a digit"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        let config = AuthConfig {
            access_token_secret: "a".repeat(32),
            access_token_expiration: 900,
            refresh_token_secret: "r".repeat(32),
            refresh_token_expiration: 864_000,
            jwt_issuer: "test".into(),
            jwt_audience: "test".into(),
            argon2_memory_cost: 4096,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            min_password_length: 8,
            cookie_secure: true,
        };
        PasswordHasher::new(&config).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Secret1!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Secret1!", &hash));
        assert!(!hasher.verify("Secret2!", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("Secret1!").unwrap();
        let second = hasher.hash("Secret1!").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("Secret1!", &second));
    }

    #[test]
    fn test_malformed_digest_is_mismatch() {
        let hasher = hasher();
        assert!(!hasher.verify("Secret1!", ""));
        assert!(!hasher.verify("Secret1!", "not-a-phc-string"));
        assert!(!hasher.verify("Secret1!", "$argon2id$v=19$broken"));
    }

    #[test]
    fn test_strength_rules() {
        let hasher = hasher();
        assert!(hasher.validate_strength("Secret1!").is_ok());
        assert!(hasher.validate_strength("Sh0rt").is_err());
        assert!(hasher.validate_strength("alllowercase1").is_err());
        assert!(hasher.validate_strength("NoDigitsHere").is_err());
    }
}

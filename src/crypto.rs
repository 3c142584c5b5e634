use crate::errors::AccountsError;
use argon2::password_hash::{PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, Version};
use rand::Rng;
use rand_core::OsRng;

/// Argon2id hashing for passwords and verification codes, plus numeric code
/// generation. Codes go through the same one-way hash as passwords; the
/// verifier comparison is constant-time, and the attempt limit bounds
/// brute force on the short code space.
#[derive(Debug, Clone, Default)]
pub struct CryptoService;

impl CryptoService {
    fn argon2() -> Result<Argon2<'static>, AccountsError> {
        let params = Params::new(
            32_768, // 32 MB
            3,      // iterations
            1,      // parallelism
            None,
        )
        .map_err(|e| AccountsError::HashError(format!("invalid argon2 params: {e}")))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash_secret(&self, secret: &str) -> Result<String, AccountsError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Self::argon2()?;

        let hash = argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AccountsError::HashError(format!("failed to hash secret: {e}")))?
            .to_string();

        Ok(hash)
    }

    pub fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, AccountsError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AccountsError::HashError(format!("invalid hash format: {e}")))?;

        let argon2 = Self::argon2()?;

        match argon2.verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AccountsError::HashError(format!(
                "secret verification failed: {e}"
            ))),
        }
    }

    /// Zero-padded numeric code of the given length (max 9 digits).
    pub fn generate_code(&self, length: usize) -> String {
        let length = length.clamp(4, 9);
        let range = 10u32.pow(length as u32);
        let num = rand::thread_rng().gen_range(0..range);
        format!("{:0width$}", num, width = length)
    }
}

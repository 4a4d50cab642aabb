use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Serialize, Deserialize};

use crate::core::error::{LedgerError, LedgerResult};

/// Salted Argon2id hash of an account secret, kept in PHC string form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHash(String);

impl SecretHash {
    pub fn hash(secret: &str) -> LedgerResult<SecretHash> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| LedgerError::Credential(err.to_string()))?
            .to_string();
        return Ok(SecretHash(phc));
    }

    #[cfg(test)]
    pub(crate) fn from_phc(phc: &str) -> SecretHash {
        SecretHash(phc.to_owned())
    }

    /// The comparison itself happens inside the Argon2 verifier in constant time.
    /// A hash that does not parse never verifies.
    pub fn verify(&self, supplied: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("stored secret hash is unreadable: {}", err);
                return false;
            }
        };
        Argon2::default()
            .verify_password(supplied.as_bytes(), &parsed)
            .is_ok()
    }
}

impl std::fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretHash(..)")
    }
}

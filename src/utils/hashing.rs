use bcrypt::{DEFAULT_COST, hash, verify};
use rand::Rng;
use rand::distr::Alphanumeric;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hashed)
}

/// Random secret for accounts created implicitly by an application submission.
/// The owner sets a real password through the reset flow.
pub fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

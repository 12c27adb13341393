use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::{Expiring, OtpStore, StoreError};

pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("No OTP found. Please request a new OTP")]
    NotFound,

    #[error("OTP has expired. Please request a new OTP")]
    Expired,

    #[error("Invalid OTP. Please try again")]
    Mismatch,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A pending one-time code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRecord {
    pub key: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Compare a submitted code against this record at `now`.
    pub fn check(&self, submitted: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.is_expired(now) {
            return Err(OtpError::Expired);
        }
        if self.code != submitted {
            return Err(OtpError::Mismatch);
        }
        Ok(())
    }
}

impl Expiring for OtpRecord {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Random numeric code of `length` digits without a leading zero.
pub fn generate_code(length: usize) -> Result<String, OtpError> {
    validate_length(length)?;

    let low = 10u64.pow(length as u32 - 1);
    let code = rand::rng().random_range(low..low * 10);
    Ok(code.to_string())
}

/// Rejects submitted codes that could never have been issued.
pub fn validate_submitted(code: &str) -> Result<(), OtpError> {
    let code = code.trim();
    if code.len() < MIN_CODE_LENGTH || code.len() > MAX_CODE_LENGTH {
        return Err(OtpError::Validation("Invalid OTP format".to_string()));
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(OtpError::Validation("OTP must contain digits only".to_string()));
    }
    Ok(())
}

fn validate_length(length: usize) -> Result<(), OtpError> {
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
        return Err(OtpError::Validation(format!(
            "OTP length must be between {} and {} digits",
            MIN_CODE_LENGTH, MAX_CODE_LENGTH
        )));
    }
    Ok(())
}

fn validate_ttl(ttl_minutes: i64) -> Result<(), OtpError> {
    if ttl_minutes <= 0 {
        return Err(OtpError::Validation(
            "OTP lifetime must be at least one minute".to_string(),
        ));
    }
    Ok(())
}

/// Issues, verifies and expires codes for one purpose (email verification,
/// password reset, ...). Each purpose gets its own manager and store namespace.
pub struct OtpManager {
    store: Arc<dyn OtpStore<OtpRecord>>,
    code_length: usize,
    ttl_minutes: i64,
}

impl OtpManager {
    pub fn new(store: Arc<dyn OtpStore<OtpRecord>>, code_length: usize, ttl_minutes: i64) -> Self {
        Self {
            store,
            code_length,
            ttl_minutes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Generate and store a new code for `key`, replacing any pending one.
    pub async fn issue(&self, key: &str, length: usize, ttl_minutes: i64) -> Result<String, OtpError> {
        validate_ttl(ttl_minutes)?;
        let code = generate_code(length)?;

        let record = OtpRecord {
            key: key.to_string(),
            code: code.clone(),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        };
        self.store.put(key, record).await?;

        log::debug!("Issued {}-digit OTP for {}", length, key);
        Ok(code)
    }

    /// Re-issue with the configured length and lifetime.
    pub async fn resend(&self, key: &str) -> Result<String, OtpError> {
        self.issue(key, self.code_length, self.ttl_minutes).await
    }

    /// Single-use check: a matching code is consumed, an expired one is purged.
    /// Of two concurrent verifies with the same code only the one whose delete
    /// removes the record succeeds.
    pub async fn verify(&self, key: &str, submitted: &str) -> Result<(), OtpError> {
        validate_submitted(submitted)?;

        let record = self.store.get(key).await?.ok_or(OtpError::NotFound)?;

        match record.check(submitted.trim(), Utc::now()) {
            Ok(()) => {
                if !self.store.delete(key).await? {
                    return Err(OtpError::NotFound);
                }
                Ok(())
            }
            Err(OtpError::Expired) => {
                self.store.delete(key).await?;
                Err(OtpError::Expired)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        self.store.sweep(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::store::{InMemoryStore, YieldingStore};

    fn manager() -> (OtpManager, Arc<InMemoryStore<OtpRecord>>) {
        let store = Arc::new(InMemoryStore::new());
        (OtpManager::new(store.clone(), 6, 10), store)
    }

    #[test]
    fn generated_codes_have_requested_length() {
        for length in MIN_CODE_LENGTH..=MAX_CODE_LENGTH {
            let code = generate_code(length).unwrap();
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn lengths_outside_bounds_are_rejected() {
        assert!(matches!(generate_code(3), Err(OtpError::Validation(_))));
        assert!(matches!(generate_code(9), Err(OtpError::Validation(_))));
    }

    #[actix_web::test]
    async fn unknown_key_is_not_found() {
        let (otp, _) = manager();
        assert!(matches!(
            otp.verify("nobody@example.com", "123456").await,
            Err(OtpError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn code_verifies_exactly_once() {
        let (otp, _) = manager();
        let code = otp.issue("user@example.com", 6, 10).await.unwrap();

        otp.verify("user@example.com", &code).await.unwrap();
        assert!(matches!(
            otp.verify("user@example.com", &code).await,
            Err(OtpError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn concurrent_verifies_accept_a_code_once() {
        let otp = OtpManager::new(Arc::new(YieldingStore::<OtpRecord>::default()), 6, 10);
        let code = otp.issue("user@example.com", 6, 10).await.unwrap();

        let (first, second) = tokio::join!(
            otp.verify("user@example.com", &code),
            otp.verify("user@example.com", &code)
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert!(matches!(first.err().or(second.err()), Some(OtpError::NotFound)));
    }

    #[actix_web::test]
    async fn wrong_code_keeps_the_record() {
        let (otp, _) = manager();
        let code = otp.issue("user@example.com", 6, 10).await.unwrap();
        let wrong = if code == "999999" { "111111" } else { "999999" };

        assert!(matches!(
            otp.verify("user@example.com", wrong).await,
            Err(OtpError::Mismatch)
        ));
        otp.verify("user@example.com", &code).await.unwrap();
    }

    #[actix_web::test]
    async fn expired_code_reports_expired_then_not_found() {
        let (otp, store) = manager();
        store
            .put(
                "late@example.com",
                OtpRecord {
                    key: "late@example.com".into(),
                    code: "4821".into(),
                    expires_at: Utc::now() - Duration::seconds(1),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            otp.verify("late@example.com", "4821").await,
            Err(OtpError::Expired)
        ));
        assert!(matches!(
            otp.verify("late@example.com", "4821").await,
            Err(OtpError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn resend_invalidates_previous_code() {
        let (otp, store) = manager();
        let first = otp.issue("user@example.com", 6, 10).await.unwrap();
        let second = otp.resend("user@example.com").await.unwrap();

        assert_eq!(store.len(), 1);
        if first != second {
            assert!(matches!(
                otp.verify("user@example.com", &first).await,
                Err(OtpError::Mismatch)
            ));
        }
        otp.verify("user@example.com", &second).await.unwrap();
    }

    #[actix_web::test]
    async fn malformed_submission_is_a_validation_error() {
        let (otp, _) = manager();
        otp.issue("user@example.com", 6, 10).await.unwrap();

        for bad in ["12", "123456789", "12ab56"] {
            assert!(matches!(
                otp.verify("user@example.com", bad).await,
                Err(OtpError::Validation(_))
            ));
        }
    }

    #[actix_web::test]
    async fn non_positive_ttl_is_rejected() {
        let (otp, store) = manager();
        assert!(matches!(
            otp.issue("user@example.com", 6, 0).await,
            Err(OtpError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn sweep_purges_expired_codes() {
        let (otp, store) = manager();
        otp.issue("live@example.com", 6, 10).await.unwrap();
        store
            .put(
                "stale@example.com",
                OtpRecord {
                    key: "stale@example.com".into(),
                    code: "1234".into(),
                    expires_at: Utc::now() - Duration::minutes(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(otp.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}

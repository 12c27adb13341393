use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::otp::{OtpError, OtpRecord, generate_code, validate_submitted};
use super::store::{Expiring, OtpStore, StoreError};

/// Signup details held until the emailed code is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    #[serde(flatten)]
    pub otp: OtpRecord,
}

impl Expiring for PendingRegistration {
    fn expires_at(&self) -> DateTime<Utc> {
        self.otp.expires_at
    }
}

/// Already validated and hashed signup input.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Pending signups keyed by email.
pub struct RegistrationManager {
    store: Arc<dyn OtpStore<PendingRegistration>>,
    code_length: usize,
    ttl_minutes: i64,
}

impl RegistrationManager {
    pub fn new(
        store: Arc<dyn OtpStore<PendingRegistration>>,
        code_length: usize,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            code_length,
            ttl_minutes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Start (or restart) a signup; returns the code to deliver.
    pub async fn initiate(&self, registration: NewRegistration) -> Result<String, OtpError> {
        let pending = self.with_fresh_code(
            registration.name,
            registration.email,
            registration.phone,
            registration.password_hash,
        )?;
        let code = pending.otp.code.clone();
        let key = pending.email.clone();

        self.store.put(&key, pending).await?;
        Ok(code)
    }

    /// Consume the pending signup when `submitted` matches.
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<PendingRegistration, OtpError> {
        validate_submitted(submitted)?;

        let pending = self.store.get(email).await?.ok_or(OtpError::NotFound)?;

        match pending.otp.check(submitted.trim(), Utc::now()) {
            Ok(()) => {
                // A concurrent verify already took it
                if !self.store.delete(email).await? {
                    return Err(OtpError::NotFound);
                }
                Ok(pending)
            }
            Err(OtpError::Expired) => {
                self.store.delete(email).await?;
                Err(OtpError::Expired)
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the code of a live signup. Expired or unknown signups must restart.
    pub async fn resend(&self, email: &str) -> Result<PendingRegistration, OtpError> {
        let pending = self.store.get(email).await?.ok_or(OtpError::NotFound)?;

        if pending.is_expired(Utc::now()) {
            self.store.delete(email).await?;
            return Err(OtpError::NotFound);
        }

        let refreshed =
            self.with_fresh_code(pending.name, pending.email, pending.phone, pending.password_hash)?;
        self.store.put(email, refreshed.clone()).await?;
        Ok(refreshed)
    }

    pub async fn cancel(&self, email: &str) -> Result<bool, StoreError> {
        self.store.delete(email).await
    }

    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        self.store.sweep(Utc::now()).await
    }

    fn with_fresh_code(
        &self,
        name: String,
        email: String,
        phone: String,
        password_hash: String,
    ) -> Result<PendingRegistration, OtpError> {
        let code = generate_code(self.code_length)?;
        Ok(PendingRegistration {
            otp: OtpRecord {
                key: email.clone(),
                code,
                expires_at: Utc::now() + Duration::minutes(self.ttl_minutes),
            },
            name,
            email,
            phone,
            password_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::store::{InMemoryStore, YieldingStore};

    fn registration(email: &str) -> NewRegistration {
        NewRegistration {
            name: "Asha Rao".into(),
            email: email.into(),
            phone: "9876543210".into(),
            password_hash: "$2b$12$hash".into(),
        }
    }

    fn manager() -> (RegistrationManager, Arc<InMemoryStore<PendingRegistration>>) {
        let store = Arc::new(InMemoryStore::new());
        (RegistrationManager::new(store.clone(), 6, 10), store)
    }

    #[actix_web::test]
    async fn verified_signup_returns_payload_and_is_consumed() {
        let (signups, store) = manager();
        let code = signups.initiate(registration("asha@example.com")).await.unwrap();

        let pending = signups.verify("asha@example.com", &code).await.unwrap();
        assert_eq!(pending.name, "Asha Rao");
        assert_eq!(pending.phone, "9876543210");
        assert!(store.is_empty());

        assert!(matches!(
            signups.verify("asha@example.com", &code).await,
            Err(OtpError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn one_code_completes_one_signup() {
        let store = Arc::new(YieldingStore::<PendingRegistration>::default());
        let signups = RegistrationManager::new(store, 6, 10);
        let code = signups.initiate(registration("asha@example.com")).await.unwrap();

        let (first, second) = tokio::join!(
            signups.verify("asha@example.com", &code),
            signups.verify("asha@example.com", &code)
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    }

    #[actix_web::test]
    async fn resend_without_pending_signup_is_not_found() {
        let (signups, _) = manager();
        assert!(matches!(
            signups.resend("ghost@example.com").await,
            Err(OtpError::NotFound)
        ));
    }

    #[actix_web::test]
    async fn resend_keeps_details_and_replaces_code() {
        let (signups, _) = manager();
        let first = signups.initiate(registration("asha@example.com")).await.unwrap();
        let refreshed = signups.resend("asha@example.com").await.unwrap();

        assert_eq!(refreshed.name, "Asha Rao");
        if refreshed.otp.code != first {
            assert!(matches!(
                signups.verify("asha@example.com", &first).await,
                Err(OtpError::Mismatch)
            ));
        }
        signups
            .verify("asha@example.com", &refreshed.otp.code)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn expired_signup_is_purged_on_lookup() {
        let (signups, store) = manager();
        let mut pending = signups
            .with_fresh_code(
                "Asha Rao".into(),
                "asha@example.com".into(),
                "9876543210".into(),
                "hash".into(),
            )
            .unwrap();
        pending.otp.expires_at = Utc::now() - Duration::seconds(5);
        let code = pending.otp.code.clone();
        store.put("asha@example.com", pending).await.unwrap();

        assert!(matches!(
            signups.verify("asha@example.com", &code).await,
            Err(OtpError::Expired)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn pending_registration_serializes_flat() {
        let pending = PendingRegistration {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: "9876543210".into(),
            password_hash: "hash".into(),
            otp: OtpRecord {
                key: "asha@example.com".into(),
                code: "123456".into(),
                expires_at: Utc::now(),
            },
        };
        let value = serde_json::to_value(&pending).unwrap();
        assert_eq!(value["code"], "123456");
        assert_eq!(value["key"], "asha@example.com");
    }
}

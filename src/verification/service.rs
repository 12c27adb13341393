use std::sync::Arc;

use crate::database::RedisService;
use crate::utils::config::AppConfig;
use crate::utils::error::CustomError;
use crate::utils::notifier::{Notifier, OtpPurpose, await_delivery, spawn_delivery};

use super::otp::{OtpManager, OtpRecord};
use super::registration::{PendingRegistration, RegistrationManager};
use super::store::{InMemoryStore, OtpStore, RedisStore};
use super::sweeper::{LabeledOtp, Sweep};

/// Every OTP flow of the service, each with its own store namespace.
pub struct VerificationService {
    pub contact: Arc<OtpManager>,
    pub email: Arc<OtpManager>,
    pub reset: Arc<OtpManager>,
    pub signups: Arc<RegistrationManager>,
    notifier: Arc<dyn Notifier>,
}

impl VerificationService {
    /// Process-local stores; state is lost on restart.
    pub fn in_memory(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::build(
            config,
            notifier,
            Arc::new(InMemoryStore::<OtpRecord>::new()),
            Arc::new(InMemoryStore::<OtpRecord>::new()),
            Arc::new(InMemoryStore::<OtpRecord>::new()),
            Arc::new(InMemoryStore::<PendingRegistration>::new()),
        )
    }

    /// Stores shared through Redis so several instances see the same codes.
    pub fn with_redis(config: &AppConfig, redis: &RedisService, notifier: Arc<dyn Notifier>) -> Self {
        Self::build(
            config,
            notifier,
            Arc::new(RedisStore::<OtpRecord>::new(redis.clone(), "otp:contact")),
            Arc::new(RedisStore::<OtpRecord>::new(redis.clone(), "otp:email")),
            Arc::new(RedisStore::<OtpRecord>::new(redis.clone(), "otp:reset")),
            Arc::new(RedisStore::<PendingRegistration>::new(redis.clone(), "otp:signup")),
        )
    }

    fn build(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        contact: Arc<dyn OtpStore<OtpRecord>>,
        email: Arc<dyn OtpStore<OtpRecord>>,
        reset: Arc<dyn OtpStore<OtpRecord>>,
        signups: Arc<dyn OtpStore<PendingRegistration>>,
    ) -> Self {
        Self {
            contact: Arc::new(OtpManager::new(
                contact,
                config.contact_otp_length,
                config.contact_otp_expiry_minutes,
            )),
            email: Arc::new(OtpManager::new(
                email,
                config.otp_length,
                config.otp_expiry_minutes,
            )),
            reset: Arc::new(OtpManager::new(
                reset,
                config.otp_length,
                config.otp_expiry_minutes,
            )),
            signups: Arc::new(RegistrationManager::new(
                signups,
                config.otp_length,
                config.otp_expiry_minutes,
            )),
            notifier,
        }
    }

    /// Everything the background sweep should visit.
    pub fn sweep_targets(&self) -> Vec<Arc<dyn Sweep>> {
        let labeled = [
            ("contact-otp", &self.contact),
            ("email-verification-otp", &self.email),
            ("password-reset-otp", &self.reset),
        ];

        let mut targets: Vec<Arc<dyn Sweep>> = labeled
            .into_iter()
            .map(|(label, manager)| {
                Arc::new(LabeledOtp {
                    label,
                    manager: manager.clone(),
                }) as Arc<dyn Sweep>
            })
            .collect();
        targets.push(self.signups.clone());
        targets
    }

    /// Deliver a code and wait for the outcome so the caller can report it.
    pub async fn deliver_otp(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> Result<(), CustomError> {
        let notifier = self.notifier.clone();
        let to = to.to_string();
        let code = code.to_string();
        let display_name = display_name.map(str::to_string);

        let handle = spawn_delivery("otp", async move {
            notifier
                .send_otp(&to, &code, display_name.as_deref(), purpose, ttl_minutes)
                .await
        });

        await_delivery(handle).await.map_err(|_| {
            CustomError::InternalServerError(
                "Failed to send OTP email. Please try again later.".to_string(),
            )
        })
    }

    /// Fire-and-forget welcome mail.
    pub fn welcome(&self, to: &str, name: &str) {
        let notifier = self.notifier.clone();
        let to = to.to_string();
        let name = name.to_string();

        drop(spawn_delivery("welcome", async move {
            notifier.send_welcome(&to, &name).await
        }));
    }
}

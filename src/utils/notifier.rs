use std::future::Future;

use async_trait::async_trait;
use tokio::task::JoinHandle;

/// What an emailed code is for; selects the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Contact,
    Signup,
    EmailVerification,
    PasswordReset,
}

/// Outbound messages sent to applicants.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> Result<(), String>;

    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), String>;

    async fn send_application_confirmation(
        &self,
        to: &str,
        name: &str,
        product_name: &str,
        product_type: &str,
        reference_no: &str,
    ) -> Result<(), String>;
}

/// Used when SMTP credentials are missing: codes only reach the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        _display_name: Option<&str>,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> Result<(), String> {
        log::warn!(
            "[DEV] {:?} OTP {} for {} (expires in {} min); SMTP not configured",
            purpose,
            code,
            to,
            ttl_minutes
        );
        Ok(())
    }

    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), String> {
        log::info!("[DEV] Welcome mail for {} <{}>", name, to);
        Ok(())
    }

    async fn send_application_confirmation(
        &self,
        to: &str,
        _name: &str,
        product_name: &str,
        _product_type: &str,
        reference_no: &str,
    ) -> Result<(), String> {
        log::info!(
            "[DEV] Application confirmation for {} ({}) -> {}",
            product_name,
            reference_no,
            to
        );
        Ok(())
    }
}

/// Run a delivery as its own task. Await the handle to surface failures, or
/// drop it to detach; failures are logged either way.
pub fn spawn_delivery<F>(label: &'static str, delivery: F) -> JoinHandle<Result<(), String>>
where
    F: Future<Output = Result<(), String>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = delivery.await;
        if let Err(e) = &result {
            log::error!("[{}] delivery failed: {}", label, e);
        }
        result
    })
}

/// Await a spawned delivery, folding a panicked task into an error.
pub async fn await_delivery(handle: JoinHandle<Result<(), String>>) -> Result<(), String> {
    handle
        .await
        .map_err(|e| format!("delivery task failed: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn awaited_delivery_reports_failure() {
        let handle = spawn_delivery("test", async { Err("smtp down".to_string()) });
        assert_eq!(await_delivery(handle).await, Err("smtp down".to_string()));
    }

    #[actix_web::test]
    async fn log_notifier_never_fails() {
        let result = LogNotifier
            .send_otp("a@b.co", "1234", None, OtpPurpose::Contact, 5)
            .await;
        assert!(result.is_ok());
    }
}

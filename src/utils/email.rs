use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

use crate::utils::notifier::{Notifier, OtpPurpose};

const BRAND: &str = "Six Loans";

/// SMTP configuration
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    /// Load email configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "465".to_string())
                .parse()
                .map_err(|_| "SMTP_PORT must be a valid number")?,
            smtp_username: env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME is required")?,
            smtp_password: env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD is required")?,
            from_email: env::var("SMTP_FROM_EMAIL").map_err(|_| "SMTP_FROM_EMAIL is required")?,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| BRAND.to_string()),
        })
    }
}

/// Email service for sending emails over SMTP
pub struct EmailService {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    pub fn with_config(config: EmailConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        // 465 is implicit TLS; anything else negotiates STARTTLS.
        let relay = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        };
        let builder = relay.map_err(|e| format!("Failed to create SMTP transport: {}", e))?;

        let transport = builder.credentials(creds).port(config.smtp_port).build();

        Ok(Self { config, transport })
    }

    /// Send a plain text email
    pub async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), String> {
        let from_address = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| format!("Invalid from address: {}", e))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| format!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| format!("Failed to send email: {}", e))?;

        Ok(())
    }
}

fn greeting(display_name: Option<&str>) -> String {
    match display_name {
        Some(name) if !name.trim().is_empty() => format!("Hi {},", name.trim()),
        _ => "Hi,".to_string(),
    }
}

fn otp_subject(purpose: OtpPurpose) -> String {
    match purpose {
        OtpPurpose::Contact => format!("Your {} OTP", BRAND),
        OtpPurpose::Signup | OtpPurpose::EmailVerification => {
            format!("Your Email Verification OTP - {}", BRAND)
        }
        OtpPurpose::PasswordReset => format!("Password Reset OTP - {}", BRAND),
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
        purpose: OtpPurpose,
        ttl_minutes: i64,
    ) -> Result<(), String> {
        let action = match purpose {
            OtpPurpose::PasswordReset => "reset your password",
            OtpPurpose::Contact => "continue",
            OtpPurpose::Signup | OtpPurpose::EmailVerification => "verify your email address",
        };
        let body = format!(
            "{}\n\n\
            Use this code to {}: {}\n\n\
            This code will expire in {} minutes.\n\n\
            If you didn't request this, please ignore this email.\n\n\
            - Team {}",
            greeting(display_name),
            action,
            code,
            ttl_minutes,
            BRAND
        );

        self.send_email(to, &otp_subject(purpose), &body).await
    }

    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), String> {
        let subject = format!("Welcome to {}!", BRAND);
        let body = format!(
            "{}\n\n\
            Your account is ready. Compare loans, credit cards and insurance \
            and track every application from your dashboard.\n\n\
            - Team {}",
            greeting(Some(name)),
            BRAND
        );

        self.send_email(to, &subject, &body).await
    }

    async fn send_application_confirmation(
        &self,
        to: &str,
        name: &str,
        product_name: &str,
        product_type: &str,
        reference_no: &str,
    ) -> Result<(), String> {
        let subject = format!(
            "Application Received - {} | Ref: {}",
            product_name, reference_no
        );
        let body = format!(
            "{}\n\n\
            We have received your {} application for {}.\n\n\
            Reference number: {}\n\n\
            Keep this number handy when you contact support. Our team will \
            review your application and get back to you shortly.\n\n\
            - Team {}",
            greeting(Some(name)),
            product_type.replace('_', " ").to_lowercase(),
            product_name,
            reference_no,
            BRAND
        );

        self.send_email(to, &subject, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_falls_back_without_name() {
        assert_eq!(greeting(Some("Asha")), "Hi Asha,");
        assert_eq!(greeting(Some("  ")), "Hi,");
        assert_eq!(greeting(None), "Hi,");
    }

    #[test]
    fn reset_mail_has_its_own_subject() {
        assert!(otp_subject(OtpPurpose::PasswordReset).starts_with("Password Reset"));
        assert!(otp_subject(OtpPurpose::Signup).contains("Verification"));
    }
}

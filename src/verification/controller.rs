use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::user::service::UserService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{envelope, normalize_email};
use crate::utils::model::{EmailOtpRequest, EmailRequest};
use crate::utils::notifier::OtpPurpose;
use crate::utils::validation::validate_email;
use crate::verification::VerificationService;

// ============================================
// Contact OTP (no account involved)
// ============================================

pub async fn send_contact_otp(
    verification: web::Data<VerificationService>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    validate_email(&email)?;

    let code = verification.contact.resend(&email).await?;
    let ttl = verification.contact.ttl_minutes();
    verification
        .deliver_otp(&email, &code, None, OtpPurpose::Contact, ttl)
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "OTP sent successfully",
        json!({ "email": email, "expiresInMinutes": ttl }),
    ))
}

pub async fn verify_contact_otp(
    verification: web::Data<VerificationService>,
    body: web::Json<EmailOtpRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    verification.contact.verify(&email, body.otp.trim()).await?;

    Ok(envelope(
        StatusCode::OK,
        "OTP verified successfully",
        json!({ "email": email, "verified": true }),
    ))
}

// ============================================
// Email verification for existing accounts
// ============================================

async fn issue_email_code(
    user_service: &UserService,
    verification: &VerificationService,
    email: &str,
) -> Result<i64, CustomError> {
    let user = user_service
        .find_by_email(email)
        .await?
        .ok_or_else(|| CustomError::NotFoundError("User not found".into()))?;

    if user.email_verified {
        return Err(CustomError::BadRequestError(
            "Email is already verified".into(),
        ));
    }

    let code = verification.email.resend(email).await?;
    let ttl = verification.email.ttl_minutes();
    verification
        .deliver_otp(email, &code, Some(&user.name), OtpPurpose::EmailVerification, ttl)
        .await?;

    Ok(ttl)
}

pub async fn send_verification_otp(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    validate_email(&email)?;
    let ttl = issue_email_code(&user_service, &verification, &email).await?;

    Ok(envelope(
        StatusCode::OK,
        "Verification code sent to your email",
        json!({ "email": email, "expiresInMinutes": ttl }),
    ))
}

pub async fn resend_verification_otp(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    let ttl = issue_email_code(&user_service, &verification, &email).await?;

    Ok(envelope(
        StatusCode::OK,
        "A new verification code has been sent",
        json!({ "email": email, "expiresInMinutes": ttl }),
    ))
}

pub async fn verify_email(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    body: web::Json<EmailOtpRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    verification.email.verify(&email, body.otp.trim()).await?;
    user_service.mark_email_verified(&email).await?;

    Ok(envelope(
        StatusCode::OK,
        "Email verified successfully",
        json!({ "email": email, "emailVerified": true }),
    ))
}

pub async fn verification_status(
    user_service: web::Data<UserService>,
    email: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&email.into_inner());
    let user = user_service
        .find_by_email(&email)
        .await?
        .ok_or_else(|| CustomError::NotFoundError("User not found".into()))?;

    Ok(envelope(
        StatusCode::OK,
        "Verification status fetched",
        json!({
            "email": user.email,
            "emailVerified": user.email_verified,
            "emailVerifiedAt": user.email_verified_at,
        }),
    ))
}

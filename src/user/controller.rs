use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use crate::database::RedisService;
use crate::middleware::auth::{get_claims, invalidate_session};
use crate::user::model::{
    LoginRequest, ResetPasswordRequest, SignupRequest, UpdateProfileRequest, UserResponse,
};
use crate::user::service::UserService;
use crate::utils::config::AppConfig;
use crate::utils::error::CustomError;
use crate::utils::hashing;
use crate::utils::helpers::{envelope, normalize_email, normalize_phone};
use crate::utils::model::{EmailOtpRequest, EmailRequest};
use crate::utils::notifier::OtpPurpose;
use crate::utils::validation::{validate_email, validate_password, validate_phone};
use crate::verification::VerificationService;
use crate::verification::registration::NewRegistration;

/// Session store when Redis is configured; tokens are stateless otherwise.
fn session_store(redis: &Option<web::Data<RedisService>>) -> Option<&RedisService> {
    redis.as_ref().map(|data| data.get_ref())
}

pub async fn signup(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, CustomError> {
    let body = body.into_inner();

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(CustomError::ValidationError("Name is required".into()));
    }
    let email = normalize_email(&body.email);
    validate_email(&email)?;
    let phone = normalize_phone(&body.phone);
    validate_phone(phone.trim_start_matches("+91"))?;
    validate_password(&body.password)?;

    user_service.ensure_available(&email, &phone).await?;

    let password_hash = hashing::hash_password(&body.password)
        .map_err(|e| CustomError::InternalServerError(e.to_string()))?;

    let code = verification
        .signups
        .initiate(NewRegistration {
            name: name.clone(),
            email: email.clone(),
            phone,
            password_hash,
        })
        .await?;

    let ttl = verification.signups.ttl_minutes();
    if let Err(e) = verification
        .deliver_otp(&email, &code, Some(&name), OtpPurpose::Signup, ttl)
        .await
    {
        // Nothing was sent, so nothing should stay pending
        if let Err(cancel_err) = verification.signups.cancel(&email).await {
            log::warn!("Failed to drop pending signup for {}: {}", email, cancel_err);
        }
        return Err(e);
    }

    Ok(envelope(
        StatusCode::OK,
        "OTP sent to your email. Please verify to complete signup.",
        json!({ "email": email, "expiresInMinutes": ttl }),
    ))
}

pub async fn verify_signup(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    config: web::Data<AppConfig>,
    redis: Option<web::Data<RedisService>>,
    body: web::Json<EmailOtpRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    let pending = verification.signups.verify(&email, body.otp.trim()).await?;

    let user = user_service.create_from_registration(pending).await?;
    let token = user_service
        .token_for(&user, &config, session_store(&redis))
        .await?;

    verification.welcome(&user.email, &user.name);
    log::info!("Signup completed for {}", user.email);

    Ok(envelope(
        StatusCode::CREATED,
        "Account created successfully",
        json!({ "token": token, "user": UserResponse::from(&user) }),
    ))
}

pub async fn resend_signup(
    verification: web::Data<VerificationService>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    let pending = verification.signups.resend(&email).await?;

    let ttl = verification.signups.ttl_minutes();
    verification
        .deliver_otp(
            &pending.email,
            &pending.otp.code,
            Some(&pending.name),
            OtpPurpose::Signup,
            ttl,
        )
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "A new OTP has been sent to your email",
        json!({ "email": email, "expiresInMinutes": ttl }),
    ))
}

pub async fn login_user(
    user_service: web::Data<UserService>,
    config: web::Data<AppConfig>,
    redis: Option<web::Data<RedisService>>,
    login_info: web::Json<LoginRequest>,
) -> Result<HttpResponse, CustomError> {
    let (token, user) = user_service
        .login_fn(login_info.into_inner(), &config, session_store(&redis))
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Login successful",
        json!({ "token": token, "user": UserResponse::from(&user) }),
    ))
}

pub async fn me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user = user_service.find_by_id(&claims.id).await?;

    Ok(envelope(
        StatusCode::OK,
        "User fetched successfully",
        json!({ "user": UserResponse::from(&user) }),
    ))
}

pub async fn logout_user(
    redis: Option<web::Data<RedisService>>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;

    if let Some(redis) = redis {
        invalidate_session(&claims.id, &redis).await?;
    }

    Ok(envelope(StatusCode::OK, "Logged out successfully", json!({})))
}

pub async fn refresh_token(
    user_service: web::Data<UserService>,
    config: web::Data<AppConfig>,
    redis: Option<web::Data<RedisService>>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user = user_service.find_by_id(&claims.id).await?;

    if let Some(redis) = session_store(&redis) {
        invalidate_session(&claims.id, redis).await?;
    }
    let token = user_service
        .token_for(&user, &config, session_store(&redis))
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Token refreshed",
        json!({ "token": token, "user": UserResponse::from(&user) }),
    ))
}

pub async fn forgot_password(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let email = normalize_email(&body.email);
    validate_email(&email)?;

    // Same answer whether or not the account exists
    if let Some(user) = user_service.find_by_email(&email).await? {
        let code = verification.reset.resend(&email).await?;
        verification
            .deliver_otp(
                &email,
                &code,
                Some(&user.name),
                OtpPurpose::PasswordReset,
                verification.reset.ttl_minutes(),
            )
            .await?;
    } else {
        log::info!("Password reset requested for unknown email {}", email);
    }

    Ok(envelope(
        StatusCode::OK,
        "If an account exists for this email, a reset code has been sent",
        json!({}),
    ))
}

pub async fn reset_password(
    user_service: web::Data<UserService>,
    verification: web::Data<VerificationService>,
    redis: Option<web::Data<RedisService>>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, CustomError> {
    let body = body.into_inner();
    let email = normalize_email(&body.email);
    validate_password(&body.password)?;

    verification.reset.verify(&email, body.otp.trim()).await?;

    let user = user_service
        .find_by_email(&email)
        .await?
        .ok_or_else(|| CustomError::NotFoundError("User not found".into()))?;

    let password_hash = hashing::hash_password(&body.password)
        .map_err(|e| CustomError::InternalServerError(e.to_string()))?;
    user_service.set_password(&email, &password_hash).await?;

    if let Some(redis) = redis {
        invalidate_session(&user.id_hex(), &redis).await?;
    }

    Ok(envelope(
        StatusCode::OK,
        "Password reset successfully. Please log in with your new password.",
        json!({}),
    ))
}

pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user = user_service.find_by_id(&claims.id).await?;

    Ok(envelope(
        StatusCode::OK,
        "Profile fetched successfully",
        json!({ "profile": UserResponse::from(&user) }),
    ))
}

pub async fn update_profile(
    user_service: web::Data<UserService>,
    body: web::Json<UpdateProfileRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user = user_service
        .update_profile(&claims.id, body.into_inner())
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Profile updated successfully",
        json!({ "profile": UserResponse::from(&user) }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_stateless_without_redis() {
        assert!(session_store(&None).is_none());
    }
}

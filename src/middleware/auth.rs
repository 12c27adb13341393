use crate::database::RedisService;
use crate::user::model::Role;
use crate::utils::config::AppConfig;
use crate::utils::error::CustomError;
use actix_web::{Error, HttpMessage, HttpRequest, dev::ServiceRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub jti: String,
    pub exp: usize,
}

/// Verify JWT token and validate session in Redis
pub async fn verify_token(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let token = credentials.token();

    let Some(config) = req.app_data::<web::Data<AppConfig>>() else {
        log::error!("AppConfig missing from app data; rejecting bearer request");
        return Err((
            CustomError::InternalServerError("Authentication is not configured".into()).into(),
            req,
        ));
    };

    // First decode the JWT
    let claims = match decode_token(token, &config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => return Err((e.into(), req)),
    };

    // Get Redis service from app data
    let redis_service = match req.app_data::<web::Data<RedisService>>() {
        Some(service) => service,
        None => {
            // If Redis is not available, just validate JWT (fallback mode)
            req.extensions_mut().insert(claims);
            return Ok(req);
        }
    };

    // Validate session in Redis
    match redis_service.validate_session(token).await {
        Ok(Some(stored_user_id)) if stored_user_id == claims.id => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Ok(Some(_)) => Err((
            CustomError::UnauthorizedError("Session mismatch".into()).into(),
            req,
        )),
        Ok(None) => {
            // Token not found in Redis - session expired or user logged out
            Err((
                CustomError::UnauthorizedError("Session expired or invalid".into()).into(),
                req,
            ))
        }
        Err(e) => {
            // Redis error - fallback to just JWT validation
            log::warn!("Session lookup failed, accepting JWT alone: {}", e);
            req.extensions_mut().insert(claims);
            Ok(req)
        }
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, CustomError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| CustomError::UnauthorizedError("Invalid or expired token".into()))
}

/// Create a JWT token, storing the session in Redis when it is available
pub async fn create_token(
    user_id: &str,
    email: &str,
    role: Role,
    config: &AppConfig,
    redis_service: Option<&RedisService>,
) -> Result<String, CustomError> {
    let expiry = chrono::Duration::hours(config.jwt_expiry_hours);
    let expiration = chrono::Utc::now()
        .checked_add_signed(expiry)
        .ok_or_else(|| CustomError::InternalServerError("Token expiry overflow".into()))?
        .timestamp() as usize;

    let claims = Claims {
        id: user_id.to_owned(),
        email: email.to_owned(),
        role,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| CustomError::InternalServerError("Token generation failed".to_string()))?;

    if let Some(redis) = redis_service {
        redis
            .store_session(user_id, &token, expiry.num_seconds().max(1) as u64)
            .await
            .map_err(|e| {
                CustomError::InternalServerError(format!("Failed to store session: {}", e))
            })?;
    }

    Ok(token)
}

/// Invalidate a user's session (logout)
pub async fn invalidate_session(
    user_id: &str,
    redis_service: &RedisService,
) -> Result<(), CustomError> {
    redis_service
        .invalidate_session(user_id)
        .await
        .map_err(|e| CustomError::InternalServerError(format!("Failed to invalidate session: {}", e)))
}

/// Claims placed by `verify_token` (use after auth middleware)
pub fn get_claims(req: &HttpRequest) -> Result<Claims, CustomError> {
    req.extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| CustomError::UnauthorizedError("No claims found".into()))
}

pub fn require_roles(req: &HttpRequest, allowed: &[Role]) -> Result<Claims, CustomError> {
    let claims = get_claims(req)?;

    if !allowed.contains(&claims.role) {
        return Err(CustomError::ForbiddenError(
            "You do not have permission to perform this action".into(),
        ));
    }

    Ok(claims)
}

pub fn require_staff(req: &HttpRequest) -> Result<Claims, CustomError> {
    require_roles(req, &[Role::Admin, Role::Moderator])
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn request_with(role: Role) -> HttpRequest {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(Claims {
            id: "64b7f0c2a1b2c3d4e5f60718".into(),
            email: "staff@sixloans.in".into(),
            role,
            jti: "test".into(),
            exp: 0,
        });
        req
    }

    #[actix_web::test]
    async fn issued_token_decodes_with_same_secret() {
        let config = AppConfig::for_tests();
        let token = create_token("abc", "a@b.co", Role::Moderator, &config, None)
            .await
            .unwrap();

        let claims = decode_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.id, "abc");
        assert_eq!(claims.role, Role::Moderator);
        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[actix_web::test]
    async fn tokens_carry_distinct_ids() {
        let config = AppConfig::for_tests();
        let first = create_token("abc", "a@b.co", Role::User, &config, None).await.unwrap();
        let second = create_token("abc", "a@b.co", Role::User, &config, None).await.unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn role_gate() {
        assert!(require_staff(&request_with(Role::Moderator)).is_ok());
        assert!(matches!(
            require_staff(&request_with(Role::User)),
            Err(CustomError::ForbiddenError(_))
        ));
        assert!(matches!(
            require_roles(&request_with(Role::Moderator), &[Role::Admin]),
            Err(CustomError::ForbiddenError(_))
        ));
    }

    #[test]
    fn missing_claims_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(get_claims(&req), Err(CustomError::UnauthorizedError(_))));
    }
}

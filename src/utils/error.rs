use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::utils::helpers::service_name;
use crate::verification::otp::OtpError;

#[derive(Debug, Error)]
pub enum CustomError {
    #[error("Unauthorized: {0}")]
    UnauthorizedError(String),

    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    #[error("Bad Request: {0}")]
    BadRequestError(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Not Found: {0}")]
    NotFoundError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    OtpError(#[from] OtpError),
}

impl CustomError {
    /// Machine-readable code placed in the `error` field of the envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            CustomError::UnauthorizedError(..) => "UNAUTHORIZED_ERROR",
            CustomError::ForbiddenError(..) => "FORBIDDEN_ERROR",
            CustomError::BadRequestError(..) => "BAD_REQUEST_ERROR",
            CustomError::ConflictError(..) => "CONFLICT_ERROR",
            CustomError::InternalServerError(..) => "INTERNAL_SERVER_ERROR",
            CustomError::NotFoundError(..) => "NOT_FOUND_ERROR",
            CustomError::ValidationError(..) => "VALIDATION_ERROR",
            CustomError::OtpError(otp) => match otp {
                OtpError::NotFound => "OTP_NOT_FOUND",
                OtpError::Expired => "OTP_EXPIRED",
                OtpError::Mismatch => "OTP_MISMATCH",
                OtpError::Validation(..) => "VALIDATION_ERROR",
                OtpError::Store(..) => "INTERNAL_SERVER_ERROR",
            },
        }
    }
}

impl ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::UnauthorizedError(..) => StatusCode::UNAUTHORIZED,
            CustomError::ForbiddenError(..) => StatusCode::FORBIDDEN,
            CustomError::BadRequestError(..) => StatusCode::BAD_REQUEST,
            CustomError::ConflictError(..) => StatusCode::CONFLICT,
            CustomError::InternalServerError(..) => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::NotFoundError(..) => StatusCode::NOT_FOUND,
            CustomError::ValidationError(..) => StatusCode::BAD_REQUEST,
            CustomError::OtpError(OtpError::Store(..)) => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::OtpError(..) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }

        let error_message = json!({
            "success": false,
            "message": self.to_string(),
            "httpStatusCode": self.status_code().as_u16(),
            "error": self.error_code(),
            "service": service_name(),
        });

        HttpResponse::build(self.status_code()).json(error_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::store::StoreError;

    #[test]
    fn otp_failures_are_client_errors() {
        for err in [OtpError::NotFound, OtpError::Expired, OtpError::Mismatch] {
            let err = CustomError::from(err);
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn otp_codes_keep_their_taxonomy() {
        assert_eq!(CustomError::from(OtpError::NotFound).error_code(), "OTP_NOT_FOUND");
        assert_eq!(CustomError::from(OtpError::Expired).error_code(), "OTP_EXPIRED");
        assert_eq!(CustomError::from(OtpError::Mismatch).error_code(), "OTP_MISMATCH");
        assert_eq!(
            CustomError::from(OtpError::Validation("bad".into())).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn store_failure_is_a_server_error() {
        let err = CustomError::from(OtpError::Store(StoreError::Backend("down".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

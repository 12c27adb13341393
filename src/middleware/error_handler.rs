use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, Result};
use serde_json::json;

use crate::utils::helpers::service_name;

/// Responses built from `CustomError` already carry the JSON envelope.
pub(crate) fn is_enveloped<B>(res: &ServiceResponse<B>) -> bool {
    res.response()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn error_label(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "BAD_REQUEST_ERROR",
        401 => "UNAUTHORIZED_ERROR",
        403 => "FORBIDDEN_ERROR",
        404 => "NOT_FOUND_ERROR",
        405 => "METHOD_NOT_ALLOWED",
        413 => "PAYLOAD_TOO_LARGE",
        400..=499 => "CLIENT_ERROR",
        _ => "INTERNAL_SERVER_ERROR",
    }
}

/// Wraps framework errors (bad JSON, missing bearer header, ...) in the envelope.
pub fn handle_error<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    if is_enveloped(&res) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let status_code = res.status();
    let error_message = res
        .response()
        .error()
        .map(|e| e.to_string())
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| status_code.canonical_reason().unwrap_or("Unknown error").to_string());

    let new_response = HttpResponse::build(status_code).json(json!({
        "success": false,
        "message": error_message,
        "httpStatusCode": status_code.as_u16(),
        "error": error_label(status_code),
        "service": service_name(),
    }));

    let (req, _) = res.into_parts();
    let res = ServiceResponse::new(req, new_response.map_into_right_body());

    Ok(ErrorHandlerResponse::Response(res))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_status() {
        assert_eq!(error_label(StatusCode::UNAUTHORIZED), "UNAUTHORIZED_ERROR");
        assert_eq!(error_label(StatusCode::UNPROCESSABLE_ENTITY), "CLIENT_ERROR");
        assert_eq!(error_label(StatusCode::BAD_GATEWAY), "INTERNAL_SERVER_ERROR");
    }
}

use serde::Deserialize;

/// `{ "email": ... }` bodies (send, resend, forgot-password).
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// `{ "email": ..., "otp": ... }` bodies.
#[derive(Debug, Deserialize)]
pub struct EmailOtpRequest {
    pub email: String,
    pub otp: String,
}

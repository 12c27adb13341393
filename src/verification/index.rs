use super::controller::{
    resend_verification_otp, send_verification_otp, verification_status, verify_email,
};
use actix_web::web;

pub fn email_verification_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/email-verification")
            .route("/send-otp", web::post().to(send_verification_otp))
            .route("/verify-otp", web::post().to(verify_email))
            .route("/resend-otp", web::post().to(resend_verification_otp))
            .route("/status/{email}", web::get().to(verification_status)),
    );
}

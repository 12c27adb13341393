use super::controller::{
    forgot_password, get_profile, login_user, logout_user, me, refresh_token, resend_signup,
    reset_password, signup, update_profile, verify_signup,
};
use crate::application::controller::{
    get_my_application, list_my_applications, withdraw_application,
};
use crate::middleware::auth::verify_token;
use crate::verification::controller::{send_contact_otp, verify_contact_otp};
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/send-otp", web::post().to(send_contact_otp))
            .route("/verify-otp", web::post().to(verify_contact_otp))
            .route("/signup", web::post().to(signup))
            .route("/signup/verify", web::post().to(verify_signup))
            .route("/signup/resend", web::post().to(resend_signup))
            .route("/login", web::post().to(login_user))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password", web::post().to(reset_password))
            .service(
                web::resource("/me")
                    .wrap(HttpAuthentication::bearer(verify_token))
                    .route(web::get().to(me)),
            )
            .service(
                web::resource("/logout")
                    .wrap(HttpAuthentication::bearer(verify_token))
                    .route(web::post().to(logout_user)),
            )
            .service(
                web::resource("/refresh-token")
                    .wrap(HttpAuthentication::bearer(verify_token))
                    .route(web::post().to(refresh_token)),
            ),
    );
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .wrap(HttpAuthentication::bearer(verify_token))
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile))
            .route("/applications", web::get().to(list_my_applications))
            .route("/applications/{id}", web::get().to(get_my_application))
            .route("/applications/{id}/withdraw", web::put().to(withdraw_application)),
    );
}

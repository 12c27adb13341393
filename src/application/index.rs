use super::controller::{get_application, submit_application, update_application_status};
use crate::middleware::auth::verify_token;
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn application_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/applications")
            .route("", web::post().to(submit_application))
            .service(
                web::resource("/{id}")
                    .wrap(HttpAuthentication::bearer(verify_token))
                    .route(web::get().to(get_application)),
            )
            .service(
                web::resource("/{id}/status")
                    .wrap(HttpAuthentication::bearer(verify_token))
                    .route(web::put().to(update_application_status)),
            ),
    );
}

use crate::admin::index::admin_routes;
use crate::application::index::application_routes;
use crate::catalog::index::catalog_routes;
use crate::user::index::{auth_routes, user_routes};
use crate::verification::index::email_verification_routes;
use actix_web::web;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth_routes);
    cfg.configure(user_routes);
    cfg.configure(email_verification_routes);
    cfg.configure(catalog_routes);
    cfg.configure(application_routes);
    cfg.configure(admin_routes);
}

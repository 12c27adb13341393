use super::controller::{
    can_delete_category, create_category, create_product, dashboard_stats, delete_category,
    delete_product, force_delete_category, get_product, list_applications, list_categories,
    list_products, list_users, update_application, update_category, update_product,
    update_user_role,
};
use crate::middleware::auth::verify_token;
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    let auth = HttpAuthentication::bearer(verify_token);

    cfg.service(
        web::scope("/api/admin")
            .wrap(auth)
            .route("/stats", web::get().to(dashboard_stats))
            .route("/users", web::get().to(list_users))
            .route("/users/{id}/role", web::put().to(update_user_role))
            .service(
                web::scope("/categories")
                    .route("", web::get().to(list_categories))
                    .route("", web::post().to(create_category))
                    .route("/{id}", web::put().to(update_category))
                    .route("/{id}", web::delete().to(delete_category))
                    .route("/{id}/can-delete", web::get().to(can_delete_category))
                    .route("/{id}/force", web::delete().to(force_delete_category)),
            )
            .service(
                web::scope("/products")
                    .route("", web::get().to(list_products))
                    .route("", web::post().to(create_product))
                    .route("/{id}", web::get().to(get_product))
                    .route("/{id}", web::put().to(update_product))
                    .route("/{id}", web::delete().to(delete_product)),
            )
            .service(
                web::scope("/applications")
                    .route("", web::get().to(list_applications))
                    .route("/{id}", web::put().to(update_application)),
            ),
    );
}

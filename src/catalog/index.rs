use super::controller::{
    credit_card_details, credit_cards_by_category, insurance_by_category, list_categories,
    list_credit_cards, loan_details, loans_by_category,
};
use actix_web::web;

pub fn catalog_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/categories", web::get().to(list_categories))
        .service(
            web::scope("/api/loans")
                .route("/category/{slug}", web::get().to(loans_by_category))
                .route("/details/{slug}", web::get().to(loan_details)),
        )
        .service(
            web::scope("/api/credit-cards")
                .route("", web::get().to(list_credit_cards))
                .route("/by-category/{slug}", web::get().to(credit_cards_by_category))
                .route("/{slug}", web::get().to(credit_card_details)),
        )
        .service(
            web::scope("/api/insurance")
                .route("/by-category/{slug}", web::get().to(insurance_by_category)),
        );
}

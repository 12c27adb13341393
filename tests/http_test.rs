//! HTTP-level tests that need no database: routing, envelopes, bearer
//! rejection and the contact OTP round trip against in-memory stores.

use std::sync::{Arc, Mutex};

use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;
use actix_web::{App, test, web};
use async_trait::async_trait;
use serde_json::{Value, json};

use sixloans_backend::middleware::error_handler::handle_error;
use sixloans_backend::middleware::not_found::not_found;
use sixloans_backend::router::index::routes;
use sixloans_backend::utils::config::AppConfig;
use sixloans_backend::utils::notifier::{Notifier, OtpPurpose};
use sixloans_backend::verification::VerificationService;

/// Keeps every code it is asked to deliver.
#[derive(Default)]
struct CapturingNotifier {
    codes: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    fn last_code_for(&self, to: &str) -> Option<String> {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(email, _)| email == to)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        _display_name: Option<&str>,
        _purpose: OtpPurpose,
        _ttl_minutes: i64,
    ) -> Result<(), String> {
        self.codes
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }

    async fn send_welcome(&self, _to: &str, _name: &str) -> Result<(), String> {
        Ok(())
    }

    async fn send_application_confirmation(
        &self,
        _to: &str,
        _name: &str,
        _product_name: &str,
        _product_type: &str,
        _reference_no: &str,
    ) -> Result<(), String> {
        Ok(())
    }
}

macro_rules! test_app {
    ($notifier:expr) => {{
        let config = AppConfig::for_tests();
        let notifier: Arc<dyn Notifier> = $notifier;
        let verification = VerificationService::in_memory(&config, notifier.clone());

        test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(verification))
                .app_data(web::Data::from(notifier))
                .configure(routes)
                .wrap(
                    ErrorHandlers::new()
                        .handler(StatusCode::NOT_FOUND, not_found)
                        .default_handler(handle_error),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn unknown_route_gets_not_found_envelope() {
    let app = test_app!(Arc::new(CapturingNotifier::default()));

    let req = test::TestRequest::get().uri("/api/nothing-here").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route does not exist");
    assert_eq!(body["httpStatusCode"], 404);
}

#[actix_web::test]
async fn admin_routes_require_a_bearer_token() {
    let app = test_app!(Arc::new(CapturingNotifier::default()));

    let req = test::TestRequest::get().uri("/api/admin/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHORIZED_ERROR");
}

#[actix_web::test]
async fn forged_token_is_rejected() {
    let app = test_app!(Arc::new(CapturingNotifier::default()));

    let req = test::TestRequest::get()
        .uri("/api/users/profile")
        .insert_header(("Authorization", "Bearer not.a.jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHORIZED_ERROR");
}

#[actix_web::test]
async fn contact_otp_is_single_use() {
    let notifier = Arc::new(CapturingNotifier::default());
    let app = test_app!(notifier.clone());
    let email = "applicant@example.com";

    let req = test::TestRequest::post()
        .uri("/auth/send-otp")
        .set_json(json!({ "email": "  Applicant@Example.com " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], email);
    assert_eq!(body["expiresInMinutes"], 5);

    let code = notifier.last_code_for(email).expect("code delivered");
    assert_eq!(code.len(), 4);

    // A wrong guess leaves the code usable
    let req = test::TestRequest::post()
        .uri("/auth/verify-otp")
        .set_json(json!({ "email": email, "otp": "0000" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "OTP_MISMATCH");

    let req = test::TestRequest::post()
        .uri("/auth/verify-otp")
        .set_json(json!({ "email": email, "otp": code }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["verified"], true);

    let req = test::TestRequest::post()
        .uri("/auth/verify-otp")
        .set_json(json!({ "email": email, "otp": code }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "OTP_NOT_FOUND");
}

#[actix_web::test]
async fn send_otp_rejects_malformed_email() {
    let app = test_app!(Arc::new(CapturingNotifier::default()));

    let req = test::TestRequest::post()
        .uri("/auth/send-otp")
        .set_json(json!({ "email": "not-an-email" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

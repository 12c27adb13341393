use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use serde_json::json;

use sixloans_backend::application::service::ApplicationService;
use sixloans_backend::catalog::service::CatalogService;
use sixloans_backend::database::{self, RedisService};
use sixloans_backend::middleware::error_handler::handle_error;
use sixloans_backend::middleware::not_found::not_found;
use sixloans_backend::router::index::routes;
use sixloans_backend::user::service::UserService;
use sixloans_backend::utils::config::AppConfig;
use sixloans_backend::utils::email::{EmailConfig, EmailService};
use sixloans_backend::utils::helpers::envelope;
use sixloans_backend::utils::notifier::{LogNotifier, Notifier};
use sixloans_backend::verification::VerificationService;
use sixloans_backend::verification::sweeper::SweepRunner;

#[get("/")]
async fn default() -> impl Responder {
    envelope(StatusCode::OK, "Welcome to the Six Loans API", json!({}))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "ok": true }))
}

fn build_notifier() -> Arc<dyn Notifier> {
    match EmailConfig::from_env().and_then(EmailService::with_config) {
        Ok(service) => {
            info!("SMTP delivery enabled");
            Arc::new(service)
        }
        Err(e) => {
            warn!("{}; OTP codes will only be logged", e);
            Arc::new(LogNotifier)
        }
    }
}

async fn connect_redis(config: &AppConfig) -> Option<RedisService> {
    let url = config.redis_url.as_deref()?;

    match database::connect_to_redis(url).await {
        Ok(client) => Some(RedisService::new(&client)),
        Err(e) => {
            warn!("{}; falling back to in-memory OTP stores", e);
            None
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match database::connect_to_mongo(&config.mongodb_uri, &config.database_name).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = database::ensure_indexes(&db).await {
        warn!("Failed to create indexes: {}", e);
    }

    let redis = connect_redis(&config).await;
    let notifier = build_notifier();

    let verification = match &redis {
        Some(redis) => VerificationService::with_redis(&config, redis, notifier.clone()),
        None => VerificationService::in_memory(&config, notifier.clone()),
    };
    let sweeper = SweepRunner::new(verification.sweep_targets(), config.otp_sweep_interval).start();

    let user_service = web::Data::new(UserService::new(&db));
    let catalog_service = web::Data::new(CatalogService::new(&db));
    let application_service = web::Data::new(ApplicationService::new(&db));
    let verification = web::Data::new(verification);
    let notifier: web::Data<dyn Notifier> = web::Data::from(notifier);
    let redis = redis.map(web::Data::new);
    let bind_addr = (config.host.clone(), config.port);
    let app_config = web::Data::new(config);

    info!("Starting server on http://{}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&app_config.frontend_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        let mut app = App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(app_config.clone())
            .app_data(user_service.clone())
            .app_data(catalog_service.clone())
            .app_data(application_service.clone())
            .app_data(verification.clone())
            .app_data(notifier.clone());

        if let Some(redis) = &redis {
            app = app.app_data(redis.clone());
        }

        app.configure(routes)
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::NOT_FOUND, not_found)
                    .default_handler(handle_error),
            )
            .service(default)
            .service(health)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    sweeper.cancel();
    info!("Server has stopped");

    Ok(())
}

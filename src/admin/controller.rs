use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use mongodb::bson::doc;
use serde_json::{Map, Value, json};

use crate::application::model::{ApplicationFilter, ApplicationStatus, StatusUpdateRequest};
use crate::application::service::{ApplicationService, parse_application_id};
use crate::catalog::model::{CategoryInput, ProductInput, ProductType, TypeQuery};
use crate::catalog::service::CatalogService;
use crate::middleware::auth::{require_roles, require_staff};
use crate::user::model::{Role, UpdateRoleRequest, UserResponse};
use crate::user::service::UserService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{api_json, api_list, envelope};
use crate::utils::validation::non_blank;

const RECENT_APPLICATIONS: i64 = 5;

// ============================================
// Users
// ============================================

pub async fn list_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let users: Vec<UserResponse> = user_service
        .list_users()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(envelope(
        StatusCode::OK,
        "Users fetched successfully",
        json!({ "count": users.len(), "users": users }),
    ))
}

pub async fn update_user_role(
    user_service: web::Data<UserService>,
    id: web::Path<String>,
    body: web::Json<UpdateRoleRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = require_roles(&req, &[Role::Admin])?;
    let role: Role = body.role.parse().map_err(CustomError::ValidationError)?;

    if claims.id == id.as_str() && role != Role::Admin {
        return Err(CustomError::BadRequestError(
            "You cannot remove your own admin role".into(),
        ));
    }

    let user = user_service.set_role(&id, role).await?;
    log::info!("{} changed role of {} to {}", claims.email, user.email, role);

    Ok(envelope(
        StatusCode::OK,
        "User role updated successfully",
        json!({ "user": UserResponse::from(&user) }),
    ))
}

pub async fn dashboard_stats(
    user_service: web::Data<UserService>,
    catalog: web::Data<CatalogService>,
    applications: web::Data<ApplicationService>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;

    let mut products_by_type = Map::new();
    for product_type in [
        ProductType::Loan,
        ProductType::CreditCard,
        ProductType::Insurance,
        ProductType::App,
    ] {
        let count = catalog.count_products(Some(product_type)).await?;
        products_by_type.insert(product_type.as_str().to_string(), Value::from(count));
    }

    let mut applications_by_status = Map::new();
    for status in [
        ApplicationStatus::Pending,
        ApplicationStatus::Processing,
        ApplicationStatus::UnderReview,
        ApplicationStatus::InProgress,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ] {
        let count = applications.count(doc! { "status": status.as_str() }).await?;
        applications_by_status.insert(status.as_str().to_string(), Value::from(count));
    }

    let recent = applications.recent(RECENT_APPLICATIONS).await?;

    Ok(envelope(
        StatusCode::OK,
        "Stats fetched successfully",
        json!({
            "stats": {
                "totalUsers": user_service.count(doc! {}).await?,
                "totalProducts": catalog.count_products(None).await?,
                "productsByType": products_by_type,
                "totalApplications": applications.count(doc! {}).await?,
                "applicationsByStatus": applications_by_status,
                "recentApplications": api_list(&recent),
            }
        }),
    ))
}

// ============================================
// Categories
// ============================================

pub async fn list_categories(
    catalog: web::Data<CatalogService>,
    query: web::Query<TypeQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let categories = catalog.list_categories(query.parsed()?).await?;

    Ok(envelope(
        StatusCode::OK,
        "Categories fetched successfully",
        json!({ "count": categories.len(), "categories": api_list(&categories) }),
    ))
}

pub async fn create_category(
    catalog: web::Data<CatalogService>,
    body: web::Json<CategoryInput>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let category = catalog.create_category(body.into_inner()).await?;

    Ok(envelope(
        StatusCode::CREATED,
        "Category created successfully",
        json!({ "category": api_json(&category) }),
    ))
}

pub async fn update_category(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    body: web::Json<CategoryInput>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let category = catalog.update_category(&id, body.into_inner()).await?;

    Ok(envelope(
        StatusCode::OK,
        "Category updated successfully",
        json!({ "category": api_json(&category) }),
    ))
}

pub async fn can_delete_category(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let category = catalog.find_category(&id).await?;
    let usage = catalog.category_usage(&category.slug).await?;

    Ok(envelope(
        StatusCode::OK,
        "Category usage fetched successfully",
        json!({
            "canDelete": usage.total() == 0,
            "reasons": usage.reasons(),
            "counts": usage,
        }),
    ))
}

pub async fn delete_category(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = require_staff(&req)?;
    let category = catalog.delete_category(&id).await?;
    log::info!("{} deleted category {}", claims.email, category.slug);

    Ok(envelope(
        StatusCode::OK,
        "Category deleted successfully",
        json!({}),
    ))
}

pub async fn force_delete_category(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let detached = catalog.force_delete_category(&id).await?;

    Ok(envelope(
        StatusCode::OK,
        "Category force deleted successfully",
        json!({ "detachedProducts": detached }),
    ))
}

// ============================================
// Products
// ============================================

pub async fn list_products(
    catalog: web::Data<CatalogService>,
    query: web::Query<TypeQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let products = catalog.list_products(query.parsed()?).await?;

    Ok(envelope(
        StatusCode::OK,
        "Products fetched successfully",
        json!({ "count": products.len(), "products": api_list(&products) }),
    ))
}

pub async fn create_product(
    catalog: web::Data<CatalogService>,
    query: web::Query<TypeQuery>,
    body: web::Json<ProductInput>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let product = catalog
        .create_product(body.into_inner(), query.parsed()?)
        .await?;

    Ok(envelope(
        StatusCode::CREATED,
        "Product created successfully",
        json!({ "product": api_json(&product) }),
    ))
}

pub async fn get_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let product = catalog.find_product(&id).await?;

    Ok(envelope(
        StatusCode::OK,
        "Product fetched successfully",
        json!({ "product": api_json(&product) }),
    ))
}

pub async fn update_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    body: web::Json<ProductInput>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let product = catalog.update_product(&id, body.into_inner()).await?;

    Ok(envelope(
        StatusCode::OK,
        "Product updated successfully",
        json!({ "product": api_json(&product) }),
    ))
}

pub async fn delete_product(
    catalog: web::Data<CatalogService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = require_staff(&req)?;
    catalog.delete_product(&id).await?;
    log::info!("{} deleted product {}", claims.email, id.as_str());

    Ok(envelope(
        StatusCode::OK,
        "Product deleted successfully",
        json!({}),
    ))
}

// ============================================
// Applications
// ============================================

pub async fn list_applications(
    applications: web::Data<ApplicationService>,
    query: web::Query<ApplicationFilter>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    require_staff(&req)?;
    let list = applications.list(query.to_document()?).await?;

    Ok(envelope(
        StatusCode::OK,
        "Applications fetched successfully",
        json!({ "count": list.len(), "applications": api_list(&list) }),
    ))
}

pub async fn update_application(
    applications: web::Data<ApplicationService>,
    id: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = require_staff(&req)?;
    let body = body.into_inner();
    let status: ApplicationStatus = body.status.parse()?;

    let application = applications
        .update_status(parse_application_id(&id)?, status, non_blank(&body.feedback))
        .await?;
    log::info!("{} set application {} to {}", claims.email, application.id, status);

    Ok(envelope(
        StatusCode::OK,
        "Application updated successfully",
        json!({ "application": api_json(&application) }),
    ))
}

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::catalog::model::{ProductType, TypeQuery};
use crate::catalog::service::CatalogService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{api_json, api_list, envelope};

pub async fn list_categories(
    catalog: web::Data<CatalogService>,
    query: web::Query<TypeQuery>,
) -> Result<HttpResponse, CustomError> {
    let categories = catalog.list_categories(query.parsed()?).await?;

    Ok(envelope(
        StatusCode::OK,
        "Categories fetched successfully",
        json!({ "count": categories.len(), "categories": api_list(&categories) }),
    ))
}

pub async fn loans_by_category(
    catalog: web::Data<CatalogService>,
    slug: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let category = catalog
        .find_category_by_slug(&slug, Some(ProductType::Loan))
        .await?;
    let products = catalog
        .products_in_category(&category.slug, Some(ProductType::Loan))
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Loans fetched successfully",
        json!({
            "category": api_json(&category),
            "count": products.len(),
            "products": api_list(&products),
        }),
    ))
}

pub async fn loan_details(
    catalog: web::Data<CatalogService>,
    slug: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let loan = catalog.find_product_by_slug(&slug, ProductType::Loan).await?;

    Ok(envelope(
        StatusCode::OK,
        "Loan fetched successfully",
        json!({ "loan": api_json(&loan) }),
    ))
}

pub async fn list_credit_cards(
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, CustomError> {
    let cards = catalog.list_products(Some(ProductType::CreditCard)).await?;

    Ok(envelope(
        StatusCode::OK,
        "Credit cards fetched successfully",
        json!({ "count": cards.len(), "cards": api_list(&cards) }),
    ))
}

pub async fn credit_cards_by_category(
    catalog: web::Data<CatalogService>,
    slug: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let category = catalog.find_category_by_slug(&slug, None).await?;
    let cards = catalog
        .products_in_category(&category.slug, Some(ProductType::CreditCard))
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Credit cards fetched successfully",
        json!({
            "category": api_json(&category),
            "count": cards.len(),
            "cards": api_list(&cards),
        }),
    ))
}

pub async fn credit_card_details(
    catalog: web::Data<CatalogService>,
    slug: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let card = catalog
        .find_product_by_slug(&slug, ProductType::CreditCard)
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Credit card fetched successfully",
        json!({ "card": api_json(&card) }),
    ))
}

pub async fn insurance_by_category(
    catalog: web::Data<CatalogService>,
    slug: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let category = catalog.find_category_by_slug(&slug, None).await?;
    let products = catalog
        .products_in_category(&category.slug, Some(ProductType::Insurance))
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Insurance products fetched successfully",
        json!({
            "category": api_json(&category),
            "count": products.len(),
            "products": api_list(&products),
        }),
    ))
}

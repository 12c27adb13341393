use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use serde_json::json;

use crate::application::model::{
    Application, ApplicationStatus, CreateApplicationRequest, NumberOrText, StatusUpdateRequest,
};
use crate::application::service::{ApplicationService, parse_application_id};
use crate::catalog::model::{Category, ProductType};
use crate::catalog::service::CatalogService;
use crate::middleware::auth::{get_claims, require_staff};
use crate::user::model::SavedEmployment;
use crate::user::service::UserService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{
    api_json, api_list, envelope, normalize_email, normalize_phone, parse_object_id,
};
use crate::utils::notifier::{Notifier, spawn_delivery};
use crate::utils::validation::{non_blank, validate_email, validate_phone};

async fn resolve_category(
    catalog: &CatalogService,
    slug: Option<&str>,
) -> Result<Option<Category>, CustomError> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    match catalog.find_category_by_slug(slug, None).await {
        Ok(category) => Ok(Some(category)),
        Err(CustomError::NotFoundError(_)) => {
            log::warn!("Application names unknown category {}", slug);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn loose_text(value: &Option<NumberOrText>) -> Option<String> {
    value.as_ref().and_then(NumberOrText::to_text)
}

fn summary_notes(body: &CreateApplicationRequest, product_type: ProductType) -> String {
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    format!(
        "Type: {}, Employer: {}, Experience: {}, Residence: {}, Income: {}",
        non_blank(&body.category_name).unwrap_or_else(|| product_type.as_str().to_string()),
        show(non_blank(&body.employer_name)),
        show(loose_text(&body.work_experience)),
        show(non_blank(&body.residence_type)),
        show(loose_text(&body.monthly_income)),
    )
}

/// Mailed confirmation; detached so a mail outage never fails a submission.
fn send_confirmation(
    notifier: &web::Data<dyn Notifier>,
    application: &Application,
    product_name: String,
) {
    let Some(reference_no) = application.reference_no.clone() else {
        return;
    };

    let notifier = notifier.clone().into_inner();
    let to = application.email.clone();
    let name = application.applicant_name.clone();
    let product_type = application.product_type.as_str();

    drop(spawn_delivery("application-confirmation", async move {
        notifier
            .send_application_confirmation(&to, &name, &product_name, product_type, &reference_no)
            .await
    }));
}

pub async fn submit_application(
    user_service: web::Data<UserService>,
    catalog: web::Data<CatalogService>,
    applications: web::Data<ApplicationService>,
    notifier: web::Data<dyn Notifier>,
    body: web::Json<CreateApplicationRequest>,
) -> Result<HttpResponse, CustomError> {
    let body = body.into_inner();

    let product_type = ProductType::from_request(&body.product_type).ok_or_else(|| {
        CustomError::ValidationError(format!("Invalid product type: {}", body.product_type))
    })?;

    let email = normalize_email(&body.email);
    validate_email(&email)?;
    let phone = normalize_phone(&body.phone);
    validate_phone(phone.trim_start_matches("+91"))?;
    let pan_number = non_blank(&body.pan_number).map(|pan| pan.to_uppercase());

    // 1. Applicant account
    let given_name = non_blank(&body.name);
    let user = user_service
        .find_or_create_applicant(given_name.as_deref().unwrap_or("User"), &email, &phone)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| CustomError::InternalServerError("User ID missing".into()))?;

    user_service
        .save_employment(
            user_id,
            &SavedEmployment {
                employment_type: body.employment_type.clone(),
                monthly_income: body.monthly_income.as_ref().and_then(NumberOrText::as_f64),
                employer_name: body.employer_name.clone(),
                work_experience: loose_text(&body.work_experience),
                residence_type: body.residence_type.clone(),
                pan_number: pan_number.clone(),
            },
        )
        .await?;

    // 2. Category and product
    let category_slug = non_blank(&body.category_slug).map(|slug| slug.to_lowercase());
    let category = resolve_category(&catalog, category_slug.as_deref()).await?;

    let product = match non_blank(&body.product_id) {
        Some(id) => Some(catalog.find_product(&id).await?),
        None => None,
    };

    let product_name = non_blank(&body.category_name)
        .or_else(|| category.as_ref().map(|c| c.name.clone()))
        .or_else(|| product.as_ref().map(|p| format!("{} {}", p.provider, p.title)))
        .unwrap_or_else(|| product_type.label().to_string());

    // 3. Application
    let now = Utc::now();
    let draft = Application {
        id: 0,
        user_id,
        product_type,
        product_id: product.as_ref().and_then(|p| p.id),
        status: ApplicationStatus::Pending,
        amount: body.loan_amount.as_ref().and_then(NumberOrText::as_f64).unwrap_or(0.0),
        category_id: category.as_ref().and_then(|c| c.id),
        category_slug,
        category_name: non_blank(&body.category_name),
        employment_type: non_blank(&body.employment_type),
        monthly_income: loose_text(&body.monthly_income),
        employer_name: non_blank(&body.employer_name),
        work_experience: loose_text(&body.work_experience),
        residence_type: non_blank(&body.residence_type),
        city: non_blank(&body.city),
        pincode: non_blank(&body.pincode),
        phone,
        email,
        pan_number,
        applicant_name: given_name.unwrap_or_else(|| user.name.clone()),
        notes: Some(summary_notes(&body, product_type)),
        feedback: None,
        documents: body.documents.clone().unwrap_or_default(),
        reference_no: None,
        created_at: now,
        updated_at: now,
    };

    let application = applications.create(draft).await?;
    send_confirmation(&notifier, &application, product_name);

    Ok(envelope(
        StatusCode::CREATED,
        "Application submitted successfully",
        json!({
            "referenceNo": application.reference_no,
            "application": api_json(&application),
        }),
    ))
}

pub async fn get_application(
    applications: web::Data<ApplicationService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let application = applications.find(parse_application_id(&id)?).await?;

    if application.user_id.to_hex() != claims.id && !claims.role.is_staff() {
        return Err(CustomError::ForbiddenError(
            "You can only view your own applications".into(),
        ));
    }

    Ok(envelope(
        StatusCode::OK,
        "Application fetched successfully",
        json!({ "application": api_json(&application) }),
    ))
}

pub async fn update_application_status(
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
        "Status updated successfully",
        json!({ "application": api_json(&application) }),
    ))
}

// ============================================
// Applicant's own applications (/api/users)
// ============================================

pub async fn list_my_applications(
    applications: web::Data<ApplicationService>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user_id = parse_object_id(&claims.id, "user")?;
    let list = applications.list_for_user(user_id).await?;

    Ok(envelope(
        StatusCode::OK,
        "Applications fetched successfully",
        json!({ "count": list.len(), "applications": api_list(&list) }),
    ))
}

pub async fn get_my_application(
    applications: web::Data<ApplicationService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user_id = parse_object_id(&claims.id, "user")?;
    let application = applications
        .find_owned(parse_application_id(&id)?, user_id)
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Application fetched successfully",
        json!({ "application": api_json(&application) }),
    ))
}

pub async fn withdraw_application(
    applications: web::Data<ApplicationService>,
    id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, CustomError> {
    let claims = get_claims(&req)?;
    let user_id = parse_object_id(&claims.id, "user")?;
    let application = applications
        .withdraw(parse_application_id(&id)?, user_id)
        .await?;

    Ok(envelope(
        StatusCode::OK,
        "Application withdrawn successfully",
        json!({ "application": api_json(&application) }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_fill_gaps_with_dashes() {
        let body = CreateApplicationRequest {
            email: "a@b.co".into(),
            phone: "9876543210".into(),
            product_type: "LOAN".into(),
            employer_name: Some("TCS".into()),
            monthly_income: Some(NumberOrText::Number(60000.0)),
            ..Default::default()
        };

        assert_eq!(
            summary_notes(&body, ProductType::Loan),
            "Type: LOAN, Employer: TCS, Experience: -, Residence: -, Income: 60000"
        );
    }
}

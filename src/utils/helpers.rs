use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::utils::error::CustomError;

/// Name reported in every response envelope.
pub fn service_name() -> String {
    std::env::var("SERVICE_NAME").unwrap_or_else(|_| "Unknown".to_string())
}

/// Success envelope; the fields of `payload` are merged next to the standard ones.
pub fn envelope(status: StatusCode, message: &str, payload: Value) -> HttpResponse {
    let mut body = json!({
        "success": true,
        "message": message,
        "httpStatusCode": status.as_u16(),
        "service": service_name(),
    });

    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), payload) {
        body.extend(extra);
    }

    HttpResponse::build(status).json(body)
}

/// JSON view of a stored document: `_id` becomes `id` and every ObjectId
/// (`{"$oid": ..}`) becomes its hex string.
pub fn api_json<T: Serialize>(document: &T) -> Value {
    let mut value = serde_json::to_value(document).unwrap_or(Value::Null);
    flatten_object_ids(&mut value);

    if let Value::Object(fields) = &mut value {
        if let Some(id) = fields.remove("_id") {
            let mut renamed = Map::with_capacity(fields.len() + 1);
            renamed.insert("id".to_string(), id);
            renamed.append(fields);
            *fields = renamed;
        }
    }

    value
}

fn flatten_object_ids(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            if fields.len() == 1 {
                if let Some(Value::String(hex)) = fields.get("$oid") {
                    *value = Value::String(hex.clone());
                    return;
                }
            }
            fields.values_mut().for_each(flatten_object_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(flatten_object_ids),
        _ => {}
    }
}

pub fn api_list<T: Serialize>(documents: &[T]) -> Vec<Value> {
    documents.iter().map(api_json).collect()
}

/// Timestamp format used for `$set` updates.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, CustomError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| CustomError::BadRequestError(format!("Invalid {} ID", what)))
}

/// Emails are used as OTP keys, so every entry point folds them the same way.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strip whitespace and collapse repeated `+91` country codes
/// (`+91+919876543210` -> `+919876543210`).
pub fn normalize_phone(phone: &str) -> String {
    let normalized: String = phone.chars().filter(|c| !c.is_whitespace()).collect();

    if normalized.matches("+91").count() > 1 {
        let rest: String = normalized.split("+91").collect();
        return format!("+91{}", rest);
    }

    normalized
}

/// Parse a money-ish input such as `"₹ 5,00,000"` into a number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_merges_payload() {
        let res = envelope(StatusCode::CREATED, "done", json!({ "id": 7 }));
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[test]
    fn documents_expose_plain_ids() {
        #[derive(Serialize)]
        struct Stored {
            #[serde(rename = "_id")]
            id: ObjectId,
            owner: ObjectId,
            tags: Vec<ObjectId>,
            title: String,
        }

        let id = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let json = api_json(&Stored {
            id,
            owner: id,
            tags: vec![id],
            title: "Gold loan".into(),
        });

        assert_eq!(json["id"], "64b7f0c2a1b2c3d4e5f60718");
        assert!(json.get("_id").is_none());
        assert_eq!(json["owner"], "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(json["tags"][0], "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(json["title"], "Gold loan");
    }

    #[test]
    fn phone_duplicate_country_code_is_collapsed() {
        assert_eq!(normalize_phone("+91+919876543210"), "+919876543210");
        assert_eq!(normalize_phone(" +91 98765 43210 "), "+919876543210");
        assert_eq!(normalize_phone("9876543210"), "9876543210");
    }

    #[test]
    fn object_ids_are_checked() {
        assert!(parse_object_id("64b7f0c2a1b2c3d4e5f60718", "user").is_ok());
        assert!(matches!(
            parse_object_id("nope", "user"),
            Err(CustomError::BadRequestError(msg)) if msg == "Invalid user ID"
        ));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Priya@Example.COM "), "priya@example.com");
    }

    #[test]
    fn amounts_ignore_currency_noise() {
        assert_eq!(parse_amount("₹ 5,00,000"), Some(500000.0));
        assert_eq!(parse_amount("12500.50"), Some(12500.5));
        assert_eq!(parse_amount("n/a"), None);
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "MODERATOR" => Ok(Role::Moderator),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub pan_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<f64>,
    pub saved_employer_name: Option<String>,
    pub saved_work_experience: Option<String>,
    pub saved_residence_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, phone: String, password: String) -> Self {
        let now = Utc::now();
        User {
            id: None,
            name,
            email,
            phone,
            password,
            role: Role::User,
            email_verified: false,
            email_verified_at: None,
            pan_number: None,
            date_of_birth: None,
            address: None,
            city: None,
            state: None,
            pincode: None,
            employment_type: None,
            monthly_income: None,
            saved_employer_name: None,
            saved_work_experience: None,
            saved_residence_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Public view of a user; never exposes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub pan_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<f64>,
    pub saved_employer_name: Option<String>,
    pub saved_work_experience: Option<String>,
    pub saved_residence_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            email_verified: user.email_verified,
            email_verified_at: user.email_verified_at,
            pan_number: user.pan_number.clone(),
            date_of_birth: user.date_of_birth.clone(),
            address: user.address.clone(),
            city: user.city.clone(),
            state: user.state.clone(),
            pincode: user.pincode.clone(),
            employment_type: user.employment_type.clone(),
            monthly_income: user.monthly_income,
            saved_employer_name: user.saved_employer_name.clone(),
            saved_work_experience: user.saved_work_experience.clone(),
            saved_residence_type: user.saved_residence_type.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub pan_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub employment_type: Option<String>,
    pub monthly_income: Option<f64>,
    pub employer_name: Option<String>,
    pub work_experience: Option<String>,
    pub residence_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Employment details an application copies onto the applicant's profile.
#[derive(Debug, Default, Clone)]
pub struct SavedEmployment {
    pub employment_type: Option<String>,
    pub monthly_income: Option<f64>,
    pub employer_name: Option<String>,
    pub work_experience: Option<String>,
    pub residence_type: Option<String>,
    pub pan_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_their_wire_names() {
        assert_eq!("moderator".parse::<Role>(), Ok(Role::Moderator));
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn response_hides_the_password() {
        let user = User::new(
            "Asha".into(),
            "asha@example.com".into(),
            "9876543210".into(),
            "$2b$12$hash".into(),
        );
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email_verified"], false);
        assert_eq!(json["role"], "USER");
    }

    #[test]
    fn login_uses_camel_case() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"emailOrPhone":"9876543210","password":"x"}"#).unwrap();
        assert_eq!(req.email_or_phone, "9876543210");
    }
}

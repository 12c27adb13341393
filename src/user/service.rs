use crate::database::RedisService;
use crate::database::is_duplicate_key;
use crate::middleware::auth::create_token;
use crate::user::model::{LoginRequest, Role, SavedEmployment, UpdateProfileRequest, User};
use crate::utils::config::AppConfig;
use crate::utils::error::CustomError;
use crate::utils::hashing;
use crate::utils::helpers::{normalize_email, normalize_phone, now_rfc3339, parse_object_id};
use crate::utils::validation::{
    non_blank, parse_dob, validate_pan, validate_phone, validate_pincode,
};
use crate::verification::registration::PendingRegistration;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

pub struct UserService {
    collection: Collection<User>,
}

fn db_error(e: mongodb::error::Error) -> CustomError {
    CustomError::InternalServerError(e.to_string())
}

fn write_error(e: mongodb::error::Error) -> CustomError {
    if is_duplicate_key(&e) {
        CustomError::ConflictError("Email or phone number already registered".to_string())
    } else {
        db_error(e)
    }
}

impl UserService {
    pub fn new(db: &Database) -> Self {
        UserService {
            collection: db.collection::<User>("users"),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, CustomError> {
        self.collection
            .find_one(doc! { "email": normalize_email(email) })
            .await
            .map_err(db_error)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, CustomError> {
        self.collection
            .find_one(doc! { "phone": normalize_phone(phone) })
            .await
            .map_err(db_error)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<User, CustomError> {
        let object_id = parse_object_id(id, "user")?;

        self.collection
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("User not found".to_string()))
    }

    /// Rejects a signup whose email or phone already belongs to an account.
    pub async fn ensure_available(&self, email: &str, phone: &str) -> Result<(), CustomError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(CustomError::ConflictError(
                "Email already exists".to_string(),
            ));
        }

        if self.find_by_phone(phone).await?.is_some() {
            return Err(CustomError::ConflictError(
                "Phone number already exists".to_string(),
            ));
        }

        Ok(())
    }

    async fn insert(&self, mut user: User) -> Result<User, CustomError> {
        let result = self
            .collection
            .insert_one(&user)
            .await
            .map_err(write_error)?;

        let user_id = result.inserted_id.as_object_id().ok_or_else(|| {
            CustomError::InternalServerError("Failed to get inserted ID".to_string())
        })?;

        user.id = Some(user_id);
        Ok(user)
    }

    /// Promote a confirmed signup into a verified account.
    pub async fn create_from_registration(
        &self,
        pending: PendingRegistration,
    ) -> Result<User, CustomError> {
        let mut user = User::new(
            pending.name,
            pending.email,
            pending.phone,
            pending.password_hash,
        );
        user.email_verified = true;
        user.email_verified_at = Some(Utc::now());

        self.insert(user).await
    }

    /// Applicants may submit without an account; one is created for them
    /// with a random password they can later reset.
    pub async fn find_or_create_applicant(
        &self,
        name: &str,
        email: &str,
        phone: &str,
    ) -> Result<User, CustomError> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }
        if let Some(user) = self.find_by_phone(phone).await? {
            return Ok(user);
        }

        let password = hashing::hash_password(&hashing::random_password())
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;

        let user = self
            .insert(User::new(
                name.trim().to_string(),
                normalize_email(email),
                normalize_phone(phone),
                password,
            ))
            .await?;

        log::info!("Created applicant account {} for {}", user.id_hex(), user.email);
        Ok(user)
    }

    pub async fn authenticate_user(
        &self,
        email_or_phone: &str,
        password: &str,
    ) -> Result<User, CustomError> {
        let identifier = email_or_phone.trim();
        let user = if identifier.contains('@') {
            self.find_by_email(identifier).await?
        } else {
            self.find_by_phone(identifier).await?
        }
        .ok_or_else(|| CustomError::UnauthorizedError("Invalid credentials".to_string()))?;

        if !hashing::verify_password(password, &user.password)
            .map_err(|_| CustomError::InternalServerError("Invalid credentials".to_string()))?
        {
            return Err(CustomError::UnauthorizedError(
                "Invalid credentials".to_string(),
            ));
        }

        Ok(user)
    }

    pub async fn login_fn(
        &self,
        login_data: LoginRequest,
        config: &AppConfig,
        redis_service: Option<&RedisService>,
    ) -> Result<(String, User), CustomError> {
        let user = self
            .authenticate_user(&login_data.email_or_phone, &login_data.password)
            .await?;

        let token = self.token_for(&user, config, redis_service).await?;
        Ok((token, user))
    }

    pub async fn token_for(
        &self,
        user: &User,
        config: &AppConfig,
        redis_service: Option<&RedisService>,
    ) -> Result<String, CustomError> {
        let user_id = user
            .id
            .as_ref()
            .ok_or_else(|| CustomError::InternalServerError("User ID missing".to_string()))?;

        create_token(&user_id.to_hex(), &user.email, user.role, config, redis_service).await
    }

    pub async fn mark_email_verified(&self, email: &str) -> Result<(), CustomError> {
        let now = now_rfc3339();
        let result = self
            .collection
            .update_one(
                doc! { "email": normalize_email(email) },
                doc! {
                    "$set": {
                        "email_verified": true,
                        "email_verified_at": now.as_str(),
                        "updated_at": now.as_str(),
                    }
                },
            )
            .await
            .map_err(db_error)?;

        if result.matched_count == 0 {
            return Err(CustomError::NotFoundError("User not found".to_string()));
        }

        Ok(())
    }

    pub async fn set_password(&self, email: &str, password_hash: &str) -> Result<(), CustomError> {
        let result = self
            .collection
            .update_one(
                doc! { "email": normalize_email(email) },
                doc! { "$set": { "password": password_hash, "updated_at": now_rfc3339() } },
            )
            .await
            .map_err(db_error)?;

        if result.matched_count == 0 {
            return Err(CustomError::NotFoundError("User not found".to_string()));
        }

        Ok(())
    }

    async fn apply_update(&self, id: ObjectId, mut set: Document) -> Result<User, CustomError> {
        set.insert("updated_at", now_rfc3339());

        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(write_error)?
            .ok_or_else(|| CustomError::NotFoundError("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        id: &str,
        update: UpdateProfileRequest,
    ) -> Result<User, CustomError> {
        let object_id = parse_object_id(id, "user")?;
        let set = profile_changes(&update)?;

        if let Ok(phone) = set.get_str("phone") {
            if let Some(owner) = self.find_by_phone(phone).await? {
                if owner.id != Some(object_id) {
                    return Err(CustomError::ConflictError(
                        "Phone number already in use".to_string(),
                    ));
                }
            }
        }

        self.apply_update(object_id, set).await
    }

    /// Copy the details typed into an application onto the profile.
    pub async fn save_employment(
        &self,
        id: ObjectId,
        details: &SavedEmployment,
    ) -> Result<(), CustomError> {
        let mut set = Document::new();
        let fields = [
            ("employment_type", &details.employment_type),
            ("saved_employer_name", &details.employer_name),
            ("saved_work_experience", &details.work_experience),
            ("saved_residence_type", &details.residence_type),
            ("pan_number", &details.pan_number),
        ];
        for (field, value) in fields {
            if let Some(value) = non_blank(value) {
                set.insert(field, value);
            }
        }
        if let Some(income) = details.monthly_income.filter(|income| *income >= 0.0) {
            set.insert("monthly_income", income);
        }

        if set.is_empty() {
            return Ok(());
        }

        self.apply_update(id, set).await.map(|_| ())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CustomError> {
        self.collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)
    }

    pub async fn set_role(&self, id: &str, role: Role) -> Result<User, CustomError> {
        let object_id = parse_object_id(id, "user")?;
        self.apply_update(object_id, doc! { "role": role.as_str() }).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64, CustomError> {
        self.collection
            .count_documents(filter)
            .await
            .map_err(db_error)
    }
}

/// Validated `$set` document for a profile update; blank fields are ignored.
fn profile_changes(update: &UpdateProfileRequest) -> Result<Document, CustomError> {
    let mut set = Document::new();

    if let Some(name) = non_blank(&update.name) {
        set.insert("name", name);
    }
    if let Some(phone) = non_blank(&update.phone) {
        let phone = normalize_phone(&phone);
        validate_phone(phone.trim_start_matches("+91"))?;
        set.insert("phone", phone);
    }
    if let Some(pan) = non_blank(&update.pan_number) {
        let pan = pan.to_uppercase();
        validate_pan(&pan)?;
        set.insert("pan_number", pan);
    }
    if let Some(dob) = non_blank(&update.date_of_birth) {
        let dob = parse_dob(&dob)?;
        set.insert("date_of_birth", dob.format("%Y-%m-%d").to_string());
    }
    if let Some(pincode) = non_blank(&update.pincode) {
        validate_pincode(&pincode)?;
        set.insert("pincode", pincode);
    }
    if let Some(income) = update.monthly_income {
        if income < 0.0 {
            return Err(CustomError::ValidationError(
                "Monthly income cannot be negative".to_string(),
            ));
        }
        set.insert("monthly_income", income);
    }

    let free_text = [
        ("address", &update.address),
        ("city", &update.city),
        ("state", &update.state),
        ("employment_type", &update.employment_type),
        ("saved_employer_name", &update.employer_name),
        ("saved_work_experience", &update.work_experience),
        ("saved_residence_type", &update.residence_type),
    ];
    for (field, value) in free_text {
        if let Some(value) = non_blank(value) {
            set.insert(field, value);
        }
    }

    if set.is_empty() {
        return Err(CustomError::ValidationError(
            "No profile fields to update".to_string(),
        ));
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_changes_validate_each_field() {
        let update = UpdateProfileRequest {
            phone: Some("5876543210".into()),
            ..Default::default()
        };
        assert!(matches!(profile_changes(&update), Err(CustomError::ValidationError(_))));

        let update = UpdateProfileRequest {
            pan_number: Some("abcde1234f".into()),
            pincode: Some("560001".into()),
            date_of_birth: Some("1990-04-12".into()),
            monthly_income: Some(85000.0),
            ..Default::default()
        };
        let set = profile_changes(&update).unwrap();
        assert_eq!(set.get_str("pan_number").unwrap(), "ABCDE1234F");
        assert_eq!(set.get_str("date_of_birth").unwrap(), "1990-04-12");
        assert_eq!(set.get_f64("monthly_income").unwrap(), 85000.0);
    }

    #[test]
    fn negative_income_is_rejected() {
        let update = UpdateProfileRequest {
            monthly_income: Some(-1.0),
            ..Default::default()
        };
        assert!(profile_changes(&update).is_err());
    }

    #[test]
    fn blank_fields_are_skipped() {
        let update = UpdateProfileRequest {
            city: Some("   ".into()),
            ..Default::default()
        };
        assert!(profile_changes(&update).is_err());

        let update = UpdateProfileRequest {
            city: Some("Pune".into()),
            employer_name: Some("Infosys".into()),
            ..Default::default()
        };
        let set = profile_changes(&update).unwrap();
        assert_eq!(set.get_str("city").unwrap(), "Pune");
        assert_eq!(set.get_str("saved_employer_name").unwrap(), "Infosys");
    }

    #[test]
    fn country_code_is_allowed_on_phone() {
        let update = UpdateProfileRequest {
            phone: Some("+91 98765 43210".into()),
            ..Default::default()
        };
        let set = profile_changes(&update).unwrap();
        assert_eq!(set.get_str("phone").unwrap(), "+919876543210");
    }
}

use crate::application::model::{Application, ApplicationFilter, ApplicationStatus};
use crate::application::reference;
use crate::catalog::model::ProductType;
use crate::database::Sequences;
use crate::utils::error::CustomError;
use crate::utils::helpers::now_rfc3339;
use crate::utils::validation::non_blank;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

const APPLICATION_SEQUENCE: &str = "applications";

pub struct ApplicationService {
    collection: Collection<Application>,
    sequences: Sequences,
}

fn db_error(e: mongodb::error::Error) -> CustomError {
    CustomError::InternalServerError(e.to_string())
}

pub fn parse_application_id(raw: &str) -> Result<i64, CustomError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CustomError::BadRequestError("Invalid application ID".into()))
}

/// Counter value as the positive number embedded in reference numbers.
fn sequence_number(id: i64) -> Result<u64, CustomError> {
    u64::try_from(id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CustomError::InternalServerError(format!("Invalid application id {}", id)))
}

impl ApplicationFilter {
    pub fn to_document(&self) -> Result<Document, CustomError> {
        let mut filter = Document::new();
        if let Some(status) = non_blank(&self.status) {
            filter.insert("status", status.parse::<ApplicationStatus>()?.as_str());
        }
        if let Some(product_type) = non_blank(&self.product_type) {
            filter.insert("type", product_type.parse::<ProductType>()?.as_str());
        }
        Ok(filter)
    }
}

impl ApplicationService {
    pub fn new(db: &Database) -> Self {
        ApplicationService {
            collection: db.collection::<Application>("applications"),
            sequences: Sequences::new(db),
        }
    }

    /// Allocate the next id, insert, then derive and store the reference number.
    pub async fn create(&self, mut application: Application) -> Result<Application, CustomError> {
        application.id = self.sequences.next(APPLICATION_SEQUENCE).await?;

        self.collection
            .insert_one(&application)
            .await
            .map_err(db_error)?;

        let reference_no = reference::generate(
            sequence_number(application.id)?,
            application.product_type.as_str(),
            application.category_slug.as_deref(),
        );

        self.collection
            .update_one(
                doc! { "_id": application.id },
                doc! { "$set": { "reference_no": reference_no.as_str() } },
            )
            .await
            .map_err(db_error)?;

        log::info!("Application {} created ({})", application.id, reference_no);
        application.reference_no = Some(reference_no);
        Ok(application)
    }

    pub async fn find(&self, id: i64) -> Result<Application, CustomError> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("Application not found".into()))
    }

    /// Owner's application; someone else's id reads as missing.
    pub async fn find_owned(&self, id: i64, user_id: ObjectId) -> Result<Application, CustomError> {
        let application = self.find(id).await?;
        if application.user_id != user_id {
            return Err(CustomError::NotFoundError("Application not found".into()));
        }
        Ok(application)
    }

    pub async fn list(&self, filter: Document) -> Result<Vec<Application>, CustomError> {
        self.collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> Result<Vec<Application>, CustomError> {
        self.list(doc! { "user_id": user_id }).await
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Application>, CustomError> {
        self.collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: ApplicationStatus,
        feedback: Option<String>,
    ) -> Result<Application, CustomError> {
        let mut set = doc! { "status": status.as_str(), "updated_at": now_rfc3339() };
        if let Some(feedback) = feedback {
            set.insert("feedback", feedback);
        }

        let application = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("Application not found".into()))?;

        log::info!("Application {} moved to {}", id, status);
        Ok(application)
    }

    pub async fn withdraw(&self, id: i64, user_id: ObjectId) -> Result<Application, CustomError> {
        let application = self.find_owned(id, user_id).await?;

        if !application.status.is_withdrawable() {
            return Err(CustomError::BadRequestError(format!(
                "Application cannot be withdrawn once it is {}",
                application.status
            )));
        }

        let open: Vec<&str> = [
            ApplicationStatus::Pending,
            ApplicationStatus::Processing,
            ApplicationStatus::UnderReview,
            ApplicationStatus::InProgress,
        ]
        .iter()
        .map(ApplicationStatus::as_str)
        .collect();

        // A staff decision made since the read wins
        self.collection
            .find_one_and_update(
                doc! { "_id": id, "user_id": user_id, "status": { "$in": open } },
                doc! {
                    "$set": {
                        "status": ApplicationStatus::Withdrawn.as_str(),
                        "updated_at": now_rfc3339(),
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(db_error)?
            .ok_or_else(|| {
                CustomError::BadRequestError("Application status changed; please refresh".into())
            })
    }

    pub async fn count(&self, filter: Document) -> Result<u64, CustomError> {
        self.collection
            .count_documents(filter)
            .await
            .map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_ids_must_be_positive_integers() {
        assert_eq!(parse_application_id(" 42 ").unwrap(), 42);
        assert!(parse_application_id("0").is_err());
        assert!(parse_application_id("abc").is_err());
    }

    #[test]
    fn reference_sequence_must_be_positive() {
        assert_eq!(sequence_number(5).unwrap(), 5);
        assert!(sequence_number(0).is_err());
        assert!(sequence_number(-5).is_err());
    }

    #[test]
    fn filter_accepts_known_values_only() {
        let filter = ApplicationFilter {
            status: Some("under_review".into()),
            product_type: Some("credit_card".into()),
        };
        let doc = filter.to_document().unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "UNDER_REVIEW");
        assert_eq!(doc.get_str("type").unwrap(), "CREDIT_CARD");

        let filter = ApplicationFilter {
            status: Some("lost".into()),
            ..Default::default()
        };
        assert!(filter.to_document().is_err());

        assert!(ApplicationFilter::default().to_document().unwrap().is_empty());
    }
}

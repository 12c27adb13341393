use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::utils::error::CustomError;

const DUPLICATE_KEY: i32 = 11000;

pub async fn connect_to_mongo(uri: &str, database_name: &str) -> Result<Database, Box<dyn Error>> {
    let mut client_options = ClientOptions::parse(uri).await?;
    client_options.app_name = Some("sixloans-backend".to_string());

    let client = Client::with_options(client_options)?;

    // Ping the server to see if you can connect to the cluster
    client.database("admin").run_command(doc! {"ping": 1}).await?;

    log::info!("Connected successfully to MongoDB ({})", database_name);

    Ok(client.database(database_name))
}

/// Unique indexes the services rely on for conflict detection.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = || IndexOptions::builder().unique(true).build();

    let users = db.collection::<mongodb::bson::Document>("users");
    for field in ["email", "phone"] {
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { field: 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
    }

    for collection in ["categories", "products"] {
        db.collection::<mongodb::bson::Document>(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "slug": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
    }

    db.collection::<mongodb::bson::Document>("applications")
        .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
        .await?;

    Ok(())
}

pub fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    id: String,
    seq: i64,
}

/// Monotonic integer ids, one sequence per name.
pub struct Sequences {
    collection: Collection<Counter>,
}

impl Sequences {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Counter>("counters"),
        }
    }

    pub async fn next(&self, name: &str) -> Result<i64, CustomError> {
        let counter = self
            .collection
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| CustomError::InternalServerError(format!("Failed to allocate id: {}", e)))?
            .ok_or_else(|| CustomError::InternalServerError("Counter upsert returned nothing".into()))?;

        Ok(counter.seq)
    }
}

use crate::catalog::model::{Category, CategoryInput, Product, ProductInput, ProductType};
use crate::database::is_duplicate_key;
use crate::utils::error::CustomError;
use crate::utils::helpers::{now_rfc3339, parse_object_id};
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::{Collection, Database};
use serde::Serialize;

pub struct CatalogService {
    categories: Collection<Category>,
    products: Collection<Product>,
}

/// Products still attached to a category, by product type.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CategoryUsage {
    pub loans: u64,
    pub credit_cards: u64,
    pub insurance: u64,
    pub apps: u64,
}

impl CategoryUsage {
    pub fn total(&self) -> u64 {
        self.loans + self.credit_cards + self.insurance + self.apps
    }

    pub fn reasons(&self) -> Vec<String> {
        [
            (self.loans, "loan"),
            (self.credit_cards, "credit card"),
            (self.insurance, "insurance"),
            (self.apps, "app"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {} product(s)", count, label))
        .collect()
    }
}

fn db_error(e: mongodb::error::Error) -> CustomError {
    CustomError::InternalServerError(e.to_string())
}

fn slug_conflict(e: mongodb::error::Error, what: &str) -> CustomError {
    if is_duplicate_key(&e) {
        CustomError::ConflictError(format!("A {} with this slug already exists", what))
    } else {
        db_error(e)
    }
}

fn type_filter(product_type: Option<ProductType>) -> Document {
    match product_type {
        Some(product_type) => doc! { "type": product_type.as_str() },
        None => doc! {},
    }
}

impl CatalogService {
    pub fn new(db: &Database) -> Self {
        CatalogService {
            categories: db.collection::<Category>("categories"),
            products: db.collection::<Product>("products"),
        }
    }

    // ============================================
    // Categories
    // ============================================

    pub async fn list_categories(
        &self,
        product_type: Option<ProductType>,
    ) -> Result<Vec<Category>, CustomError> {
        self.categories
            .find(type_filter(product_type))
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)
    }

    pub async fn find_category(&self, id: &str) -> Result<Category, CustomError> {
        let object_id = parse_object_id(id, "category")?;

        self.categories
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("Category not found".into()))
    }

    pub async fn find_category_by_slug(
        &self,
        slug: &str,
        product_type: Option<ProductType>,
    ) -> Result<Category, CustomError> {
        let mut filter = type_filter(product_type);
        filter.insert("slug", slug.trim().to_lowercase());

        self.categories
            .find_one(filter)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("Category not found".into()))
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, CustomError> {
        let mut category = input.into_category()?;

        let result = self
            .categories
            .insert_one(&category)
            .await
            .map_err(|e| slug_conflict(e, "category"))?;

        category.id = result.inserted_id.as_object_id();
        log::info!("Created category {} ({})", category.slug, category.product_type);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: CategoryInput,
    ) -> Result<Category, CustomError> {
        let mut category = self.find_category(id).await?;
        let previous_slug = category.slug.clone();
        input.apply_to(&mut category)?;

        self.categories
            .replace_one(doc! { "_id": category.id }, &category)
            .await
            .map_err(|e| slug_conflict(e, "category"))?;

        if category.slug != previous_slug {
            let moved = self
                .products
                .update_many(
                    doc! { "category_slugs": previous_slug.as_str() },
                    doc! {
                        "$set": {
                            "category_slugs.$": category.slug.as_str(),
                            "updated_at": now_rfc3339(),
                        }
                    },
                )
                .await
                .map_err(db_error)?;
            log::info!(
                "Category {} renamed to {}; {} product(s) relinked",
                previous_slug,
                category.slug,
                moved.modified_count
            );
        }

        Ok(category)
    }

    pub async fn category_usage(&self, slug: &str) -> Result<CategoryUsage, CustomError> {
        let mut usage = CategoryUsage::default();

        for (product_type, counter) in [
            (ProductType::Loan, &mut usage.loans),
            (ProductType::CreditCard, &mut usage.credit_cards),
            (ProductType::Insurance, &mut usage.insurance),
            (ProductType::App, &mut usage.apps),
        ] {
            *counter = self
                .products
                .count_documents(doc! { "category_slugs": slug, "type": product_type.as_str() })
                .await
                .map_err(db_error)?;
        }

        Ok(usage)
    }

    /// Refused while any product is still filed under the category.
    pub async fn delete_category(&self, id: &str) -> Result<Category, CustomError> {
        let category = self.find_category(id).await?;
        let usage = self.category_usage(&category.slug).await?;

        if usage.total() > 0 {
            return Err(CustomError::BadRequestError(format!(
                "Cannot delete category: still used by {}. Use force delete instead.",
                usage.reasons().join(", ")
            )));
        }

        self.categories
            .delete_one(doc! { "_id": category.id })
            .await
            .map_err(db_error)?;

        Ok(category)
    }

    /// Detach every product from the category, then delete it.
    pub async fn force_delete_category(&self, id: &str) -> Result<u64, CustomError> {
        let category = self.find_category(id).await?;

        let detached = self
            .products
            .update_many(
                doc! { "category_slugs": category.slug.as_str() },
                doc! {
                    "$pull": { "category_slugs": category.slug.as_str() },
                    "$set": { "updated_at": now_rfc3339() },
                },
            )
            .await
            .map_err(db_error)?;

        self.categories
            .delete_one(doc! { "_id": category.id })
            .await
            .map_err(db_error)?;

        log::warn!(
            "Force deleted category {}; detached {} product(s)",
            category.slug,
            detached.modified_count
        );
        Ok(detached.modified_count)
    }

    // ============================================
    // Products
    // ============================================

    async fn collect_products(&self, filter: Document) -> Result<Vec<Product>, CustomError> {
        let mut products: Vec<Product> = self
            .products
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)?;

        products.iter_mut().for_each(Product::sort_details);
        Ok(products)
    }

    pub async fn list_products(
        &self,
        product_type: Option<ProductType>,
    ) -> Result<Vec<Product>, CustomError> {
        self.collect_products(type_filter(product_type)).await
    }

    pub async fn products_in_category(
        &self,
        category_slug: &str,
        product_type: Option<ProductType>,
    ) -> Result<Vec<Product>, CustomError> {
        let mut filter = type_filter(product_type);
        filter.insert("category_slugs", category_slug);
        self.collect_products(filter).await
    }

    pub async fn find_product(&self, id: &str) -> Result<Product, CustomError> {
        let object_id = parse_object_id(id, "product")?;

        let mut product = self
            .products
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(db_error)?
            .ok_or_else(|| CustomError::NotFoundError("Product not found".into()))?;
        product.sort_details();
        Ok(product)
    }

    pub async fn find_product_by_slug(
        &self,
        slug: &str,
        product_type: ProductType,
    ) -> Result<Product, CustomError> {
        let mut product = self
            .products
            .find_one(doc! { "slug": slug.trim().to_lowercase(), "type": product_type.as_str() })
            .await
            .map_err(db_error)?
            .ok_or_else(|| {
                CustomError::NotFoundError(format!("{} not found", capitalize(product_type.label())))
            })?;
        product.sort_details();
        Ok(product)
    }

    pub async fn create_product(
        &self,
        input: ProductInput,
        default_type: Option<ProductType>,
    ) -> Result<Product, CustomError> {
        let mut product = input.into_product(default_type)?;
        self.ensure_categories_exist(&product).await?;

        let result = self
            .products
            .insert_one(&product)
            .await
            .map_err(|e| slug_conflict(e, "product"))?;

        product.id = result.inserted_id.as_object_id();
        log::info!("Created {} product {}", product.product_type, product.slug);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: &str,
        input: ProductInput,
    ) -> Result<Product, CustomError> {
        let mut product = self.find_product(id).await?;
        input.apply_to(&mut product)?;
        self.ensure_categories_exist(&product).await?;

        self.products
            .replace_one(doc! { "_id": product.id }, &product)
            .await
            .map_err(|e| slug_conflict(e, "product"))?;

        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), CustomError> {
        let object_id = parse_object_id(id, "product")?;

        let result = self
            .products
            .delete_one(doc! { "_id": object_id })
            .await
            .map_err(db_error)?;

        if result.deleted_count == 0 {
            return Err(CustomError::NotFoundError("Product not found".into()));
        }

        Ok(())
    }

    pub async fn count_products(
        &self,
        product_type: Option<ProductType>,
    ) -> Result<u64, CustomError> {
        self.products
            .count_documents(type_filter(product_type))
            .await
            .map_err(db_error)
    }

    async fn ensure_categories_exist(&self, product: &Product) -> Result<(), CustomError> {
        for slug in &product.category_slugs {
            let found = self
                .categories
                .count_documents(doc! { "slug": slug.as_str() })
                .await
                .map_err(db_error)?;

            if found == 0 {
                return Err(CustomError::ValidationError(format!(
                    "Unknown category: {}",
                    slug
                )));
            }
        }

        Ok(())
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_lists_only_nonzero_reasons() {
        let usage = CategoryUsage {
            loans: 2,
            credit_cards: 0,
            insurance: 1,
            apps: 0,
        };
        assert_eq!(usage.total(), 3);
        assert_eq!(
            usage.reasons(),
            vec!["2 loan product(s)", "1 insurance product(s)"]
        );
        assert!(CategoryUsage::default().reasons().is_empty());
    }

    #[test]
    fn not_found_messages_read_naturally() {
        assert_eq!(capitalize("credit card"), "Credit card");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn type_filter_is_empty_without_type() {
        assert!(type_filter(None).is_empty());
        assert_eq!(
            type_filter(Some(ProductType::CreditCard)).get_str("type").unwrap(),
            "CREDIT_CARD"
        );
    }
}

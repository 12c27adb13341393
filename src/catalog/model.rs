use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::error::CustomError;
use crate::utils::validation::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Loan,
    CreditCard,
    Insurance,
    App,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Loan => "LOAN",
            ProductType::CreditCard => "CREDIT_CARD",
            ProductType::Insurance => "INSURANCE",
            ProductType::App => "APP",
        }
    }

    /// Type named by an application form; securities-backed loans are loans.
    pub fn from_request(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "LOAN_AGAINST_SECURITY" => Some(ProductType::Loan),
            other => other.parse().ok(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Loan => "loan",
            ProductType::CreditCard => "credit card",
            ProductType::Insurance => "insurance",
            ProductType::App => "app",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CustomError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "LOAN" => Ok(ProductType::Loan),
            "CREDIT_CARD" => Ok(ProductType::CreditCard),
            "INSURANCE" => Ok(ProductType::Insurance),
            "APP" => Ok(ProductType::App),
            other => Err(CustomError::ValidationError(format!(
                "Unknown product type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bullet {
    pub text: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryCharge {
    pub label: String,
    pub main_text: String,
    pub sub_text: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

/// A required document or a process step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailItem {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub category_slugs: Vec<String>,
    pub title: String,
    pub slug: String,
    /// Bank, insurer or app publisher.
    pub provider: String,
    pub logo_url: Option<String>,
    pub interest_rate_text: Option<String>,
    pub apr_text: Option<String>,
    pub process_time_label: Option<String>,
    pub chance_of_approval: Option<String>,
    pub approval_score: Option<i32>,
    pub annual_fee: Option<String>,
    pub card_network: Option<String>,
    pub minimum_premium: Option<String>,
    pub coverage: Option<String>,
    pub key_statement: Option<String>,
    #[serde(default)]
    pub bullets: Vec<Bullet>,
    #[serde(default)]
    pub summary_charges: Vec<SummaryCharge>,
    #[serde(default)]
    pub required_documents: Vec<DetailItem>,
    #[serde(default)]
    pub process_steps: Vec<DetailItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Lists are shown in `display_order`.
    pub fn sort_details(&mut self) {
        self.bullets.sort_by_key(|b| b.display_order);
        self.summary_charges.sort_by_key(|c| c.display_order);
        self.required_documents.sort_by_key(|d| d.display_order);
        self.process_steps.sort_by_key(|s| s.display_order);
    }
}

#[derive(Debug, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
}

impl TypeQuery {
    pub fn parsed(&self) -> Result<Option<ProductType>, CustomError> {
        non_blank(&self.product_type)
            .map(|raw| raw.parse())
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn into_category(self) -> Result<Category, CustomError> {
        let name = non_blank(&self.name)
            .ok_or_else(|| CustomError::ValidationError("Category name is required".into()))?;
        let slug = match non_blank(&self.slug) {
            Some(slug) => normalize_slug(&slug)?,
            None => normalize_slug(&name)?,
        };
        let product_type = non_blank(&self.product_type)
            .ok_or_else(|| CustomError::ValidationError("Category type is required".into()))?
            .parse()?;

        let now = Utc::now();
        Ok(Category {
            id: None,
            name,
            slug,
            description: non_blank(&self.description),
            product_type,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_to(self, category: &mut Category) -> Result<(), CustomError> {
        if let Some(name) = non_blank(&self.name) {
            category.name = name;
        }
        if let Some(slug) = non_blank(&self.slug) {
            category.slug = normalize_slug(&slug)?;
        }
        if let Some(product_type) = non_blank(&self.product_type) {
            category.product_type = product_type.parse()?;
        }
        if self.description.is_some() {
            category.description = non_blank(&self.description);
        }
        category.updated_at = Utc::now();
        Ok(())
    }
}

/// Admin product form. Every field is optional so the same shape serves
/// create (required fields checked) and partial update.
#[derive(Debug, Default, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub category_slugs: Option<Vec<String>>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub provider: Option<String>,
    pub logo_url: Option<String>,
    pub interest_rate_text: Option<String>,
    pub apr_text: Option<String>,
    pub process_time_label: Option<String>,
    pub chance_of_approval: Option<String>,
    pub approval_score: Option<i32>,
    pub annual_fee: Option<String>,
    pub card_network: Option<String>,
    pub minimum_premium: Option<String>,
    pub coverage: Option<String>,
    pub key_statement: Option<String>,
    pub bullets: Option<Vec<Bullet>>,
    pub summary_charges: Option<Vec<SummaryCharge>>,
    pub required_documents: Option<Vec<DetailItem>>,
    pub process_steps: Option<Vec<DetailItem>>,
}

impl ProductInput {
    pub fn into_product(self, default_type: Option<ProductType>) -> Result<Product, CustomError> {
        let product_type = match non_blank(&self.product_type) {
            Some(raw) => raw.parse()?,
            None => default_type
                .ok_or_else(|| CustomError::ValidationError("Product type is required".into()))?,
        };
        let title = non_blank(&self.title)
            .ok_or_else(|| CustomError::ValidationError("Product title is required".into()))?;
        let provider = non_blank(&self.provider)
            .ok_or_else(|| CustomError::ValidationError("Provider name is required".into()))?;
        let slug = match non_blank(&self.slug) {
            Some(slug) => normalize_slug(&slug)?,
            None => normalize_slug(&format!("{}-{}", provider, title))?,
        };

        let now = Utc::now();
        let mut product = Product {
            id: None,
            product_type,
            category_slugs: Vec::new(),
            title,
            slug,
            provider,
            logo_url: None,
            interest_rate_text: None,
            apr_text: None,
            process_time_label: None,
            chance_of_approval: None,
            approval_score: None,
            annual_fee: None,
            card_network: None,
            minimum_premium: None,
            coverage: None,
            key_statement: None,
            bullets: Vec::new(),
            summary_charges: Vec::new(),
            required_documents: Vec::new(),
            process_steps: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.apply_to(&mut product)?;
        Ok(product)
    }

    pub fn apply_to(self, product: &mut Product) -> Result<(), CustomError> {
        if let Some(raw) = non_blank(&self.product_type) {
            product.product_type = raw.parse()?;
        }
        if let Some(title) = non_blank(&self.title) {
            product.title = title;
        }
        if let Some(slug) = non_blank(&self.slug) {
            product.slug = normalize_slug(&slug)?;
        }
        if let Some(provider) = non_blank(&self.provider) {
            product.provider = provider;
        }
        if let Some(slugs) = self.category_slugs {
            let mut cleaned = slugs
                .iter()
                .map(|slug| normalize_slug(slug))
                .collect::<Result<Vec<_>, _>>()?;
            cleaned.sort();
            cleaned.dedup();
            product.category_slugs = cleaned;
        }
        if let Some(score) = self.approval_score {
            if !(0..=100).contains(&score) {
                return Err(CustomError::ValidationError(
                    "Approval score must be between 0 and 100".into(),
                ));
            }
            product.approval_score = Some(score);
        }

        let text_fields = [
            (&mut product.logo_url, self.logo_url),
            (&mut product.interest_rate_text, self.interest_rate_text),
            (&mut product.apr_text, self.apr_text),
            (&mut product.process_time_label, self.process_time_label),
            (&mut product.chance_of_approval, self.chance_of_approval),
            (&mut product.annual_fee, self.annual_fee),
            (&mut product.card_network, self.card_network),
            (&mut product.minimum_premium, self.minimum_premium),
            (&mut product.coverage, self.coverage),
            (&mut product.key_statement, self.key_statement),
        ];
        for (field, value) in text_fields {
            if value.is_some() {
                *field = non_blank(&value);
            }
        }

        if let Some(bullets) = self.bullets {
            product.bullets = bullets;
        }
        if let Some(charges) = self.summary_charges {
            product.summary_charges = charges;
        }
        if let Some(documents) = self.required_documents {
            product.required_documents = documents;
        }
        if let Some(steps) = self.process_steps {
            product.process_steps = steps;
        }

        product.sort_details();
        product.updated_at = Utc::now();
        Ok(())
    }
}

/// Lowercase, hyphen separated, ASCII alphanumerics only.
pub fn normalize_slug(raw: &str) -> Result<String, CustomError> {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        return Err(CustomError::ValidationError("Slug cannot be empty".into()));
    }

    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn securities_loans_are_filed_as_loans() {
        assert_eq!(
            ProductType::from_request("LOAN_AGAINST_SECURITY"),
            Some(ProductType::Loan)
        );
        assert_eq!(
            ProductType::from_request("credit_card"),
            Some(ProductType::CreditCard)
        );
        assert_eq!(ProductType::from_request("MORTGAGE"), None);
    }

    #[test]
    fn slugs_are_normalized() {
        assert_eq!(normalize_slug("  Personal Loan ").unwrap(), "personal-loan");
        assert_eq!(normalize_slug("HDFC -- Regalia!").unwrap(), "hdfc-regalia");
        assert!(normalize_slug("--").is_err());
    }

    #[test]
    fn category_requires_name_and_type() {
        let input = CategoryInput {
            name: Some("Personal Loan".into()),
            product_type: Some("loan".into()),
            ..Default::default()
        };
        let category = input.into_category().unwrap();
        assert_eq!(category.slug, "personal-loan");
        assert_eq!(category.product_type, ProductType::Loan);

        let input = CategoryInput {
            name: Some("Travel".into()),
            ..Default::default()
        };
        assert!(input.into_category().is_err());
    }

    #[test]
    fn product_update_only_touches_given_fields() {
        let mut product = ProductInput {
            title: Some("Regalia".into()),
            provider: Some("HDFC".into()),
            annual_fee: Some("₹2,500".into()),
            ..Default::default()
        }
        .into_product(Some(ProductType::CreditCard))
        .unwrap();
        assert_eq!(product.slug, "hdfc-regalia");

        ProductInput {
            card_network: Some("Visa".into()),
            bullets: Some(vec![
                Bullet { text: "second".into(), display_order: 2 },
                Bullet { text: "first".into(), display_order: 1 },
            ]),
            ..Default::default()
        }
        .apply_to(&mut product)
        .unwrap();

        assert_eq!(product.annual_fee.as_deref(), Some("₹2,500"));
        assert_eq!(product.card_network.as_deref(), Some("Visa"));
        assert_eq!(product.bullets[0].text, "first");
    }

    #[test]
    fn approval_score_is_bounded() {
        let result = ProductInput {
            title: Some("Gold".into()),
            provider: Some("SBI".into()),
            approval_score: Some(140),
            ..Default::default()
        }
        .into_product(Some(ProductType::Loan));
        assert!(result.is_err());
    }
}

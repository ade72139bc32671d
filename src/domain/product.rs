//! Canonical product shape shared by normalization and reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category applied when a source record carries none.
pub const DEFAULT_CATEGORY: Category = Category::Movies;

/// Fixed poster category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movies,
    Shows,
    Music,
    Anime,
    Sports,
    Motivation,
    Games,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Movies,
        Self::Shows,
        Self::Music,
        Self::Anime,
        Self::Sports,
        Self::Motivation,
        Self::Games,
    ];

    /// Lowercase token used in both stores
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Shows => "shows",
            Self::Music => "music",
            Self::Anime => "anime",
            Self::Sports => "sports",
            Self::Motivation => "motivation",
            Self::Games => "games",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category token is outside the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == token)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Normalized, validated product as the target store expects it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProduct {
    pub identifier: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub category: Category,
}

/// Product row as read back from the target store.
///
/// Legacy rows may have no identifier; those can never be matched by a
/// reconciliation run. `extra` holds target-only attributes the source
/// schema does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProduct {
    pub identifier: Option<String>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub category: String,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredProduct {
    /// Builds the stored form of a freshly created product
    #[must_use]
    pub fn from_canonical(product: &CanonicalProduct, now: DateTime<Utc>) -> Self {
        Self {
            identifier: Some(product.identifier.clone()),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category: product.category.as_str().to_string(),
            extra: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies field changes in place, leaving every other attribute untouched
    pub fn apply(&mut self, changes: &[FieldChange], now: DateTime<Utc>) {
        for change in changes {
            match change {
                FieldChange::Name(v) => self.name.clone_from(v),
                FieldChange::Description(v) => self.description.clone_from(v),
                FieldChange::Price(v) => self.price = *v,
                FieldChange::ImageUrl(v) => self.image_url.clone_from(v),
                FieldChange::Category(v) => self.category = v.as_str().to_string(),
            }
        }
        if !changes.is_empty() {
            self.updated_at = now;
        }
    }

    /// True when every canonical field equals the given product
    #[must_use]
    pub fn matches(&self, product: &CanonicalProduct) -> bool {
        diff_fields(self, product).is_empty()
    }
}

/// Names of the canonical fields, in comparison order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductField {
    Name,
    Description,
    Price,
    ImageUrl,
    Category,
}

impl ProductField {
    /// Column / document key for this field
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::ImageUrl => "imageUrl",
            Self::Category => "category",
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// New value for one canonical field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldChange {
    Name(String),
    Description(String),
    Price(f64),
    ImageUrl(String),
    Category(Category),
}

impl FieldChange {
    #[must_use]
    pub const fn field(&self) -> ProductField {
        match self {
            Self::Name(_) => ProductField::Name,
            Self::Description(_) => ProductField::Description,
            Self::Price(_) => ProductField::Price,
            Self::ImageUrl(_) => ProductField::ImageUrl,
            Self::Category(_) => ProductField::Category,
        }
    }
}

/// Computes the field-level difference between a stored row and its
/// normalized source counterpart.
///
/// Strings compare exactly and the price compares with exact `f64`
/// equality; an empty result means the record is unchanged.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn diff_fields(existing: &StoredProduct, incoming: &CanonicalProduct) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if existing.name != incoming.name {
        changes.push(FieldChange::Name(incoming.name.clone()));
    }
    if existing.description != incoming.description {
        changes.push(FieldChange::Description(incoming.description.clone()));
    }
    if existing.price != incoming.price {
        changes.push(FieldChange::Price(incoming.price));
    }
    if existing.image_url != incoming.image_url {
        changes.push(FieldChange::ImageUrl(incoming.image_url.clone()));
    }
    if existing.category != incoming.category.as_str() {
        changes.push(FieldChange::Category(incoming.category));
    }

    changes
}

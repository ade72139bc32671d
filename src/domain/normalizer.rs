//! # Record Normalizer
//!
//! Maps a raw source document (an arbitrary JSON object exported from the
//! document store) onto a [`CanonicalProduct`].
//!
//! Rules:
//! - image: `imageUrl` when it is a non-empty string, otherwise the legacy
//!   `image` alias
//! - price: JSON number or numeric string, finite and non-negative
//! - category: missing, `null` or blank falls back to [`DEFAULT_CATEGORY`]
//!   unless the normalizer is built with [`MissingCategoryPolicy::Reject`]
//!
//! Normalization is pure; it never touches either store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::product::{CanonicalProduct, Category, DEFAULT_CATEGORY};

pub const PRIMARY_IMAGE_FIELD: &str = "imageUrl";
pub const ALTERNATE_IMAGE_FIELD: &str = "image";

const NAME_FIELD: &str = "name";
const DESCRIPTION_FIELD: &str = "description";
const PRICE_FIELD: &str = "price";
const CATEGORY_FIELD: &str = "category";

/// Why a source record could not be turned into a canonical product
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NormalizationError {
    #[error("MissingImage: neither 'imageUrl' nor 'image' is set")]
    MissingImage,

    #[error("InvalidPrice: {value} is not a finite non-negative number")]
    InvalidPrice { value: String },

    #[error("InvalidCategory: '{value}' is not one of movies, shows, music, anime, sports, motivation, games")]
    InvalidCategory { value: String },

    #[error("MissingField: '{field}' is required")]
    MissingField { field: String },

    #[error("MissingIdentifier: source record has an empty identifier")]
    MissingIdentifier,

    #[error("NotAnObject: source record is not a key-value document")]
    NotAnObject,
}

impl NormalizationError {
    fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }
}

/// What to do when a source record carries no category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCategoryPolicy {
    /// Fall back to [`DEFAULT_CATEGORY`]
    #[default]
    Default,
    /// Treat a missing category as a validation failure
    Reject,
}

/// Source-to-canonical mapping with a configurable category policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    missing_category: MissingCategoryPolicy,
}

impl Normalizer {
    #[must_use]
    pub const fn new(missing_category: MissingCategoryPolicy) -> Self {
        Self { missing_category }
    }

    #[must_use]
    pub const fn missing_category_policy(&self) -> MissingCategoryPolicy {
        self.missing_category
    }

    /// Normalizes one source record.
    ///
    /// The identifier is supplied separately because the source system keeps
    /// it outside the document body.
    pub fn normalize(
        &self,
        raw: &Value,
        identifier: &str,
    ) -> Result<CanonicalProduct, NormalizationError> {
        if identifier.trim().is_empty() {
            return Err(NormalizationError::MissingIdentifier);
        }
        let record = raw.as_object().ok_or(NormalizationError::NotAnObject)?;

        let name = record
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| NormalizationError::missing(NAME_FIELD))?;

        let description = record
            .get(DESCRIPTION_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| NormalizationError::missing(DESCRIPTION_FIELD))?;

        let image_url = non_empty_str(record.get(PRIMARY_IMAGE_FIELD))
            .or_else(|| non_empty_str(record.get(ALTERNATE_IMAGE_FIELD)))
            .ok_or(NormalizationError::MissingImage)?;

        let price = coerce_price(record.get(PRICE_FIELD))?;
        let category = self.resolve_category(record.get(CATEGORY_FIELD))?;

        Ok(CanonicalProduct {
            identifier: identifier.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            image_url: image_url.to_string(),
            category,
        })
    }

    fn resolve_category(&self, value: Option<&Value>) -> Result<Category, NormalizationError> {
        let token = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                return Err(NormalizationError::InvalidCategory {
                    value: other.to_string(),
                });
            }
        };

        match (token, self.missing_category) {
            (Some(token), _) => token
                .parse::<Category>()
                .map_err(|_| NormalizationError::InvalidCategory {
                    value: token.to_string(),
                }),
            (None, MissingCategoryPolicy::Default) => Ok(DEFAULT_CATEGORY),
            (None, MissingCategoryPolicy::Reject) => Err(NormalizationError::missing(CATEGORY_FIELD)),
        }
    }
}

/// Normalizes with the default category policy
pub fn normalize(raw: &Value, identifier: &str) -> Result<CanonicalProduct, NormalizationError> {
    Normalizer::default().normalize(raw, identifier)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn coerce_price(value: Option<&Value>) -> Result<f64, NormalizationError> {
    let invalid = |shown: String| NormalizationError::InvalidPrice { value: shown };

    let price = match value {
        None => return Err(invalid("<missing>".to_string())),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match price {
        Some(p) if p.is_finite() && p >= 0.0 => Ok(p),
        _ => Err(invalid(value.map_or_else(String::new, Value::to_string))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "name": "Interstellar",
            "description": "Docking scene, 50x70",
            "price": 19.99,
            "imageUrl": "https://cdn.example.com/interstellar.jpg",
            "category": "movies"
        })
    }

    #[test]
    fn normalizes_complete_record() {
        let product = normalize(&record(), "doc-1").unwrap();
        assert_eq!(product.identifier, "doc-1");
        assert_eq!(product.name, "Interstellar");
        assert_eq!(product.category, Category::Movies);
        assert!((product.price - 19.99).abs() < f64::EPSILON);
    }

    #[test]
    fn falls_back_to_image_alias() {
        let mut raw = record();
        raw["imageUrl"] = json!("");
        raw["image"] = json!("legacy.jpg");
        assert_eq!(normalize(&raw, "doc-1").unwrap().image_url, "legacy.jpg");

        let raw = json!({"name": "n", "description": "", "price": 1, "image": "only-alias.jpg"});
        assert_eq!(normalize(&raw, "doc-2").unwrap().image_url, "only-alias.jpg");
    }

    #[test]
    fn primary_image_wins_over_alias() {
        let mut raw = record();
        raw["image"] = json!("legacy.jpg");
        assert_eq!(
            normalize(&raw, "doc-1").unwrap().image_url,
            "https://cdn.example.com/interstellar.jpg"
        );
    }

    #[test]
    fn missing_image_is_rejected() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("imageUrl");
        raw["image"] = json!("   ");
        assert_eq!(normalize(&raw, "doc-1"), Err(NormalizationError::MissingImage));
    }

    #[rstest]
    #[case(json!(10), 10.0)]
    #[case(json!(0), 0.0)]
    #[case(json!("24.50"), 24.5)]
    #[case(json!(" 7 "), 7.0)]
    fn coerces_price(#[case] price: Value, #[case] expected: f64) {
        let mut raw = record();
        raw["price"] = price;
        let product = normalize(&raw, "doc-1").unwrap();
        assert!((product.price - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(json!(-1))]
    #[case(json!("abc"))]
    #[case(json!("NaN"))]
    #[case(json!("inf"))]
    #[case(json!(null))]
    #[case(json!(true))]
    fn rejects_invalid_price(#[case] price: Value) {
        let mut raw = record();
        raw["price"] = price;
        assert!(matches!(
            normalize(&raw, "doc-1"),
            Err(NormalizationError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn absent_price_is_invalid() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("price");
        assert_eq!(
            normalize(&raw, "doc-1"),
            Err(NormalizationError::InvalidPrice {
                value: "<missing>".to_string()
            })
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(json!(null)))]
    #[case(Some(json!("")))]
    fn missing_category_defaults_to_movies(#[case] category: Option<Value>) {
        let mut raw = record();
        let obj = raw.as_object_mut().unwrap();
        obj.remove("category");
        if let Some(value) = category {
            obj.insert("category".to_string(), value);
        }
        assert_eq!(normalize(&raw, "doc-1").unwrap().category, Category::Movies);
    }

    #[test]
    fn reject_policy_fails_missing_category() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("category");
        let normalizer = Normalizer::new(MissingCategoryPolicy::Reject);
        assert_eq!(
            normalizer.normalize(&raw, "doc-1"),
            Err(NormalizationError::MissingField {
                field: "category".to_string()
            })
        );
    }

    #[rstest]
    #[case(json!("posters"))]
    #[case(json!(3))]
    fn unknown_category_is_rejected(#[case] category: Value) {
        let mut raw = record();
        raw["category"] = category;
        assert!(matches!(
            normalize(&raw, "doc-1"),
            Err(NormalizationError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn category_token_is_case_insensitive() {
        let mut raw = record();
        raw["category"] = json!("Sports");
        assert_eq!(normalize(&raw, "doc-1").unwrap().category, Category::Sports);
    }

    #[test]
    fn required_text_fields() {
        let mut raw = record();
        raw["name"] = json!("  ");
        assert_eq!(
            normalize(&raw, "doc-1"),
            Err(NormalizationError::MissingField { field: "name".to_string() })
        );

        let mut raw = record();
        raw.as_object_mut().unwrap().remove("description");
        assert_eq!(
            normalize(&raw, "doc-1"),
            Err(NormalizationError::MissingField { field: "description".to_string() })
        );

        let mut raw = record();
        raw["description"] = json!("");
        assert_eq!(normalize(&raw, "doc-1").unwrap().description, "");
    }

    #[test]
    fn rejects_non_objects_and_blank_identifiers() {
        assert_eq!(normalize(&json!([1, 2]), "doc-1"), Err(NormalizationError::NotAnObject));
        assert_eq!(normalize(&record(), " "), Err(NormalizationError::MissingIdentifier));
    }

    #[test]
    fn error_messages_name_the_failure_kind() {
        assert!(NormalizationError::MissingImage.to_string().starts_with("MissingImage"));
        let err = NormalizationError::InvalidCategory { value: "x".into() };
        assert!(err.to_string().starts_with("InvalidCategory"));
    }
}

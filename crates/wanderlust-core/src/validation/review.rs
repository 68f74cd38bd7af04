//! Review request-body schema and model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::schema::{Field, Rule, ValidationError};

pub const MAX_COMMENT_LENGTH: usize = 2000;

pub fn review_schema() -> Rule {
    let rating = || Rule::range(1.0, 5.0);

    let category_ratings = Rule::object(vec![
        Field::optional("cleanliness", rating()),
        Field::optional("communication", rating()),
        Field::optional("checkIn", rating()),
        Field::optional("accuracy", rating()),
        Field::optional("location", rating()),
        Field::optional("value", rating()),
    ]);

    Rule::object(vec![Field::required(
        "review",
        Rule::object(vec![
            Field::required("rating", rating()),
            Field::required("comment", Rule::string_max(MAX_COMMENT_LENGTH)),
            Field::optional("categoryRatings", category_ratings),
        ]),
    )])
}

/// Validate a review body, returning it with form values converted
pub fn validate_review(body: &Value) -> Result<Value, ValidationError> {
    review_schema().validate(body)
}

/// Body of a review submission: `{ "review": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct ReviewSubmission {
    pub review: Review,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: f64,
    pub comment: String,
    pub category_ratings: Option<CategoryRatings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CategoryRatings {
    pub cleanliness: Option<f64>,
    pub communication: Option<f64>,
    pub check_in: Option<f64>,
    pub accuracy: Option<f64>,
    pub location: Option<f64>,
    pub value: Option<f64>,
}

impl ReviewSubmission {
    /// Validate and deserialize a review body
    pub fn from_body(body: &Value) -> anyhow::Result<Self> {
        let validated = validate_review(body)?;
        Ok(serde_json::from_value(validated)?)
    }
}

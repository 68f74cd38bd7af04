//! Listing request-body schema and model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::schema::{Field, Rule, ValidationError};

pub const PROPERTY_TYPES: &[&str] = &["Entire place", "Private room", "Shared room", "Hotel room"];

pub const CATEGORIES: &[&str] = &[
    "Trending",
    "Rooms",
    "Mountain Cities",
    "Castles",
    "Swimming Pools",
    "Camping Ground",
    "Cow Farms",
    "Bus Side",
    "Sea Beaches",
    "Vacant",
    "Hotel",
];

pub const MIN_ADVANCE_NOTICE: &[&str] = &["Same day", "1 day", "2 days", "3 days", "1 week"];

pub const MAX_ADVANCE_NOTICE: &[&str] = &[
    "3 months",
    "6 months",
    "9 months",
    "12 months",
    "All dates available",
];

pub fn listing_schema() -> Rule {
    let house_rules = Rule::object(vec![
        Field::optional("checkIn", Rule::string()),
        Field::optional("checkOut", Rule::string()),
        Field::optional("maxGuests", Rule::min(1.0)),
        Field::optional("minStay", Rule::min(1.0)),
        Field::optional("maxStay", Rule::min(1.0)),
        Field::optional("smokingAllowed", Rule::boolean()),
        Field::optional("petsAllowed", Rule::boolean()),
        Field::optional("eventsAllowed", Rule::boolean()),
        Field::optional("additionalRules", Rule::array_of(Rule::string())),
    ]);

    let availability = Rule::object(vec![
        Field::optional("instantBook", Rule::boolean()),
        Field::optional("minAdvanceNotice", Rule::one_of(MIN_ADVANCE_NOTICE)),
        Field::optional("maxAdvanceNotice", Rule::one_of(MAX_ADVANCE_NOTICE)),
    ]);

    let geometry = Rule::object(vec![
        Field::optional("type", Rule::one_of(&["Point"])),
        Field::optional("coordinates", Rule::exactly(Rule::number(), 2)),
    ]);

    // Multipart forms carry extra fields (uploads, tokens) at the top level
    Rule::open_object(vec![
        Field::required("title", Rule::string()),
        Field::optional("description", Rule::text()),
        Field::optional("price", Rule::min(0.0)),
        Field::optional("location", Rule::text()),
        Field::optional("country", Rule::text()),
        Field::optional("propertyType", Rule::one_of(PROPERTY_TYPES)),
        Field::optional("accommodates", Rule::min(1.0)),
        Field::optional("bedrooms", Rule::min(0.0)),
        Field::optional("bathrooms", Rule::min(0.5)),
        Field::optional("beds", Rule::min(1.0)),
        Field::optional("category", Rule::one_of(CATEGORIES)),
        Field::optional("amenities", Rule::array_of(Rule::string())),
        Field::optional("houseRules", house_rules),
        Field::optional("availability", availability),
        Field::optional("geometry", geometry),
    ])
}

/// Validate a listing body, returning it with form values converted
pub fn validate_listing(body: &Value) -> Result<Value, ValidationError> {
    listing_schema().validate(body)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub property_type: Option<String>,
    pub accommodates: Option<f64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub beds: Option<f64>,
    pub category: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub house_rules: Option<HouseRules>,
    pub availability: Option<Availability>,
    pub geometry: Option<Geometry>,
    /// Top-level fields outside the schema, passed through untouched
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct HouseRules {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub max_guests: Option<f64>,
    pub min_stay: Option<f64>,
    pub max_stay: Option<f64>,
    pub smoking_allowed: Option<bool>,
    pub pets_allowed: Option<bool>,
    pub events_allowed: Option<bool>,
    pub additional_rules: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub instant_book: Option<bool>,
    pub min_advance_notice: Option<String>,
    pub max_advance_notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub coordinates: Option<Vec<f64>>,
}

impl Listing {
    /// Validate and deserialize a listing body
    pub fn from_body(body: &Value) -> anyhow::Result<Self> {
        let validated = validate_listing(body)?;
        Ok(serde_json::from_value(validated)?)
    }
}

//! Request-body validation for listings and reviews.
//!
//! These schemas gate writes before they reach persistence. The cache
//! manager never consults them.

pub mod listing;
pub mod review;
pub mod schema;

pub use listing::{validate_listing, Listing};
pub use review::{validate_review, ReviewSubmission};
pub use schema::{Field, Rule, ValidationError};

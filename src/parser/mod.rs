pub mod detail;
pub mod records;
pub mod table;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;

pub use records::ListingProfile;

/// One animal from the listing table. `image` stays empty until the image
/// pipeline has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: String,
    pub adjectives: Option<Vec<String>>,
    pub page_url: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page structure changed: {0}")]
    Structure(String),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// Parse a listing page and resolve its animal records.
pub fn resolve_records(
    html: &str,
    profile: &ListingProfile,
    extended: bool,
) -> Result<Vec<Record>, ExtractError> {
    let doc = Html::parse_document(html);
    records::resolve(&doc, profile, extended)
}

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// One entry of a catalog ranking or search result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub rating: Option<String>,
    #[serde(default, alias = "poster")]
    pub poster_url: Option<String>,
}

#[cfg(test)]
impl MovieRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rating: None,
            poster_url: None,
        }
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn with_poster(mut self, poster_url: impl Into<String>) -> Self {
        self.poster_url = Some(poster_url.into());
        self
    }
}

impl MovieRecord {
    /// Records must carry a non-empty id so detail links can be built
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::InvalidRecord(format!(
                "record '{}' has no id",
                self.title
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("catalog did not answer within {0:?}")]
    Timeout(Duration),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Source of movie rankings, random picks and title search
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Ordered ranking for a category
    async fn fetch_category(&self, category: &str) -> Result<Vec<MovieRecord>, CatalogError>;

    /// A single randomly picked movie from a category
    async fn fetch_random(&self, category: &str) -> Result<MovieRecord, CatalogError>;

    /// Free-text title search
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>, CatalogError>;

    /// Prefix that `<id>.html` is appended to for a movie's detail page
    fn base_detail_url(&self) -> &str;
}

//! Supermarket offers
//!
//! Offers are scraped elsewhere and are read-only here.

use serde::{Deserialize, Serialize};

use super::id::OfferId;

/// A discounted product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,

    pub name: String,

    /// Short product description, e.g. "500 g / Danish"
    #[serde(default)]
    pub underline: Option<String>,

    /// Price as displayed by the store, e.g. "19,95 kr"
    pub price: String,

    #[serde(default)]
    pub price_numeric: Option<f64>,

    #[serde(default)]
    pub normal_price: Option<f64>,

    #[serde(default)]
    pub savings_percent: Option<f64>,

    #[serde(default = "default_department")]
    pub department: String,
}

fn default_department() -> String {
    "Other".to_string()
}

/// Query for available offers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferFilter {
    /// Only these offers
    pub ids: Option<Vec<OfferId>>,

    /// Case-insensitive department match
    pub department: Option<String>,

    /// Case-insensitive substring of the name or underline
    pub query: Option<String>,

    /// Minimum savings percentage
    pub min_savings: Option<f64>,
}

impl OfferFilter {
    /// Filter selecting exactly the given offers
    pub fn by_ids(ids: impl IntoIterator<Item = OfferId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Check if an offer passes this filter
    pub fn matches(&self, offer: &Offer) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&offer.id)
        {
            return false;
        }

        if let Some(dept) = &self.department
            && !offer.department.eq_ignore_ascii_case(dept)
        {
            return false;
        }

        if let Some(query) = &self.query {
            let query = query.to_lowercase();
            let in_name = offer.name.to_lowercase().contains(&query);
            let in_underline = offer
                .underline
                .as_deref()
                .is_some_and(|u| u.to_lowercase().contains(&query));
            if !in_name && !in_underline {
                return false;
            }
        }

        if let Some(min) = self.min_savings
            && offer.savings_percent.unwrap_or(0.0) < min
        {
            return false;
        }

        true
    }
}

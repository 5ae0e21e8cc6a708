use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Material filter value that disables material matching.
pub const ALL_MATERIALS: &str = "all";

/// A listed product as read back from the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub farmer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub price: f64,
    pub material_type: String,
    pub farmer_phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Buyer-side narrowing of the loaded catalogue.
///
/// Every field holds the raw input; an empty field applies no constraint.
/// A price bound that does not parse as a number matches no product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub material_type: String,
    #[serde(default)]
    pub min_price: String,
    #[serde(default)]
    pub max_price: String,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_query(product)
            && self.matches_material(product)
            && price_bound(&self.min_price).map_or(true, |min| product.price >= min)
            && price_bound(&self.max_price).map_or(true, |max| product.price <= max)
    }

    /// Products passing every constraint, in their original order.
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    fn matches_query(&self, product: &Product) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let query = self.query.to_lowercase();
        product.title.to_lowercase().contains(&query)
            || product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }

    fn matches_material(&self, product: &Product) -> bool {
        self.material_type.is_empty()
            || self.material_type == ALL_MATERIALS
            || product.material_type == self.material_type
    }
}

fn price_bound(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    // NaN compares false against every price.
    Some(raw.trim().parse::<f64>().unwrap_or(f64::NAN))
}

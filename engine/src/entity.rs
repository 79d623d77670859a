//! Product snapshots and the entities that hold them.

use crate::{ProductId, Quantity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product as the storefront catalog describes it.
///
/// Only the fields the engine reasons about are typed. Everything else the
/// catalog sends (images, gallery, ratings, timestamps) is kept verbatim in
/// `extra` so that a stored snapshot round-trips without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier, unique within a collection
    pub id: ProductId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Unit price
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    /// Untyped catalog fields, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with the fields the engine needs.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            slug: None,
            discount: None,
            old_price: None,
            extra: Map::new(),
        }
    }
}

/// One element of a collection: a product snapshot, plus a quantity for carts.
///
/// Serialized flat, so a stored cart line looks like the product object with
/// an added `quantity` field. Liked entities carry no quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
}

impl Entity {
    /// A cart line. Quantity is clamped to at least 1.
    pub fn cart(product: Product, quantity: Quantity) -> Self {
        Self {
            product,
            quantity: Some(quantity.max(1)),
        }
    }

    /// A liked item.
    pub fn liked(product: Product) -> Self {
        Self {
            product,
            quantity: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.product.id
    }

    /// Effective quantity. Entities without one count as a single unit.
    pub fn quantity(&self) -> Quantity {
        self.quantity.unwrap_or(1)
    }

    /// Price contribution of this entity.
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity())
    }
}

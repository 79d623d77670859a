//! Mutations: the user-initiated changes to a collection.
//!
//! Changes are expressed as values rather than direct edits, so they can be
//! queued while a collection is still loading and replayed in order once it
//! is ready.

use crate::{Product, ProductId, Quantity};
use serde::{Deserialize, Serialize};

fn one() -> Quantity {
    1
}

/// A change requested by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Add a product. Carts accumulate quantity, liked lists ignore repeats.
    Add {
        product: Product,
        #[serde(default = "one")]
        quantity: Quantity,
    },
    /// Set a cart line's quantity. Zero or less removes the line.
    SetQuantity { product_id: ProductId, quantity: i64 },
    /// Remove a product if present.
    Remove { product_id: ProductId },
    /// Empty the collection.
    Clear,
}

impl Mutation {
    pub fn add(product: Product, quantity: Quantity) -> Self {
        Mutation::Add { product, quantity }
    }

    pub fn set_quantity(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Mutation::SetQuantity {
            product_id: product_id.into(),
            quantity,
        }
    }

    pub fn remove(product_id: impl Into<ProductId>) -> Self {
        Mutation::Remove {
            product_id: product_id.into(),
        }
    }

    pub fn clear() -> Self {
        Mutation::Clear
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Add { .. } => "add",
            Mutation::SetQuantity { .. } => "setQuantity",
            Mutation::Remove { .. } => "remove",
            Mutation::Clear => "clear",
        }
    }

    /// The product this mutation targets, if any.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            Mutation::Add { product, .. } => Some(&product.id),
            Mutation::SetQuantity { product_id, .. } | Mutation::Remove { product_id } => {
                Some(product_id)
            }
            Mutation::Clear => None,
        }
    }
}

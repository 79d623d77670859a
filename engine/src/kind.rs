//! Collection kinds and their per-kind policies.
//!
//! Carts and liked lists share one reconciliation core. Everything that
//! differs between them (storage keys, remote slug, wire field, add
//! semantics) is answered here.

use crate::{Entity, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The two user-scoped collections the storefront keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Cart,
    Liked,
}

/// What `add` does when the product is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPolicy {
    /// Increase the existing quantity
    Accumulate,
    /// Leave the collection untouched
    Idempotent,
}

/// Local storage keys for one collection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key holding the JSON-encoded entity list
    pub entities: &'static str,
    /// Key holding the remote document id
    pub remote_id: &'static str,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Cart, CollectionKind::Liked];

    pub fn storage_keys(&self) -> StorageKeys {
        match self {
            CollectionKind::Cart => StorageKeys {
                entities: "local_shopping_cart",
                remote_id: "local_cart_id",
            },
            CollectionKind::Liked => StorageKeys {
                entities: "local_liked_products",
                remote_id: "local_liked_id",
            },
        }
    }

    /// Path segment of the remote collection endpoint.
    pub fn api_slug(&self) -> &'static str {
        match self {
            CollectionKind::Cart => "cart",
            CollectionKind::Liked => "liked",
        }
    }

    /// Name of the document field that holds the entities on the wire.
    pub fn content_field(&self) -> &'static str {
        match self {
            CollectionKind::Cart => "content",
            CollectionKind::Liked => "products",
        }
    }

    /// Human readable noun, used in log lines and user facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::Cart => "cart",
            CollectionKind::Liked => "liked products",
        }
    }

    pub fn add_policy(&self) -> AddPolicy {
        match self {
            CollectionKind::Cart => AddPolicy::Accumulate,
            CollectionKind::Liked => AddPolicy::Idempotent,
        }
    }

    pub fn tracks_quantity(&self) -> bool {
        matches!(self, CollectionKind::Cart)
    }

    /// Bring an entity into the shape this kind stores.
    ///
    /// Cart lines always carry a quantity of at least 1. Liked entities never
    /// carry one.
    pub fn normalize(&self, entity: Entity) -> Entity {
        match self {
            CollectionKind::Cart => {
                let quantity = entity.quantity();
                Entity::cart(entity.product, quantity)
            }
            CollectionKind::Liked => Entity::liked(entity.product),
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_slug())
    }
}

impl FromStr for CollectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cart" => Ok(CollectionKind::Cart),
            "liked" => Ok(CollectionKind::Liked),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

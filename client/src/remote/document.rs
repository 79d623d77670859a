//! Wire format of the collection REST API.
//!
//! Carts are documents with a `content` array of `{product, quantity}` lines,
//! liked lists are documents with a `products` array. Product references may
//! arrive populated (an object), as a bare id, or as `null` once the product
//! was deleted; only populated ones carry enough data to keep.

use super::RemoteCollection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tote_engine::{CollectionKind, Entity, EntityList, Product, Quantity};

/// Response of a `GET /<slug>?where...` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub docs: Vec<CollectionDoc>,
}

/// Response of a `POST /<slug>`.
#[derive(Debug, Deserialize)]
pub struct CreateResponse {
    pub doc: Option<CreatedDoc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedDoc {
    pub id: String,
}

/// A cart or liked document as the API returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDoc {
    pub id: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub content: Option<Vec<CartLine>>,
    #[serde(default)]
    pub products: Option<Vec<ProductRef>>,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Owner reference, populated or not.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Doc { id: String },
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Id(id) | UserRef::Doc { id } => id,
        }
    }
}

/// Product reference, populated or not.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Populated(Box<Product>),
    /// `null` or absent, the product no longer exists
    #[default]
    Missing,
}

#[derive(Debug, Deserialize)]
pub struct CartLine {
    #[serde(default)]
    pub product: ProductRef,
    #[serde(default = "one")]
    pub quantity: Quantity,
}

fn one() -> Quantity {
    1
}

impl CollectionDoc {
    /// Decode into a collection of `kind`, dropping unpopulated references.
    pub fn into_collection(self, kind: CollectionKind) -> RemoteCollection {
        let mut skipped = 0usize;
        let entities: Vec<Entity> = match kind {
            CollectionKind::Cart => self
                .content
                .unwrap_or_default()
                .into_iter()
                .filter_map(|line| match line.product {
                    ProductRef::Populated(product) => Some(Entity::cart(*product, line.quantity)),
                    ProductRef::Id(_) | ProductRef::Missing => {
                        skipped += 1;
                        None
                    }
                })
                .collect(),
            CollectionKind::Liked => self
                .products
                .unwrap_or_default()
                .into_iter()
                .filter_map(|product| match product {
                    ProductRef::Populated(product) => Some(Entity::liked(*product)),
                    ProductRef::Id(_) | ProductRef::Missing => {
                        skipped += 1;
                        None
                    }
                })
                .collect(),
        };

        if skipped > 0 {
            tracing::debug!(kind = %kind, remote_id = %self.id, skipped, "Dropped unpopulated product references");
        }

        RemoteCollection {
            owner: self.user.map(|u| u.id().to_string()).unwrap_or_default(),
            entities: EntityList::from_entities(kind, entities),
            updated_at: self.updated_at.or(self.created_at),
            id: self.id,
        }
    }
}

#[derive(Debug, Serialize)]
struct CartLineBody<'a> {
    product: &'a str,
    quantity: Quantity,
}

/// The `content`/`products` value sent to the API.
pub fn contents_value(kind: CollectionKind, entities: &EntityList) -> Value {
    match kind {
        CollectionKind::Cart => json!(entities
            .iter()
            .map(|e| CartLineBody {
                product: e.id(),
                quantity: e.quantity(),
            })
            .collect::<Vec<_>>()),
        CollectionKind::Liked => json!(entities.ids()),
    }
}

/// Body of a create request.
pub fn create_body(kind: CollectionKind, user_id: &str, entities: &EntityList) -> Value {
    let mut body = json!({ "user": user_id });
    body[kind.content_field()] = contents_value(kind, entities);
    if kind == CollectionKind::Cart {
        body["totalPrice"] = json!(0);
    }
    body
}

/// Body of a patch request.
pub fn patch_body(kind: CollectionKind, entities: &EntityList) -> Value {
    let mut body = json!({});
    body[kind.content_field()] = contents_value(kind, entities);
    body
}

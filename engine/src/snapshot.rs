//! Local snapshot: the device-side state of one collection.
//!
//! A snapshot is what the local key-value store holds for a collection kind:
//! the serialized entity list under one key and the remote document id under
//! another. Encoding and decoding live here so the runtime only moves
//! strings around.

use crate::{error::Result, CollectionKind, EntityList, Error, RemoteId};
use serde::{Deserialize, Serialize};

/// Entities plus the remote linkage, as persisted on the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub entities: EntityList,
    #[serde(default)]
    pub remote_id: Option<RemoteId>,
}

impl LocalSnapshot {
    pub fn new(entities: EntityList, remote_id: Option<RemoteId>) -> Self {
        Self {
            entities,
            remote_id,
        }
    }

    /// Nothing stored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode the two raw storage values.
    ///
    /// Missing values decode to an empty list and no remote id. An empty
    /// stored id counts as missing. Malformed entity JSON is an error, which
    /// callers treat as "nothing stored".
    pub fn decode(
        kind: CollectionKind,
        entities: Option<&str>,
        remote_id: Option<&str>,
    ) -> Result<Self> {
        let entities = match entities.map(str::trim) {
            None | Some("") => EntityList::new(),
            Some(raw) => {
                let parsed: Vec<crate::Entity> = serde_json::from_str(raw)
                    .map_err(|e| Error::InvalidSnapshot(format!("{kind} entities: {e}")))?;
                EntityList::from_entities(kind, parsed)
            }
        };

        let remote_id = remote_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from);

        Ok(Self {
            entities,
            remote_id,
        })
    }

    /// Serialize the entity list for storage.
    pub fn encode_entities(&self) -> Result<String> {
        serde_json::to_string(&self.entities).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.remote_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, Product};

    #[test]
    fn missing_values_decode_empty() {
        let snapshot = LocalSnapshot::decode(CollectionKind::Cart, None, None).unwrap();
        assert!(snapshot.is_empty());

        let snapshot = LocalSnapshot::decode(CollectionKind::Cart, Some(""), Some("")).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn roundtrip_preserves_order_and_id() {
        let kind = CollectionKind::Cart;
        let snapshot = LocalSnapshot::new(
            EntityList::from_entities(
                kind,
                vec![
                    Entity::cart(Product::new("B", "Bowl", 8.0), 1),
                    Entity::cart(Product::new("A", "Mug", 4.0), 3),
                ],
            ),
            Some("remote-1".into()),
        );

        let encoded = snapshot.encode_entities().unwrap();
        let decoded =
            LocalSnapshot::decode(kind, Some(&encoded), snapshot.remote_id.as_deref()).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.entities.ids(), vec!["B", "A"]);
    }

    #[test]
    fn malformed_entities_are_an_error() {
        let err = LocalSnapshot::decode(CollectionKind::Liked, Some("{not json"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));

        let err = LocalSnapshot::decode(CollectionKind::Liked, Some(r#"{"id":"A"}"#), None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
    }

    #[test]
    fn decodes_original_storage_format() {
        let raw = r#"[
            {"id":"p1","name":"Lamp","price":49.9,"slug":"lamp","image":{"url":"/l.png"},"quantity":2},
            {"id":"p2","name":"Rug","price":120,"quantity":1}
        ]"#;
        let snapshot = LocalSnapshot::decode(CollectionKind::Cart, Some(raw), Some("c-9")).unwrap();

        assert_eq!(snapshot.entities.quantity_of("p1"), 2);
        assert_eq!(snapshot.entities.get("p2").unwrap().product.price, 120.0);
        assert_eq!(snapshot.remote_id.as_deref(), Some("c-9"));
    }
}

//! Collection-level view of the key-value store.

use super::KeyValueStore;
use std::sync::Arc;
use tote_engine::{CollectionKind, EntityList, LocalSnapshot};

/// Loads and saves one collection kind.
///
/// Never fails towards the caller: read problems yield an empty snapshot and
/// write problems are logged, so a broken disk degrades to an in-memory
/// session instead of stopping the app.
#[derive(Clone)]
pub struct LocalStore {
    kind: CollectionKind,
    kv: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(kind: CollectionKind, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kind, kv }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Read the stored entities and remote id.
    pub async fn load(&self) -> LocalSnapshot {
        let keys = self.kind.storage_keys();
        let (entities, remote_id) =
            futures::join!(self.kv.get(keys.entities), self.kv.get(keys.remote_id));

        let (entities, remote_id) = match (entities, remote_id) {
            (Ok(entities), Ok(remote_id)) => (entities, remote_id),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(kind = %self.kind, error = %e, "Error loading local state");
                return LocalSnapshot::empty();
            }
        };

        match LocalSnapshot::decode(self.kind, entities.as_deref(), remote_id.as_deref()) {
            Ok(snapshot) => {
                tracing::debug!(
                    kind = %self.kind,
                    entities = snapshot.entities.len(),
                    remote_id = ?snapshot.remote_id,
                    "Loaded local state"
                );
                snapshot
            }
            Err(e) => {
                tracing::error!(kind = %self.kind, error = %e, "Discarding unreadable local state");
                LocalSnapshot::empty()
            }
        }
    }

    /// Write the entities and set or delete the remote id.
    pub async fn save(&self, entities: &EntityList, remote_id: Option<&str>) {
        let keys = self.kind.storage_keys();
        let snapshot = LocalSnapshot::new(entities.clone(), remote_id.map(String::from));
        let encoded = match snapshot.encode_entities() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(kind = %self.kind, error = %e, "Error encoding local state");
                return;
            }
        };

        let write_entities = self.kv.set(keys.entities, &encoded);
        let write_remote_id = async {
            match remote_id {
                Some(id) => self.kv.set(keys.remote_id, id).await,
                None => self.kv.remove(keys.remote_id).await,
            }
        };

        let (entities_result, remote_id_result) = futures::join!(write_entities, write_remote_id);
        for result in [entities_result, remote_id_result] {
            if let Err(e) = result {
                tracing::error!(kind = %self.kind, error = %e, "Error saving local state");
            }
        }
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKv, SqliteKv};
    use tote_engine::{Entity, Product};

    fn cart() -> EntityList {
        EntityList::from_entities(
            CollectionKind::Cart,
            vec![
                Entity::cart(Product::new("A", "Mug", 4.0), 2),
                Entity::cart(Product::new("B", "Bowl", 7.5), 1),
            ],
        )
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let kv = Arc::new(SqliteKv::connect("sqlite::memory:").await.unwrap());
        let store = LocalStore::new(CollectionKind::Cart, kv);

        store.save(&cart(), Some("r1")).await;
        let snapshot = store.load().await;

        assert_eq!(snapshot.entities, cart());
        assert_eq!(snapshot.remote_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn saving_without_id_deletes_the_key() {
        let kv = Arc::new(MemoryKv::new());
        let store = LocalStore::new(CollectionKind::Cart, kv.clone());

        store.save(&cart(), Some("r1")).await;
        store.save(&cart(), None).await;

        assert_eq!(kv.peek("local_cart_id"), None);
        assert!(kv.peek("local_shopping_cart").is_some());
        assert_eq!(store.load().await.remote_id, None);
    }

    #[tokio::test]
    async fn kinds_use_disjoint_keys() {
        let kv = Arc::new(MemoryKv::new());
        let carts = LocalStore::new(CollectionKind::Cart, kv.clone());
        let liked = LocalStore::new(CollectionKind::Liked, kv.clone());

        carts.save(&cart(), Some("c1")).await;
        assert!(liked.load().await.is_empty());

        liked.save(&EntityList::new(), Some("l1")).await;
        assert_eq!(carts.load().await.remote_id.as_deref(), Some("c1"));
        assert_eq!(kv.len(), 4);
    }

    #[tokio::test]
    async fn corrupt_data_loads_empty() {
        let kv = Arc::new(MemoryKv::new());
        kv.set("local_liked_products", "{oops").await.unwrap();
        kv.set("local_liked_id", "l1").await.unwrap();

        let store = LocalStore::new(CollectionKind::Liked, kv);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn io_failures_are_swallowed() {
        let kv = Arc::new(MemoryKv::new());
        let store = LocalStore::new(CollectionKind::Cart, kv.clone());
        store.save(&cart(), Some("r1")).await;

        kv.set_failing(true);
        assert!(store.load().await.is_empty());
        store.save(&EntityList::new(), None).await;

        kv.set_failing(false);
        assert_eq!(store.load().await.entities, cart());
    }
}

//! EntityList - the ordered, duplicate-free contents of one collection.
//!
//! Order is insertion order and is preserved across every mutation, merge and
//! persistence round trip. Product ids are unique within a list.

use crate::{error::Result, AddPolicy, CollectionKind, Entity, Error, Mutation, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered entities of a collection, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct EntityList {
    entities: Vec<Entity>,
}

/// Result of applying a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Whether the list differs from before
    pub changed: bool,
    /// Number of entities after the mutation
    pub len: usize,
}

/// Derived totals of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of quantities (cart) or number of entities (liked)
    pub count: u64,
    /// Sum of price times quantity
    pub price: f64,
}

impl EntityList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Build a list from raw entities, normalizing them for `kind`.
    ///
    /// Later duplicates of a product id are dropped, the first one wins.
    pub fn from_entities(kind: CollectionKind, entities: Vec<Entity>) -> Self {
        let mut seen = HashSet::with_capacity(entities.len());
        let entities = entities
            .into_iter()
            .filter(|e| seen.insert(e.product.id.clone()))
            .map(|e| kind.normalize(e))
            .collect();
        Self { entities }
    }

    /// Like [`EntityList::from_entities`], but duplicates are an error.
    pub fn try_from_entities(kind: CollectionKind, entities: Vec<Entity>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !seen.insert(entity.id()) {
                return Err(Error::DuplicateEntity(entity.product.id.clone()));
            }
        }
        Ok(Self {
            entities: entities.into_iter().map(|e| kind.normalize(e)).collect(),
        })
    }

    /// Get an entity by product id.
    pub fn get(&self, product_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.position(product_id).is_some()
    }

    /// Quantity held for a product, 0 when absent.
    pub fn quantity_of(&self, product_id: &str) -> Quantity {
        self.get(product_id).map(Entity::quantity).unwrap_or(0)
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.id() == product_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Product ids in list order.
    pub fn ids(&self) -> Vec<&str> {
        self.entities.iter().map(Entity::id).collect()
    }

    pub fn into_vec(self) -> Vec<Entity> {
        self.entities
    }

    /// Append an entity that is known to be absent.
    pub(crate) fn push_unchecked(&mut self, entity: Entity) {
        debug_assert!(!self.contains(entity.id()));
        self.entities.push(entity);
    }

    /// Apply a mutation in place.
    ///
    /// Mutations that find nothing to do (removing an absent product,
    /// re-liking a liked one, adding zero to a cart line) succeed with
    /// `changed == false`.
    pub fn apply(&mut self, kind: CollectionKind, mutation: &Mutation) -> Result<ApplyResult> {
        let changed = match mutation {
            Mutation::Add { product, quantity } => match self.position(&product.id) {
                Some(index) => match kind.add_policy() {
                    AddPolicy::Accumulate if *quantity == 0 => false,
                    AddPolicy::Accumulate => {
                        let entity = &mut self.entities[index];
                        let next = entity.quantity().saturating_add(*quantity);
                        entity.quantity = Some(next);
                        true
                    }
                    AddPolicy::Idempotent => false,
                },
                None => {
                    let entity = kind.normalize(Entity::cart(product.clone(), *quantity));
                    self.entities.push(entity);
                    true
                }
            },
            Mutation::SetQuantity {
                product_id,
                quantity,
            } => {
                if !kind.tracks_quantity() {
                    return Err(Error::UnsupportedForKind {
                        operation: mutation.name(),
                        kind,
                    });
                }
                if *quantity <= 0 {
                    self.remove(product_id)
                } else {
                    let next = Quantity::try_from(*quantity).unwrap_or(Quantity::MAX);
                    match self.position(product_id) {
                        Some(index) => {
                            let entity = &mut self.entities[index];
                            let changed = entity.quantity != Some(next);
                            entity.quantity = Some(next);
                            changed
                        }
                        None => false,
                    }
                }
            }
            Mutation::Remove { product_id } => self.remove(product_id),
            Mutation::Clear => {
                let changed = !self.entities.is_empty();
                self.entities.clear();
                changed
            }
        };

        Ok(ApplyResult {
            changed,
            len: self.entities.len(),
        })
    }

    fn remove(&mut self, product_id: &str) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id() != product_id);
        self.entities.len() != before
    }

    /// Count and price totals for `kind`.
    pub fn totals(&self, kind: CollectionKind) -> Totals {
        self.entities.iter().fold(Totals::default(), |acc, entity| {
            let units = if kind.tracks_quantity() {
                u64::from(entity.quantity())
            } else {
                1
            };
            Totals {
                count: acc.count + units,
                price: acc.price + entity.line_total(),
            }
        })
    }
}

impl From<Vec<Entity>> for EntityList {
    fn from(entities: Vec<Entity>) -> Self {
        let mut seen = HashSet::with_capacity(entities.len());
        let entities = entities
            .into_iter()
            .filter(|e| seen.insert(e.product.id.clone()))
            .collect();
        Self { entities }
    }
}

impl From<EntityList> for Vec<Entity> {
    fn from(list: EntityList) -> Self {
        list.entities
    }
}

impl<'a> IntoIterator for &'a EntityList {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Product;

    fn product(id: &str, price: f64) -> Product {
        Product::new(id, format!("Product {id}"), price)
    }

    #[test]
    fn cart_add_accumulates() {
        let mut list = EntityList::new();
        let kind = CollectionKind::Cart;

        list.apply(kind, &Mutation::add(product("A", 10.0), 1)).unwrap();
        let result = list.apply(kind, &Mutation::add(product("A", 10.0), 2)).unwrap();

        assert!(result.changed);
        assert_eq!(result.len, 1);
        assert_eq!(list.quantity_of("A"), 3);
    }

    #[test]
    fn cart_add_zero_to_existing_line_changes_nothing() {
        let mut list = EntityList::new();
        let kind = CollectionKind::Cart;

        list.apply(kind, &Mutation::add(product("A", 10.0), 2)).unwrap();
        let result = list.apply(kind, &Mutation::add(product("A", 10.0), 0)).unwrap();

        assert!(!result.changed);
        assert_eq!(list.quantity_of("A"), 2);
    }

    #[test]
    fn liked_add_is_idempotent() {
        let mut list = EntityList::new();
        let kind = CollectionKind::Liked;

        let first = list.apply(kind, &Mutation::add(product("A", 10.0), 1)).unwrap();
        let second = list.apply(kind, &Mutation::add(product("A", 10.0), 1)).unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("A").unwrap().quantity, None);
    }

    #[test]
    fn set_quantity_zero_removes() {
        let kind = CollectionKind::Cart;
        let mut list = EntityList::from_entities(kind, vec![Entity::cart(product("A", 1.0), 2)]);

        let result = list.apply(kind, &Mutation::set_quantity("A", 0)).unwrap();
        assert!(result.changed);
        assert!(list.is_empty());

        let mut list = EntityList::from_entities(kind, vec![Entity::cart(product("A", 1.0), 2)]);
        list.apply(kind, &Mutation::set_quantity("A", -3)).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn set_quantity_on_absent_is_noop() {
        let mut list = EntityList::new();
        let result = list
            .apply(CollectionKind::Cart, &Mutation::set_quantity("A", 4))
            .unwrap();
        assert!(!result.changed);
        assert!(list.is_empty());
    }

    #[test]
    fn set_quantity_saturates() {
        let kind = CollectionKind::Cart;
        let mut list = EntityList::from_entities(kind, vec![Entity::cart(product("A", 1.0), 1)]);
        list.apply(kind, &Mutation::set_quantity("A", i64::MAX)).unwrap();
        assert_eq!(list.quantity_of("A"), Quantity::MAX);

        list.apply(kind, &Mutation::add(product("A", 1.0), 5)).unwrap();
        assert_eq!(list.quantity_of("A"), Quantity::MAX);
    }

    #[test]
    fn set_quantity_unsupported_for_liked() {
        let mut list = EntityList::new();
        let err = list
            .apply(CollectionKind::Liked, &Mutation::set_quantity("A", 2))
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedForKind {
                operation: "setQuantity",
                kind: CollectionKind::Liked,
            }
        );
    }

    #[test]
    fn remove_absent_is_noop() {
        let kind = CollectionKind::Cart;
        let mut list = EntityList::from_entities(kind, vec![Entity::cart(product("A", 1.0), 1)]);
        let result = list.apply(kind, &Mutation::remove("B")).unwrap();
        assert!(!result.changed);
        assert_eq!(list.ids(), vec!["A"]);
    }

    #[test]
    fn order_is_preserved() {
        let kind = CollectionKind::Cart;
        let mut list = EntityList::new();
        for id in ["C", "A", "B"] {
            list.apply(kind, &Mutation::add(product(id, 1.0), 1)).unwrap();
        }
        list.apply(kind, &Mutation::set_quantity("A", 5)).unwrap();
        list.apply(kind, &Mutation::remove("C")).unwrap();
        list.apply(kind, &Mutation::add(product("C", 1.0), 1)).unwrap();

        assert_eq!(list.ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn clear_reports_change_once() {
        let kind = CollectionKind::Liked;
        let mut list = EntityList::from_entities(kind, vec![Entity::liked(product("A", 1.0))]);
        assert!(list.apply(kind, &Mutation::clear()).unwrap().changed);
        assert!(!list.apply(kind, &Mutation::clear()).unwrap().changed);
    }

    #[test]
    fn from_entities_drops_duplicates() {
        let list = EntityList::from_entities(
            CollectionKind::Cart,
            vec![
                Entity::cart(product("A", 1.0), 2),
                Entity::cart(product("B", 1.0), 1),
                Entity::cart(product("A", 1.0), 9),
            ],
        );
        assert_eq!(list.ids(), vec!["A", "B"]);
        assert_eq!(list.quantity_of("A"), 2);

        let err = EntityList::try_from_entities(
            CollectionKind::Cart,
            vec![
                Entity::cart(product("A", 1.0), 2),
                Entity::cart(product("A", 1.0), 9),
            ],
        )
        .unwrap_err();
        assert_eq!(err, Error::DuplicateEntity("A".into()));
    }

    #[test]
    fn totals_per_kind() {
        let entities = vec![
            Entity::cart(product("A", 2.5), 2),
            Entity::cart(product("B", 10.0), 1),
        ];
        let cart = EntityList::from_entities(CollectionKind::Cart, entities.clone());
        let totals = cart.totals(CollectionKind::Cart);
        assert_eq!(totals.count, 3);
        assert_eq!(totals.price, 15.0);

        let liked = EntityList::from_entities(CollectionKind::Liked, entities);
        let totals = liked.totals(CollectionKind::Liked);
        assert_eq!(totals.count, 2);
        assert_eq!(totals.price, 12.5);
    }

    #[test]
    fn deserialize_dedups() {
        let json = r#"[{"id":"A","quantity":1},{"id":"A","quantity":2}]"#;
        let list: EntityList = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.quantity_of("A"), 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn mutation_strategy() -> impl Strategy<Value = Mutation> {
            let id = prop::sample::select(vec!["A", "B", "C", "D"]);
            prop_oneof![
                (id.clone(), 1u32..5).prop_map(|(id, q)| Mutation::add(product(id, 1.0), q)),
                (id.clone(), -2i64..6).prop_map(|(id, q)| Mutation::set_quantity(id, q)),
                id.prop_map(|id| Mutation::remove(id)),
                Just(Mutation::clear()),
            ]
        }

        proptest! {
            #[test]
            fn cart_stays_unique_and_positive(
                mutations in prop::collection::vec(mutation_strategy(), 0..40)
            ) {
                let mut list = EntityList::new();
                for mutation in &mutations {
                    list.apply(CollectionKind::Cart, mutation).unwrap();
                }

                let mut ids = list.ids();
                let len = ids.len();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), len);
                prop_assert!(list.iter().all(|e| e.quantity.unwrap_or(0) >= 1));
            }

            #[test]
            fn liked_add_twice_equals_once(id in "[a-z]{1,6}") {
                let kind = CollectionKind::Liked;
                let mut once = EntityList::new();
                once.apply(kind, &Mutation::add(product(&id, 1.0), 1)).unwrap();

                let mut twice = once.clone();
                twice.apply(kind, &Mutation::add(product(&id, 1.0), 1)).unwrap();

                prop_assert_eq!(once, twice);
            }
        }
    }
}

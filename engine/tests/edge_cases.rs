//! Edge case tests for tote-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use serde_json::json;
use tote_engine::{
    merge_local_wins, plan_reconcile, CollectionKind, Entity, EntityList, LocalSnapshot, Mutation,
    Product, Quantity, ReconcileBranch, RemoteAction, RemoteSnapshot, Session, SessionTransition,
};

fn product(id: &str) -> Product {
    Product::new(id, format!("Product {id}"), 5.0)
}

fn cart(lines: &[(&str, Quantity)]) -> EntityList {
    EntityList::from_entities(
        CollectionKind::Cart,
        lines
            .iter()
            .map(|(id, q)| Entity::cart(product(id), *q))
            .collect(),
    )
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn unicode_product_ids() {
    let kind = CollectionKind::Liked;
    let mut list = EntityList::new();

    let ids = ["日本語テスト", "Привет мир", "🎉🚀💯", "Hello\nWorld\tTab"];
    for id in ids {
        list.apply(kind, &Mutation::add(product(id), 1)).unwrap();
    }

    let snapshot = LocalSnapshot::new(list.clone(), None);
    let encoded = snapshot.encode_entities().unwrap();
    let decoded = LocalSnapshot::decode(kind, Some(&encoded), None).unwrap();

    assert_eq!(decoded.entities, list);
    assert_eq!(decoded.entities.ids(), ids.to_vec());
}

#[test]
fn empty_product_id_is_still_an_identity() {
    let kind = CollectionKind::Cart;
    let mut list = EntityList::new();
    list.apply(kind, &Mutation::add(product(""), 1)).unwrap();
    list.apply(kind, &Mutation::add(product(""), 1)).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.quantity_of(""), 2);
}

#[test]
fn whitespace_remote_id_is_missing() {
    let snapshot = LocalSnapshot::decode(CollectionKind::Cart, Some("[]"), Some("   ")).unwrap();
    assert_eq!(snapshot.remote_id, None);
}

// ============================================================================
// Numeric Edge Cases
// ============================================================================

#[test]
fn quantity_boundaries() {
    let kind = CollectionKind::Cart;
    let mut list = cart(&[("A", Quantity::MAX - 1)]);

    list.apply(kind, &Mutation::add(product("A"), 10)).unwrap();
    assert_eq!(list.quantity_of("A"), Quantity::MAX);

    list.apply(kind, &Mutation::set_quantity("A", i64::MIN)).unwrap();
    assert!(list.is_empty());
}

#[test]
fn add_with_zero_quantity_creates_one_then_adds_nothing() {
    let kind = CollectionKind::Cart;
    let mut list = EntityList::new();
    let result = list.apply(kind, &Mutation::add(product("A"), 0)).unwrap();
    assert!(result.changed);
    assert_eq!(list.quantity_of("A"), 1);

    let result = list.apply(kind, &Mutation::add(product("A"), 0)).unwrap();
    assert!(!result.changed);
    assert_eq!(list.quantity_of("A"), 1);
}

#[test]
fn totals_of_large_cart() {
    let kind = CollectionKind::Cart;
    let list = cart(&[("A", Quantity::MAX), ("B", Quantity::MAX)]);
    let totals = list.totals(kind);
    assert_eq!(totals.count, 2 * u64::from(Quantity::MAX));
}

// ============================================================================
// JSON Edge Cases
// ============================================================================

#[test]
fn product_with_nested_catalog_fields() {
    let raw = json!([{
        "id": "p1",
        "name": "Chair",
        "price": 199,
        "gallery": [{"url": "/a.png"}, {"url": "/b.png"}],
        "category": {"id": "c1", "title": "Seating", "parent": {"id": "c0"}},
        "description": null,
        "quantity": 1
    }]);
    let encoded = raw.to_string();

    let snapshot = LocalSnapshot::decode(CollectionKind::Cart, Some(&encoded), None).unwrap();
    let reencoded: serde_json::Value =
        serde_json::from_str(&snapshot.encode_entities().unwrap()).unwrap();

    assert_eq!(reencoded[0]["gallery"], raw[0]["gallery"]);
    assert_eq!(reencoded[0]["category"]["parent"]["id"], json!("c0"));
    assert_eq!(reencoded[0]["price"], json!(199.0));
}

#[test]
fn stored_liked_quantities_are_dropped() {
    let raw = r#"[{"id":"p1","quantity":4}]"#;
    let snapshot = LocalSnapshot::decode(CollectionKind::Liked, Some(raw), None).unwrap();
    assert_eq!(snapshot.entities.get("p1").unwrap().quantity, None);
}

#[test]
fn stored_cart_without_quantity_gets_one() {
    let raw = r#"[{"id":"p1"}]"#;
    let snapshot = LocalSnapshot::decode(CollectionKind::Cart, Some(raw), None).unwrap();
    assert_eq!(snapshot.entities.quantity_of("p1"), 1);
}

// ============================================================================
// Reconciliation Edge Cases
// ============================================================================

#[test]
fn merge_of_two_empty_lists() {
    let outcome = merge_local_wins(&EntityList::new(), &EntityList::new());
    assert!(outcome.entities.is_empty());
    assert!(outcome.conflicts.is_empty());
}

#[test]
fn merge_tie_break_keeps_local_quantity() {
    let outcome = merge_local_wins(&cart(&[("A", 2)]), &cart(&[("A", 9), ("B", 1)]));
    assert_eq!(outcome.entities, cart(&[("A", 2), ("B", 1)]));
}

#[test]
fn empty_remote_with_matching_id_empties_local() {
    let plan = plan_reconcile(
        CollectionKind::Cart,
        &LocalSnapshot::new(cart(&[("A", 1)]), Some("r1".into())),
        Some(&RemoteSnapshot {
            id: "r1".into(),
            entities: EntityList::new(),
        }),
    );
    assert_eq!(plan.branch, ReconcileBranch::RemoteAuthoritative);
    assert!(plan.entities.is_empty());
    assert_eq!(plan.action, RemoteAction::None);
}

#[test]
fn mismatched_ids_with_empty_local_still_update_remote() {
    let plan = plan_reconcile(
        CollectionKind::Cart,
        &LocalSnapshot::new(EntityList::new(), Some("old".into())),
        Some(&RemoteSnapshot {
            id: "r1".into(),
            entities: cart(&[("B", 1)]),
        }),
    );
    assert_eq!(plan.branch, ReconcileBranch::MergeMismatched);
    assert_eq!(plan.entities.ids(), vec!["B"]);
    assert_eq!(plan.remote_id.as_deref(), Some("r1"));
}

// ============================================================================
// Session Edge Cases
// ============================================================================

#[test]
fn token_without_user_is_anonymous() {
    let token_only = Session {
        user_id: None,
        auth_token: Some("t".into()),
    };
    assert_eq!(
        SessionTransition::between(Some(&Session::anonymous()), &token_only),
        SessionTransition::Unchanged
    );
}

#[test]
fn losing_the_token_is_a_logout() {
    let alice = Session::authenticated("alice", "t");
    let stale = Session {
        user_id: Some("alice".into()),
        auth_token: None,
    };
    assert_eq!(
        SessionTransition::between(Some(&alice), &stale),
        SessionTransition::Logout
    );
}

// ============================================================================
// Volume
// ============================================================================

#[test]
fn many_mutations_keep_order() {
    let kind = CollectionKind::Cart;
    let mut list = EntityList::new();

    for i in 0..1000 {
        list.apply(kind, &Mutation::add(product(&format!("p{i}")), 1))
            .unwrap();
    }
    for i in (0..1000).step_by(2) {
        list.apply(kind, &Mutation::remove(format!("p{i}"))).unwrap();
    }

    assert_eq!(list.len(), 500);
    let ids = list.ids();
    assert_eq!(ids.first(), Some(&"p1"));
    assert_eq!(ids.last(), Some(&"p999"));
}

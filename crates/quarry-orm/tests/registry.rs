//! Metadata registration shared across threads.

mod common;

use std::sync::Arc;
use std::thread;

use common::{City, Country, Person, Tag};
use quarry_orm::{EntityRef, EntityRegistry};

#[test]
fn test_concurrent_lookups_derive_once() {
    let registry = EntityRegistry::new();
    let found: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.metadata::<Country>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(registry.derivation_count(), 1);
    assert!(found.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_concurrent_registration_of_related_entities() {
    let registry = EntityRegistry::new();
    thread::scope(|scope| {
        scope.spawn(|| registry.register::<Person>().unwrap());
        scope.spawn(|| registry.register::<City>().unwrap());
        scope.spawn(|| registry.register::<Tag>().unwrap());
    });

    assert_eq!(registry.derivation_count(), 4);
    let registered = registry.registered();
    for entity in [
        EntityRef::of::<Person>(),
        EntityRef::of::<City>(),
        EntityRef::of::<Country>(),
        EntityRef::of::<Tag>(),
    ] {
        assert!(registered.contains(&entity));
    }

    let order: Vec<String> = registry
        .creation_order()
        .unwrap()
        .iter()
        .map(|metadata| metadata.table().to_owned())
        .collect();
    let position = |name: &str| order.iter().position(|t| t == name).unwrap();
    assert!(position("Country") < position("City"));
    assert!(position("City") < position("Person"));
}

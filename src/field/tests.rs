use std::cell::RefCell;
use std::rc::Rc;

use crate::test_util::{self, Event, Recorder, TestSchema};
use crate::Error;

#[test]
fn test_get_requires_component() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();

    assert_eq!(ts.position.try_get(&ctx, entity), Ok(None));
    assert_eq!(
        ts.position.get(&ctx, entity),
        Err(Error::ComponentNotFound { entity, component: "Position".into() })
    );
    assert!(matches!(
        ts.position.update(&mut ctx, entity, |xy| xy[0] += 1.0),
        Err(Error::ComponentNotFound { .. })
    ));

    ts.position.set(&mut ctx, entity, [1.0, 2.0]).unwrap();
    assert_eq!(ts.position.get(&ctx, entity), Ok([1.0, 2.0]));
    assert!(ts.position.component().has(&ctx, entity).unwrap());
}

#[test]
fn test_update_in_place() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();
    ts.position.set(&mut ctx, entity, [1.0, 2.0]).unwrap();

    let sum = ts
        .position
        .update(&mut ctx, entity, |xy| {
            xy[0] *= 10.0;
            xy[0] + xy[1]
        })
        .unwrap();
    assert_eq!(sum, 12.0);
    assert_eq!(ts.position.get(&ctx, entity), Ok([10.0, 2.0]));
}

#[test]
fn test_get_or_set() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();

    assert_eq!(ts.position.get_or_set(&mut ctx, entity, [3.0, 4.0]), Ok([3.0, 4.0]));
    assert_eq!(ts.position.get_or_set(&mut ctx, entity, [5.0, 6.0]), Ok([3.0, 4.0]));
}

#[test]
fn test_dead_entity_is_rejected() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();
    ctx.remove_entity(entity);

    assert_eq!(ts.position.try_get(&ctx, entity), Err(Error::DeadEntity { entity }));
    assert_eq!(ts.position.set(&mut ctx, entity, [0.0, 0.0]), Err(Error::DeadEntity { entity }));
    assert_eq!(ts.position.component().add(&mut ctx, entity), Err(Error::DeadEntity { entity }));
}

#[test]
fn test_component_add_and_remove() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();
    let position = ts.position.component();

    assert_eq!(position.add(&mut ctx, entity), Ok(true));
    assert_eq!(position.add(&mut ctx, entity), Ok(false));
    assert_eq!(ts.position.get(&ctx, entity), Ok([0.0, 0.0]));
    assert_eq!(position.len(&ctx), 1);

    assert_eq!(position.remove(&mut ctx, entity), Ok(true));
    assert_eq!(position.remove(&mut ctx, entity), Ok(false));
    assert_eq!(position.len(&ctx), 0);
}

#[test]
fn test_reactive_field_notifies_effective_changes() {
    test_util::init();

    let (ts, mut ctx) = TestSchema::context();
    let recorder = Recorder::new();
    let subscription = ts.health.subscribe(&ctx, recorder.clone());

    let entity = ctx.create_entity();
    ts.health.set(&mut ctx, entity, 10).unwrap();
    ts.health.set(&mut ctx, entity, 10).unwrap();
    ts.health.update(&mut ctx, entity, |hp| *hp -= 3).unwrap();
    ts.health.update(&mut ctx, entity, |_| ()).unwrap();

    assert_eq!(
        recorder.borrow().events,
        [
            Event::Value { entity, old: None, new: 10 },
            Event::Value { entity, old: Some(10), new: 7 },
        ]
    );

    assert!(subscription.cancel());
    ts.health.set(&mut ctx, entity, 1).unwrap();
    assert_eq!(recorder.borrow().events.len(), 2);
}

#[test]
fn test_reactive_observers_in_subscription_order() {
    let (ts, mut ctx) = TestSchema::context();
    let order = Rc::new(RefCell::new(Vec::new()));

    struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);
    impl crate::ValueObserver<i32> for Tagged {
        fn value_changed(&mut self, _: crate::EntityId, _: Option<i32>, _: i32) {
            self.1.borrow_mut().push(self.0);
        }
    }

    let first = Rc::new(RefCell::new(Tagged("first", order.clone())));
    let second = Rc::new(RefCell::new(Tagged("second", order.clone())));
    let _first = ts.health.subscribe(&ctx, first);
    let _second = ts.health.subscribe(&ctx, second);

    let entity = ctx.create_entity();
    ts.health.set(&mut ctx, entity, 1).unwrap();
    assert_eq!(*order.borrow(), ["first", "second"]);
}

#[test]
fn test_primary_key_round_trip() {
    test_util::init();

    let (ts, mut ctx) = TestSchema::context();
    let alice = ctx.create_entity();
    let bob = ctx.create_entity();

    ts.account.set(&mut ctx, alice, 100).unwrap();
    ts.account.set(&mut ctx, bob, 200).unwrap();
    assert_eq!(ts.account.get_entity_by_key(&ctx, 100), Ok(alice));
    assert_eq!(ts.account.get_entity_by_key(&ctx, 200), Ok(bob));
    assert_eq!(ts.account.len(&ctx), 2);

    // rekeying releases the old key
    ts.account.set(&mut ctx, alice, 101).unwrap();
    assert_eq!(ts.account.try_get_entity_by_key(&ctx, 100), None);
    assert_eq!(ts.account.get_entity_by_key(&ctx, 101), Ok(alice));
    assert_eq!(
        ts.account.get_entity_by_key(&ctx, 100),
        Err(Error::KeyNotFound { field: "id".into(), key: "100".into() })
    );

    ctx.remove_entity(bob);
    assert_eq!(ts.account.try_get_entity_by_key(&ctx, 200), None);
    assert_eq!(ts.account.len(&ctx), 1);
}

#[test]
fn test_primary_key_conflict_changes_nothing() {
    let (ts, mut ctx) = TestSchema::context();
    let alice = ctx.create_entity();
    let bob = ctx.create_entity();

    ts.account.set(&mut ctx, alice, 1).unwrap();
    ts.account.set(&mut ctx, bob, 2).unwrap();

    assert_eq!(
        ts.account.set(&mut ctx, bob, 1),
        Err(Error::PrimaryKeyConflict {
            field:  "id".into(),
            key:    "1".into(),
            owner:  alice,
            entity: bob,
        })
    );
    assert_eq!(ts.account.get(&ctx, bob), Ok(2));
    assert_eq!(ts.account.get_entity_by_key(&ctx, 2), Ok(bob));
    assert_eq!(ts.account.get_entity_by_key(&ctx, 1), Ok(alice));

    // assigning the key an entity already owns is a no-op
    assert_eq!(ts.account.set(&mut ctx, alice, 1), Ok(()));
}

#[test]
fn test_primary_key_released_on_detach() {
    let (ts, mut ctx) = TestSchema::context();
    let alice = ctx.create_entity();
    let bob = ctx.create_entity();

    ts.account.set(&mut ctx, alice, 7).unwrap();
    ts.account.component().remove(&mut ctx, alice).unwrap();

    ts.account.set(&mut ctx, bob, 7).unwrap();
    assert_eq!(ts.account.get_entity_by_key(&ctx, 7), Ok(bob));
}

#[test]
fn test_primary_key_eviction_ignores_record_contents() {
    let (ts, mut ctx) = TestSchema::context();
    let alice = ctx.create_entity();
    let bob = ctx.create_entity();

    ts.account.set(&mut ctx, alice, 7).unwrap();
    let offset = ts.account.info().offset();
    ctx.storage_mut(ts.account.component().id()).write(alice.index(), offset, 8u64);

    ctx.remove_entity(alice);
    assert_eq!(ts.account.try_get_entity_by_key(&ctx, 7), None);
    assert_eq!(ts.account.try_get_entity_by_key(&ctx, 8), None);
    assert_eq!(ts.account.len(&ctx), 0);

    ts.account.set(&mut ctx, bob, 7).unwrap();
    assert_eq!(ts.account.get_entity_by_key(&ctx, 7), Ok(bob));
}

#[test]
fn test_index_field_tracks_values() {
    test_util::init();

    let (ts, mut ctx) = TestSchema::context();
    let a = ctx.create_entity();
    let b = ctx.create_entity();
    let c = ctx.create_entity();

    ts.team.set(&mut ctx, a, 1).unwrap();
    ts.team.set(&mut ctx, b, 1).unwrap();
    ts.team.set(&mut ctx, c, 2).unwrap();
    assert_eq!(ts.team.entities_with(&ctx, 1), [a, b]);
    assert_eq!(ts.team.entities_with(&ctx, 2), [c]);

    ts.team.set(&mut ctx, a, 2).unwrap();
    assert_eq!(ts.team.entities_with(&ctx, 1), [b]);
    assert_eq!(ts.team.entities_with(&ctx, 2), [c, a]);

    ctx.remove_entity(c);
    assert_eq!(ts.team.entities_with(&ctx, 2), [a]);

    ts.team.component().remove(&mut ctx, b).unwrap();
    assert!(ts.team.entities_with(&ctx, 1).is_empty());
}

#[test]
fn test_index_field_links_zeroed_records() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();

    ts.team.component().add(&mut ctx, entity).unwrap();
    assert_eq!(ts.team.entities_with(&ctx, 0), [entity]);

    ts.team.set(&mut ctx, entity, 3).unwrap();
    assert!(ts.team.entities_with(&ctx, 0).is_empty());
    assert_eq!(ts.team.entities_with(&ctx, 3), [entity]);
}

#[test]
fn test_index_field_unlinks_tracked_value() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();

    ts.team.set(&mut ctx, entity, 3).unwrap();
    let offset = ts.team.info().offset();
    ctx.storage_mut(ts.team.component().id()).write(entity.index(), offset, 4u32);

    ts.team.set(&mut ctx, entity, 5).unwrap();
    assert!(ts.team.entities_with(&ctx, 3).is_empty());
    assert!(ts.team.entities_with(&ctx, 4).is_empty());
    assert_eq!(ts.team.entities_with(&ctx, 5), [entity]);

    ts.team.component().remove(&mut ctx, entity).unwrap();
    assert!(ts.team.entities_with(&ctx, 5).is_empty());
}

#[test]
fn test_ref_field_values() {
    let (ts, mut ctx) = TestSchema::context();
    let entity = ctx.create_entity();

    assert_eq!(ts.label.try_get(&ctx, entity), Ok(None));
    assert_eq!(ts.label.set(&mut ctx, entity, "first".to_owned()), Ok(None));
    assert!(ts.label.component().has(&ctx, entity).unwrap());
    assert_eq!(ts.label.get(&ctx, entity).map(String::as_str), Ok("first"));

    ts.label.get_mut(&mut ctx, entity).unwrap().push_str("!");
    assert_eq!(
        ts.label.set(&mut ctx, entity, "second".to_owned()),
        Ok(Some("first!".to_owned()))
    );

    assert_eq!(ts.label.take(&mut ctx, entity), Ok(Some("second".to_owned())));
    assert!(ts.label.component().has(&ctx, entity).unwrap());
    assert!(matches!(ts.label.get(&ctx, entity), Err(Error::ComponentNotFound { .. })));
}

#[test]
fn test_ref_field_cleared_on_detach() {
    let (ts, mut ctx) = TestSchema::context();
    let value = Rc::new(());
    let weak = Rc::downgrade(&value);

    let (removed, kept) = (ctx.create_entity(), ctx.create_entity());
    ts.label.set(&mut ctx, removed, "removed".to_owned()).unwrap();
    ts.label.set(&mut ctx, kept, "kept".to_owned()).unwrap();

    let mut schema = crate::Schema::builder();
    let shared = schema.component("Shared").ref_field::<Rc<()>>("value");
    let mut other = crate::Context::new(schema.build());
    let holder = other.create_entity();
    shared.set(&mut other, holder, value).unwrap();
    shared.component().remove(&mut other, holder).unwrap();
    assert!(weak.upgrade().is_none());

    ctx.remove_entity(removed);
    assert_eq!(ts.label.get(&ctx, kept).map(String::as_str), Ok("kept"));

    assert_eq!(ts.label.try_get(&ctx, removed), Err(Error::DeadEntity { entity: removed }));
}

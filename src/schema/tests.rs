use super::{ComponentId, Schema};
use crate::storage::BACK_POINTER_SIZE;

#[test]
fn test_field_offsets_are_packed() {
    let mut schema = Schema::builder();
    let mut comp = schema.component("Mixed");
    let a = *comp.field::<i32>("a").info();
    let b = *comp.field::<u8>("b").info();
    let c = *comp.field::<i64>("c").info();

    assert_eq!((a.offset(), a.size()), (4, 4));
    assert_eq!((b.offset(), b.size()), (8, 1));
    assert_eq!((c.offset(), c.size()), (9, 8));
    assert_eq!([a.index(), b.index(), c.index()], [0, 1, 2]);

    let schema = schema.build();
    let def = &schema.components()[0];
    assert_eq!(def.name(), "Mixed");
    assert_eq!(def.record_size(), 17);
    assert_eq!(def.field("c").map(|field| field.offset), Some(9));
    assert!(def.field("d").is_none());
    assert!(!def.is_tag());
}

#[test]
fn test_components_are_numbered_in_order() {
    let mut schema = Schema::builder();
    let first = schema.component("First").handle();
    let second = schema.component("Second").handle();
    let relation = schema.relation("Third");

    assert_eq!(first.id(), ComponentId(0));
    assert_eq!(second.id(), ComponentId(1));
    assert_eq!(relation.component().id(), ComponentId(2));

    let schema = schema.build();
    let names: Vec<_> = schema.components().iter().map(|def| def.name()).collect();
    assert_eq!(names, ["First", "Second", "Third"]);
    assert!(schema.components()[1].is_tag());
    assert_eq!(schema.components()[1].record_size(), BACK_POINTER_SIZE);
}

#[test]
fn test_ref_field_occupies_no_bytes() {
    let mut schema = Schema::builder();
    let mut comp = schema.component("Named");
    let id = comp.field::<u32>("id");
    let label = comp.ref_field::<String>("label");
    let after = comp.field::<u16>("after");

    assert_eq!(id.info().offset(), 4);
    assert_eq!(label.info().offset(), 8);
    assert_eq!(label.info().size(), 0);
    assert_eq!(after.info().offset(), 8);

    let schema = schema.build();
    assert_eq!(schema.components()[0].record_size(), 10);
    assert_eq!(schema.components()[0].fields().len(), 3);
}

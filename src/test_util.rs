#![allow(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;

use parking_lot::Once;

use crate::field::{Field, IndexField, PrimaryKey, ReactiveField, RefField, ValueObserver};
use crate::group::GroupObserver;
use crate::{Config, Context, EntityId, Relation, Schema};

pub(crate) fn init() {
    static SET_LOGGER_ONCE: Once = Once::new();
    SET_LOGGER_ONCE.call_once(env_logger::init);
}

/// The components shared by most tests.
///
/// Each field belongs to a component of its own, in declaration order:
/// `Position`, `Velocity`, `Health`, `Account`, `Team`, `Label` and the `Likes` relation.
#[derive(Clone, Copy)]
pub struct TestSchema {
    pub position: Field<[f32; 2]>,
    pub velocity: Field<[f32; 2]>,
    pub health:   ReactiveField<i32>,
    pub account:  PrimaryKey<u64>,
    pub team:     IndexField<u32>,
    pub label:    RefField<String>,
    pub likes:    Relation,
}

impl TestSchema {
    pub fn schema() -> (Self, Schema) {
        let mut builder = Schema::builder();
        let handles = Self {
            position: builder.component("Position").field("xy"),
            velocity: builder.component("Velocity").field("xy"),
            health:   builder.component("Health").reactive_field("value"),
            account:  builder.component("Account").primary_key("id"),
            team:     builder.component("Team").index_field("id"),
            label:    builder.component("Label").ref_field("text"),
            likes:    builder.relation("Likes"),
        };
        (handles, builder.build())
    }

    /// Creates a context with the default config.
    pub fn context() -> (Self, Context) { Self::context_with(Config::default()) }

    pub fn context_with(config: Config) -> (Self, Context) {
        let (handles, schema) = Self::schema();
        (handles, Context::with_config(schema, config))
    }
}

/// A schema of `count` components named `Comp{i}`, each with one `u32` field.
pub fn numbered_fields(count: usize) -> (Vec<Field<u32>>, Context) {
    let mut builder = Schema::builder();
    let fields =
        (0..count).map(|i| builder.component(format!("Comp{i}")).field("value")).collect();
    (fields, Context::new(builder.build()))
}

/// A config small enough to exercise growth and recycling in short tests.
pub fn tiny_config() -> Config {
    Config { initial_entities_capacity: 2, reuse_barrier: 2, initial_records_capacity: 2 }
}

/// An event received by a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Group { entity: EntityId, added: bool },
    Value { entity: EntityId, old: Option<i32>, new: i32 },
}

/// Records every group and value event it receives, in order.
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn new() -> Rc<RefCell<Self>> { Rc::new(RefCell::new(Self { events: Vec::new() })) }
}

impl GroupObserver for Recorder {
    fn group_changed(&mut self, entity: EntityId, added: bool) {
        self.events.push(Event::Group { entity, added });
    }
}

impl ValueObserver<i32> for Recorder {
    fn value_changed(&mut self, entity: EntityId, old: Option<i32>, new: i32) {
        self.events.push(Event::Value { entity, old, new });
    }
}

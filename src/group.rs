//! Live views of the entities matching a component filter.
//!
//! A group is created once per distinct filter and populated by scanning the live entities.
//! After that, it is only maintained by the update callbacks of the storages it filters on.
//!
//! Iterating a group locks its member set.
//! Membership changes caused by the loop body are queued
//! and applied (and reported to observers) when the last iterator is dropped.
//!
//! ```
//! use dynrec::{Context, GroupFilter, Schema};
//!
//! let mut schema = Schema::builder();
//! let position = schema.component("Position").field::<[f32; 2]>("xy");
//! let velocity = schema.component("Velocity").field::<[f32; 2]>("xy");
//! let mut ctx = Context::new(schema.build());
//!
//! let moving = ctx
//!     .group(&GroupFilter::new().include(&position.component()).include(&velocity.component()))
//!     .unwrap();
//!
//! let entity = ctx.create_entity();
//! position.set(&mut ctx, entity, [0.0, 0.0]).unwrap();
//! assert_eq!(moving.len(), 0);
//! velocity.set(&mut ctx, entity, [1.0, 0.0]).unwrap();
//! assert_eq!(moving.len(), 1);
//!
//! for entity in moving.iter() {
//!     velocity.component().remove(&mut ctx, entity).unwrap();
//!     assert_eq!(moving.len(), 1);
//! }
//! assert_eq!(moving.len(), 0);
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::callback::{Subscribers, Subscription};
use crate::context::ContextToken;
use crate::entity::EntityId;
use crate::schema::ComponentId;
use crate::set::{Applied, EntitiesSet, LockedIter};
use crate::storage::ComponentStorage;
use crate::{Error, Result};


/// Receives the membership changes of a [`Group`].
pub trait GroupObserver {
    /// Called after `entity` entered (`added`) or left the group.
    fn group_changed(&mut self, entity: EntityId, added: bool);
}

/// Selects entities holding all included components and none of the excluded ones.
///
/// Filters are compared as sets,
/// so the order of declaration does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupFilter {
    include: BTreeSet<ComponentId>,
    exclude: BTreeSet<ComponentId>,
}

impl GroupFilter {
    /// Creates an empty filter.
    pub fn new() -> Self { Self::default() }

    /// Requires the component.
    pub fn include(mut self, component: impl Into<ComponentId>) -> Self {
        self.include.insert(component.into());
        self
    }

    /// Rejects the component.
    pub fn exclude(mut self, component: impl Into<ComponentId>) -> Self {
        self.exclude.insert(component.into());
        self
    }

    /// The required components.
    pub fn includes(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.include.iter().copied()
    }

    /// The rejected components.
    pub fn excludes(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.exclude.iter().copied()
    }

    /// Checks that the filter can be maintained over `storages`.
    pub(crate) fn validate(&self, storages: &[ComponentStorage]) -> Result<()> {
        let name = |id: &ComponentId| storages[id.0].name().to_owned();

        if let Some(unknown) =
            self.include.iter().chain(&self.exclude).find(|id| id.0 >= storages.len())
        {
            return Err(Error::InvalidFilter { reason: format!("unknown component {unknown:?}") });
        }
        if self.include.is_empty() {
            return Err(Error::InvalidFilter { reason: "no component is included".into() });
        }
        let conflicts = self.include.intersection(&self.exclude).map(name).join(", ");
        if !conflicts.is_empty() {
            return Err(Error::InvalidFilter {
                reason: format!("{conflicts} both included and excluded"),
            });
        }
        Ok(())
    }

    /// The conditions to evaluate, as `(component, required presence)`.
    fn conditions(&self) -> Vec<(ComponentId, bool)> {
        let include = self.include.iter().map(|&id| (id, true));
        let exclude = self.exclude.iter().map(|&id| (id, false));
        include.chain(exclude).collect()
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let include = self.include.iter().map(|id| format!("+{}", id.0));
        let exclude = self.exclude.iter().map(|id| format!("-{}", id.0));
        write!(f, "[{}]", include.chain(exclude).join(" "))
    }
}

/// State shared between a group, its handles and its iterators.
struct Shared {
    filter:    GroupFilter,
    members:   Rc<RefCell<EntitiesSet>>,
    observers: Rc<Subscribers<dyn GroupObserver>>,
}

/// A group as owned by its context.
pub(crate) struct GroupState {
    conditions:     Vec<(ComponentId, bool)>,
    single_include: bool,
    shared:         Rc<Shared>,
}

impl GroupState {
    pub(crate) fn new(filter: GroupFilter, entities_capacity: usize) -> Self {
        let conditions = filter.conditions();
        let single_include = filter.include.len() == 1 && filter.exclude.is_empty();
        Self {
            conditions,
            single_include,
            shared: Rc::new(Shared {
                filter,
                members: Rc::new(RefCell::new(EntitiesSet::new(entities_capacity))),
                observers: Subscribers::new(),
            }),
        }
    }

    /// The components whose storages must notify this group.
    pub(crate) fn watched(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.conditions.iter().map(|&(id, _)| id)
    }

    pub(crate) fn matches(&self, storages: &[ComponentStorage], entity: EntityId) -> bool {
        self.conditions
            .iter()
            .all(|&(id, present)| storages[id.0].has(entity.index()) == present)
    }

    /// Adds `entity` during the initial population, without notifying observers.
    pub(crate) fn populate(&self, entity: EntityId) {
        self.shared.members.borrow_mut().add(entity);
    }

    /// Reacts to a presence change of one of the watched components.
    ///
    /// A dead entity is never a member, even while its components are being detached.
    pub(crate) fn update(
        &self,
        storages: &[ComponentStorage],
        entity: EntityId,
        added: bool,
        alive: bool,
    ) {
        let member = alive
            && if self.single_include { added } else { self.matches(storages, entity) };

        let applied = {
            let mut members = self.shared.members.borrow_mut();
            if member {
                members.add(entity)
            } else {
                members.remove(entity)
            }
        };

        if applied == Applied::Applied {
            self.shared.observers.notify(|observer| observer.group_changed(entity, member));
        }
    }

    pub(crate) fn resize_entities(&self, len: usize) {
        self.shared.members.borrow_mut().resize_entities(len);
    }

    pub(crate) fn handle(&self, id: usize, token: &ContextToken) -> Group {
        Group { id, token: token.clone(), shared: Rc::clone(&self.shared) }
    }
}

/// A handle to a live filtered view.
///
/// Handles are cheap to clone and stay valid for the lifetime of the process,
/// although the group stops being updated once its context is dropped.
#[derive(Clone)]
pub struct Group {
    id:     usize,
    token:  ContextToken,
    shared: Rc<Shared>,
}

impl Group {
    /// The filter of this group.
    pub fn filter(&self) -> &GroupFilter { &self.shared.filter }

    /// The number of members, excluding changes queued during iteration.
    pub fn len(&self) -> usize { self.shared.members.borrow().len() }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Checks whether `entity` is a member.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.shared.members.borrow().contains(entity)
    }

    /// Iterates over the members.
    ///
    /// The group is locked until the iterator is dropped.
    /// While locked, membership changes are queued;
    /// the members seen by this iterator and [`len`](Self::len) do not change.
    pub fn iter(&self) -> LockedIter {
        LockedIter::new(Rc::clone(&self.shared.members), Some(Rc::clone(&self.shared.observers)))
    }

    /// Appends the members to `out`, returning the number appended.
    pub fn copy_entities(&self, out: &mut Vec<EntityId>) -> usize {
        self.shared.members.borrow().copy_to(out)
    }

    /// Subscribes `observer` to the membership changes of this group.
    ///
    /// Observers are notified only on effective changes, in subscription order.
    pub fn subscribe(&self, observer: Rc<RefCell<dyn GroupObserver>>) -> Subscription {
        self.shared.observers.subscribe(observer)
    }

    pub(crate) fn id(&self) -> usize { self.id }

    pub(crate) fn token(&self) -> &ContextToken { &self.token }
}

impl<'t> IntoIterator for &'t Group {
    type Item = EntityId;
    type IntoIter = LockedIter;

    fn into_iter(self) -> LockedIter { self.iter() }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("filter", &self.shared.filter)
            .field("len", &self.len())
            .finish()
    }
}

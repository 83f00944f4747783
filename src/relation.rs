//! Directed many-to-many links between entities.
//!
//! A relation kind is a tag component attached to both ends of each link,
//! with the link sets kept in an [`UpdateCallback`] of that component.
//! Detaching the tag (or removing the entity) drops every link touching the entity.

use indexmap::IndexSet;

use crate::callback::{CallbackHandle, UpdateCallback};
use crate::entity::EntityId;
use crate::field::Component;
use crate::storage::ComponentStorage;
use crate::{Context, Result};


type LinkSet = IndexSet<EntityId>;

/// The link sets of one relation kind.
pub struct Links {
    /// Targets of each entity.
    direct:  Vec<Option<LinkSet>>,
    /// Sources pointing at each entity.
    reverse: Vec<Option<LinkSet>>,
    pool:    Vec<LinkSet>,
}

impl Links {
    pub(crate) fn new(entities_capacity: usize) -> Self {
        let mut links = Self { direct: Vec::new(), reverse: Vec::new(), pool: Vec::new() };
        links.resize_entities(entities_capacity);
        links
    }

    fn link(&mut self, from: EntityId, to: EntityId) -> bool {
        if !slot(&mut self.direct, &mut self.pool, from).insert(to) {
            return false;
        }
        slot(&mut self.reverse, &mut self.pool, to).insert(from);
        true
    }

    fn unlink(&mut self, from: EntityId, to: EntityId) -> bool {
        let removed = match self.direct.get_mut(from.usize()) {
            Some(Some(targets)) => targets.shift_remove(&to),
            _ => false,
        };
        if removed {
            if let Some(Some(sources)) = self.reverse.get_mut(to.usize()) {
                sources.shift_remove(&from);
            }
        }
        removed
    }

    fn unlink_all(&mut self, entity: EntityId) {
        if let Some(mut targets) = self.direct.get_mut(entity.usize()).and_then(Option::take) {
            for target in &targets {
                if let Some(Some(sources)) = self.reverse.get_mut(target.usize()) {
                    sources.shift_remove(&entity);
                }
            }
            targets.clear();
            self.pool.push(targets);
        }

        if let Some(mut sources) = self.reverse.get_mut(entity.usize()).and_then(Option::take) {
            for source in &sources {
                if let Some(Some(targets)) = self.direct.get_mut(source.usize()) {
                    targets.shift_remove(&entity);
                }
            }
            sources.clear();
            self.pool.push(sources);
        }
    }

    fn get(sets: &[Option<LinkSet>], entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        sets.get(entity.usize()).into_iter().flatten().flatten().copied()
    }
}

fn slot<'t>(
    sets: &'t mut Vec<Option<LinkSet>>,
    pool: &mut Vec<LinkSet>,
    entity: EntityId,
) -> &'t mut LinkSet {
    if sets.len() <= entity.usize() {
        sets.resize_with(entity.usize() + 1, || None);
    }
    sets[entity.usize()].get_or_insert_with(|| pool.pop().unwrap_or_default())
}

impl UpdateCallback for Links {
    fn before_change(&mut self, _: &ComponentStorage, entity: EntityId, added: bool) {
        if !added {
            self.unlink_all(entity);
        }
    }

    fn resize_entities(&mut self, len: usize) {
        if self.direct.len() < len {
            self.direct.resize_with(len, || None);
            self.reverse.resize_with(len, || None);
        }
    }
}

/// A kind of directed relationship, such as "child of" or "likes".
///
/// For a link `from -> to`, `to` is a target of `from`
/// and `from` is a source of `to`.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    component: Component,
    links:     CallbackHandle<Links>,
}

impl Relation {
    pub(crate) fn new(component: Component, links: CallbackHandle<Links>) -> Self {
        Self { component, links }
    }

    /// The tag component marking the participants of this relation.
    pub fn component(&self) -> Component { self.component }

    /// Links `from` to `to`.
    ///
    /// Returns false if the link already exists.
    pub fn add(&self, ctx: &mut Context, from: EntityId, to: EntityId) -> Result<bool> {
        ctx.ensure_alive(from)?;
        ctx.ensure_alive(to)?;

        ctx.attach(self.component.id(), from);
        ctx.attach(self.component.id(), to);
        Ok(ctx.callback_mut(self.links).link(from, to))
    }

    /// Unlinks `from` from `to`.
    ///
    /// Returns false if there was no such link.
    /// Both entities keep the tag component.
    pub fn remove(&self, ctx: &mut Context, from: EntityId, to: EntityId) -> Result<bool> {
        ctx.ensure_alive(from)?;
        ctx.ensure_alive(to)?;
        Ok(ctx.callback_mut(self.links).unlink(from, to))
    }

    /// Checks whether `from` is linked to `to`.
    pub fn has(&self, ctx: &Context, from: EntityId, to: EntityId) -> Result<bool> {
        ctx.ensure_alive(from)?;
        ctx.ensure_alive(to)?;
        Ok(Links::get(&ctx.callback(self.links).direct, from).any(|target| target == to))
    }

    /// The targets of `entity`, in link order.
    pub fn targets<'c>(
        &self,
        ctx: &'c Context,
        entity: EntityId,
    ) -> Result<impl Iterator<Item = EntityId> + 'c> {
        ctx.ensure_alive(entity)?;
        Ok(Links::get(&ctx.callback(self.links).direct, entity))
    }

    /// The sources linking to `entity`, in link order.
    pub fn sources<'c>(
        &self,
        ctx: &'c Context,
        entity: EntityId,
    ) -> Result<impl Iterator<Item = EntityId> + 'c> {
        ctx.ensure_alive(entity)?;
        Ok(Links::get(&ctx.callback(self.links).reverse, entity))
    }
}

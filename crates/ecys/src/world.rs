//! The [`World`] is the top-level container for the ECS. It owns every entity,
//! the pending-deletion set, the system registry and the entity id counter.
//!
//! ## Tick
//!
//! [`World::update`] performs one tick:
//!
//! 1. Entities marked with [`World::delete_entity`] are removed.
//! 2. Every registered system runs once, highest priority first. Systems with
//!    equal priority keep their registration order.
//!
//! The system order is snapshotted before the first system runs. Calls to
//! [`add_system`](World::add_system) and [`remove_system`](World::remove_system)
//! made by a system during the tick are queued and applied once the tick's
//! systems have all run, so they take effect on the next tick.

use std::any::TypeId;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, debug_span, trace, warn};

use crate::component::{Bundle, ComponentSet};
use crate::entity::{Entity, EntityAllocator, EntityId, WorldId};
use crate::filter::Filter;
use crate::system::{System, SystemContext, SystemKey, SystemSlot, DEFAULT_PRIORITY};
use crate::EcsError;

/// Source of process-unique [`WorldId`]s.
static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Deferred registry edits
// ---------------------------------------------------------------------------

/// A registry edit requested while a tick is running.
enum RegistryEdit<A: 'static> {
    Add(SystemSlot<A>),
    Remove(TypeId),
}

/// Closes the running tick when dropped, including while a system unwinds.
///
/// Clears the in-tick flag, drops systems lost to a panic (their slot is
/// still empty), applies queued registry edits and counts the tick.
struct TickGuard<'w, A: 'static> {
    world: &'w mut World<A>,
}

impl<A: 'static> Drop for TickGuard<'_, A> {
    fn drop(&mut self) {
        let world = &mut *self.world;
        world.in_tick = false;
        world.systems.retain(|slot| {
            if slot.system.is_none() {
                warn!(system = slot.name, "dropping system that panicked mid-tick");
            }
            slot.system.is_some()
        });
        world.apply_deferred();
        world.tick_count += 1;
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Owner of all entities and systems.
///
/// `A` is the argument type passed to [`update`](Self::update) and forwarded
/// to every system. [`World::new`] builds a world with `A = ()`; use
/// [`World::default`] for any other argument type:
///
/// ```
/// use ecys::prelude::*;
///
/// struct Dt(f32);
/// let world: World<Dt> = World::default();
/// assert_eq!(world.entity_count(), 0);
/// ```
pub struct World<A: 'static = ()> {
    id: WorldId,
    allocator: EntityAllocator,
    /// Live entities, keyed by id so iteration order is ascending.
    entities: BTreeMap<EntityId, Entity>,
    /// Entities marked for removal at the start of the next tick.
    pending_deletion: BTreeSet<EntityId>,
    /// Registered systems in execution order.
    systems: Vec<SystemSlot<A>>,
    next_system_key: u64,
    /// Registry edits queued during the current tick.
    deferred: Vec<RegistryEdit<A>>,
    in_tick: bool,
    tick_count: u64,
}

impl<A: 'static> fmt::Debug for World<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entity_count", &self.entities.len())
            .field("pending_deletion", &self.pending_deletion.len())
            .field("systems", &self.system_names())
            .field("tick_count", &self.tick_count)
            .finish()
    }
}

impl World<()> {
    /// Create an empty world whose systems take no update argument.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: 'static> Default for World<A> {
    fn default() -> Self {
        Self {
            id: WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)),
            allocator: EntityAllocator::new(),
            entities: BTreeMap::new(),
            pending_deletion: BTreeSet::new(),
            systems: Vec::new(),
            next_system_key: 0,
            deferred: Vec::new(),
            in_tick: false,
            tick_count: 0,
        }
    }
}

impl<A: 'static> World<A> {
    /// This world's process-unique id.
    pub fn id(&self) -> WorldId {
        self.id
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity owning the components of `bundle` and return its id.
    ///
    /// Ids grow strictly from 1 and are not reused until [`clear`](Self::clear).
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let id = self.allocator.allocate();
        let entity = Entity::new(id, self.id, bundle.into_components());
        trace!(entity = %id, components = entity.component_count(), "created entity");
        self.entities.insert(id, entity);
        id
    }

    /// Mark an entity for removal at the start of the next [`update`](Self::update).
    ///
    /// Until then the entity stays live and keeps showing up in queries.
    /// Marking an entity twice is harmless.
    pub fn delete_entity(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.entities.contains_key(&entity) {
            return Err(EcsError::EntityNotFound { entity });
        }
        self.pending_deletion.insert(entity);
        Ok(())
    }

    /// Remove an entity now, returning it.
    pub fn delete_entity_immediate(&mut self, entity: EntityId) -> Result<Entity, EcsError> {
        let removed = self
            .entities
            .remove(&entity)
            .ok_or(EcsError::EntityNotFound { entity })?;
        self.pending_deletion.remove(&entity);
        trace!(entity = %entity, "deleted entity immediately");
        Ok(removed)
    }

    /// Whether `entity` is live (including entities pending deletion).
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Whether `entity` is marked for removal at the next tick.
    pub fn is_pending_deletion(&self, entity: EntityId) -> bool {
        self.pending_deletion.contains(&entity)
    }

    /// Borrow a live entity.
    pub fn entity(&self, entity: EntityId) -> Option<&Entity> {
        self.entities.get(&entity)
    }

    /// Mutably borrow a live entity.
    pub fn entity_mut(&mut self, entity: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Every live entity id, ascending.
    pub fn entities(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Live entities matching `filter`, ascending. `None` returns every live
    /// entity.
    pub fn filtered_entities(&self, filter: Option<&Filter>) -> Vec<EntityId> {
        match filter {
            None => self.entities(),
            Some(filter) => self
                .entities
                .values()
                .filter(|e| filter.matches(e))
                .map(Entity::id)
                .collect(),
        }
    }

    /// Live entities holding every type in `S`.
    pub fn entities_with<S: ComponentSet>(&self) -> Vec<EntityId> {
        self.filtered_entities(Some(&Filter::requires::<S>()))
    }

    /// Remove every entity and reset the id counter. Systems stay registered.
    pub fn clear(&mut self) {
        debug!(
            world = self.id.to_raw(),
            entities = self.entities.len(),
            pending = self.pending_deletion.len(),
            "clearing world"
        );
        self.allocator.reset();
        self.entities.clear();
        self.pending_deletion.clear();
    }

    // -- system registry ----------------------------------------------------

    /// Register `system` with the given priority. Higher priorities run first;
    /// equal priorities run in registration order.
    ///
    /// Fails with [`EcsError::InvalidSystemType`] if a system of the same
    /// concrete type is already registered. During a tick the registration is
    /// queued and takes effect once the tick's systems have run.
    pub fn add_system<S: System<A>>(&mut self, system: S, priority: i32) -> Result<(), EcsError> {
        let type_id = TypeId::of::<S>();
        if self.will_be_registered(type_id) {
            return Err(EcsError::InvalidSystemType {
                system: system.name(),
            });
        }
        let key = SystemKey(self.next_system_key);
        self.next_system_key += 1;
        let slot = SystemSlot::new(key, system, priority);

        if self.in_tick {
            debug!(system = slot.name, priority, "queued system registration");
            self.deferred.push(RegistryEdit::Add(slot));
        } else {
            self.insert_slot(slot);
        }
        Ok(())
    }

    /// Register `system` with [`DEFAULT_PRIORITY`].
    pub fn add_system_default<S: System<A>>(&mut self, system: S) -> Result<(), EcsError> {
        self.add_system(system, DEFAULT_PRIORITY)
    }

    /// Unregister the system of type `S`.
    ///
    /// Returns `false` without error when no such system is registered. During
    /// a tick the removal is queued and takes effect once the tick's systems
    /// have run.
    pub fn remove_system<S: System<A>>(&mut self) -> bool {
        let type_id = TypeId::of::<S>();
        if !self.will_be_registered(type_id) {
            return false;
        }
        if self.in_tick {
            debug!(system = std::any::type_name::<S>(), "queued system removal");
            self.deferred.push(RegistryEdit::Remove(type_id));
        } else {
            self.remove_slot(type_id);
        }
        true
    }

    /// The registered system of type `S`, or `None`.
    ///
    /// A system that is currently running is not reachable through its own
    /// world and yields `None`.
    pub fn get_system<S: System<A>>(&self) -> Option<&S> {
        self.slot(TypeId::of::<S>())?.downcast_ref::<S>()
    }

    /// Mutable variant of [`get_system`](Self::get_system).
    pub fn get_system_mut<S: System<A>>(&mut self) -> Option<&mut S> {
        let type_id = TypeId::of::<S>();
        self.systems
            .iter_mut()
            .find(|s| s.type_id == type_id)?
            .downcast_mut::<S>()
    }

    /// Whether a system of type `S` is registered.
    pub fn has_system<S: System<A>>(&self) -> bool {
        self.slot(TypeId::of::<S>()).is_some()
    }

    /// Priority of the registered system of type `S`.
    pub fn system_priority<S: System<A>>(&self) -> Option<i32> {
        self.slot(TypeId::of::<S>()).map(|s| s.priority)
    }

    /// Entities matching the filter of the registered system type `S`.
    ///
    /// Fails with [`EcsError::NotRegistered`] if `S` is not registered.
    pub fn system_entities<S: System<A>>(&self) -> Result<Vec<EntityId>, EcsError> {
        let slot = self
            .slot(TypeId::of::<S>())
            .ok_or(EcsError::NotRegistered {
                system: crate::component::short_type_name(std::any::type_name::<S>()),
            })?;
        Ok(self.filtered_entities(Some(slot.filter.as_ref())))
    }

    /// Names of the registered systems in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name).collect()
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    fn slot(&self, type_id: TypeId) -> Option<&SystemSlot<A>> {
        self.systems.iter().find(|s| s.type_id == type_id)
    }

    /// Registration state of `type_id` once queued edits are applied.
    fn will_be_registered(&self, type_id: TypeId) -> bool {
        let mut registered = self.slot(type_id).is_some();
        for edit in &self.deferred {
            match edit {
                RegistryEdit::Add(slot) if slot.type_id == type_id => registered = true,
                RegistryEdit::Remove(id) if *id == type_id => registered = false,
                _ => {}
            }
        }
        registered
    }

    fn insert_slot(&mut self, slot: SystemSlot<A>) {
        debug!(system = slot.name, priority = slot.priority, "registered system");
        self.systems.push(slot);
        // Stable: equal priorities keep insertion order.
        self.systems.sort_by_key(|s| Reverse(s.priority));
    }

    fn remove_slot(&mut self, type_id: TypeId) {
        if let Some(idx) = self.systems.iter().position(|s| s.type_id == type_id) {
            let slot = self.systems.remove(idx);
            debug!(system = slot.name, "removed system");
        }
    }

    fn apply_deferred(&mut self) {
        for edit in std::mem::take(&mut self.deferred) {
            match edit {
                RegistryEdit::Add(slot) => self.insert_slot(slot),
                RegistryEdit::Remove(type_id) => self.remove_slot(type_id),
            }
        }
    }

    // -- tick ---------------------------------------------------------------

    /// Run one tick: sweep deferred deletions, then run every system in
    /// priority order with `args`.
    ///
    /// If a system fails, the systems after it are skipped for this tick and
    /// the error is returned with the system's name as context. Queued
    /// registry edits are applied either way and the tick is counted.
    ///
    /// A system that panics is unregistered while the panic unwinds, so a
    /// host that catches the unwind can keep ticking the world.
    pub fn update(&mut self, args: &A) -> anyhow::Result<()> {
        if self.in_tick {
            return Err(EcsError::TickInProgress.into());
        }
        let span = debug_span!("tick", world = self.id.to_raw(), tick = self.tick_count);
        let _span = span.enter();

        self.sweep_deleted();

        let order: Vec<SystemKey> = self.systems.iter().map(|s| s.key).collect();
        self.in_tick = true;
        let mut tick = TickGuard { world: self };
        let outcome = tick.world.run_systems(&order, args);
        drop(tick);
        outcome
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn sweep_deleted(&mut self) {
        if self.pending_deletion.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending_deletion);
        let count = pending.len();
        for entity in pending {
            self.entities.remove(&entity);
        }
        debug!(count, "swept deleted entities");
    }

    fn run_systems(&mut self, order: &[SystemKey], args: &A) -> anyhow::Result<()> {
        for &key in order {
            let Some(idx) = self.systems.iter().position(|s| s.key == key) else {
                continue;
            };
            let slot = &mut self.systems[idx];
            let Some(mut system) = slot.system.take() else {
                continue;
            };
            let filter = slot.filter.clone();
            let name = slot.name;
            let priority = slot.priority;

            trace!(system = name, priority, "running system");
            let result = {
                let mut ctx = SystemContext::new(self, filter, name, priority);
                system.update(&mut ctx, args)
            };

            // Removals are deferred during a tick, so the slot is still here.
            if let Some(slot) = self.systems.iter_mut().find(|s| s.key == key) {
                slot.system = Some(system);
            }

            if let Err(err) = result {
                warn!(system = name, error = %err, "system failed; skipping rest of tick");
                return Err(err.context(format!("system `{name}` failed")));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Entity identifiers and per-entity component storage.
//!
//! An [`EntityId`] is a plain 64-bit counter value handed out by the owning
//! [`World`](crate::world::World). Ids start at 1, grow strictly, and are only
//! reused after [`World::clear`](crate::world::World::clear) resets the counter.
//!
//! An [`Entity`] owns at most one component per Rust type. Entities are never
//! constructed directly; use [`World::create_entity`](crate::world::World::create_entity).

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::component::{BoxedComponent, Component, ComponentRef, ComponentSet, ComponentTypeId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Identifier of an entity within one world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// WorldId
// ---------------------------------------------------------------------------

/// Process-unique identifier of a [`World`](crate::world::World).
///
/// Entities keep their world's id as a non-owning back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(pub(crate) u64);

impl WorldId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out strictly increasing [`EntityId`]s for one world.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    /// Last id issued; 0 means none yet.
    last: u64,
}

impl EntityAllocator {
    pub(crate) fn new() -> Self {
        Self { last: 0 }
    }

    pub(crate) fn allocate(&mut self) -> EntityId {
        self.last += 1;
        EntityId(self.last)
    }

    /// Forget every issued id. The next allocation returns `EntityId(1)` again.
    pub(crate) fn reset(&mut self) {
        self.last = 0;
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An identity holding a unique-by-type set of components.
///
/// Equality and hashing use the id only.
pub struct Entity {
    id: EntityId,
    world: WorldId,
    components: HashMap<TypeId, (ComponentTypeId, BoxedComponent)>,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        world: WorldId,
        components: Vec<(ComponentTypeId, BoxedComponent)>,
    ) -> Self {
        let mut map = HashMap::with_capacity(components.len());
        for (type_id, value) in components {
            map.insert(type_id.type_id(), (type_id, value));
        }
        Self {
            id,
            world,
            components: map,
        }
    }

    /// This entity's identifier.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The world that owns this entity.
    #[inline]
    pub fn world(&self) -> WorldId {
        self.world
    }

    /// Attach `component`, replacing and returning any existing component of
    /// the same type.
    pub fn add_component<T: Component>(&mut self, component: T) -> Option<T> {
        let type_id = ComponentTypeId::of::<T>();
        let previous = self
            .components
            .insert(type_id.type_id(), (type_id, Box::new(component)))?;
        previous.1.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Detach and return the component of type `T`.
    pub fn remove_component<T: Component>(&mut self) -> Result<T, EcsError> {
        let (_, value) = self
            .components
            .remove(&TypeId::of::<T>())
            .ok_or_else(|| self.missing::<T>())?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| self.missing::<T>())
    }

    /// Borrow the component of type `T`.
    pub fn get_component<T: Component>(&self) -> Result<&T, EcsError> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast_ref::<T>())
            .ok_or_else(|| self.missing::<T>())
    }

    /// Mutably borrow the component of type `T`.
    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T, EcsError> {
        let id = self.id;
        self.components
            .get_mut(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast_mut::<T>())
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                component: ComponentTypeId::of::<T>().name(),
            })
    }

    /// Whether a component of type `T` is attached.
    pub fn has_component<T: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<T>())
    }

    /// Whether a component with the given type id is attached.
    pub fn has_component_id(&self, type_id: ComponentTypeId) -> bool {
        self.components.contains_key(&type_id.type_id())
    }

    /// Whether every type in `S` is attached. `has_components::<()>()` is
    /// always `true`.
    pub fn has_components<S: ComponentSet>(&self) -> bool {
        self.has_all(&S::type_ids())
    }

    pub(crate) fn has_all(&self, type_ids: &[ComponentTypeId]) -> bool {
        type_ids.iter().all(|id| self.has_component_id(*id))
    }

    pub(crate) fn has_any(&self, type_ids: &[ComponentTypeId]) -> bool {
        type_ids.iter().any(|id| self.has_component_id(*id))
    }

    /// Snapshot of the attached components, sorted by type name.
    pub fn components(&self) -> Vec<ComponentRef<'_>> {
        let mut refs: Vec<_> = self
            .components
            .values()
            .map(|(type_id, value)| ComponentRef::new(*type_id, value.as_ref()))
            .collect();
        refs.sort_by_key(|c| c.name());
        refs
    }

    /// Type ids of the attached components, sorted by type name.
    pub fn component_types(&self) -> Vec<ComponentTypeId> {
        let mut ids: Vec<_> = self.components.values().map(|(id, _)| *id).collect();
        ids.sort_by_key(|id| id.name());
        ids
    }

    /// Number of attached components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    fn missing<T: Component>(&self) -> EcsError {
        EcsError::MissingComponent {
            entity: self.id,
            component: ComponentTypeId::of::<T>().name(),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}: ", self.id)?;
        f.debug_list()
            .entries(self.component_types().iter().map(|id| id.name()))
            .finish()?;
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

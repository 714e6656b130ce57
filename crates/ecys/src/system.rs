//! Systems: stateful units of behavior run once per tick.
//!
//! A system is any type implementing [`System`]. The type declares which
//! entities it works on through [`System::filter`], an associated function
//! evaluated once when the system is registered with
//! [`World::add_system`](crate::world::World::add_system). Because the filter
//! belongs to the type, every registration of that type shares it, and a type
//! cannot declare two competing filters. Combine clause sets explicitly with
//! [`Filter::and`] or [`Filter::all`].
//!
//! During [`World::update`](crate::world::World::update) each system receives
//! a [`SystemContext`] giving it the filtered entity view and access to the
//! world, plus the update argument forwarded unchanged from the caller.
//!
//! ```
//! use ecys::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! struct Velocity { dx: f32, dy: f32 }
//!
//! struct Movement;
//!
//! impl System for Movement {
//!     fn filter() -> Filter {
//!         Filter::requires::<(Position, Velocity)>()
//!     }
//!
//!     fn update(&mut self, ctx: &mut SystemContext<'_>, _args: &()) -> anyhow::Result<()> {
//!         for id in ctx.entities() {
//!             let entity = ctx.entity_mut(id)?;
//!             let (dx, dy) = {
//!                 let v = entity.get_component::<Velocity>()?;
//!                 (v.dx, v.dy)
//!             };
//!             let pos = entity.get_component_mut::<Position>()?;
//!             pos.x += dx;
//!             pos.y += dy;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut world = World::new();
//! let e = world.create_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 2.0 }));
//! world.add_system(Movement, 0).unwrap();
//! world.update(&()).unwrap();
//!
//! let pos = world.entity(e).unwrap().get_component::<Position>().unwrap();
//! assert_eq!(pos, &Position { x: 1.0, y: 2.0 });
//! ```

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use crate::component::short_type_name;
use crate::entity::{Entity, EntityId, WorldId};
use crate::filter::Filter;
use crate::world::World;
use crate::EcsError;

/// Priority used by [`World::add_system_default`](crate::world::World::add_system_default).
pub const DEFAULT_PRIORITY: i32 = 0;

// ---------------------------------------------------------------------------
// AsAny
// ---------------------------------------------------------------------------

/// Upcast helper so registered systems can be downcast to their concrete type.
pub trait AsAny: Any {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A unit of behavior bound to an entity filter.
///
/// `A` is the argument type of [`World::update`](crate::world::World::update);
/// the world passes the same `&A` to every system in a tick.
pub trait System<A: 'static = ()>: AsAny {
    /// Entities this system type works on. Defaults to every entity.
    fn filter() -> Filter
    where
        Self: Sized,
    {
        Filter::everything()
    }

    /// Name used in logs and error context.
    fn name(&self) -> &'static str {
        short_type_name(type_name::<Self>())
    }

    /// Run one tick of this system.
    fn update(&mut self, ctx: &mut SystemContext<'_, A>, args: &A) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// SystemSlot -- a registry entry
// ---------------------------------------------------------------------------

/// Stable handle of one registration, used to find a slot again after the
/// registry has been re-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SystemKey(pub(crate) u64);

/// A registered system plus the state the world binds to it.
pub(crate) struct SystemSlot<A: 'static> {
    pub(crate) key: SystemKey,
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) priority: i32,
    pub(crate) filter: Arc<Filter>,
    /// `None` while the system is running; it is moved out for the call.
    pub(crate) system: Option<Box<dyn System<A>>>,
}

impl<A: 'static> SystemSlot<A> {
    pub(crate) fn new<S: System<A>>(key: SystemKey, system: S, priority: i32) -> Self {
        let name = system.name();
        Self {
            key,
            type_id: TypeId::of::<S>(),
            name,
            priority,
            filter: Arc::new(S::filter()),
            system: Some(Box::new(system)),
        }
    }

    pub(crate) fn downcast_ref<S: System<A>>(&self) -> Option<&S> {
        let system = self.system.as_deref()?;
        system.as_any().downcast_ref::<S>()
    }

    pub(crate) fn downcast_mut<S: System<A>>(&mut self) -> Option<&mut S> {
        let system = self.system.as_deref_mut()?;
        system.as_any_mut().downcast_mut::<S>()
    }
}

// ---------------------------------------------------------------------------
// SystemContext
// ---------------------------------------------------------------------------

/// What a running system sees of the world during one tick.
///
/// Registry edits made through [`world_mut`](Self::world_mut) while a tick is
/// running (`add_system`, `remove_system`) are queued and applied after the
/// last system of the tick has run.
pub struct SystemContext<'w, A: 'static = ()> {
    world: &'w mut World<A>,
    filter: Arc<Filter>,
    name: &'static str,
    priority: i32,
}

impl<'w, A: 'static> SystemContext<'w, A> {
    pub(crate) fn new(
        world: &'w mut World<A>,
        filter: Arc<Filter>,
        name: &'static str,
        priority: i32,
    ) -> Self {
        Self {
            world,
            filter,
            name,
            priority,
        }
    }

    /// Live entities matching this system's filter, in ascending id order.
    ///
    /// The result is a snapshot: entities created while iterating it are not
    /// included, and entities marked for deferred deletion still are.
    pub fn entities(&self) -> Vec<EntityId> {
        self.world.filtered_entities(Some(self.filter.as_ref()))
    }

    /// Borrow a live entity.
    pub fn entity(&self, id: EntityId) -> Result<&Entity, EcsError> {
        self.world
            .entity(id)
            .ok_or(EcsError::EntityNotFound { entity: id })
    }

    /// Mutably borrow a live entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, EcsError> {
        self.world
            .entity_mut(id)
            .ok_or(EcsError::EntityNotFound { entity: id })
    }

    /// Shared access to the world.
    pub fn world(&self) -> &World<A> {
        &*self.world
    }

    /// Exclusive access to the world.
    pub fn world_mut(&mut self) -> &mut World<A> {
        &mut *self.world
    }

    /// Id of the world running this system.
    pub fn world_id(&self) -> WorldId {
        self.world.id()
    }

    /// The filter bound to this system at registration.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Name of the running system.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Priority the running system was registered with.
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

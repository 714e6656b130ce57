//! ecys -- a minimal Entity Component System.
//!
//! A [`World`](world::World) owns entities and systems. Each
//! [`Entity`](entity::Entity) holds at most one component per Rust type. Each
//! [`System`](system::System) declares a [`Filter`](filter::Filter) on its
//! type and is run once per [`World::update`](world::World::update) over the
//! entities that match it, highest priority first. Deleting an entity is
//! either immediate or deferred to the start of the next update.
//!
//! # Quick Start
//!
//! ```
//! use ecys::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new();
//! let still = world.create_entity((Position { x: 0.0, y: 0.0 },));
//! let moving = world.create_entity((
//!     Position { x: 0.0, y: 0.0 },
//!     Velocity { dx: 1.0, dy: 0.0 },
//! ));
//!
//! assert_eq!(world.entities_with::<(Position, Velocity)>(), vec![moving]);
//! assert_eq!(world.filtered_entities(Some(&Filter::excludes::<(Velocity,)>())), vec![still]);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod filter;
pub mod system;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
///
/// Every variant is a precondition violation reported before any state
/// changes. Looking up or removing a system that is not registered is not an
/// error; see [`World::get_system`](world::World::get_system) and
/// [`World::remove_system`](world::World::remove_system).
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not hold a component of the requested type.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: entity::EntityId,
        component: &'static str,
    },

    /// The entity is not live in this world (never created, or already
    /// deleted).
    #[error("entity {entity} does not exist in this world")]
    EntityNotFound { entity: entity::EntityId },

    /// A system type was queried that is not registered with the world.
    #[error("system `{system}` is not registered with a world")]
    NotRegistered { system: &'static str },

    /// The system cannot be registered: a system of the same concrete type is
    /// already registered.
    #[error("system `{system}` cannot be registered: a system of this type is already registered")]
    InvalidSystemType { system: &'static str },

    /// `World::update` was called from inside a running system.
    #[error("world update called while a tick is already running")]
    TickInProgress,
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Bundle, Component, ComponentBundle, ComponentRef, ComponentSet, ComponentTypeId};
    pub use crate::entity::{Entity, EntityId, WorldId};
    pub use crate::filter::{Clause, Filter};
    pub use crate::system::{System, SystemContext, DEFAULT_PRIORITY};
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

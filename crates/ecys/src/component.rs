//! Component types and type-keyed component sets.
//!
//! Any `'static + Send + Sync` type is a [`Component`]. There is nothing to
//! register: the Rust [`TypeId`] of the value is the key used for entity
//! storage and for filtering. [`ComponentTypeId`] wraps that key together with
//! a short, human-readable name for diagnostics.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker trait for component data. Implemented for every eligible type.
pub trait Component: Any + Send + Sync {}

impl<T: Any + Send + Sync> Component for T {}

/// Type-erased, owned component value as stored on an entity.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Identifier of a component type.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried along
/// for `Debug` output and error messages.
#[derive(Clone, Copy)]
pub struct ComponentTypeId {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentTypeId {
    /// The identifier of component type `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(type_name::<T>()),
        }
    }

    /// The underlying Rust `TypeId`.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Short type name, without the module path (`"Position"`).
    #[inline]
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentTypeId {}

impl Hash for ComponentTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.name)
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strip the module path from a `std::any::type_name` string:
/// `game::Pos` becomes `Pos`, `game::Wrapper<game::Pos>` becomes
/// `Wrapper<game::Pos>`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    // Only the outermost path is stripped so the result can stay `'static`.
    if full.starts_with(['(', '[', '&', '*']) {
        return full;
    }
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

// ---------------------------------------------------------------------------
// ComponentRef
// ---------------------------------------------------------------------------

/// Read-only view of one component held by an entity.
#[derive(Clone, Copy)]
pub struct ComponentRef<'a> {
    type_id: ComponentTypeId,
    value: &'a (dyn Any + Send + Sync),
}

impl<'a> ComponentRef<'a> {
    pub(crate) fn new(type_id: ComponentTypeId, value: &'a (dyn Any + Send + Sync)) -> Self {
        Self { type_id, value }
    }

    /// The component's type identifier.
    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Short name of the component type.
    pub fn name(&self) -> &'static str {
        self.type_id.name()
    }

    /// Downcast to the concrete component type.
    pub fn downcast_ref<T: Component>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether the component is of type `T`.
    pub fn is<T: Component>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id.name())
    }
}

// ---------------------------------------------------------------------------
// ComponentSet -- a tuple of component *types*
// ---------------------------------------------------------------------------

/// A statically known list of component types, written as a tuple:
/// `()`, `(Position,)`, `(Position, Velocity)`, ...
///
/// Used by [`Filter::requires`](crate::filter::Filter::requires),
/// [`Filter::excludes`](crate::filter::Filter::excludes),
/// [`Entity::has_components`](crate::entity::Entity::has_components) and
/// [`World::entities_with`](crate::world::World::entities_with).
pub trait ComponentSet {
    /// The type identifiers in declaration order.
    fn type_ids() -> Vec<ComponentTypeId>;
}

// ---------------------------------------------------------------------------
// Bundle -- a tuple of component *values*
// ---------------------------------------------------------------------------

/// A group of component values moved onto a new entity by
/// [`World::create_entity`](crate::world::World::create_entity).
///
/// If the same type appears more than once, the last value wins, matching
/// [`Entity::add_component`](crate::entity::Entity::add_component).
pub trait Bundle {
    /// Consume the bundle into `(type, value)` pairs.
    fn into_components(self) -> Vec<(ComponentTypeId, BoxedComponent)>;
}

macro_rules! impl_component_tuples {
    ($($name:ident),*) => {
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$(ComponentTypeId::of::<$name>()),*]
            }
        }

        impl<$($name: Component),*> Bundle for ($($name,)*) {
            #[allow(non_snake_case)]
            fn into_components(self) -> Vec<(ComponentTypeId, BoxedComponent)> {
                let ($($name,)*) = self;
                vec![$((ComponentTypeId::of::<$name>(), Box::new($name) as BoxedComponent)),*]
            }
        }
    };
}

impl_component_tuples!();
impl_component_tuples!(A);
impl_component_tuples!(A, B);
impl_component_tuples!(A, B, C);
impl_component_tuples!(A, B, C, D);
impl_component_tuples!(A, B, C, D, E);
impl_component_tuples!(A, B, C, D, E, F);
impl_component_tuples!(A, B, C, D, E, F, G);
impl_component_tuples!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// ComponentBundle -- runtime-built bundle
// ---------------------------------------------------------------------------

/// A bundle assembled at runtime, for when the component list is not known
/// statically.
///
/// ```
/// use ecys::prelude::*;
///
/// struct Position(f32, f32);
/// struct Frozen;
///
/// let mut bundle = ComponentBundle::new();
/// bundle.add(Position(0.0, 0.0));
/// bundle.add(Frozen);
///
/// let mut world = World::new();
/// let e = world.create_entity(bundle);
/// assert!(world.entity(e).unwrap().has_components::<(Position, Frozen)>());
/// ```
#[derive(Default)]
pub struct ComponentBundle {
    entries: Vec<(ComponentTypeId, BoxedComponent)>,
}

impl ComponentBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a component. Returns `self` for chaining.
    pub fn add<T: Component>(&mut self, value: T) -> &mut Self {
        self.entries
            .push((ComponentTypeId::of::<T>(), Box::new(value)));
        self
    }

    /// Builder-style variant of [`add`](Self::add).
    pub fn with<T: Component>(mut self, value: T) -> Self {
        self.add(value);
        self
    }

    /// Number of queued components (duplicates included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Bundle for ComponentBundle {
    fn into_components(self) -> Vec<(ComponentTypeId, BoxedComponent)> {
        self.entries
    }
}

impl fmt::Debug for ComponentBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Vel {
        dx: f32,
        dy: f32,
    }

    struct Wrapper<T>(T);

    #[test]
    fn same_type_same_id() {
        assert_eq!(ComponentTypeId::of::<Pos>(), ComponentTypeId::of::<Pos>());
        assert_ne!(ComponentTypeId::of::<Pos>(), ComponentTypeId::of::<Vel>());
    }

    #[test]
    fn names_are_short() {
        assert_eq!(ComponentTypeId::of::<Pos>().name(), "Pos");
        assert_eq!(ComponentTypeId::of::<u32>().name(), "u32");
        assert!(ComponentTypeId::of::<Wrapper<Pos>>().name().starts_with("Wrapper<"));
    }

    #[test]
    fn component_set_lists_types_in_order() {
        assert!(<() as ComponentSet>::type_ids().is_empty());
        assert_eq!(
            <(Pos, Vel) as ComponentSet>::type_ids(),
            vec![ComponentTypeId::of::<Pos>(), ComponentTypeId::of::<Vel>()]
        );
    }

    #[test]
    fn tuple_bundle_moves_values() {
        let parts = (Pos { x: 1.0, y: 2.0 }, Vel { dx: 3.0, dy: 4.0 }).into_components();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, ComponentTypeId::of::<Pos>());
        assert_eq!(
            parts[1].1.downcast_ref::<Vel>(),
            Some(&Vel { dx: 3.0, dy: 4.0 })
        );
    }

    #[test]
    fn runtime_bundle_keeps_duplicates_for_later_overwrite() {
        let bundle = ComponentBundle::new()
            .with(Pos { x: 0.0, y: 0.0 })
            .with(Pos { x: 5.0, y: 5.0 });
        assert_eq!(bundle.len(), 2);
        assert_eq!(format!("{bundle:?}"), "[\"Pos\", \"Pos\"]");
    }
}

//! Entity filters built from typed clauses.
//!
//! A [`Filter`] is a pure predicate over an entity's component set. It is
//! composed from [`Clause`]s:
//!
//! - [`Clause::Require`]: the entity holds every listed type.
//! - [`Clause::Exclude`]: the entity holds none of the listed types.
//! - [`Clause::All`]: every nested clause holds.
//!
//! An empty type list or an empty `All` is always true, and a filter without
//! any clause matches every entity.
//!
//! ```
//! use ecys::prelude::*;
//!
//! struct Position;
//! struct Velocity;
//! struct Frozen;
//!
//! let moving = Filter::requires::<(Position, Velocity)>()
//!     .and(Filter::excludes::<(Frozen,)>());
//!
//! let mut world = World::new();
//! let a = world.create_entity((Position, Velocity));
//! let _b = world.create_entity((Position, Velocity, Frozen));
//! let _c = world.create_entity((Position,));
//!
//! assert_eq!(world.filtered_entities(Some(&moving)), vec![a]);
//! ```

use crate::component::{ComponentSet, ComponentTypeId};
use crate::entity::Entity;

// ---------------------------------------------------------------------------
// Clause
// ---------------------------------------------------------------------------

/// One node of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Entity holds every listed component type.
    Require(Vec<ComponentTypeId>),
    /// Entity holds none of the listed component types.
    Exclude(Vec<ComponentTypeId>),
    /// Every nested clause holds.
    All(Vec<Clause>),
}

impl Clause {
    /// Evaluate the clause against `entity`.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Clause::Require(types) => entity.has_all(types),
            Clause::Exclude(types) => !entity.has_any(types),
            Clause::All(clauses) => clauses.iter().all(|c| c.matches(entity)),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A composable, side-effect-free entity predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clause: Option<Clause>,
}

impl Filter {
    /// A filter that matches every entity.
    pub fn everything() -> Self {
        Self { clause: None }
    }

    /// Entities holding every type in `S`.
    pub fn requires<S: ComponentSet>() -> Self {
        Self::from_clause(Clause::Require(S::type_ids()))
    }

    /// Entities holding none of the types in `S`.
    pub fn excludes<S: ComponentSet>() -> Self {
        Self::from_clause(Clause::Exclude(S::type_ids()))
    }

    /// Entities matched by every filter in `filters`.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        let clauses: Vec<Clause> = filters.into_iter().filter_map(|f| f.clause).collect();
        Self::from_clause(Clause::All(clauses))
    }

    /// Wrap a hand-built clause tree.
    pub fn from_clause(clause: Clause) -> Self {
        Self {
            clause: Some(clause),
        }
    }

    /// Combine with `other`; both must match.
    pub fn and(self, other: Filter) -> Self {
        match (self.clause, other.clause) {
            (None, rhs) => Self { clause: rhs },
            (lhs, None) => Self { clause: lhs },
            (Some(Clause::All(mut lhs)), Some(Clause::All(rhs))) => {
                lhs.extend(rhs);
                Self::from_clause(Clause::All(lhs))
            }
            (Some(Clause::All(mut lhs)), Some(rhs)) => {
                lhs.push(rhs);
                Self::from_clause(Clause::All(lhs))
            }
            (Some(lhs), Some(rhs)) => Self::from_clause(Clause::All(vec![lhs, rhs])),
        }
    }

    /// The clause tree, or `None` for a match-everything filter.
    pub fn clause(&self) -> Option<&Clause> {
        self.clause.as_ref()
    }

    /// Whether this filter matches every entity without inspecting it.
    pub fn is_everything(&self) -> bool {
        self.clause.is_none()
    }

    /// Evaluate the filter against `entity`.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.clause.as_ref().map_or(true, |c| c.matches(entity))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

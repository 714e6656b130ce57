//! Property tests for ECS operations.
//!
//! These tests use `proptest` to generate random sequences of world
//! operations and check the filter and lifecycle invariants after each step
//! against a simple shadow model.

use std::collections::{BTreeMap, BTreeSet};

use ecys::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Pos(i32);

#[derive(Debug, Clone, PartialEq)]
struct Vel(i32);

#[derive(Debug, Clone, PartialEq)]
struct Tag;

/// Which of the three component types an entity holds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Shape {
    pos: bool,
    vel: bool,
    tag: bool,
}

/// Operations we can perform on the world.
#[derive(Debug, Clone)]
enum EcsOp {
    Create { pos: bool, vel: bool, tag: bool },
    Delete(usize),
    DeleteNow(usize),
    AddVel(usize),
    RemoveVel(usize),
    AddTag(usize),
    Update,
    Clear,
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        4 => (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(pos, vel, tag)| EcsOp::Create { pos, vel, tag }),
        1 => (0..64usize).prop_map(EcsOp::Delete),
        1 => (0..64usize).prop_map(EcsOp::DeleteNow),
        2 => (0..64usize).prop_map(EcsOp::AddVel),
        2 => (0..64usize).prop_map(EcsOp::RemoveVel),
        1 => (0..64usize).prop_map(EcsOp::AddTag),
        2 => Just(EcsOp::Update),
        1 => Just(EcsOp::Clear),
    ]
}

fn pick(model: &BTreeMap<EntityId, Shape>, idx: usize) -> Option<EntityId> {
    if model.is_empty() {
        return None;
    }
    model.keys().nth(idx % model.len()).copied()
}

fn expected(model: &BTreeMap<EntityId, Shape>, pred: impl Fn(&Shape) -> bool) -> Vec<EntityId> {
    model
        .iter()
        .filter(|(_, shape)| pred(shape))
        .map(|(id, _)| *id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn filters_agree_with_shadow_model(ops in prop::collection::vec(ecs_op_strategy(), 1..60)) {
        let mut world = World::new();
        let mut model: BTreeMap<EntityId, Shape> = BTreeMap::new();
        let mut pending: BTreeSet<EntityId> = BTreeSet::new();

        for op in ops {
            match op {
                EcsOp::Create { pos, vel, tag } => {
                    let mut bundle = ComponentBundle::new();
                    if pos { bundle.add(Pos(0)); }
                    if vel { bundle.add(Vel(1)); }
                    if tag { bundle.add(Tag); }
                    let id = world.create_entity(bundle);
                    if let Some(last) = model.keys().next_back() {
                        prop_assert!(id > *last, "ids must grow strictly");
                    }
                    model.insert(id, Shape { pos, vel, tag });
                }
                EcsOp::Delete(idx) => {
                    if let Some(id) = pick(&model, idx) {
                        world.delete_entity(id).unwrap();
                        pending.insert(id);
                    }
                }
                EcsOp::DeleteNow(idx) => {
                    if let Some(id) = pick(&model, idx) {
                        world.delete_entity_immediate(id).unwrap();
                        model.remove(&id);
                        pending.remove(&id);
                        prop_assert!(world.delete_entity_immediate(id).is_err());
                    }
                }
                EcsOp::AddVel(idx) => {
                    if let Some(id) = pick(&model, idx) {
                        world.entity_mut(id).unwrap().add_component(Vel(2));
                        model.get_mut(&id).unwrap().vel = true;
                    }
                }
                EcsOp::RemoveVel(idx) => {
                    if let Some(id) = pick(&model, idx) {
                        let shape = model.get_mut(&id).unwrap();
                        let result = world.entity_mut(id).unwrap().remove_component::<Vel>();
                        prop_assert_eq!(result.is_ok(), shape.vel);
                        shape.vel = false;
                    }
                }
                EcsOp::AddTag(idx) => {
                    if let Some(id) = pick(&model, idx) {
                        world.entity_mut(id).unwrap().add_component(Tag);
                        model.get_mut(&id).unwrap().tag = true;
                    }
                }
                EcsOp::Update => {
                    world.update(&()).unwrap();
                    for id in std::mem::take(&mut pending) {
                        model.remove(&id);
                    }
                }
                EcsOp::Clear => {
                    world.clear();
                    model.clear();
                    pending.clear();
                }
            }

            prop_assert_eq!(world.entity_count(), model.len());
            prop_assert_eq!(world.filtered_entities(None), expected(&model, |_| true));
            prop_assert_eq!(
                world.filtered_entities(Some(&Filter::requires::<(Pos, Vel)>())),
                expected(&model, |s| s.pos && s.vel)
            );
            prop_assert_eq!(
                world.entities_with::<(Pos, Vel)>(),
                expected(&model, |s| s.pos && s.vel)
            );
            prop_assert_eq!(
                world.filtered_entities(Some(&Filter::excludes::<(Tag,)>())),
                expected(&model, |s| !s.tag)
            );
            prop_assert_eq!(
                world.filtered_entities(Some(
                    &Filter::requires::<(Pos,)>().and(Filter::excludes::<(Vel, Tag)>())
                )),
                expected(&model, |s| s.pos && !s.vel && !s.tag)
            );
            for id in &pending {
                prop_assert!(world.is_alive(*id), "pending entities stay live until update");
            }
        }
    }

    #[test]
    fn component_round_trip(value in any::<i32>()) {
        let mut world = World::new();
        let id = world.create_entity(());
        let entity = world.entity_mut(id).unwrap();

        entity.add_component(Pos(value));
        prop_assert_eq!(entity.get_component::<Pos>().unwrap(), &Pos(value));
        prop_assert!(entity.has_component::<Pos>());

        prop_assert_eq!(entity.remove_component::<Pos>().unwrap(), Pos(value));
        prop_assert!(!entity.has_component::<Pos>());
        let is_missing = matches!(
            entity.remove_component::<Pos>(),
            Err(EcsError::MissingComponent { .. })
        );
        prop_assert!(is_missing);
        prop_assert!(entity.has_components::<()>());
    }
}

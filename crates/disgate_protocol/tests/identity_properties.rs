//! Property tests: the identity map stays a set of 1:1 tuples under any
//! sequence of puts and removals, and agrees with a naive reference model.

use disgate_protocol::{ActorId, EntityIdentifier, EntityIdentityMap, WireObjectHandle};
use proptest::prelude::*;
use std::collections::HashMap;

const ACTORS: usize = 4;
const LEGS: u16 = 6;

#[derive(Debug, Clone, Copy)]
enum Op {
    PutHandle(usize, u16),
    PutEntity(u16, usize),
    PutName(u16, usize),
    RemoveHandle(u16),
    RemoveEntity(u16),
    RemoveName(u16),
    RemoveActor(usize),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let actor = 0..ACTORS;
    let leg = 0..LEGS;
    prop_oneof![
        4 => (actor.clone(), leg.clone()).prop_map(|(a, h)| Op::PutHandle(a, h)),
        4 => (leg.clone(), actor.clone()).prop_map(|(e, a)| Op::PutEntity(e, a)),
        3 => (leg.clone(), actor.clone()).prop_map(|(n, a)| Op::PutName(n, a)),
        2 => leg.clone().prop_map(Op::RemoveHandle),
        2 => leg.clone().prop_map(Op::RemoveEntity),
        1 => leg.prop_map(Op::RemoveName),
        2 => actor.prop_map(Op::RemoveActor),
        1 => Just(Op::Clear),
    ]
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Legs {
    handle: Option<u16>,
    entity: Option<u16>,
    name: Option<u16>,
}

/// Reference model: one record per actor, uniqueness checked by scanning.
#[derive(Debug, Default)]
struct Model {
    records: HashMap<usize, Legs>,
}

impl Model {
    fn owner(&self, pick: impl Fn(&Legs) -> Option<u16>, value: u16) -> Option<usize> {
        self.records.iter().find(|(_, legs)| pick(legs) == Some(value)).map(|(a, _)| *a)
    }

    fn put(&mut self, actor: usize, value: u16, pick: fn(&Legs) -> Option<u16>, set: fn(&mut Legs, u16)) -> bool {
        match self.owner(pick, value) {
            Some(owner) => owner == actor,
            None => {
                let legs = self.records.entry(actor).or_default();
                if pick(legs).is_some() {
                    return false;
                }
                set(legs, value);
                true
            }
        }
    }

    fn remove_owner_of(&mut self, pick: fn(&Legs) -> Option<u16>, value: u16) {
        if let Some(owner) = self.owner(pick, value) {
            self.records.remove(&owner);
        }
    }
}

fn handle(n: u16) -> WireObjectHandle {
    WireObjectHandle(u32::from(n))
}

fn entity(n: u16) -> EntityIdentifier {
    EntityIdentifier::new(1, 1, n)
}

fn name(n: u16) -> String {
    format!("object-{}", n)
}

proptest! {
    #[test]
    fn prop_map_matches_reference_model(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let actors: Vec<ActorId> = (0..ACTORS).map(|_| ActorId::new()).collect();
        let mut map = EntityIdentityMap::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::PutHandle(a, h) => {
                    let expected = model.put(a, h, |l| l.handle, |l, v| l.handle = Some(v));
                    prop_assert_eq!(map.put_wire_handle(actors[a], handle(h)), expected, "{:?}", op);
                }
                Op::PutEntity(e, a) => {
                    let expected = model.put(a, e, |l| l.entity, |l, v| l.entity = Some(v));
                    prop_assert_eq!(map.put_entity_id(entity(e), actors[a]), expected, "{:?}", op);
                }
                Op::PutName(n, a) => {
                    let expected = model.put(a, n, |l| l.name, |l, v| l.name = Some(v));
                    prop_assert_eq!(map.put_object_name(name(n), actors[a]), expected, "{:?}", op);
                }
                Op::RemoveHandle(h) => {
                    model.remove_owner_of(|l| l.handle, h);
                    map.remove_by_wire_handle(&handle(h));
                }
                Op::RemoveEntity(e) => {
                    model.remove_owner_of(|l| l.entity, e);
                    map.remove_by_entity_id(&entity(e));
                }
                Op::RemoveName(n) => {
                    model.remove_owner_of(|l| l.name, n);
                    map.remove_by_object_name(&name(n));
                }
                Op::RemoveActor(a) => {
                    model.records.remove(&a);
                    map.remove_by_actor(&actors[a]);
                }
                Op::Clear => {
                    model.records.clear();
                    map.clear();
                }
            }

            prop_assert_eq!(map.len(), model.records.len());
            for (index, actor) in actors.iter().enumerate() {
                let legs = model.records.get(&index).copied().unwrap_or_default();
                prop_assert_eq!(map.get_wire_handle(actor), legs.handle.map(handle));
                prop_assert_eq!(map.get_entity_id(actor), legs.entity.map(entity));
                prop_assert_eq!(map.get_object_name(actor).map(str::to_string), legs.name.map(name));
            }
            for n in 0..LEGS {
                let by_handle = model.owner(|l| l.handle, n).map(|a| actors[a]);
                let by_entity = model.owner(|l| l.entity, n).map(|a| actors[a]);
                let by_name = model.owner(|l| l.name, n).map(|a| actors[a]);
                prop_assert_eq!(map.get_actor_by_wire_handle(&handle(n)), by_handle);
                prop_assert_eq!(map.get_actor_by_entity_id(&entity(n)), by_entity);
                prop_assert_eq!(map.get_actor_by_object_name(&name(n)), by_name);
            }
        }
    }

    #[test]
    fn prop_every_leg_resolves_back_to_its_actor(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let actors: Vec<ActorId> = (0..ACTORS).map(|_| ActorId::new()).collect();
        let mut map = EntityIdentityMap::new();

        for op in ops {
            match op {
                Op::PutHandle(a, h) => { map.put_wire_handle(actors[a], handle(h)); }
                Op::PutEntity(e, a) => { map.put_entity_id(entity(e), actors[a]); }
                Op::PutName(n, a) => { map.put_object_name(name(n), actors[a]); }
                Op::RemoveHandle(h) => { map.remove_by_wire_handle(&handle(h)); }
                Op::RemoveEntity(e) => { map.remove_by_entity_id(&entity(e)); }
                Op::RemoveName(n) => { map.remove_by_object_name(&name(n)); }
                Op::RemoveActor(a) => { map.remove_by_actor(&actors[a]); }
                Op::Clear => map.clear(),
            }
        }

        let mut seen = Vec::new();
        map.get_all_actor_ids(&mut seen);
        prop_assert_eq!(seen.len(), map.iter().count());

        for binding in map.iter() {
            prop_assert_eq!(map.binding(&binding.actor), Some(binding));
            if let Some(h) = binding.wire_handle {
                prop_assert_eq!(map.get_actor_by_wire_handle(&h), Some(binding.actor));
            }
            if let Some(e) = binding.entity_id {
                prop_assert_eq!(map.get_actor_by_entity_id(&e), Some(binding.actor));
            }
            if let Some(n) = &binding.object_name {
                prop_assert_eq!(map.get_actor_by_object_name(n), Some(binding.actor));
            }
        }
    }
}

#[test]
fn put_conflict_keeps_first_handle() {
    let mut map = EntityIdentityMap::new();
    let actor_a = ActorId::new();

    assert!(map.put_wire_handle(actor_a, WireObjectHandle(1)));
    assert!(!map.put_wire_handle(actor_a, WireObjectHandle(2)));
    assert_eq!(map.get_wire_handle(&actor_a), Some(WireObjectHandle(1)));
}

#[test]
fn remove_twice_leaves_map_unchanged() {
    let mut map = EntityIdentityMap::new();
    let kept = ActorId::new();
    let gone = ActorId::new();
    map.put_entity_id(EntityIdentifier::new(1, 1, 1), kept);
    map.put_entity_id(EntityIdentifier::new(1, 1, 2), gone);

    map.remove_by_entity_id(&EntityIdentifier::new(1, 1, 2));
    let after_first: Vec<_> = map.iter().cloned().collect();
    assert!(map.remove_by_entity_id(&EntityIdentifier::new(1, 1, 2)).is_none());
    let after_second: Vec<_> = map.iter().cloned().collect();

    assert_eq!(after_first, after_second);
    assert_eq!(map.all_actor_ids(), vec![kept]);
}

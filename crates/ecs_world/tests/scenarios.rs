use ecs_world::{Command, Component, ComponentId, EcsError, Filter, World, WorldConfig};

#[derive(Debug, Clone, PartialEq)]
struct Position(f32, f32);
impl Component for Position {}

#[derive(Debug, Clone, PartialEq)]
struct Velocity(f32, f32);
impl Component for Velocity {}

#[derive(Debug, Clone, PartialEq)]
struct A(u32);
impl Component for A {}

#[derive(Debug, Clone, PartialEq)]
struct B(u32);
impl Component for B {}

#[derive(Debug, Clone, PartialEq)]
struct C(u32);
impl Component for C {}

#[test]
fn test_position_velocity_roundtrip() {
    let world = World::new();
    let e = world
        .create_entity((Position(0.0, 0.0), Velocity(1.0, 1.0)))
        .unwrap();
    assert_eq!(world.get_component::<Position>(e).unwrap(), Position(0.0, 0.0));
    assert_eq!(world.get_component::<Velocity>(e).unwrap(), Velocity(1.0, 1.0));
}

#[test]
fn test_include_and_exclude_counts() {
    let world = World::new();
    world.create_entity((A(1), B(1))).unwrap();
    world.create_entity((A(2), B(2))).unwrap();
    world.create_entity((A(3), C(3))).unwrap();

    let a = world.component_id::<A>().unwrap();
    let b = world.component_id::<B>().unwrap();
    let c = world.component_id::<C>().unwrap();

    assert_eq!(Filter::new().include(a).count(&world), 3);
    assert_eq!(Filter::new().include(a).include(b).count(&world), 2);
    assert_eq!(Filter::new().include(a).exclude(c).count(&world), 2);
    assert_eq!(Filter::new().exclude(c).count(&world), 0);
}

#[test]
fn test_filter_rows_follow_component_id_order() {
    let world = World::new();
    let a = world.register::<A>().unwrap();
    let b = world.register::<B>().unwrap();
    assert!(a < b);
    // Bundle order is the reverse of id order.
    let e = world.create_entity((B(20), A(10))).unwrap();

    let mut visited = Vec::new();
    Filter::new()
        .include(b)
        .include(a)
        .query(&world)
        .for_each_row(|mut row| {
            assert_eq!(row.len(), 2);
            row.get_mut::<A>(0).unwrap().0 += 1;
            visited.push((row.entity(), row.get::<B>(1).unwrap().clone()));
        });

    assert_eq!(visited, vec![(e, B(20))]);
    assert_eq!(world.get_component::<A>(e).unwrap(), A(11));
}

#[test]
fn test_batches_visit_archetypes_in_id_order() {
    let world = World::new();
    world.create_entity((A(0), C(0))).unwrap();
    world.create_entity((A(0),)).unwrap();
    world.create_entity((A(0), B(0))).unwrap();

    let a = world.component_id::<A>().unwrap();
    let ids: Vec<_> = Filter::new()
        .include(a)
        .query(&world)
        .map(|batch| batch.archetype())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_typed_query_mutates_in_place() {
    let world = World::new();
    let moving = world
        .create_entity((Position(0.0, 0.0), Velocity(1.0, 2.0)))
        .unwrap();
    let frozen = world
        .create_entity((Position(5.0, 5.0), Velocity(1.0, 1.0), C(0)))
        .unwrap();

    for mut batch in world.query::<(Position, Velocity)>().without::<C>() {
        for (_entity, (pos, vel)) in batch.iter_mut() {
            pos.0 += vel.0;
            pos.1 += vel.1;
        }
    }

    assert_eq!(world.get_component::<Position>(moving).unwrap(), Position(1.0, 2.0));
    assert_eq!(world.get_component::<Position>(frozen).unwrap(), Position(5.0, 5.0));
    assert_eq!(world.query::<(Position,)>().count(), 2);
}

#[test]
fn test_typed_query_with_unregistered_type_is_empty() {
    let world = World::new();
    world.create_entity((A(1),)).unwrap();
    assert_eq!(world.query::<(A, Velocity)>().count(), 0);
    assert_eq!(world.query::<(A,)>().with::<Velocity>().count(), 0);
    assert_eq!(world.query::<(A,)>().without::<Velocity>().count(), 1);
    assert!(world.query::<(A, Velocity)>().into_iter().next().is_none());
}

#[test]
fn test_same_component_set_shares_one_archetype() {
    let world = World::new();
    for i in 0..10 {
        if i % 2 == 0 {
            world.create_entity((A(i), B(i))).unwrap();
        } else {
            world.create_entity((B(i), A(i))).unwrap();
        }
    }
    world.create_entity((A(0),)).unwrap();
    world.create_entity((A(0), B(0), C(0))).unwrap();
    assert_eq!(world.archetype_count(), 3);

    let sizes: Vec<_> = world.archetypes().iter().map(|a| a.len).collect();
    assert_eq!(sizes, vec![10, 1, 1]);
}

#[test]
fn test_fingerprint_collision_keeps_archetypes_apart() {
    // Ids 17 and 64 fold to the same fingerprint.
    let world = World::new();
    world.register_as::<A>(ComponentId::new(17).unwrap()).unwrap();
    world.register_as::<B>(ComponentId::new(64).unwrap()).unwrap();

    let a = world.create_entity((A(1),)).unwrap();
    let b = world.create_entity((B(2),)).unwrap();
    assert_eq!(world.archetype_count(), 2);
    assert_ne!(world.location(a).unwrap().archetype, world.location(b).unwrap().archetype);
    assert_eq!(world.get_component::<B>(b).unwrap(), B(2));
}

#[test]
fn test_register_as_conflicts() {
    let world = World::new();
    let id = ComponentId::new(3).unwrap();
    world.register_as::<A>(id).unwrap();
    assert_eq!(world.register_as::<A>(id), Ok(id));
    assert!(matches!(
        world.register_as::<B>(id),
        Err(EcsError::ComponentIdInUse { .. })
    ));
    assert!(ComponentId::new(256).is_err());
}

#[test]
fn test_structural_changes_deferred_from_query() {
    let world = World::new();
    for i in 0..4 {
        world.create_entity((A(i),)).unwrap();
    }
    for mut batch in world.query::<(A,)>() {
        for (entity, (a,)) in batch.iter_mut() {
            if a.0 % 2 == 0 {
                world.defer(Command::insert(entity, B(a.0)));
            } else {
                world.defer(Command::despawn(entity));
            }
        }
    }
    assert_eq!(world.apply_commands(), 4);
    assert_eq!(world.entity_count(), 2);
    assert_eq!(world.query::<(A, B)>().count(), 2);
}

#[test]
fn test_accessor_inside_visit_reports_archetype_in_use() {
    let world = World::new();
    let e = world
        .create_entity((Position(0.0, 0.0), Velocity(1.0, 2.0)))
        .unwrap();
    let p = world.component_id::<Position>().unwrap();
    let archetype = world.location(e).unwrap().archetype;

    let mut seen = Vec::new();
    Filter::new().include(p).query(&world).for_each_row(|row| {
        seen.push(world.get_component::<Velocity>(row.entity()));
        seen.push(world.with_component_mut::<Velocity, _>(row.entity(), |v| v.clone()));
        world.defer(Command::insert(row.entity(), A(1)));
        assert_eq!(Filter::new().include(p).count(&world), 1);
        assert_eq!(Filter::new().include(p).entities(&world), vec![row.entity()]);
    });
    assert_eq!(seen, vec![Err(EcsError::ArchetypeInUse { archetype }); 2]);

    assert_eq!(world.apply_commands(), 1);
    assert_eq!(world.get_component::<A>(e).unwrap(), A(1));
}

#[test]
fn test_system_updates_matched_entities_through_accessors() {
    let world = World::new();
    let e = world
        .create_entity((Position(0.0, 0.0), Velocity(1.0, 2.0)))
        .unwrap();
    world.create_entity((Position(5.0, 5.0),)).unwrap();
    let p = world.component_id::<Position>().unwrap();
    let v = world.component_id::<Velocity>().unwrap();

    world.add_system(ecs_world::FnSystem::new("movement", move |world: &World, dt: f64| {
        for entity in Filter::new().include(p).include(v).entities(world) {
            let velocity = world.get_component::<Velocity>(entity).unwrap();
            world
                .with_component_mut::<Position, _>(entity, |position| {
                    position.0 += velocity.0 * dt as f32;
                    position.1 += velocity.1 * dt as f32;
                })
                .unwrap();
        }
    }));
    world.update(0.5);
    world.update(0.5);
    assert_eq!(world.get_component::<Position>(e).unwrap(), Position(1.0, 2.0));
}

#[test]
fn test_query_cache_sees_new_archetypes() {
    let world = World::with_config(WorldConfig::default().with_query_cache(true));
    world.create_entity((A(0),)).unwrap();
    let a = world.component_id::<A>().unwrap();
    let filter = Filter::new().include(a);

    assert_eq!(filter.count(&world), 1);
    assert_eq!(filter.count(&world), 1);
    world.create_entity((A(1), B(1))).unwrap();
    assert_eq!(filter.count(&world), 2);

    let stats = world.stats().query_cache;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(world.clear_query_cache(), 1);
}

#[test]
fn test_cache_disabled_gives_same_answers() {
    let cached = World::new();
    let uncached = World::with_config(WorldConfig::default().with_query_cache(false));
    for world in [&cached, &uncached] {
        world.create_entity((A(1), B(1))).unwrap();
        world.create_entity((A(2),)).unwrap();
    }
    for world in [&cached, &uncached] {
        let a = world.component_id::<A>().unwrap();
        let b = world.component_id::<B>().unwrap();
        assert_eq!(Filter::new().include(a).exclude(b).count(world), 1);
    }
    assert_eq!(uncached.stats().query_cache.misses, 0);
}

//! Headless demo: a handful of particles drifting under a fixed timestep.
//!
//! Run with `RUST_LOG=debug` to see per-tick spans and registry events.

use ecys_engine::prelude::*;

#[derive(Debug)]
struct Position {
    x: f64,
    y: f64,
}

struct Velocity {
    dx: f64,
    dy: f64,
}

/// Ticks left before a particle fades out.
struct Fade(u32);

struct Drift;

impl System<Tick> for Drift {
    fn filter() -> Filter {
        Filter::requires::<(Position, Velocity)>()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_, Tick>, tick: &Tick) -> anyhow::Result<()> {
        for id in ctx.entities() {
            let entity = ctx.entity_mut(id)?;
            let (dx, dy) = {
                let v = entity.get_component::<Velocity>()?;
                (v.dx, v.dy)
            };
            let pos = entity.get_component_mut::<Position>()?;
            pos.x += dx * tick.dt;
            pos.y += dy * tick.dt;
        }
        Ok(())
    }
}

struct Fading;

impl System<Tick> for Fading {
    fn filter() -> Filter {
        Filter::requires::<(Fade,)>()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_, Tick>, tick: &Tick) -> anyhow::Result<()> {
        for id in ctx.entities() {
            let fade = ctx.entity_mut(id)?.get_component_mut::<Fade>()?;
            if fade.0 == 0 {
                tracing::info!(entity = %id, tick = tick.index, "particle faded");
                ctx.world_mut().delete_entity(id)?;
            } else {
                fade.0 -= 1;
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let config = TickConfig::from_json(r#"{ "fixed_dt": 0.1 }"#)?;
    let mut tick_loop = TickLoop::new(World::default(), config)?;

    let world = tick_loop.world_mut();
    for i in 0..5u32 {
        let mut bundle = ComponentBundle::new()
            .with(Position { x: 0.0, y: f64::from(i) })
            .with(Velocity { dx: 1.0 + f64::from(i), dy: 0.0 });
        if i % 2 == 1 {
            bundle.add(Fade(i * 3));
        }
        world.create_entity(bundle);
    }

    tick_loop.add_system(Fading, 10)?;
    tick_loop.add_system(Drift, 0)?;
    tick_loop.run_ticks(20)?;

    let world = tick_loop.world();
    println!(
        "after {} ticks ({:.1}s): {} particles",
        tick_loop.tick_count(),
        tick_loop.sim_time(),
        world.entity_count()
    );
    for id in world.entities() {
        if let Some(entity) = world.entity(id) {
            println!("  {id}: {:?}", entity.get_component::<Position>()?);
        }
    }
    Ok(())
}

//! Fixed-timestep tick loop.
//!
//! The [`TickLoop`] owns a [`World<Tick>`] and drives it forward. Each tick:
//!
//! 1. A [`Tick`] record (index, fixed `dt`, simulation time) is built.
//! 2. [`World::update`] runs with that record: deferred deletions are swept,
//!    then every system runs in priority order and receives the same `&Tick`.
//! 3. The tick counter advances and diagnostics are recorded.
//!
//! # Example
//!
//! ```
//! use ecys_engine::prelude::*;
//!
//! struct Age(u64);
//! struct Aging;
//!
//! impl System<Tick> for Aging {
//!     fn filter() -> Filter {
//!         Filter::requires::<(Age,)>()
//!     }
//!
//!     fn update(&mut self, ctx: &mut SystemContext<'_, Tick>, _tick: &Tick) -> anyhow::Result<()> {
//!         for id in ctx.entities() {
//!             ctx.entity_mut(id)?.get_component_mut::<Age>()?.0 += 1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let config = TickConfig { fixed_dt: 1.0 / 60.0 };
//! let mut tick_loop = TickLoop::new(World::default(), config).unwrap();
//! let e = tick_loop.world_mut().create_entity((Age(0),));
//! tick_loop.add_system(Aging, 0).unwrap();
//!
//! tick_loop.run_ticks(10).unwrap();
//!
//! assert_eq!(tick_loop.tick_count(), 10);
//! assert_eq!(tick_loop.world().entity(e).unwrap().get_component::<Age>().unwrap().0, 10);
//! ```

use std::time::{Duration, Instant};

use ecys::system::System;
use ecys::world::World;
use ecys::EcsError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while building a tick loop configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `fixed_dt` is zero, negative, NaN or infinite.
    #[error("fixed_dt must be positive and finite, got {0}")]
    InvalidFixedDt(f64),

    /// The configuration text is not valid JSON for [`TickConfig`].
    #[error("invalid tick config: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep tick loop.
///
/// The `fixed_dt` is the duration in seconds of each simulation tick. A value
/// of `1.0 / 60.0` gives 60 ticks per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// Defaults to 60 Hz (1/60 second per tick).
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

impl TickConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```
    /// use ecys_engine::tick::TickConfig;
    ///
    /// let config = TickConfig::from_json(r#"{ "fixed_dt": 0.5 }"#).unwrap();
    /// assert_eq!(config.fixed_dt, 0.5);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: TickConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a tick loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fixed_dt > 0.0 && self.fixed_dt.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::InvalidFixedDt(self.fixed_dt))
        }
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// The update argument every system receives from the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Zero-based index of this tick.
    pub index: u64,
    /// Fixed time step in seconds.
    pub dt: f64,
    /// Simulation time in seconds at the start of this tick
    /// (`index * dt`, computed without accumulation).
    pub sim_time: f64,
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Measurements for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time of the whole tick.
    pub total_time: Duration,
    /// Live entities after the tick.
    pub entity_count: usize,
    /// Registered systems after the tick.
    pub system_count: usize,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The fixed-timestep driver around a [`World<Tick>`].
pub struct TickLoop {
    /// The ECS world containing all entities and systems.
    world: World<Tick>,
    /// Number of ticks executed so far.
    tick_counter: u64,
    /// Configuration used to create this tick loop.
    config: TickConfig,
    /// Diagnostics from the last tick.
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a new tick loop with the given world and configuration.
    ///
    /// The tick counter starts at 0 and simulation time at 0.0.
    pub fn new(world: World<Tick>, config: TickConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world,
            tick_counter: 0,
            config,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Register a system; see [`World::add_system`].
    pub fn add_system<S: System<Tick>>(&mut self, system: S, priority: i32) -> Result<(), EcsError> {
        self.world.add_system(system, priority)
    }

    /// Unregister a system; see [`World::remove_system`].
    pub fn remove_system<S: System<Tick>>(&mut self) -> bool {
        self.world.remove_system::<S>()
    }

    /// Execute one simulation tick.
    ///
    /// The tick counts even when a system fails, so simulation time stays in
    /// step with the world's own tick counter.
    pub fn tick(&mut self) -> anyhow::Result<()> {
        let tick_start = Instant::now();
        let tick = Tick {
            index: self.tick_counter,
            dt: self.config.fixed_dt,
            sim_time: self.sim_time(),
        };

        let result = self.world.update(&tick);
        self.tick_counter += 1;

        self.last_diagnostics = TickDiagnostics {
            total_time: tick_start.elapsed(),
            entity_count: self.world.entity_count(),
            system_count: self.world.system_count(),
        };
        if let Err(err) = &result {
            tracing::warn!(tick = tick.index, error = %err, "tick failed");
        }
        result
    }

    /// Run `count` ticks in sequence, stopping at the first failure.
    pub fn run_ticks(&mut self, count: u64) -> anyhow::Result<()> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// The current simulation time in seconds.
    ///
    /// Computed as `tick_count * fixed_dt` to avoid floating-point drift from
    /// repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    /// The fixed time step in seconds per tick.
    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    /// Read-only access to the ECS world.
    pub fn world(&self) -> &World<Tick> {
        &self.world
    }

    /// Mutable access to the ECS world, for setup and tests.
    pub fn world_mut(&mut self) -> &mut World<Tick> {
        &mut self.world
    }

    /// Consume the loop and return its world.
    pub fn into_world(self) -> World<Tick> {
        self.world
    }

    /// Diagnostics from the last tick.
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ecys::prelude::*;
    use std::sync::{Arc, Mutex};

    // -- test component types -----------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f64,
        y: f64,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f64,
        dy: f64,
    }

    struct Movement;

    impl System<Tick> for Movement {
        fn filter() -> Filter {
            Filter::requires::<(Position, Velocity)>()
        }

        fn update(&mut self, ctx: &mut SystemContext<'_, Tick>, tick: &Tick) -> anyhow::Result<()> {
            for id in ctx.entities() {
                let entity = ctx.entity_mut(id)?;
                let vel = entity.get_component::<Velocity>()?.clone();
                let pos = entity.get_component_mut::<Position>()?;
                pos.x += vel.dx * tick.dt;
                pos.y += vel.dy * tick.dt;
            }
            Ok(())
        }
    }

    struct TickRecorder {
        seen: Arc<Mutex<Vec<Tick>>>,
    }

    impl System<Tick> for TickRecorder {
        fn update(&mut self, _: &mut SystemContext<'_, Tick>, tick: &Tick) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(*tick);
            Ok(())
        }
    }

    struct FailOnThird;

    impl System<Tick> for FailOnThird {
        fn update(&mut self, _: &mut SystemContext<'_, Tick>, tick: &Tick) -> anyhow::Result<()> {
            anyhow::ensure!(tick.index != 2, "third tick rejected");
            Ok(())
        }
    }

    fn tick_loop(fixed_dt: f64) -> TickLoop {
        let config = TickConfig { fixed_dt };
        TickLoop::new(World::default(), config).unwrap()
    }

    // -- 1. Basic construction and defaults ---------------------------------

    #[test]
    fn new_tick_loop_starts_at_zero() {
        let tick_loop = tick_loop(1.0 / 60.0);
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.sim_time(), 0.0);
        assert_eq!(tick_loop.world().system_count(), 0);
    }

    #[test]
    fn default_config_is_60hz() {
        let config = TickConfig::default();
        let expected = 1.0 / 60.0;
        assert!((config.fixed_dt - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_dt_is_rejected() {
        for bad in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let config = TickConfig { fixed_dt: bad };
            let result = TickLoop::new(World::default(), config);
            assert!(matches!(result, Err(ConfigError::InvalidFixedDt(_))), "{bad}");
        }
    }

    #[test]
    fn config_from_json() {
        let config = TickConfig::from_json(r#"{ "fixed_dt": 0.25 }"#).unwrap();
        assert_eq!(config, TickConfig { fixed_dt: 0.25 });
        // Configs written for a rendering host still load; extra keys are ignored.
        let legacy = TickConfig::from_json(r#"{ "fixed_dt": 0.25, "headless": true }"#).unwrap();
        assert_eq!(legacy, config);
        assert_eq!(TickConfig::from_json("{}").unwrap(), TickConfig::default());
        assert!(matches!(
            TickConfig::from_json(r#"{ "fixed_dt": -2.0 }"#),
            Err(ConfigError::InvalidFixedDt(_))
        ));
        assert!(matches!(
            TickConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    // -- 2. Ticking ---------------------------------------------------------

    #[test]
    fn empty_tick_advances_counter_and_time() {
        let mut tick_loop = tick_loop(0.01);

        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_count(), 1);
        assert!((tick_loop.sim_time() - 0.01).abs() < f64::EPSILON);

        tick_loop.tick().unwrap();
        assert_eq!(tick_loop.tick_count(), 2);
        assert!((tick_loop.sim_time() - 0.02).abs() < f64::EPSILON);
        assert_eq!(tick_loop.world().tick_count(), 2);
    }

    #[test]
    fn systems_receive_tick_records() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tick_loop = tick_loop(0.5);
        tick_loop
            .add_system(TickRecorder { seen: seen.clone() }, 0)
            .unwrap();

        tick_loop.run_ticks(3).unwrap();

        let seen = seen.lock().unwrap();
        let indices: Vec<u64> = seen.iter().map(|t| t.index).collect();
        let times: Vec<f64> = seen.iter().map(|t| t.sim_time).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert!(seen.iter().all(|t| t.dt == 0.5));
    }

    #[test]
    fn movement_uses_fixed_dt() {
        let mut tick_loop = tick_loop(0.5);
        let e = tick_loop
            .world_mut()
            .create_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 2.0, dy: -2.0 }));
        tick_loop.add_system(Movement, 0).unwrap();

        tick_loop.run_ticks(4).unwrap();

        let pos = tick_loop
            .world()
            .entity(e)
            .unwrap()
            .get_component::<Position>()
            .unwrap();
        assert_eq!(pos, &Position { x: 4.0, y: -4.0 });
    }

    #[test]
    fn run_ticks_stops_at_first_failure() {
        let mut tick_loop = tick_loop(1.0);
        tick_loop.add_system(FailOnThird, 0).unwrap();

        let err = tick_loop.run_ticks(5).unwrap_err();
        assert_eq!(tick_loop.tick_count(), 3);
        assert!(format!("{err:#}").contains("third tick rejected"));
    }

    #[test]
    fn diagnostics_track_world_size() {
        let mut tick_loop = tick_loop(1.0);
        let doomed = tick_loop.world_mut().create_entity(());
        tick_loop.world_mut().create_entity(());
        tick_loop.world_mut().delete_entity(doomed).unwrap();
        tick_loop.add_system(Movement, 0).unwrap();

        tick_loop.tick().unwrap();
        let diag = tick_loop.last_diagnostics();
        assert_eq!(diag.entity_count, 1);
        assert_eq!(diag.system_count, 1);
    }

    #[test]
    fn remove_system_stops_it_running() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tick_loop = tick_loop(1.0);
        tick_loop
            .add_system(TickRecorder { seen: seen.clone() }, 0)
            .unwrap();
        tick_loop.tick().unwrap();
        assert!(tick_loop.remove_system::<TickRecorder>());
        assert!(!tick_loop.remove_system::<TickRecorder>());
        tick_loop.tick().unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}

//! ecys engine -- fixed-timestep driver for an [`ecys`] world.
//!
//! This crate builds on [`ecys`] to provide the simulation driver: a tick loop
//! that calls [`World::update`](ecys::world::World::update) once per tick,
//! hands every system a [`Tick`](tick::Tick) record, and keeps simulation time
//! and per-tick diagnostics.
//!
//! # Quick Start
//!
//! ```
//! use ecys_engine::prelude::*;
//!
//! let config = TickConfig { fixed_dt: 1.0 / 60.0 };
//! let mut tick_loop = TickLoop::new(World::default(), config).unwrap();
//!
//! tick_loop.world_mut().create_entity((42u32,));
//! tick_loop.run_ticks(100).unwrap();
//! assert_eq!(tick_loop.tick_count(), 100);
//! ```

#![deny(unsafe_code)]

pub mod tick;

/// Re-export the ECS crate for convenience.
pub use ecys;

/// Install a `tracing` subscriber that prints to stderr.
///
/// The filter comes from `RUST_LOG` and falls back to `warn`. Calling this
/// more than once is harmless; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use ecys::prelude::*;

    // Engine-specific exports.
    pub use crate::init_tracing;
    pub use crate::tick::{ConfigError, Tick, TickConfig, TickDiagnostics, TickLoop};
}

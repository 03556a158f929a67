//! Simulation driver: clock, time-shifted coupling, engine, and step records.

/// Simulation clock for fixed-step time management.
pub mod clock;
/// One-slot delayed buffers for time-shifted coupling edges.
pub mod coupling;
/// Coupling network and per-tick evaluation order.
pub mod engine;
pub mod types;

pub use clock::Clock;
pub use coupling::Delayed;
pub use engine::Engine;
pub use types::{ReadAttribute, SimConfig, StepRecord};

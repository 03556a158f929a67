//! Network stand-ins consumed through a `set input → solve → read output`
//! shape.
//!
//! The real electrical power-flow and hydraulic solvers are external
//! collaborators; these lumped models close the loops deterministically for
//! tests and the demo binary.

/// Ideal-mixing district-heating network.
pub mod dh;
/// Lumped radial feeder voltage model.
pub mod grid;

pub use dh::{DhInputs, DhNetwork, DhParams};
pub use grid::{BusParams, FeederGrid};

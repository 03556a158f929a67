//! Rule-based controllers for the power-to-heat facility.

/// Supervisory state machine for heat pump and storage tank.
pub mod flex_heat;
/// Feeder-voltage controller deriving the heat-pump power setpoint.
pub mod voltage;

pub use flex_heat::{FlexHeatController, FlexHeatInputs, FlexHeatParams, HpRequests, TankMode};
pub use voltage::{VoltageController, VoltageControllerParams};

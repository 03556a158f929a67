//! Physical process models: storage tank, heat pump, heat-exchanger consumer.

/// Heat-exchanger consumer with rate-limited flow control.
pub mod hex_consumer;
/// Constant-condenser-target heat pump model.
pub mod heat_pump;
/// Stratified water storage tank model.
pub mod tank;

pub use heat_pump::{HeatPump, HeatPumpParams};
pub use hex_consumer::{HexConsumer, HexConsumerParams};
pub use tank::{StratifiedTank, TankParams};

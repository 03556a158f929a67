//! Lumped radial feeder: per-bus voltage from an affine sensitivity to the
//! aggregate net load.

use crate::error::SimError;
use crate::sim::types::ReadAttribute;

/// One monitored bus of the feeder.
#[derive(Debug, Clone)]
pub struct BusParams {
    /// Bus name, used for attribute reads and error messages.
    pub name: String,
    /// Voltage sensitivity (p.u. drop per MW of aggregate net load).
    pub v_sensitivity_pu_per_mw: f64,
}

#[derive(Debug, Clone)]
struct Bus {
    params: BusParams,
    /// Net injection set this step (MW, positive = load).
    p_mw: f64,
    /// Solved voltage magnitude (p.u.).
    vm_pu: f64,
}

/// Deterministic stand-in for the external power-flow solver.
///
/// Every bus voltage is an affine function of the aggregate feeder net
/// load around the slack voltage. The call discipline matches the external
/// solver: set all injections, [`solve`](FeederGrid::solve) once, then read
/// voltages.
#[derive(Debug, Clone)]
pub struct FeederGrid {
    vm_slack_pu: f64,
    buses: Vec<Bus>,
    net_load_mw: f64,
}

impl FeederGrid {
    /// Creates the feeder with all injections at zero and voltages at the
    /// slack value.
    ///
    /// # Panics
    ///
    /// Panics if no bus is given or a sensitivity is negative.
    pub fn new(vm_slack_pu: f64, buses: Vec<BusParams>) -> Self {
        assert!(!buses.is_empty(), "feeder needs at least one bus");
        for b in &buses {
            assert!(b.v_sensitivity_pu_per_mw >= 0.0);
        }

        Self {
            buses: buses
                .into_iter()
                .map(|params| Bus {
                    params,
                    p_mw: 0.0,
                    vm_pu: vm_slack_pu,
                })
                .collect(),
            vm_slack_pu,
            net_load_mw: 0.0,
        }
    }

    /// Sets the net injection at a bus for this step (MW, positive = load,
    /// negative = generation).
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range bus index; wiring errors are programming
    /// errors, not runtime conditions.
    pub fn set_injection(&mut self, bus: usize, p_mw: f64) {
        self.buses[bus].p_mw = p_mw;
    }

    /// Solves the feeder for the injections set since the last call.
    pub fn solve(&mut self) {
        self.net_load_mw = self.buses.iter().map(|b| b.p_mw).sum();
        for bus in &mut self.buses {
            bus.vm_pu =
                self.vm_slack_pu - bus.params.v_sensitivity_pu_per_mw * self.net_load_mw;
        }
    }

    /// Solved voltage magnitude at a bus (p.u.).
    pub fn vm_pu(&self, bus: usize) -> f64 {
        self.buses[bus].vm_pu
    }

    /// Aggregate feeder net load of the last solve (MW).
    pub fn net_load_mw(&self) -> f64 {
        self.net_load_mw
    }

    /// Number of buses.
    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }
}

impl ReadAttribute for FeederGrid {
    fn component_name(&self) -> &'static str {
        "el_network"
    }

    fn read(&self, attribute: &str) -> Result<f64, SimError> {
        if attribute == "net_load_mw" {
            return Ok(self.net_load_mw);
        }
        if let Some(name) = attribute.strip_prefix("vm_pu_") {
            if let Some(bus) = self.buses.iter().find(|b| b.params.name == name) {
                return Ok(bus.vm_pu);
            }
        }
        Err(self.unknown_attribute(attribute))
    }
}

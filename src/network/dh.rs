//! Ideal-mixing district-heating network stand-in.

use tracing::warn;

use crate::error::SimError;
use crate::sim::types::ReadAttribute;
use crate::util::{CP_WATER_KJ, clamp, safediv};

/// Construction parameters for [`DhNetwork`].
#[derive(Debug, Clone)]
pub struct DhParams {
    /// Supply temperature of the external grid source (°C).
    pub t_supply_grid_c: f64,
    /// Constant bypass flow between supply and return (kg/s).
    pub mdot_bypass: f64,
    /// Physical floor on any return temperature (°C).
    pub t_return_min_c: f64,
}

impl Default for DhParams {
    fn default() -> Self {
        Self {
            t_supply_grid_c: 75.0,
            mdot_bypass: 0.5,
            t_return_min_c: 5.0,
        }
    }
}

/// Inputs applied before one [`solve`](DhNetwork::solve).
///
/// Flow convention: positive values feed the named branch *into* the
/// network supply side (`mdot_grid`, `mdot_tank_out`) or draw from it
/// (`mdot_cons1`, `mdot_cons2`).
#[derive(Debug, Clone, Copy)]
pub struct DhInputs {
    /// Flow injected by the external grid source (kg/s).
    pub mdot_grid: f64,
    /// Flow supplied by the storage tank branch (kg/s).
    pub mdot_tank_out: f64,
    /// Flow drawn by consumer 1 (kg/s, positive).
    pub mdot_cons1: f64,
    /// Flow drawn by consumer 2 (kg/s, positive).
    pub mdot_cons2: f64,
    /// Heat drawn by consumer 1 (kW).
    pub qdot_cons1_kw: f64,
    /// Heat drawn by consumer 2 (kW).
    pub qdot_cons2_kw: f64,
    /// Heat extracted from the return line by the heat-pump evaporator (kW).
    pub qdot_evap_kw: f64,
    /// Forward temperature of the storage tank branch (°C).
    pub t_tank_forward_c: f64,
}

/// Lossless algebraic stand-in for the external hydraulic/thermal solver.
///
/// Supply temperatures are the flow-weighted mix of the grid source and the
/// tank branch; consumer returns and the bypass mix into the network
/// return, from which the heat-pump evaporator extracts its heat. No pipe
/// inertia, no pressure model.
#[derive(Debug, Clone)]
pub struct DhNetwork {
    params: DhParams,
    inputs: DhInputs,

    t_supply_cons1: f64,
    t_supply_cons2: f64,
    t_return_cons1: f64,
    t_return_cons2: f64,
    t_return_grid: f64,
    t_return_tank: f64,
    t_evap_in: f64,
}

impl DhNetwork {
    /// Creates the network at the grid supply temperature throughout.
    pub fn new(params: DhParams) -> Self {
        let t0 = params.t_supply_grid_c;
        Self {
            inputs: DhInputs {
                mdot_grid: 0.0,
                mdot_tank_out: 0.0,
                mdot_cons1: 0.0,
                mdot_cons2: 0.0,
                qdot_cons1_kw: 0.0,
                qdot_cons2_kw: 0.0,
                qdot_evap_kw: 0.0,
                t_tank_forward_c: t0,
            },
            t_supply_cons1: t0,
            t_supply_cons2: t0,
            t_return_cons1: t0,
            t_return_cons2: t0,
            t_return_grid: t0,
            t_return_tank: t0,
            t_evap_in: t0,
            params,
        }
    }

    /// Solves the network for one set of inputs.
    pub fn solve(&mut self, inputs: DhInputs) {
        self.inputs = inputs;
        let p = &self.params;

        // Supply side: flow-weighted mix of the grid source and the tank
        // branch. A branch pushed negative (grid absorbing surplus) does
        // not contribute supply water.
        let m_grid = inputs.mdot_grid.max(0.0);
        let m_tank = inputs.mdot_tank_out.max(0.0);
        let t_supply = if m_grid + m_tank > 0.0 {
            (m_grid * p.t_supply_grid_c + m_tank * inputs.t_tank_forward_c) / (m_grid + m_tank)
        } else {
            p.t_supply_grid_c
        };
        self.t_supply_cons1 = t_supply;
        self.t_supply_cons2 = t_supply;

        // Consumer returns from their energy balances.
        self.t_return_cons1 = clamp(
            p.t_return_min_c,
            t_supply - safediv(inputs.qdot_cons1_kw, CP_WATER_KJ * inputs.mdot_cons1),
            t_supply,
        );
        self.t_return_cons2 = clamp(
            p.t_return_min_c,
            t_supply - safediv(inputs.qdot_cons2_kw, CP_WATER_KJ * inputs.mdot_cons2),
            t_supply,
        );

        // Return side: consumers and bypass mix, then the evaporator
        // extracts its heat from the combined stream.
        let m_return = inputs.mdot_cons1 + inputs.mdot_cons2 + p.mdot_bypass;
        let t_return_mix = safediv(
            inputs.mdot_cons1 * self.t_return_cons1
                + inputs.mdot_cons2 * self.t_return_cons2
                + p.mdot_bypass * t_supply,
            m_return,
        );

        let mut t_return_net =
            t_return_mix - safediv(inputs.qdot_evap_kw, CP_WATER_KJ * m_return);
        if t_return_net < p.t_return_min_c {
            warn!(
                t_return_net,
                floor = p.t_return_min_c,
                "evaporator extraction clamped at the return temperature floor"
            );
            t_return_net = p.t_return_min_c;
        }

        self.t_evap_in = t_return_net;
        self.t_return_tank = t_return_net;
        self.t_return_grid = t_return_net;
    }

    /// Supply temperature at consumer 1 (°C).
    pub fn t_supply_cons1(&self) -> f64 {
        self.t_supply_cons1
    }

    /// Supply temperature at consumer 2 (°C).
    pub fn t_supply_cons2(&self) -> f64 {
        self.t_supply_cons2
    }

    /// Return temperature toward the heat-pump evaporator (°C).
    pub fn t_evap_in(&self) -> f64 {
        self.t_evap_in
    }

    /// Return temperature toward the storage tank (°C).
    pub fn t_return_tank(&self) -> f64 {
        self.t_return_tank
    }

    /// Return temperature toward the external grid (°C).
    pub fn t_return_grid(&self) -> f64 {
        self.t_return_grid
    }
}

impl ReadAttribute for DhNetwork {
    fn component_name(&self) -> &'static str {
        "dh_network"
    }

    fn read(&self, attribute: &str) -> Result<f64, SimError> {
        match attribute {
            "t_supply_cons1" => Ok(self.t_supply_cons1),
            "t_supply_cons2" => Ok(self.t_supply_cons2),
            "t_return_cons1" => Ok(self.t_return_cons1),
            "t_return_cons2" => Ok(self.t_return_cons2),
            "t_return_grid" => Ok(self.t_return_grid),
            "t_return_tank" => Ok(self.t_return_tank),
            "t_evap_in" => Ok(self.t_evap_in),
            "t_tank_forward" => Ok(self.inputs.t_tank_forward_c),
            "mdot_grid" => Ok(self.inputs.mdot_grid),
            "mdot_tank_out" => Ok(self.inputs.mdot_tank_out),
            "mdot_cons1" => Ok(self.inputs.mdot_cons1),
            "mdot_cons2" => Ok(self.inputs.mdot_cons2),
            "qdot_evap" => Ok(self.inputs.qdot_evap_kw),
            _ => Err(self.unknown_attribute(attribute)),
        }
    }
}

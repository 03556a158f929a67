//! Supervisory controller for the power-to-heat facility (heat pump and
//! storage tank).

use tracing::info;

use crate::error::SimError;
use crate::sim::types::ReadAttribute;
use crate::util::clamp;

/// Operating mode of the facility: tank role × heat-pump role.
///
/// The numeric encoding (1..6) is kept for records and attribute reads.
/// The discharge modes exist so the state space is closed, but this
/// controller variant never selects them and treats them as fatal if
/// forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankMode {
    /// External grid supplies the network; heat pump and tank inactive.
    GridSupply,
    /// External grid supplies the network; heat pump charges the tank.
    ChargeTank,
    /// Tank discharges into the network, heat pump off (extended variant
    /// only).
    DischargeHpOff,
    /// Tank discharges into the network, heat pump on (extended variant
    /// only).
    DischargeHpOn,
    /// Tank supports the grid with a fixed flow, heat pump off.
    TankSupport,
    /// Tank supports the grid with a fixed flow, heat pump on.
    TankSupportHpOn,
}

impl TankMode {
    /// Numeric state encoding used in records and logs.
    pub fn number(self) -> u8 {
        match self {
            TankMode::GridSupply => 1,
            TankMode::ChargeTank => 2,
            TankMode::DischargeHpOff => 3,
            TankMode::DischargeHpOn => 4,
            TankMode::TankSupport => 5,
            TankMode::TankSupportHpOn => 6,
        }
    }
}

/// Heat-pump on/off requests derived from the upstream voltage-control
/// loop. Both stay `false` while that loop is inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HpRequests {
    /// Demand that the heat pump keep running (setpoint above threshold).
    pub hp_on: bool,
    /// Demand that the heat pump shut down (setpoint at or below threshold).
    pub hp_off: bool,
}

/// Construction parameters for [`FlexHeatController`].
#[derive(Debug, Clone)]
pub struct FlexHeatParams {
    /// Tank temperature above which charging stops (°C).
    pub t_tank_max_c: f64,
    /// Tank temperature below which support mode ends (°C).
    pub t_tank_min_c: f64,
    /// Whether the centralized voltage controller is connected.
    pub voltage_control_enabled: bool,
    /// Rated heat-pump electrical consumption (kW).
    pub p_hp_rated_kw: f64,
    /// Fraction of rated power above which a setpoint counts as an
    /// on-request.
    pub hp_threshold_frac: f64,
    /// Constant network bypass flow (kg/s).
    pub mdot_bypass: f64,
    /// Minimum forward flow kept through the tank branch (kg/s).
    pub mdot_forward_min: f64,
    /// Fixed tank-support discharge flow (kg/s).
    pub mdot_tank_support: f64,
    /// Magnitude cap on the heat-pump condenser flow command (kg/s).
    pub mdot_hp_max: f64,
    /// Fixed condenser flow magnitude when voltage control is inactive
    /// (kg/s).
    pub mdot_hp_fixed: f64,
}

impl Default for FlexHeatParams {
    fn default() -> Self {
        Self {
            t_tank_max_c: 72.0,
            t_tank_min_c: 65.0,
            voltage_control_enabled: false,
            p_hp_rated_kw: 100.0,
            hp_threshold_frac: 0.35,
            mdot_bypass: 0.5,
            mdot_forward_min: 0.11,
            mdot_tank_support: 2.0,
            mdot_hp_max: 10.0,
            mdot_hp_fixed: 3.5,
        }
    }
}

/// Per-step measurements and control inputs.
#[derive(Debug, Clone, Copy)]
pub struct FlexHeatInputs {
    /// Mass flow requested by consumer 1 (kg/s, positive).
    pub mdot_hex1: f64,
    /// Mass flow requested by consumer 2 (kg/s, positive).
    pub mdot_hex2: f64,
    /// Tank top-layer temperature (°C, previous step).
    pub t_tank_hot: f64,
    /// Heat-pump electrical setpoint from the voltage controller (kW).
    pub p_hp_setpoint_kw: f64,
    /// Effective heat-pump electrical consumption (kW, previous step).
    pub p_hp_effective_kw: f64,
}

/// Finite-state supervisory controller.
///
/// Once per step the controller first evaluates the transition function on
/// the measured tank temperature and the heat-pump requests, then derives
/// the three-way-valve flow splits and the heat-pump condenser flow command
/// for the new state. State persists across steps; a state change is an
/// observable event with no other side effect.
///
/// # Flow Convention
/// Valve ports follow the network orientation: flows leaving the
/// controller's node toward the network are negative, flows arriving are
/// positive. The heat-pump flow command `mdot_hp_out` is therefore never
/// positive.
#[derive(Debug, Clone)]
pub struct FlexHeatController {
    params: FlexHeatParams,
    /// Threshold separating on- from off-requests (kW).
    hp_operating_threshold_kw: f64,

    state: TankMode,
    requests: HpRequests,

    // Last applied inputs.
    inputs: FlexHeatInputs,

    // Supply-side three-way valve (ports 1 = grid, 2 = consumers, 3 = tank).
    mdot_1_supply: f64,
    mdot_2_supply: f64,
    mdot_3_supply: f64,
    // Return-side three-way valve.
    mdot_1_return: f64,
    mdot_2_return: f64,
    mdot_3_return: f64,
    /// Heat-pump condenser flow command (kg/s, <= 0). Persists across
    /// steps: the power-tracking update integrates on it.
    mdot_hp_out: f64,
}

/// Pure transition function: next mode from the current mode, the measured
/// tank temperature and the heat-pump requests. No hidden memory.
pub fn transition(
    state: TankMode,
    t_tank_hot: f64,
    req: HpRequests,
    t_tank_max_c: f64,
    t_tank_min_c: f64,
) -> TankMode {
    match state {
        TankMode::GridSupply => {
            if !req.hp_off {
                TankMode::ChargeTank
            } else {
                TankMode::GridSupply
            }
        }
        TankMode::ChargeTank => {
            if req.hp_off {
                TankMode::TankSupport
            } else if t_tank_hot > t_tank_max_c {
                if req.hp_on {
                    TankMode::TankSupportHpOn
                } else {
                    TankMode::TankSupport
                }
            } else {
                TankMode::ChargeTank
            }
        }
        TankMode::TankSupportHpOn => {
            if !req.hp_on {
                TankMode::TankSupport
            } else {
                TankMode::TankSupportHpOn
            }
        }
        TankMode::TankSupport => {
            if req.hp_on {
                TankMode::ChargeTank
            } else if t_tank_hot < t_tank_min_c {
                if req.hp_off {
                    TankMode::GridSupply
                } else {
                    TankMode::ChargeTank
                }
            } else {
                TankMode::TankSupport
            }
        }
        // Discharge modes have no transitions in this variant.
        TankMode::DischargeHpOff | TankMode::DischargeHpOn => state,
    }
}

impl FlexHeatController {
    /// Creates the controller in [`TankMode::GridSupply`].
    ///
    /// # Panics
    ///
    /// Panics if the tank temperature band is inverted or the rated power
    /// is not positive.
    pub fn new(params: FlexHeatParams) -> Self {
        assert!(params.t_tank_min_c < params.t_tank_max_c);
        assert!(params.p_hp_rated_kw > 0.0);
        assert!(params.mdot_hp_max > 0.0);

        let hp_operating_threshold_kw = params.hp_threshold_frac * params.p_hp_rated_kw;
        Self {
            hp_operating_threshold_kw,
            state: TankMode::GridSupply,
            requests: HpRequests::default(),
            inputs: FlexHeatInputs {
                mdot_hex1: 0.0,
                mdot_hex2: 0.0,
                t_tank_hot: params.t_tank_min_c,
                p_hp_setpoint_kw: 0.0,
                p_hp_effective_kw: 0.0,
            },
            mdot_1_supply: 0.0,
            mdot_2_supply: 0.0,
            mdot_3_supply: 0.0,
            mdot_1_return: 0.0,
            mdot_2_return: 0.0,
            mdot_3_return: 0.0,
            mdot_hp_out: 0.0,
            params,
        }
    }

    /// Advances the controller by one step: transition first, then the
    /// state-based flow outputs.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnsupportedState`] if the machine sits in a
    /// discharge mode, which this variant does not implement.
    pub fn step(&mut self, inputs: FlexHeatInputs) -> Result<(), SimError> {
        self.inputs = inputs;

        if self.params.voltage_control_enabled {
            self.requests = self.derive_hp_requests(inputs.p_hp_setpoint_kw);
        }

        let next = transition(
            self.state,
            inputs.t_tank_hot,
            self.requests,
            self.params.t_tank_max_c,
            self.params.t_tank_min_c,
        );
        if next != self.state {
            info!(
                from = self.state.number(),
                to = next.number(),
                t_tank_hot = inputs.t_tank_hot,
                "controller state changed"
            );
            self.state = next;
        }

        self.apply_state_outputs()
    }

    /// Requests derived from comparing the setpoint against the operating
    /// threshold. Exactly one of the two is asserted.
    fn derive_hp_requests(&self, p_hp_setpoint_kw: f64) -> HpRequests {
        if p_hp_setpoint_kw > self.hp_operating_threshold_kw {
            HpRequests {
                hp_on: true,
                hp_off: false,
            }
        } else {
            HpRequests {
                hp_on: false,
                hp_off: true,
            }
        }
    }

    fn apply_state_outputs(&mut self) -> Result<(), SimError> {
        let consumers =
            self.inputs.mdot_hex1 + self.inputs.mdot_hex2 + self.params.mdot_bypass;
        self.mdot_2_supply = -consumers;
        self.mdot_1_return = consumers;

        match self.state {
            TankMode::GridSupply => {
                self.mdot_1_supply = -self.mdot_2_supply - self.params.mdot_forward_min;
                self.mdot_hp_out = 0.0;
            }
            TankMode::ChargeTank => {
                self.mdot_1_supply = -self.mdot_2_supply - self.params.mdot_forward_min;
                self.update_hp_flow_command();
            }
            TankMode::TankSupport => {
                self.mdot_1_supply = -self.mdot_2_supply - self.params.mdot_tank_support;
                self.mdot_hp_out = 0.0;
            }
            TankMode::TankSupportHpOn => {
                self.mdot_1_supply = -self.mdot_2_supply - self.params.mdot_tank_support;
                self.update_hp_flow_command();
            }
            TankMode::DischargeHpOff | TankMode::DischargeHpOn => {
                return Err(SimError::UnsupportedState(self.state.number()));
            }
        }

        self.mdot_3_supply = -(self.mdot_1_supply + self.mdot_2_supply);
        self.mdot_3_return = -self.mdot_3_supply;
        self.mdot_2_return = -self.mdot_1_supply;
        Ok(())
    }

    /// Heat-pump condenser flow command.
    ///
    /// Under voltage control this tracks the electrical setpoint with a
    /// proportional update on the relative power error. The gain and clamp
    /// bounds are empirically tuned against the demonstrator; keep them as
    /// given.
    fn update_hp_flow_command(&mut self) {
        if self.params.voltage_control_enabled {
            if self.requests.hp_off {
                self.mdot_hp_out = 0.0;
            } else {
                // Off-requests gate this branch, so the setpoint is above
                // the (positive) operating threshold.
                let error_pu = (self.inputs.p_hp_setpoint_kw - self.inputs.p_hp_effective_kw)
                    / self.inputs.p_hp_setpoint_kw;
                let mdot = self.mdot_hp_out + error_pu * -0.5;
                self.mdot_hp_out = clamp(-self.params.mdot_hp_max, mdot, 0.0);
            }
        } else {
            self.mdot_hp_out = -self.params.mdot_hp_fixed;
        }
    }

    /// Current operating mode.
    pub fn state(&self) -> TankMode {
        self.state
    }

    /// Current heat-pump requests.
    pub fn requests(&self) -> HpRequests {
        self.requests
    }

    /// Supply valve flow toward the external grid port (kg/s).
    pub fn mdot_1_supply(&self) -> f64 {
        self.mdot_1_supply
    }

    /// Supply valve flow toward the consumer port (kg/s).
    pub fn mdot_2_supply(&self) -> f64 {
        self.mdot_2_supply
    }

    /// Supply valve flow toward the tank port (kg/s).
    pub fn mdot_3_supply(&self) -> f64 {
        self.mdot_3_supply
    }

    /// Return valve flow at the consumer port (kg/s).
    pub fn mdot_1_return(&self) -> f64 {
        self.mdot_1_return
    }

    /// Return valve flow at the grid port (kg/s).
    pub fn mdot_2_return(&self) -> f64 {
        self.mdot_2_return
    }

    /// Return valve flow at the tank port (kg/s).
    pub fn mdot_3_return(&self) -> f64 {
        self.mdot_3_return
    }

    /// Heat-pump condenser flow command (kg/s, <= 0).
    pub fn mdot_hp_out(&self) -> f64 {
        self.mdot_hp_out
    }
}

impl ReadAttribute for FlexHeatController {
    fn component_name(&self) -> &'static str {
        "flex_heat_ctrl"
    }

    fn read(&self, attribute: &str) -> Result<f64, SimError> {
        match attribute {
            "state" => Ok(f64::from(self.state.number())),
            "hp_on_request" => Ok(f64::from(u8::from(self.requests.hp_on))),
            "hp_off_request" => Ok(f64::from(u8::from(self.requests.hp_off))),
            "mdot_1_supply" => Ok(self.mdot_1_supply),
            "mdot_2_supply" => Ok(self.mdot_2_supply),
            "mdot_3_supply" => Ok(self.mdot_3_supply),
            "mdot_1_return" => Ok(self.mdot_1_return),
            "mdot_2_return" => Ok(self.mdot_2_return),
            "mdot_3_return" => Ok(self.mdot_3_return),
            "mdot_hp_out" => Ok(self.mdot_hp_out),
            "t_tank_hot" => Ok(self.inputs.t_tank_hot),
            _ => Err(self.unknown_attribute(attribute)),
        }
    }
}

//! Feeder-voltage controller for the heat-pump power setpoint.

use tracing::info;

/// Construction parameters for [`VoltageController`].
///
/// The two lower deviation thresholds implement asymmetric hysteresis: the
/// threshold that applies while the pump is off is intentionally less
/// negative than the one that applies while it runs.
#[derive(Debug, Clone)]
pub struct VoltageControllerParams {
    /// Upper voltage-deviation threshold (p.u.).
    pub delta_vm_upper_pu: f64,
    /// Lower voltage-deviation threshold while the pump runs (p.u.).
    pub delta_vm_lower_pu_hp_on: f64,
    /// Lower voltage-deviation threshold while the pump is off (p.u.).
    pub delta_vm_lower_pu_hp_off: f64,
    /// Deadband width subtracted from the deviation in the proportional
    /// term (p.u.).
    pub delta_vm_deadband: f64,
    /// Heat-pump power rating (MW).
    pub p_rated_mw: f64,
    /// Minimum operating point of the heat pump (MW).
    pub p_min_mw: f64,
    /// Setpoint discretization step (MW).
    pub p_step_mw: f64,
    /// Minimum number of steps between on/off switches.
    pub min_dwell_steps: u64,
    /// Proportional gain.
    pub k_p: f64,
}

impl Default for VoltageControllerParams {
    fn default() -> Self {
        Self {
            delta_vm_upper_pu: 0.1,
            delta_vm_lower_pu_hp_on: -0.1,
            delta_vm_lower_pu_hp_off: -0.08,
            delta_vm_deadband: 0.03,
            p_rated_mw: 0.1,
            p_min_mw: 0.4 * 0.1,
            p_step_mw: 0.005,
            min_dwell_steps: 30,
            k_p: 0.15,
        }
    }
}

/// Hysteresis + proportional controller that keeps a monitored bus voltage
/// inside a deadband by modulating the heat-pump electrical setpoint.
///
/// A dwell counter enforces the minimum number of steps between on/off
/// switches so the pump cannot chatter. The proportional correction is
/// discretized to whole multiples of `p_step_mw`; the truncation and
/// residual arithmetic were tuned against the demonstrator and are kept
/// exactly as given.
#[derive(Debug, Clone)]
pub struct VoltageController {
    params: VoltageControllerParams,

    /// Steps since the pump last switched on or off.
    dwell_steps: u64,
    /// Last applied voltage measurement (p.u.).
    vmeas_pu: f64,
    /// Proposed heat-pump electrical setpoint (MW).
    p_setpoint_mw: f64,
}

impl VoltageController {
    /// Creates the controller with its setpoint at the minimum operating
    /// point.
    ///
    /// # Panics
    ///
    /// Panics if the discretization step is not positive or the minimum
    /// operating point exceeds the rating.
    pub fn new(params: VoltageControllerParams) -> Self {
        assert!(params.p_step_mw > 0.0, "p_step_mw must be positive");
        assert!(params.p_min_mw <= params.p_rated_mw);
        assert!(params.min_dwell_steps > 0);

        Self {
            dwell_steps: 0,
            vmeas_pu: 1.0,
            p_setpoint_mw: params.p_min_mw,
            params,
        }
    }

    /// Advances the controller by one step against a voltage measurement.
    ///
    /// # Arguments
    ///
    /// * `vmeas_pu` - Voltage at the heat-pump bus (p.u.)
    ///
    /// # Returns
    ///
    /// The proposed heat-pump electrical setpoint (MW).
    pub fn step(&mut self, vmeas_pu: f64) -> f64 {
        self.vmeas_pu = vmeas_pu;
        self.dwell_steps += 1;

        let p = &self.params;
        let hp_off = self.p_setpoint_mw == 0.0;

        // Off and inside the dwell window: hold everything.
        if hp_off && self.dwell_steps < p.min_dwell_steps {
            return self.p_setpoint_mw;
        }

        let delta_vm_pu = vmeas_pu - 1.0;
        let delta_vm_lower_pu = if hp_off {
            p.delta_vm_lower_pu_hp_off
        } else {
            p.delta_vm_lower_pu_hp_on
        };

        // Inside the deadband no correction is applied; an off pump whose
        // dwell has elapsed restarts at the minimum operating point.
        if delta_vm_lower_pu < delta_vm_pu && delta_vm_pu < p.delta_vm_upper_pu {
            if hp_off && self.dwell_steps >= p.min_dwell_steps {
                self.p_setpoint_mw = p.p_min_mw;
                self.dwell_steps = 0;
                info!(setpoint_mw = self.p_setpoint_mw, "heat pump switched on");
            }
            return self.p_setpoint_mw;
        }

        // Proportional correction, discretized to whole setpoint steps.
        let res = p.k_p * (delta_vm_pu - p.delta_vm_deadband) / p.p_step_mw;
        let step_res = res.trunc();
        if (res - step_res).abs() > p.p_step_mw {
            self.p_setpoint_mw += p.p_step_mw * (step_res + 1.0);
        }

        if self.p_setpoint_mw > p.p_rated_mw {
            self.p_setpoint_mw = p.p_rated_mw;
        } else if self.p_setpoint_mw < p.p_min_mw && self.dwell_steps >= p.min_dwell_steps {
            self.p_setpoint_mw = 0.0;
            self.dwell_steps = 0;
            info!("heat pump switched off");
        } else if self.p_setpoint_mw < p.p_min_mw && self.dwell_steps < p.min_dwell_steps {
            self.p_setpoint_mw = p.p_min_mw;
        }

        self.p_setpoint_mw
    }

    /// Proposed heat-pump setpoint (MW).
    pub fn p_setpoint_mw(&self) -> f64 {
        self.p_setpoint_mw
    }

    /// Proposed heat-pump setpoint (kW).
    pub fn p_setpoint_kw(&self) -> f64 {
        1e3 * self.p_setpoint_mw
    }

    /// Whether the pump is currently commanded off.
    pub fn is_off(&self) -> bool {
        self.p_setpoint_mw == 0.0
    }

    /// Last applied voltage measurement (p.u.).
    pub fn vmeas_pu(&self) -> f64 {
        self.vmeas_pu
    }
}

impl crate::sim::types::ReadAttribute for VoltageController {
    fn component_name(&self) -> &'static str {
        "voltage_ctrl"
    }

    fn read(&self, attribute: &str) -> Result<f64, crate::error::SimError> {
        match attribute {
            "vmeas_pu" => Ok(self.vmeas_pu),
            "p_setpoint_mw" => Ok(self.p_setpoint_mw),
            "p_setpoint_kw" => Ok(self.p_setpoint_kw()),
            _ => Err(self.unknown_attribute(attribute)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_with_dwell(min_dwell_steps: u64) -> VoltageController {
        VoltageController::new(VoltageControllerParams {
            min_dwell_steps,
            ..VoltageControllerParams::default()
        })
    }

    /// Drives the controller with a deep under-voltage until it switches
    /// off (resets the dwell counter).
    fn drive_off(ctrl: &mut VoltageController) {
        for _ in 0..ctrl.params.min_dwell_steps + 2 {
            ctrl.step(0.88);
            if ctrl.is_off() {
                return;
            }
        }
        panic!("controller never switched off");
    }

    #[test]
    fn starts_at_the_minimum_operating_point() {
        let ctrl = controller_with_dwell(6);
        assert_eq!(ctrl.p_setpoint_mw(), 0.04);
        assert_eq!(ctrl.p_setpoint_kw(), 40.0);
    }

    #[test]
    #[should_panic]
    fn zero_discretization_step_is_rejected() {
        VoltageController::new(VoltageControllerParams {
            p_step_mw: 0.0,
            ..VoltageControllerParams::default()
        });
    }

    #[test]
    fn overvoltage_drives_the_setpoint_to_rated() {
        let mut ctrl = controller_with_dwell(6);
        for _ in 0..100 {
            ctrl.step(1.12);
        }
        assert_eq!(ctrl.p_setpoint_mw(), 0.1);
        assert!(!ctrl.is_off());
    }

    #[test]
    fn undervoltage_switches_the_pump_off_after_the_dwell_time() {
        let mut ctrl = controller_with_dwell(6);
        for _ in 0..6 {
            ctrl.step(0.88);
        }
        assert!(ctrl.is_off());
    }

    #[test]
    fn no_chatter_before_the_dwell_elapses() {
        let mut ctrl = controller_with_dwell(6);
        drive_off(&mut ctrl);

        // Conditions that would turn the pump back on must not do so
        // before 6 steps have elapsed.
        for _ in 0..5 {
            ctrl.step(1.0);
            assert!(ctrl.is_off());
        }
        ctrl.step(1.0);
        assert!(!ctrl.is_off());
        assert_eq!(ctrl.p_setpoint_mw(), 0.04);
    }

    #[test]
    fn off_state_uses_the_reduced_lower_threshold() {
        let mut ctrl = controller_with_dwell(6);
        drive_off(&mut ctrl);

        // Deviation -0.09 sits inside the on-threshold (-0.1) but outside
        // the off-threshold (-0.08): an off pump must stay off.
        for _ in 0..20 {
            ctrl.step(0.91);
            assert!(ctrl.is_off());
        }

        // Deviation -0.075 is inside the off-threshold deadband: the pump
        // restarts once the dwell has elapsed.
        for _ in 0..6 {
            ctrl.step(0.925);
        }
        assert!(!ctrl.is_off());
    }

    #[test]
    fn sustained_undervoltage_keeps_resetting_the_dwell() {
        let mut ctrl = controller_with_dwell(6);
        drive_off(&mut ctrl);
        // Persistent deep undervoltage holds the pump off indefinitely.
        for _ in 0..50 {
            ctrl.step(0.88);
            assert!(ctrl.is_off());
        }
    }

    #[test]
    fn deadband_holds_a_running_pump_setpoint() {
        let mut ctrl = controller_with_dwell(6);
        let before = ctrl.p_setpoint_mw();
        for _ in 0..10 {
            ctrl.step(1.0);
        }
        assert_eq!(ctrl.p_setpoint_mw(), before);
    }
}

//! Simulation engine: owns every component and the coupling network
//! between them.

use crate::control::flex_heat::{FlexHeatController, FlexHeatInputs};
use crate::control::voltage::VoltageController;
use crate::error::SimError;
use crate::models::heat_pump::HeatPump;
use crate::models::hex_consumer::HexConsumer;
use crate::models::tank::StratifiedTank;
use crate::network::dh::{DhInputs, DhNetwork};
use crate::network::grid::FeederGrid;
use crate::profiles::{DemandProfile, PvProfile};

use super::clock::Clock;
use super::coupling::Delayed;
use super::types::{ReadAttribute, SimConfig, StepRecord};

/// Bus carrying the heat pump, load 1 and PV 1; its voltage is the
/// controller measurement.
const HP_BUS: usize = 0;
/// Bus carrying load 2 and PV 2.
const FAR_BUS: usize = 1;

/// The demand and generation profiles the engine replays.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    /// Heat demand of consumer 1 (kW).
    pub heat_demand1: DemandProfile,
    /// Heat demand of consumer 2 (kW).
    pub heat_demand2: DemandProfile,
    /// Electrical load at the heat-pump bus (MW).
    pub load1: DemandProfile,
    /// Electrical load at the far bus (MW).
    pub load2: DemandProfile,
    /// PV generation at the heat-pump bus (MW).
    pub pv1: PvProfile,
    /// PV generation at the far bus (MW).
    pub pv2: PvProfile,
}

/// Seeds for the time-shifted edges that close feedback cycles.
///
/// Tank- and heat-pump-related seeds are derived from the components at
/// construction; these two have no natural owner and match the
/// demonstrator's startup assumptions.
#[derive(Debug, Clone)]
pub struct CouplingSeeds {
    /// Initial consumer supply temperature (°C).
    pub t_supply_cons_c: f64,
    /// Initial heat-pump evaporator inlet temperature (°C).
    pub t_evap_in_c: f64,
}

impl Default for CouplingSeeds {
    fn default() -> Self {
        Self {
            t_supply_cons_c: 70.0,
            t_evap_in_c: 40.0,
        }
    }
}

/// Simulation engine owning all components, profiles, and delayed edges.
///
/// One [`step`](Engine::step) evaluates the fixed order
/// grid → voltage controller → consumers → flex-heat controller →
/// heat pump → district-heating network → tank, then commits every delayed
/// slot. Components exchange scalars by value only; mass-flow signals are
/// negated at each boundary (what leaves one port enters the neighbour
/// with opposite sign), so each component keeps its local sign convention.
pub struct Engine {
    config: SimConfig,
    grid: FeederGrid,
    dh: DhNetwork,
    /// `None` when the voltage-control loop is disabled; the flex-heat
    /// controller must then be built with `voltage_control_enabled = false`.
    voltage_ctrl: Option<VoltageController>,
    flex_ctrl: FlexHeatController,
    heat_pump: HeatPump,
    tank: StratifiedTank,
    hex1: HexConsumer,
    hex2: HexConsumer,
    profiles: ProfileSet,

    // Time-shifted edges, committed at the end of each step.
    d_p_hp_kw_to_ctrl: Delayed<f64>,
    d_p_hp_mw_to_grid: Delayed<f64>,
    d_t_supply_cons1: Delayed<f64>,
    d_t_supply_cons2: Delayed<f64>,
    d_t_evap_in: Delayed<f64>,
    d_t_tank_cold_to_hp: Delayed<f64>,
    d_t_tank_hot_to_ctrl: Delayed<f64>,
    d_t_tank_hot_to_dh: Delayed<f64>,
    d_mdot_tank_port: Delayed<f64>,
}

impl Engine {
    /// Wires the coupling network around the given components.
    ///
    /// # Panics
    ///
    /// Panics if the feeder has fewer than two buses.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        config: SimConfig,
        grid: FeederGrid,
        dh: DhNetwork,
        voltage_ctrl: Option<VoltageController>,
        flex_ctrl: FlexHeatController,
        heat_pump: HeatPump,
        tank: StratifiedTank,
        hex1: HexConsumer,
        hex2: HexConsumer,
        profiles: ProfileSet,
        seeds: CouplingSeeds,
    ) -> Self {
        assert!(grid.bus_count() >= 2, "feeder needs the HP bus and one more");

        let t_tank_initial = tank.t_hot();
        Self {
            d_p_hp_kw_to_ctrl: Delayed::new(0.0),
            d_p_hp_mw_to_grid: Delayed::new(0.0),
            d_t_supply_cons1: Delayed::new(seeds.t_supply_cons_c),
            d_t_supply_cons2: Delayed::new(seeds.t_supply_cons_c),
            d_t_evap_in: Delayed::new(seeds.t_evap_in_c),
            d_t_tank_cold_to_hp: Delayed::new(t_tank_initial),
            d_t_tank_hot_to_ctrl: Delayed::new(t_tank_initial),
            d_t_tank_hot_to_dh: Delayed::new(t_tank_initial),
            d_mdot_tank_port: Delayed::new(0.0),
            config,
            grid,
            dh,
            voltage_ctrl,
            flex_ctrl,
            heat_pump,
            tank,
            hex1,
            hex2,
            profiles,
        }
    }

    /// Executes one simulation step.
    ///
    /// # Errors
    ///
    /// Propagates the first component contract violation; the run must
    /// abort, there is nothing to retry.
    pub fn step(&mut self, t: usize) -> Result<StepRecord, SimError> {
        let dt = self.config.step_size_s;

        // 1. Profiles for this step.
        let p_heat1_kw = self.profiles.heat_demand1.value(t);
        let p_heat2_kw = self.profiles.heat_demand2.value(t);
        let load1_mw = self.profiles.load1.value(t);
        let load2_mw = self.profiles.load2.value(t);
        let pv1_mw = self.profiles.pv1.value(t);
        let pv2_mw = self.profiles.pv2.value(t);

        // 2. Electrical network. The heat-pump injection is the previous
        // step's consumption (time-shifted edge).
        self.grid
            .set_injection(HP_BUS, load1_mw - pv1_mw + self.d_p_hp_mw_to_grid.get());
        self.grid.set_injection(FAR_BUS, load2_mw - pv2_mw);
        self.grid.solve();
        let vm_pu = self.grid.vm_pu(HP_BUS);

        // 3. Voltage controller (same-step measurement).
        let p_setpoint_kw = match self.voltage_ctrl.as_mut() {
            Some(ctrl) => {
                ctrl.step(vm_pu);
                ctrl.p_setpoint_kw()
            }
            None => 0.0,
        };

        // 4. Consumers, fed with the previous step's supply temperatures.
        self.hex1.step(p_heat1_kw, self.d_t_supply_cons1.get());
        self.hex2.step(p_heat2_kw, self.d_t_supply_cons2.get());

        // 5. Flex-heat controller. Consumer outlet flows arrive negated.
        self.flex_ctrl.step(FlexHeatInputs {
            mdot_hex1: -self.hex1.mdot_hex_out(),
            mdot_hex2: -self.hex2.mdot_hex_out(),
            t_tank_hot: self.d_t_tank_hot_to_ctrl.get(),
            p_hp_setpoint_kw: p_setpoint_kw,
            p_hp_effective_kw: self.d_p_hp_kw_to_ctrl.get(),
        })?;

        // 6. Heat pump: flow commands from the controller (negated),
        // boundary temperatures from the previous step.
        let t_cond_out_target = self.heat_pump.t_cond_out_target();
        self.heat_pump.step(
            self.d_t_tank_cold_to_hp.get(),
            self.d_t_evap_in.get(),
            -self.flex_ctrl.mdot_hp_out(),
            -self.flex_ctrl.mdot_2_return(),
            t_cond_out_target,
            dt,
        );

        // 7. District-heating network, all same-step except the tank
        // forward temperature.
        self.dh.solve(DhInputs {
            mdot_grid: self.flex_ctrl.mdot_1_supply(),
            mdot_tank_out: self.flex_ctrl.mdot_3_supply(),
            mdot_cons1: -self.hex1.mdot_hex_out(),
            mdot_cons2: -self.hex2.mdot_hex_out(),
            qdot_cons1_kw: p_heat1_kw,
            qdot_cons2_kw: p_heat2_kw,
            qdot_evap_kw: self.heat_pump.qdot_evap_kw(),
            t_tank_forward_c: self.d_t_tank_hot_to_dh.get(),
        });

        // 8. Tank: charged from the condenser outlet (same step),
        // discharged by the previous step's tank-port flow.
        let mdot_dis_out = -self.d_mdot_tank_port.get();
        self.tank.step(
            -self.heat_pump.mdot_cond_out(),
            self.heat_pump.t_cond_out(),
            mdot_dis_out,
            self.dh.t_return_tank(),
            dt,
        )?;

        // 9. Commit every delayed slot for the next step.
        self.d_p_hp_kw_to_ctrl.set(self.heat_pump.p_effective_kw());
        self.d_p_hp_mw_to_grid.set(self.heat_pump.p_effective_mw());
        self.d_t_supply_cons1.set(self.dh.t_supply_cons1());
        self.d_t_supply_cons2.set(self.dh.t_supply_cons2());
        self.d_t_evap_in.set(self.dh.t_evap_in());
        self.d_t_tank_cold_to_hp.set(self.tank.t_cold());
        self.d_t_tank_hot_to_ctrl.set(self.tank.t_hot());
        self.d_t_tank_hot_to_dh.set(self.tank.t_hot());
        self.d_mdot_tank_port.set(self.flex_ctrl.mdot_3_supply());

        Ok(StepRecord {
            step: t,
            time_s: t as f64 * dt,
            t_tank_hot: self.tank.t_hot(),
            t_tank_cold: self.tank.t_cold(),
            t_tank_avg: self.tank.t_avg(),
            mdot_tank_ch_in: -self.heat_pump.mdot_cond_out(),
            mdot_tank_dis_out: mdot_dis_out,
            qdot_cond_kw: self.heat_pump.qdot_cond_kw(),
            qdot_evap_kw: self.heat_pump.qdot_evap_kw(),
            p_hp_effective_kw: self.heat_pump.p_effective_kw(),
            p_hp_setpoint_kw: p_setpoint_kw,
            t_cond_out: self.heat_pump.t_cond_out(),
            mdot_cons1: self.hex1.mdot_hex_in(),
            mdot_cons2: self.hex2.mdot_hex_in(),
            p_heat_cons1_kw: p_heat1_kw,
            p_heat_cons2_kw: p_heat2_kw,
            vm_pu,
            controller_state: self.flex_ctrl.state().number(),
        })
    }

    /// Runs the whole horizon and returns one record per step.
    ///
    /// # Errors
    ///
    /// Aborts at the first component error; records up to that step are
    /// discarded with the run.
    pub fn run(&mut self) -> Result<Vec<StepRecord>, SimError> {
        let total = self.config.total_steps();
        let mut clock = Clock::new(total);
        let mut records = Vec::with_capacity(total);
        while let Some(t) = clock.tick() {
            records.push(self.step(t)?);
        }
        Ok(records)
    }

    /// Simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Storage tank (for KPI and attribute queries).
    pub fn tank(&self) -> &StratifiedTank {
        &self.tank
    }

    /// Heat pump (for KPI and attribute queries).
    pub fn heat_pump(&self) -> &HeatPump {
        &self.heat_pump
    }

    /// Flex-heat controller.
    pub fn flex_ctrl(&self) -> &FlexHeatController {
        &self.flex_ctrl
    }

    /// Voltage controller, when the loop is enabled.
    pub fn voltage_ctrl(&self) -> Option<&VoltageController> {
        self.voltage_ctrl.as_ref()
    }

    /// District-heating network.
    pub fn dh(&self) -> &DhNetwork {
        &self.dh
    }

    /// Electrical feeder.
    pub fn grid(&self) -> &FeederGrid {
        &self.grid
    }

    /// Consumer heat exchangers.
    pub fn consumers(&self) -> (&HexConsumer, &HexConsumer) {
        (&self.hex1, &self.hex2)
    }

    /// Resolves a component by the name the results collector routes on.
    ///
    /// `voltage_ctrl` resolves only while the voltage loop is enabled.
    pub fn component(&self, name: &str) -> Option<&dyn ReadAttribute> {
        match name {
            "storage_tank" => Some(&self.tank),
            "heat_pump" => Some(&self.heat_pump),
            "flex_heat_ctrl" => Some(&self.flex_ctrl),
            "voltage_ctrl" => self
                .voltage_ctrl
                .as_ref()
                .map(|c| c as &dyn ReadAttribute),
            "hex_consumer1" => Some(&self.hex1),
            "hex_consumer2" => Some(&self.hex2),
            "dh_network" => Some(&self.dh),
            "el_network" => Some(&self.grid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::flex_heat::FlexHeatParams;
    use crate::control::voltage::VoltageControllerParams;
    use crate::models::heat_pump::HeatPumpParams;
    use crate::models::hex_consumer::HexConsumerParams;
    use crate::models::tank::TankParams;
    use crate::network::dh::DhParams;
    use crate::network::grid::BusParams;
    use crate::sim::types::ReadAttribute;

    fn profiles(steps_per_day: usize, seed: u64) -> ProfileSet {
        ProfileSet {
            heat_demand1: DemandProfile::new(400.0, 150.0, 1.2, 5.0, steps_per_day, seed),
            heat_demand2: DemandProfile::new(350.0, 120.0, 0.8, 5.0, steps_per_day, seed + 1),
            load1: DemandProfile::new(0.4, 0.2, 1.2, 0.01, steps_per_day, seed + 2),
            load2: DemandProfile::new(0.3, 0.15, 0.9, 0.01, steps_per_day, seed + 3),
            pv1: PvProfile::new(
                0.5,
                steps_per_day / 4,
                3 * steps_per_day / 4,
                0.01,
                steps_per_day,
                seed + 4,
            ),
            pv2: PvProfile::new(
                0.4,
                steps_per_day / 4,
                3 * steps_per_day / 4,
                0.01,
                steps_per_day,
                seed + 5,
            ),
        }
    }

    fn engine(voltage_control: bool, seed: u64) -> Engine {
        let config = SimConfig::new(60.0, 2 * 60 * 60, seed);
        let steps_per_day = (24 * 60 * 60) / 60;

        let grid = FeederGrid::new(
            1.0,
            vec![
                BusParams {
                    name: "bus_1".to_string(),
                    v_sensitivity_pu_per_mw: 0.05,
                },
                BusParams {
                    name: "bus_2".to_string(),
                    v_sensitivity_pu_per_mw: 0.03,
                },
            ],
        );
        let dh = DhNetwork::new(DhParams::default());
        let voltage_ctrl =
            voltage_control.then(|| VoltageController::new(VoltageControllerParams::default()));
        let flex_ctrl = FlexHeatController::new(FlexHeatParams {
            voltage_control_enabled: voltage_control,
            ..FlexHeatParams::default()
        });
        let heat_pump = HeatPump::new(HeatPumpParams::default());
        let tank = StratifiedTank::new(TankParams::default());
        let hex1 = HexConsumer::new(HexConsumerParams::default());
        let hex2 = HexConsumer::new(HexConsumerParams::default());

        Engine::new(
            config,
            grid,
            dh,
            voltage_ctrl,
            flex_ctrl,
            heat_pump,
            tank,
            hex1,
            hex2,
            profiles(steps_per_day, seed),
            CouplingSeeds::default(),
        )
    }

    #[test]
    fn run_produces_one_record_per_step() {
        let mut e = engine(false, 42);
        let records = e.run().unwrap();
        assert_eq!(records.len(), 120);
        assert_eq!(records[0].step, 0);
        assert_eq!(records[119].time_s, 119.0 * 60.0);
    }

    #[test]
    fn first_step_consumers_see_the_seeded_supply_temperature() {
        let mut e = engine(false, 42);
        assert_eq!(e.d_t_supply_cons1.get(), 70.0);
        e.step(0).unwrap();
        // After one step the slot carries the network's solved value.
        assert_eq!(e.d_t_supply_cons1.get(), e.dh.t_supply_cons1());
    }

    #[test]
    fn identical_seeds_reproduce_identical_runs() {
        let mut a = engine(true, 7);
        let mut b = engine(true, 7);
        let ra = a.run().unwrap();
        let rb = b.run().unwrap();
        for (x, y) in ra.iter().zip(&rb) {
            assert_eq!(x.t_tank_hot, y.t_tank_hot);
            assert_eq!(x.p_hp_effective_kw, y.p_hp_effective_kw);
            assert_eq!(x.vm_pu, y.vm_pu);
            assert_eq!(x.controller_state, y.controller_state);
        }
    }

    #[test]
    fn mass_is_conserved_across_every_coupling_edge() {
        let mut e = engine(false, 42);
        for t in 0..120 {
            e.step(t).unwrap();
            // Tank echo flows negate their inlets.
            assert_eq!(
                e.tank.read("mdot_ch_out").unwrap(),
                -e.tank.read("mdot_ch_in").unwrap()
            );
            // Consumer outlets negate their inlets.
            assert_eq!(e.hex1.mdot_hex_out(), -e.hex1.mdot_hex_in());
            // Valve splits balance.
            let sum = e.flex_ctrl.mdot_1_supply()
                + e.flex_ctrl.mdot_2_supply()
                + e.flex_ctrl.mdot_3_supply();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn closed_loop_signals_stay_finite_and_bounded() {
        let mut e = engine(true, 11);
        let records = e.run().unwrap();
        for r in &records {
            assert!(r.t_tank_hot.is_finite());
            // Condenser-limited charging cannot push the tank past the
            // maximum condenser outlet temperature.
            assert!(r.t_tank_hot <= 86.0);
            assert!(r.t_tank_cold >= 5.0 - 1e-6);
            assert!(r.p_hp_effective_kw >= 0.0);
            assert!(r.vm_pu > 0.8 && r.vm_pu < 1.2);
        }
    }

    #[test]
    fn disabled_voltage_loop_never_asserts_requests() {
        let mut e = engine(false, 42);
        e.run().unwrap();
        let req = e.flex_ctrl.requests();
        assert!(!req.hp_on);
        assert!(!req.hp_off);
    }
}

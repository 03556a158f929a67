//! Tank charge scenario: one hour of constant charging into a uniform
//! tank.

use mes_sim::models::tank::{StratifiedTank, TankParams};

fn demonstrator_tank() -> StratifiedTank {
    StratifiedTank::new(TankParams {
        n_layers: 10,
        t_initial_c: 70.0,
        t_ambient_c: 8.0,
        ..TankParams::default()
    })
}

#[test]
fn top_layer_warms_monotonically_toward_the_inlet_temperature() {
    let mut tank = demonstrator_tank();
    let mut prev_top = tank.t_hot();

    for _ in 0..3600 {
        tank.step(2.0, 80.0, 0.0, 40.0, 1.0).unwrap();
        assert!(tank.t_hot() >= prev_top - 1e-9);
        assert!(tank.t_hot() < 80.0);
        prev_top = tank.t_hot();
    }

    // After an hour the top layer has moved visibly toward the inlet.
    assert!(tank.t_hot() > 71.0);
}

#[test]
fn bottom_layer_sees_no_advective_heating_before_the_front_arrives() {
    let mut tank = demonstrator_tank();

    // At 2 kg/s the charge front needs more than an hour per layer of this
    // tank, so the bottom only loses heat to ambient and conduction.
    let mut prev_bottom = tank.t_cold();
    for _ in 0..3600 {
        tank.step(2.0, 80.0, 0.0, 40.0, 1.0).unwrap();
        assert!(tank.t_cold() <= prev_bottom + 1e-9);
        prev_bottom = tank.t_cold();
    }
    assert!(tank.t_cold() < 70.0);
    assert!(tank.t_cold() > 65.0);
}

#[test]
fn charged_tank_is_stratified_top_down() {
    let mut tank = demonstrator_tank();
    for _ in 0..3600 {
        tank.step(2.0, 80.0, 0.0, 40.0, 1.0).unwrap();
    }
    let layers = tank.layer_temperatures();
    for pair in layers.windows(2) {
        assert!(pair[0] >= pair[1] - 1e-9);
    }
}

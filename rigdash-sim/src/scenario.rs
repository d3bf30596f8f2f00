//! Scenario definitions and vehicle-state evolution.

use rand::Rng;
use rand::rngs::SmallRng;

/// Named driving scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Engine idling in a parking lot.
    #[default]
    Idle,
    /// Cruising at 105 km/h.
    Highway,
    /// Stop-and-go on a 60 second cycle.
    City,
    /// Cranking a cold engine, then fast-idle warmup.
    ColdStart,
    /// Full-throttle acceleration through the gears.
    Acceleration,
    /// Highway with an injected overheat fault.
    FaultInjection,
    /// Caller drives the state directly.
    Custom,
}

/// The full simulated vehicle state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub engine_rpm: f32,
    pub engine_load_pct: f32,
    pub throttle_pct: f32,
    pub coolant_temp_c: f32,
    pub oil_temp_c: f32,
    pub oil_pressure_kpa: f32,
    pub fuel_rate_lph: f32,
    pub boost_pressure_kpa: f32,
    pub engine_hours: f32,
    pub trans_oil_temp_c: f32,
    pub current_gear: i8,
    pub selected_gear: i8,
    pub vehicle_speed_kmh: f32,
    pub fuel_level_pct: f32,
    pub battery_voltage: f32,
    pub ambient_temp_c: f32,
    pub odometer_km: f32,
    pub trip_km: f32,
    pub parking_brake: bool,
    pub brake_switch: bool,
    pub cruise_active: bool,
    pub cruise_set_speed_kmh: u8,
}

impl Default for VehicleState {
    /// A warm truck that has lived a while.
    fn default() -> Self {
        Self {
            engine_rpm: 0.0,
            engine_load_pct: 0.0,
            throttle_pct: 0.0,
            coolant_temp_c: 85.0,
            oil_temp_c: 95.0,
            oil_pressure_kpa: 350.0,
            fuel_rate_lph: 0.0,
            boost_pressure_kpa: 100.0,
            engine_hours: 12_500.0,
            trans_oil_temp_c: 75.0,
            current_gear: 0,
            selected_gear: 0,
            vehicle_speed_kmh: 0.0,
            fuel_level_pct: 75.0,
            battery_voltage: 13.8,
            ambient_temp_c: 25.0,
            odometer_km: 450_000.0,
            trip_km: 0.0,
            parking_brake: true,
            brake_switch: false,
            cruise_active: false,
            cruise_set_speed_kmh: 0,
        }
    }
}

fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.clamp(min, max)
}

/// Move `current` towards `target` by at most `rate`.
fn approach(current: f32, target: f32, rate: f32) -> f32 {
    let diff = target - current;
    if diff.abs() < rate {
        target
    } else if diff > 0.0 {
        current + rate
    } else {
        current - rate
    }
}

fn noise(rng: &mut SmallRng, span: f32) -> f32 {
    rng.gen_range(-span..=span)
}

pub(crate) fn evolve(
    scenario: Scenario,
    state: &mut VehicleState,
    rng: &mut SmallRng,
    elapsed_ms: u64,
    delta_s: f32,
) {
    match scenario {
        Scenario::Idle => idle(state, rng, delta_s),
        Scenario::Highway | Scenario::FaultInjection => highway(state, rng, delta_s),
        Scenario::City => city(state, rng, elapsed_ms, delta_s),
        Scenario::ColdStart => cold_start(state, rng, elapsed_ms, delta_s),
        Scenario::Acceleration => acceleration(state, rng, elapsed_ms, delta_s),
        Scenario::Custom => {}
    }

    // Oil pressure tracks engine speed.
    if state.engine_rpm > 0.0 && scenario != Scenario::ColdStart {
        let rpm_factor = state.engine_rpm / 2000.0;
        state.oil_pressure_kpa = 200.0 + 200.0 * rpm_factor + noise(rng, 10.0);
    } else if state.engine_rpm <= 0.0 {
        state.oil_pressure_kpa = 0.0;
    }

    state.engine_rpm = clamp(state.engine_rpm, 0.0, 2800.0);
    state.vehicle_speed_kmh = clamp(state.vehicle_speed_kmh, 0.0, 150.0);
    state.coolant_temp_c = clamp(state.coolant_temp_c, -40.0, 120.0);
    state.fuel_level_pct = clamp(state.fuel_level_pct, 0.0, 100.0);
}

fn idle(state: &mut VehicleState, rng: &mut SmallRng, delta_s: f32) {
    let target_rpm = 700.0 + noise(rng, 20.0);
    state.engine_rpm = approach(state.engine_rpm, target_rpm, 50.0 * delta_s);
    state.vehicle_speed_kmh = 0.0;
    state.throttle_pct = approach(state.throttle_pct, 0.0, 20.0 * delta_s);
    state.engine_load_pct = 15.0 + noise(rng, 2.0);
    state.fuel_rate_lph = 3.0 + noise(rng, 0.2);
    state.boost_pressure_kpa = 100.0 + noise(rng, 5.0);
    state.current_gear = 0;
    state.parking_brake = true;
    state.cruise_active = false;

    state.coolant_temp_c = approach(state.coolant_temp_c, 85.0, 0.5 * delta_s);
    state.oil_temp_c = approach(state.oil_temp_c, 95.0, 0.3 * delta_s);
    state.trans_oil_temp_c = approach(state.trans_oil_temp_c, 75.0, 0.3 * delta_s);
}

fn highway(state: &mut VehicleState, rng: &mut SmallRng, delta_s: f32) {
    let target_rpm = 1400.0 + noise(rng, 30.0);
    let target_speed = 105.0 + noise(rng, 2.0);
    let target_throttle = 45.0 + noise(rng, 5.0);

    state.engine_rpm = approach(state.engine_rpm, target_rpm, 100.0 * delta_s);
    state.vehicle_speed_kmh = approach(state.vehicle_speed_kmh, target_speed, 5.0 * delta_s);
    state.throttle_pct = approach(state.throttle_pct, target_throttle, 30.0 * delta_s);
    state.engine_load_pct = 55.0 + noise(rng, 5.0);
    state.fuel_rate_lph = 28.0 + noise(rng, 2.0);
    state.boost_pressure_kpa = 180.0 + noise(rng, 10.0);
    state.current_gear = 10;
    state.selected_gear = 10;
    state.parking_brake = false;
    state.cruise_active = true;
    state.cruise_set_speed_kmh = 105;

    state.coolant_temp_c = approach(state.coolant_temp_c, 88.0, 0.3 * delta_s);
    state.oil_temp_c = approach(state.oil_temp_c, 105.0, 0.2 * delta_s);
    state.trans_oil_temp_c = approach(state.trans_oil_temp_c, 85.0, 0.2 * delta_s);

    state.fuel_level_pct -= 0.001 * delta_s;
    if state.fuel_level_pct < 0.0 {
        state.fuel_level_pct = 100.0;
    }

    let km = state.vehicle_speed_kmh * delta_s / 3600.0;
    state.odometer_km += km;
    state.trip_km += km;
    state.engine_hours += delta_s / 3600.0;
}

fn city(state: &mut VehicleState, rng: &mut SmallRng, elapsed_ms: u64, delta_s: f32) {
    // 60 second light-to-light cycle.
    let cycle = (elapsed_ms as f32 / 1000.0) % 60.0;

    let (target_rpm, target_speed, target_throttle);
    if cycle < 10.0 {
        target_rpm = 1800.0 + noise(rng, 50.0);
        target_speed = cycle * 5.0;
        target_throttle = 60.0;
        state.current_gear = (cycle / 2.0) as i8 + 1;
        state.brake_switch = false;
    } else if cycle < 30.0 {
        target_rpm = 1200.0;
        target_speed = 50.0;
        target_throttle = 30.0;
        state.current_gear = 5;
        state.brake_switch = false;
    } else if cycle < 40.0 {
        target_rpm = 800.0;
        target_speed = 50.0 - (cycle - 30.0) * 5.0;
        target_throttle = 0.0;
        state.brake_switch = true;
    } else {
        target_rpm = 700.0;
        target_speed = 0.0;
        target_throttle = 0.0;
        state.current_gear = 0;
        state.brake_switch = true;
    }

    state.engine_rpm = approach(state.engine_rpm, target_rpm, 200.0 * delta_s);
    state.vehicle_speed_kmh = approach(state.vehicle_speed_kmh, target_speed, 10.0 * delta_s);
    state.throttle_pct = approach(state.throttle_pct, target_throttle, 50.0 * delta_s);
    state.parking_brake = false;

    let km = state.vehicle_speed_kmh * delta_s / 3600.0;
    state.odometer_km += km;
    state.trip_km += km;
}

fn cold_start(state: &mut VehicleState, rng: &mut SmallRng, elapsed_ms: u64, delta_s: f32) {
    let elapsed = elapsed_ms as f32 / 1000.0;

    if elapsed < 2.0 {
        // Cranking.
        state.engine_rpm = 200.0 + noise(rng, 30.0);
        state.battery_voltage = 10.5 + noise(rng, 0.5);
    } else if elapsed < 5.0 {
        state.engine_rpm = approach(state.engine_rpm, 900.0, 200.0 * delta_s);
        state.battery_voltage = approach(state.battery_voltage, 14.2, 2.0 * delta_s);
    } else {
        // Fast idle drops as the engine warms, three minutes in all.
        let warmup = clamp((elapsed - 5.0) / 180.0, 0.0, 1.0);
        let target_rpm = 900.0 - 200.0 * warmup;
        state.engine_rpm = approach(state.engine_rpm, target_rpm, 50.0 * delta_s);
    }

    let warmup_factor = clamp(elapsed / 300.0, 0.0, 1.0);
    state.coolant_temp_c = approach(
        state.coolant_temp_c,
        -10.0 + 95.0 * warmup_factor,
        0.5 * delta_s,
    );
    state.oil_temp_c = state.coolant_temp_c - 10.0;
    state.oil_pressure_kpa = 150.0 + 150.0 * (1.0 - warmup_factor) + noise(rng, 10.0);

    state.vehicle_speed_kmh = 0.0;
    state.parking_brake = true;
}

fn acceleration(state: &mut VehicleState, rng: &mut SmallRng, elapsed_ms: u64, delta_s: f32) {
    let elapsed = elapsed_ms as f32 / 1000.0;

    if elapsed < 15.0 {
        state.throttle_pct = 100.0;
        state.engine_load_pct = 95.0 + noise(rng, 3.0);

        // Shift up at redline.
        if state.engine_rpm > 2000.0 && state.current_gear < 10 {
            state.current_gear += 1;
            state.engine_rpm = 1200.0;
        }
        state.engine_rpm = approach(state.engine_rpm, 2200.0, 400.0 * delta_s);

        let target_speed = f32::from(state.current_gear) * 12.0;
        state.vehicle_speed_kmh = approach(state.vehicle_speed_kmh, target_speed, 5.0 * delta_s);

        state.boost_pressure_kpa = 250.0 + noise(rng, 10.0);
        state.fuel_rate_lph = 80.0 + noise(rng, 5.0);
    } else {
        state.throttle_pct = approach(state.throttle_pct, 0.0, 30.0 * delta_s);
        state.engine_rpm = approach(state.engine_rpm, 1200.0, 100.0 * delta_s);
    }

    state.parking_brake = false;
    state.selected_gear = state.current_gear;
}

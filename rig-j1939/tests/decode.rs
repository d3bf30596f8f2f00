//! Frame and signal decoding against known-good captures.

use rig_j1939::signal::current_gear;
use rig_j1939::{J1939Frame, Signal, id};

#[test]
fn pdu2_extraction() {
    let frame = J1939Frame::decode(0x18FEEE00, &[0xFF; 8], 0).unwrap();
    assert_eq!(frame.pgn, 65262);
    assert_eq!(frame.source_address, 0x00);
    assert_eq!(frame.priority, 6);
    assert_eq!(frame.destination, 0xFF);
}

#[test]
fn pdu1_extraction() {
    let frame = J1939Frame::decode(0x18EA00F9, &[0xFF; 3], 0).unwrap();
    assert_eq!(frame.pgn, 59904);
    assert_eq!(frame.source_address, 0xF9);
    assert_eq!(frame.priority, 6);
    assert_eq!(frame.destination, 0x00);
}

#[test]
fn eec1_engine_speed() {
    let frame = J1939Frame::decode(
        id::build_raw_id(id::pgn::EEC1, 0x00, 3),
        &[0x00, 0x7D, 0x7D, 0x80, 0x3E, 0x00, 0x00, 0x00],
        0,
    )
    .unwrap();
    assert_eq!(Signal::EngineSpeed.decode(frame.data()), Some(2000.0));
}

#[test]
fn et1_coolant_temp() {
    let payload = [0x8C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    assert_eq!(Signal::CoolantTemp.decode(&payload), Some(100.0));
}

#[test]
fn ccvs_vehicle_speed() {
    let payload = [0xFF, 0x00, 0x69, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    assert_eq!(Signal::WheelSpeed.decode(&payload), Some(105.0));
}

#[test]
fn etc2_gear_bands() {
    let mut payload = [0xFFu8; 8];
    payload[3] = 0x7C;
    assert_eq!(current_gear(&payload), Some(-1));
    payload[3] = 0x7D;
    assert_eq!(current_gear(&payload), Some(0));
    payload[3] = 0x85;
    assert_eq!(current_gear(&payload), Some(8));
}

#[test]
fn unknown_pgn_passes_through_without_signals() {
    let frame = J1939Frame::decode(id::build_raw_id(65280, 0x42, 6), &[1, 2, 3, 4], 0).unwrap();
    assert_eq!(frame.pgn, 65280);
    assert!(Signal::for_pgn(frame.pgn).is_empty());
}

#[test]
fn signal_decode_matches_spec_table_on_synthetic_raws() {
    // One mid-range raw per signal, checked against hand-computed values.
    let cases: &[(Signal, [u8; 8], f32)] = &[
        (Signal::PedalPosition, [0, 125, 0, 0, 0, 0, 0, 0], 50.0),
        (Signal::OilPressure, [0, 0, 0, 100, 0, 0, 0, 0], 400.0),
        (Signal::FuelRate, [0x90, 0x01, 0, 0, 0, 0, 0, 0], 20.0),
        (Signal::BoostPressure, [0, 90, 0, 0, 0, 0, 0, 0], 180.0),
        (Signal::BatteryVoltage, [0, 0, 0, 0, 0, 0, 0x14, 0x01], 13.8),
        (Signal::FuelLevel1, [0, 200, 0, 0, 0, 0, 0, 0], 80.0),
        (Signal::EngineHours, [0x40, 0x0D, 0x03, 0x00, 0, 0, 0, 0], 10000.0),
    ];
    for (signal, payload, expected) in cases {
        let got = signal.decode(payload).unwrap();
        assert!(
            (got - expected).abs() < 0.01,
            "{signal:?}: {got} != {expected}"
        );
    }
}

#[test]
fn ambient_and_trans_temps_share_the_kelvin_offset() {
    // raw 9536 * 0.03125 - 273 = 25 C.
    let raw = 9536u16.to_le_bytes();
    let mut amb = [0xFFu8; 8];
    amb[3] = raw[0];
    amb[4] = raw[1];
    assert_eq!(Signal::AmbientTemp.decode(&amb), Some(25.0));

    let mut trf = [0xFFu8; 8];
    trf[4] = raw[0];
    trf[5] = raw[1];
    assert_eq!(Signal::TransOilTemp.decode(&trf), Some(25.0));
}

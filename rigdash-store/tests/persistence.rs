//! Reopen-the-store tests: the boot/shutdown protocol and round-trip
//! identity of persisted state.

use rigdash_store::{
    Backend, JsonFileBackend, MemBackend, Namespace, Storage, TripId, UserSettings,
};

#[test]
fn clean_shutdown_is_detected_on_the_next_boot() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();
    assert_eq!(storage.system().boot_count, 1);
    assert_eq!(storage.system().crash_count, 0);

    storage.shutdown().unwrap();
    let backend = storage.into_backend();

    let storage = Storage::open(backend).unwrap();
    assert!(storage.previous_shutdown_clean());
    assert_eq!(storage.system().boot_count, 2);
    assert_eq!(storage.system().crash_count, 0);
}

#[test]
fn missing_shutdown_counts_a_crash() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();
    // Some state gets written, but shutdown() is never called.
    storage.trip_reset(TripId::A, 1_700_000_000);
    storage.save_all().unwrap();
    let backend = storage.into_backend();

    let storage = Storage::open(backend).unwrap();
    assert!(!storage.previous_shutdown_clean());
    assert_eq!(storage.system().boot_count, 2);
    assert_eq!(storage.system().crash_count, 1);
}

#[test]
fn first_boot_is_not_a_crash() {
    let storage = Storage::open(MemBackend::new()).unwrap();
    assert!(storage.previous_shutdown_clean());
    assert_eq!(storage.system().crash_count, 0);
}

#[test]
fn shutdown_persists_pending_work_first() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();
    storage.trip_reset(TripId::A, 1_700_000_000);

    // Distance below the flush threshold: still in the accumulators.
    assert!(!storage.periodic_update(1_000, 0.3, 0.1).unwrap());
    storage.shutdown().unwrap();

    let storage = Storage::open(storage.into_backend()).unwrap();
    assert!((storage.trip(TripId::A).distance_km - 0.3).abs() < 1e-4);
    assert!((storage.lifetime().total_distance_km - 0.3).abs() < 1e-4);
}

#[test]
fn trips_lifetime_and_settings_round_trip() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();

    storage.trip_reset(TripId::B, 1_700_000_123);
    storage.trip_update(TripId::B, 120.0, 30.0, 4000);
    storage.set_engine_hours(12_500.0);
    storage.add_runtime(7200);
    storage.record_economy_sample(6.5);
    storage.set_settings(UserSettings {
        brightness: 40,
        tank_1_capacity_l: 300,
        ..UserSettings::default()
    });
    storage.save_all().unwrap();

    let storage = Storage::open(storage.into_backend()).unwrap();
    let trip = storage.trip(TripId::B);
    assert_eq!(trip.start_time, 1_700_000_123);
    assert!((trip.distance_km - 120.0).abs() < 1e-3);
    assert!((trip.avg_speed_kmh - 108.0).abs() < 0.01);
    assert!(trip.active);

    assert_eq!(storage.lifetime().engine_hours, 12_500.0);
    assert_eq!(storage.lifetime().total_runtime_s, 7200);
    assert_eq!(storage.lifetime().best_mpg, 6.5);
    assert_eq!(storage.lifetime().worst_mpg, 6.5);

    assert_eq!(storage.settings().brightness, 40);
    assert_eq!(storage.settings().tank_1_capacity_l, 300);
    assert_eq!(storage.settings().tank_2_capacity_l, 200);
}

#[test]
fn dtc_history_round_trips_through_the_blob() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();
    storage.dtc_store(110, 0, 0x00, 1_700_000_000, true);
    storage.dtc_store(629, 12, 0x17, 1_700_000_100, true);
    storage.dtc_store(110, 0, 0x00, 1_700_000_200, true);
    storage.save_all().unwrap();

    let storage = Storage::open(storage.into_backend()).unwrap();
    let history = storage.dtc_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].spn, 110);
    assert_eq!(history[0].occurrence_count, 2);
    assert_eq!(history[0].last_seen, 1_700_000_200);
    assert_eq!(history[1].spn, 629);
    assert_eq!(storage.active_dtc_count(), 2);
}

#[test]
fn json_file_backend_supports_the_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let backend = JsonFileBackend::open(&path).unwrap();
        let mut storage = Storage::open(backend).unwrap();
        storage.trip_reset(TripId::A, 42);
        storage.periodic_update(1_000, 2.5, 0.8).unwrap();
        storage.shutdown().unwrap();
    }

    // A whole new process: reopen from the file alone.
    let backend = JsonFileBackend::open(&path).unwrap();
    let storage = Storage::open(backend).unwrap();
    assert!(storage.previous_shutdown_clean());
    assert_eq!(storage.system().boot_count, 2);
    assert!((storage.lifetime().total_distance_km - 2.5).abs() < 1e-4);
    assert!((storage.trip(TripId::A).distance_km - 2.5).abs() < 1e-4);
}

#[test]
fn emergency_save_is_idempotent_about_accumulators() {
    let mut storage = Storage::open(MemBackend::new()).unwrap();
    storage.periodic_update(100, 0.4, 0.1).unwrap();
    storage.emergency_save().unwrap();
    storage.emergency_save().unwrap();

    // Folded exactly once.
    assert!((storage.lifetime().total_distance_km - 0.4).abs() < 1e-4);

    // And the persisted pending counters are back to zero.
    let mut backend = storage.into_backend();
    backend
        .read(Namespace::System, |ns| {
            use rigdash_store::backend::NamespaceRead;
            assert_eq!(ns.get_f32("pend_dist"), Some(0.0));
        })
        .unwrap();
}

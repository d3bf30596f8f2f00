//! The storage manager: dirty-flag batching, accumulators, trips, fault
//! history and the clean-shutdown protocol.

use tracing::{debug, warn};

use crate::backend::{Backend, Namespace, StoreError};
use crate::records::{
    EconomyUnit, LifetimeStats, PressureUnit, StoredDtc, SystemState, TempUnit, TripData,
    UnitSystem, UserSettings, pack_dtcs, unpack_dtcs,
};

/// Most fault codes kept in history.
pub const MAX_DTC_HISTORY: usize = 20;
/// Periodic flush interval.
pub const SAVE_INTERVAL_MS: u64 = 5 * 60 * 1000;
/// Accumulated distance that forces a flush.
pub const DISTANCE_THRESHOLD_KM: f32 = 1.0;

/// The two trip counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripId {
    /// Trip A.
    A,
    /// Trip B.
    B,
}

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    trip_a: bool,
    trip_b: bool,
    lifetime: bool,
    dtc: bool,
    settings: bool,
    economy: bool,
}

impl Dirty {
    fn set_all(&mut self) {
        *self = Self {
            trip_a: true,
            trip_b: true,
            lifetime: true,
            dtc: true,
            settings: true,
            economy: true,
        };
    }
}

/// In-memory image of the persisted state plus the write-batching policy.
pub struct Storage<B: Backend> {
    backend: B,
    trip_a: TripData,
    trip_b: TripData,
    lifetime: LifetimeStats,
    dtc_history: Vec<StoredDtc>,
    settings: UserSettings,
    system: SystemState,
    dirty: Dirty,
    distance_accum_km: f32,
    fuel_accum_l: f32,
    last_save_ms: u64,
    previous_shutdown_clean: bool,
}

impl<B: Backend> Storage<B> {
    /// Load everything and run the boot protocol.
    ///
    /// Boot counts up; a persisted clean-shutdown flag of `false` counts a
    /// crash; and the flag is immediately written back as `false` so the
    /// *next* boot can tell whether this run shut down properly.
    pub fn open(backend: B) -> Result<Self, StoreError> {
        let mut storage = Self {
            backend,
            trip_a: TripData::default(),
            trip_b: TripData::default(),
            lifetime: LifetimeStats::default(),
            dtc_history: Vec::new(),
            settings: UserSettings::default(),
            system: SystemState::default(),
            dirty: Dirty::default(),
            distance_accum_km: 0.0,
            fuel_accum_l: 0.0,
            last_save_ms: 0,
            previous_shutdown_clean: true,
        };
        storage.load_all()?;

        storage.previous_shutdown_clean = storage.system.clean_shutdown;
        storage.system.boot_count += 1;
        if !storage.previous_shutdown_clean {
            storage.system.crash_count += 1;
        }
        storage.system.clean_shutdown = false;

        let system = storage.system;
        storage.backend.write(Namespace::System, |ns| {
            ns.put_u32("boot_count", system.boot_count);
            ns.put_u32("crash_count", system.crash_count);
            ns.put_bool("clean_shut", false);
        })?;

        debug!(
            boot = storage.system.boot_count,
            crashes = storage.system.crash_count,
            clean = storage.previous_shutdown_clean,
            "storage loaded"
        );
        Ok(storage)
    }

    fn load_all(&mut self) -> Result<(), StoreError> {
        self.trip_a = Self::load_trip(&mut self.backend, Namespace::TripA)?;
        self.trip_b = Self::load_trip(&mut self.backend, Namespace::TripB)?;

        self.lifetime = self.backend.read(Namespace::Lifetime, |ns| {
            let d = LifetimeStats::default();
            LifetimeStats {
                total_distance_km: ns.get_f32("total_dist").unwrap_or(d.total_distance_km),
                total_fuel_l: ns.get_f32("total_fuel").unwrap_or(d.total_fuel_l),
                engine_hours: ns.get_f32("eng_hours").unwrap_or(d.engine_hours),
                boot_count: ns.get_u32("boot_count").unwrap_or(d.boot_count),
                best_mpg: d.best_mpg,
                worst_mpg: d.worst_mpg,
                first_boot_time: ns.get_u64("first_boot").unwrap_or(d.first_boot_time),
                total_runtime_s: ns.get_u64("runtime").unwrap_or(d.total_runtime_s),
            }
        })?;

        let (best, worst) = self.backend.read(Namespace::FuelEconomy, |ns| {
            let d = LifetimeStats::default();
            (
                ns.get_f32("best_mpg").unwrap_or(d.best_mpg),
                ns.get_f32("worst_mpg").unwrap_or(d.worst_mpg),
            )
        })?;
        self.lifetime.best_mpg = best;
        self.lifetime.worst_mpg = worst;

        self.settings = self.backend.read(Namespace::Settings, |ns| {
            let d = UserSettings::default();
            UserSettings {
                units: ns.get_u8("units").map_or(d.units, UnitSystem::from_u8),
                brightness: ns.get_u8("brightness").unwrap_or(d.brightness),
                default_page: ns.get_u8("def_page").unwrap_or(d.default_page),
                temp_unit: ns.get_u8("temp_unit").map_or(d.temp_unit, TempUnit::from_u8),
                pressure_unit: ns
                    .get_u8("press_unit")
                    .map_or(d.pressure_unit, PressureUnit::from_u8),
                economy_unit: ns
                    .get_u8("econ_unit")
                    .map_or(d.economy_unit, EconomyUnit::from_u8),
                tank_1_capacity_l: ns.get_u16("tank1_size").unwrap_or(d.tank_1_capacity_l),
                tank_2_capacity_l: ns.get_u16("tank2_size").unwrap_or(d.tank_2_capacity_l),
            }
        })?;

        self.system = self.backend.read(Namespace::System, |ns| SystemState {
            // Absent flag means first boot, which is not a crash.
            clean_shutdown: ns.get_bool("clean_shut").unwrap_or(true),
            last_timestamp_ms: ns.get_u64("last_time").unwrap_or(0),
            boot_count: ns.get_u32("boot_count").unwrap_or(0),
            crash_count: ns.get_u32("crash_count").unwrap_or(0),
            pending_distance_km: ns.get_f32("pend_dist").unwrap_or(0.0),
            pending_fuel_l: ns.get_f32("pend_fuel").unwrap_or(0.0),
        })?;

        self.dtc_history = self.backend.read(Namespace::FaultLog, |ns| {
            match ns.get_blob("dtcs") {
                Some(blob) => {
                    let count = usize::from(ns.get_u8("count").unwrap_or(0));
                    unpack_dtcs(blob, count.min(MAX_DTC_HISTORY))
                }
                None => Vec::new(),
            }
        })?;

        Ok(())
    }

    fn load_trip(backend: &mut B, ns_id: Namespace) -> Result<TripData, StoreError> {
        backend.read(ns_id, |ns| TripData {
            distance_km: ns.get_f32("distance").unwrap_or(0.0),
            fuel_used_l: ns.get_f32("fuel").unwrap_or(0.0),
            start_time: ns.get_u64("start_time").unwrap_or(0),
            duration_s: ns.get_u32("duration").unwrap_or(0),
            avg_speed_kmh: ns.get_f32("avg_speed").unwrap_or(0.0),
            avg_economy: ns.get_f32("avg_econ").unwrap_or(0.0),
            active: ns.get_bool("active").unwrap_or(false),
        })
    }

    /// Write every dirty namespace, plus the system bookkeeping.
    pub fn save_all(&mut self) -> Result<(), StoreError> {
        if self.dirty.trip_a {
            Self::save_trip(&mut self.backend, Namespace::TripA, &self.trip_a)?;
            self.dirty.trip_a = false;
        }
        if self.dirty.trip_b {
            Self::save_trip(&mut self.backend, Namespace::TripB, &self.trip_b)?;
            self.dirty.trip_b = false;
        }
        if self.dirty.lifetime {
            let lifetime = self.lifetime;
            self.backend.write(Namespace::Lifetime, |ns| {
                ns.put_f32("total_dist", lifetime.total_distance_km);
                ns.put_f32("total_fuel", lifetime.total_fuel_l);
                ns.put_f32("eng_hours", lifetime.engine_hours);
                ns.put_u32("boot_count", lifetime.boot_count);
                ns.put_u64("first_boot", lifetime.first_boot_time);
                ns.put_u64("runtime", lifetime.total_runtime_s);
            })?;
            self.dirty.lifetime = false;
        }
        if self.dirty.economy {
            let (best, worst) = (self.lifetime.best_mpg, self.lifetime.worst_mpg);
            self.backend.write(Namespace::FuelEconomy, |ns| {
                ns.put_f32("best_mpg", best);
                ns.put_f32("worst_mpg", worst);
            })?;
            self.dirty.economy = false;
        }
        if self.dirty.settings {
            let s = self.settings;
            self.backend.write(Namespace::Settings, |ns| {
                ns.put_u8("units", s.units.as_u8());
                ns.put_u8("brightness", s.brightness);
                ns.put_u8("def_page", s.default_page);
                ns.put_u8("temp_unit", s.temp_unit.as_u8());
                ns.put_u8("press_unit", s.pressure_unit.as_u8());
                ns.put_u8("econ_unit", s.economy_unit.as_u8());
                ns.put_u16("tank1_size", s.tank_1_capacity_l);
                ns.put_u16("tank2_size", s.tank_2_capacity_l);
            })?;
            self.dirty.settings = false;
        }
        if self.dirty.dtc {
            let mut blob = Vec::new();
            pack_dtcs(&self.dtc_history, &mut blob);
            let count = self.dtc_history.len() as u8;
            self.backend.write(Namespace::FaultLog, |ns| {
                ns.put_u8("count", count);
                ns.put_blob("dtcs", &blob);
            })?;
            self.dirty.dtc = false;
        }

        // Pending accumulators record what a power loss would cost.
        let system = self.system;
        let (pend_d, pend_f) = (self.distance_accum_km, self.fuel_accum_l);
        self.backend.write(Namespace::System, |ns| {
            ns.put_u64("last_time", system.last_timestamp_ms);
            ns.put_f32("pend_dist", pend_d);
            ns.put_f32("pend_fuel", pend_f);
        })?;

        debug!("storage flushed");
        Ok(())
    }

    fn save_trip(backend: &mut B, ns_id: Namespace, trip: &TripData) -> Result<(), StoreError> {
        let trip = *trip;
        backend.write(ns_id, |ns| {
            ns.put_f32("distance", trip.distance_km);
            ns.put_f32("fuel", trip.fuel_used_l);
            ns.put_u64("start_time", trip.start_time);
            ns.put_u32("duration", trip.duration_s);
            ns.put_f32("avg_speed", trip.avg_speed_kmh);
            ns.put_f32("avg_econ", trip.avg_economy);
            ns.put_bool("active", trip.active);
        })
    }

    /// Accumulate deltas and flush when a trigger fires.
    ///
    /// Returns `Ok(true)` when a flush ran. Call from the lowest-priority
    /// tick; a flush may stall for flash latency and nothing else waits on
    /// it.
    pub fn periodic_update(
        &mut self,
        now_ms: u64,
        distance_delta_km: f32,
        fuel_delta_l: f32,
    ) -> Result<bool, StoreError> {
        self.distance_accum_km += distance_delta_km;
        self.fuel_accum_l += fuel_delta_l;
        self.system.last_timestamp_ms = now_ms;

        let time_due = now_ms.saturating_sub(self.last_save_ms) >= SAVE_INTERVAL_MS;
        let volume_due = self.distance_accum_km >= DISTANCE_THRESHOLD_KM;
        if !time_due && !volume_due {
            return Ok(false);
        }

        self.fold_accumulators();
        self.save_all()?;
        self.last_save_ms = now_ms;
        Ok(true)
    }

    /// Force everything out now (detected power-loss precondition).
    pub fn emergency_save(&mut self) -> Result<(), StoreError> {
        self.fold_accumulators();
        self.dirty.set_all();
        self.save_all()
    }

    /// Orderly shutdown: flush, then mark the shutdown clean on flash.
    pub fn shutdown(&mut self) -> Result<(), StoreError> {
        if let Err(err) = self.emergency_save() {
            warn!("emergency save during shutdown failed: {err}");
            return Err(err);
        }
        self.system.clean_shutdown = true;
        self.backend
            .write(Namespace::System, |ns| ns.put_bool("clean_shut", true))?;
        debug!("clean shutdown recorded");
        Ok(())
    }

    fn fold_accumulators(&mut self) {
        if self.distance_accum_km <= 0.0 && self.fuel_accum_l <= 0.0 {
            return;
        }
        for (trip, dirty) in [
            (&mut self.trip_a, &mut self.dirty.trip_a),
            (&mut self.trip_b, &mut self.dirty.trip_b),
        ] {
            trip.distance_km += self.distance_accum_km;
            trip.fuel_used_l += self.fuel_accum_l;
            trip.avg_economy = trip.economy();
            *dirty = true;
        }
        self.lifetime.total_distance_km += self.distance_accum_km;
        self.lifetime.total_fuel_l += self.fuel_accum_l;
        self.dirty.lifetime = true;
        self.distance_accum_km = 0.0;
        self.fuel_accum_l = 0.0;
    }

    /// Zero a trip and mark it running.
    pub fn trip_reset(&mut self, trip: TripId, now_epoch_s: u64) {
        let record = self.trip_mut(trip);
        *record = TripData {
            start_time: now_epoch_s,
            active: true,
            ..TripData::default()
        };
        self.mark_trip_dirty(trip);
    }

    /// Add distance, fuel and time to a trip; recompute the averages.
    pub fn trip_update(
        &mut self,
        trip: TripId,
        distance_delta_km: f32,
        fuel_delta_l: f32,
        duration_delta_s: u32,
    ) {
        let record = self.trip_mut(trip);
        record.distance_km += distance_delta_km;
        record.fuel_used_l += fuel_delta_l;
        record.duration_s += duration_delta_s;
        if record.duration_s > 0 {
            record.avg_speed_kmh = record.distance_km * 3600.0 / record.duration_s as f32;
        }
        record.avg_economy = record.economy();
        self.mark_trip_dirty(trip);
    }

    /// Trip state.
    pub fn trip(&self, trip: TripId) -> &TripData {
        match trip {
            TripId::A => &self.trip_a,
            TripId::B => &self.trip_b,
        }
    }

    /// Lifetime statistics.
    pub fn lifetime(&self) -> &LifetimeStats {
        &self.lifetime
    }

    /// Engine hours come from the bus value as-is.
    pub fn set_engine_hours(&mut self, hours: f32) {
        self.lifetime.engine_hours = hours;
        self.dirty.lifetime = true;
    }

    /// Add runtime seconds to the lifetime total.
    pub fn add_runtime(&mut self, seconds: u64) {
        self.lifetime.total_runtime_s += seconds;
        self.dirty.lifetime = true;
    }

    /// Feed one fuel-economy sample; extremes widen to include it.
    pub fn record_economy_sample(&mut self, mpg: f32) {
        let mut changed = false;
        if mpg > self.lifetime.best_mpg {
            self.lifetime.best_mpg = mpg;
            changed = true;
        }
        if mpg < self.lifetime.worst_mpg {
            self.lifetime.worst_mpg = mpg;
            changed = true;
        }
        if changed {
            self.dirty.economy = true;
        }
    }

    /// Record a fault code observation.
    ///
    /// A matching (spn, fmi, source) entry is refreshed; otherwise a new
    /// entry is appended, evicting the oldest `last_seen` when the history
    /// is at [`MAX_DTC_HISTORY`].
    pub fn dtc_store(
        &mut self,
        spn: u32,
        fmi: u8,
        source_address: u8,
        timestamp_epoch_s: u64,
        active: bool,
    ) {
        self.dirty.dtc = true;

        if let Some(existing) = self.dtc_history.iter_mut().find(|d| {
            d.spn == spn && d.fmi == fmi && d.source_address == source_address
        }) {
            existing.last_seen = timestamp_epoch_s;
            existing.occurrence_count = existing.occurrence_count.saturating_add(1);
            existing.active = active;
            return;
        }

        let entry = StoredDtc {
            spn,
            fmi,
            source_address,
            first_seen: timestamp_epoch_s,
            last_seen: timestamp_epoch_s,
            occurrence_count: 1,
            active,
        };

        if self.dtc_history.len() < MAX_DTC_HISTORY {
            self.dtc_history.push(entry);
            return;
        }

        if let Some((oldest, _)) = self
            .dtc_history
            .iter()
            .enumerate()
            .min_by_key(|(_, d)| d.last_seen)
        {
            self.dtc_history[oldest] = entry;
        }
    }

    /// Mark every stored code inactive.
    pub fn dtc_clear_active(&mut self) {
        for dtc in &mut self.dtc_history {
            dtc.active = false;
        }
        self.dirty.dtc = true;
    }

    /// Empty the history.
    pub fn dtc_clear_all(&mut self) {
        self.dtc_history.clear();
        self.dirty.dtc = true;
    }

    /// Stored history, insertion order.
    pub fn dtc_history(&self) -> &[StoredDtc] {
        &self.dtc_history
    }

    /// Codes currently flagged active.
    pub fn active_dtc_count(&self) -> usize {
        self.dtc_history.iter().filter(|d| d.active).count()
    }

    /// Current settings.
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Replace the settings.
    pub fn set_settings(&mut self, settings: UserSettings) {
        self.settings = settings;
        self.dirty.settings = true;
    }

    /// Back to factory defaults.
    pub fn reset_settings(&mut self) {
        self.settings = UserSettings::default();
        self.dirty.settings = true;
    }

    /// System bookkeeping (boot/crash counters, pending accumulators).
    pub fn system(&self) -> &SystemState {
        &self.system
    }

    /// Whether the previous run shut down cleanly.
    pub fn previous_shutdown_clean(&self) -> bool {
        self.previous_shutdown_clean
    }

    /// Hand the backend back (to reopen in tests).
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn trip_mut(&mut self, trip: TripId) -> &mut TripData {
        match trip {
            TripId::A => &mut self.trip_a,
            TripId::B => &mut self.trip_b,
        }
    }

    fn mark_trip_dirty(&mut self, trip: TripId) {
        match trip {
            TripId::A => self.dirty.trip_a = true,
            TripId::B => self.dirty.trip_b = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemBackend;

    #[test]
    fn trip_averages_follow_the_rules() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();
        storage.trip_reset(TripId::A, 1_700_000_000);

        storage.trip_update(TripId::A, 50.0, 12.0, 1800);
        let trip = storage.trip(TripId::A);
        assert!(trip.active);
        assert_eq!(trip.start_time, 1_700_000_000);
        assert!((trip.avg_speed_kmh - 100.0).abs() < 0.01);
        assert!((trip.avg_economy - 24.0).abs() < 0.01);

        // Below a kilometre, economy reads zero.
        storage.trip_reset(TripId::B, 0);
        storage.trip_update(TripId::B, 0.4, 0.2, 60);
        assert_eq!(storage.trip(TripId::B).avg_economy, 0.0);
    }

    #[test]
    fn volume_trigger_folds_accumulators() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();

        // 0.6 km: below both triggers.
        assert!(!storage.periodic_update(10_000, 0.6, 0.2).unwrap());
        assert_eq!(storage.lifetime().total_distance_km, 0.0);

        // Crosses the 1 km threshold.
        assert!(storage.periodic_update(20_000, 0.6, 0.2).unwrap());
        let lifetime = storage.lifetime();
        assert!((lifetime.total_distance_km - 1.2).abs() < 1e-4);
        assert!((lifetime.total_fuel_l - 0.4).abs() < 1e-4);
        assert!((storage.trip(TripId::A).distance_km - 1.2).abs() < 1e-4);
        assert!((storage.trip(TripId::B).distance_km - 1.2).abs() < 1e-4);
    }

    #[test]
    fn periodic_trigger_fires_on_time() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();
        assert!(!storage.periodic_update(SAVE_INTERVAL_MS - 1, 0.0, 0.0).unwrap());
        assert!(storage.periodic_update(SAVE_INTERVAL_MS, 0.0, 0.0).unwrap());
        // Interval restarts from the flush.
        assert!(!storage.periodic_update(SAVE_INTERVAL_MS + 1000, 0.0, 0.0).unwrap());
    }

    #[test]
    fn dtc_dedup_and_eviction() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();

        storage.dtc_store(110, 0, 0, 100, true);
        storage.dtc_store(110, 0, 0, 200, true);
        assert_eq!(storage.dtc_history().len(), 1);
        assert_eq!(storage.dtc_history()[0].occurrence_count, 2);
        assert_eq!(storage.dtc_history()[0].first_seen, 100);
        assert_eq!(storage.dtc_history()[0].last_seen, 200);

        // Fill to capacity with distinct codes.
        for i in 0..MAX_DTC_HISTORY as u32 - 1 {
            storage.dtc_store(1000 + i, 3, 0, 300 + u64::from(i), true);
        }
        assert_eq!(storage.dtc_history().len(), MAX_DTC_HISTORY);

        // One more evicts the oldest last_seen (spn 110, seen at 200).
        storage.dtc_store(9999, 1, 0, 5000, true);
        assert_eq!(storage.dtc_history().len(), MAX_DTC_HISTORY);
        assert!(storage.dtc_history().iter().all(|d| d.spn != 110));
        assert!(storage.dtc_history().iter().any(|d| d.spn == 9999));
    }

    #[test]
    fn dtc_clear_operations() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();
        storage.dtc_store(110, 0, 0, 1, true);
        storage.dtc_store(100, 1, 0, 2, true);
        assert_eq!(storage.active_dtc_count(), 2);

        storage.dtc_clear_active();
        assert_eq!(storage.active_dtc_count(), 0);
        assert_eq!(storage.dtc_history().len(), 2);

        storage.dtc_clear_all();
        assert!(storage.dtc_history().is_empty());
    }

    #[test]
    fn economy_extremes_widen() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();
        storage.record_economy_sample(7.2);
        assert_eq!(storage.lifetime().best_mpg, 7.2);
        assert_eq!(storage.lifetime().worst_mpg, 7.2);

        storage.record_economy_sample(9.0);
        storage.record_economy_sample(5.5);
        assert_eq!(storage.lifetime().best_mpg, 9.0);
        assert_eq!(storage.lifetime().worst_mpg, 5.5);
    }

    #[test]
    fn engine_hours_are_verbatim() {
        let mut storage = Storage::open(MemBackend::new()).unwrap();
        storage.set_engine_hours(12_500.5);
        storage.set_engine_hours(12_500.6);
        assert_eq!(storage.lifetime().engine_hours, 12_500.6);
    }
}

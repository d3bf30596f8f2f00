//! The persisted record types.

/// One trip counter (two exist, A and B).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TripData {
    /// Distance travelled, km.
    pub distance_km: f32,
    /// Fuel consumed, litres.
    pub fuel_used_l: f32,
    /// Epoch seconds when the trip was reset.
    pub start_time: u64,
    /// Driving time, seconds.
    pub duration_s: u32,
    /// Recomputed on every update while duration is nonzero.
    pub avg_speed_kmh: f32,
    /// L/100km; zero below one kilometre to avoid division noise.
    pub avg_economy: f32,
    /// Trip currently running.
    pub active: bool,
}

impl TripData {
    /// Average economy rule: L/100km once at least a kilometre is on the
    /// trip, zero before that.
    pub fn economy(&self) -> f32 {
        if self.distance_km < 1.0 {
            0.0
        } else {
            self.fuel_used_l * 100.0 / self.distance_km
        }
    }
}

/// Lifetime statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifetimeStats {
    /// Odometer, km.
    pub total_distance_km: f32,
    /// Lifetime fuel, litres.
    pub total_fuel_l: f32,
    /// Taken verbatim from the bus, never accumulated locally.
    pub engine_hours: f32,
    /// Power cycles.
    pub boot_count: u32,
    /// Best recorded economy, MPG.
    pub best_mpg: f32,
    /// Worst recorded economy, MPG.
    pub worst_mpg: f32,
    /// Epoch seconds of the first boot.
    pub first_boot_time: u64,
    /// Total system runtime, seconds.
    pub total_runtime_s: u64,
}

impl Default for LifetimeStats {
    /// Extremes start at 0/999 so the first sample becomes both.
    fn default() -> Self {
        Self {
            total_distance_km: 0.0,
            total_fuel_l: 0.0,
            engine_hours: 0.0,
            boot_count: 0,
            best_mpg: 0.0,
            worst_mpg: 999.0,
            first_boot_time: 0,
            total_runtime_s: 0,
        }
    }
}

/// A fault code with first/last-seen history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredDtc {
    /// Suspect parameter number.
    pub spn: u32,
    /// Failure mode identifier.
    pub fmi: u8,
    /// ECU the code came from.
    pub source_address: u8,
    /// Epoch seconds first observed.
    pub first_seen: u64,
    /// Epoch seconds last observed.
    pub last_seen: u64,
    /// Times observed.
    pub occurrence_count: u16,
    /// Currently active.
    pub active: bool,
}

/// Bytes per packed DTC record in the fault-log blob.
pub const DTC_RECORD_BYTES: usize = 25;

/// Pack DTC records into the fault-log blob layout.
pub fn pack_dtcs(dtcs: &[StoredDtc], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(dtcs.len() * DTC_RECORD_BYTES);
    for dtc in dtcs {
        out.extend_from_slice(&dtc.spn.to_le_bytes());
        out.push(dtc.fmi);
        out.push(dtc.source_address);
        out.extend_from_slice(&dtc.first_seen.to_le_bytes());
        out.extend_from_slice(&dtc.last_seen.to_le_bytes());
        out.extend_from_slice(&dtc.occurrence_count.to_le_bytes());
        out.push(u8::from(dtc.active));
    }
}

/// Unpack the fault-log blob; a trailing partial record is dropped.
pub fn unpack_dtcs(blob: &[u8], max: usize) -> Vec<StoredDtc> {
    let mut out = Vec::new();
    for chunk in blob.chunks_exact(DTC_RECORD_BYTES).take(max) {
        out.push(StoredDtc {
            spn: u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            fmi: chunk[4],
            source_address: chunk[5],
            first_seen: u64::from_le_bytes(chunk[6..14].try_into().unwrap_or_default()),
            last_seen: u64::from_le_bytes(chunk[14..22].try_into().unwrap_or_default()),
            occurrence_count: u16::from_le_bytes([chunk[22], chunk[23]]),
            active: chunk[24] != 0,
        });
    }
    out
}

/// Master unit toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// Temperature display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Pressure display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressureUnit {
    #[default]
    Kpa,
    Psi,
    Bar,
}

/// Fuel-economy display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EconomyUnit {
    #[default]
    LitresPer100Km,
    Mpg,
}

impl UnitSystem {
    pub fn from_u8(raw: u8) -> Self {
        if raw == 1 { Self::Imperial } else { Self::Metric }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TempUnit {
    pub fn from_u8(raw: u8) -> Self {
        if raw == 1 { Self::Fahrenheit } else { Self::Celsius }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl PressureUnit {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Psi,
            2 => Self::Bar,
            _ => Self::Kpa,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl EconomyUnit {
    pub fn from_u8(raw: u8) -> Self {
        if raw == 1 { Self::Mpg } else { Self::LitresPer100Km }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// User-facing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSettings {
    /// Master metric/imperial toggle.
    pub units: UnitSystem,
    /// Display brightness, 0..=100.
    pub brightness: u8,
    /// Page shown at boot.
    pub default_page: u8,
    /// Temperature unit override.
    pub temp_unit: TempUnit,
    /// Pressure unit override.
    pub pressure_unit: PressureUnit,
    /// Economy unit override.
    pub economy_unit: EconomyUnit,
    /// Tank 1 capacity, litres.
    pub tank_1_capacity_l: u16,
    /// Tank 2 capacity, litres.
    pub tank_2_capacity_l: u16,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            units: UnitSystem::Metric,
            brightness: 75,
            default_page: 0,
            temp_unit: TempUnit::Celsius,
            pressure_unit: PressureUnit::Kpa,
            economy_unit: EconomyUnit::LitresPer100Km,
            tank_1_capacity_l: 200,
            tank_2_capacity_l: 200,
        }
    }
}

/// Boot/shutdown bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemState {
    /// True on disk only between a clean shutdown and the next boot.
    pub clean_shutdown: bool,
    /// Last persisted monotonic timestamp, ms.
    pub last_timestamp_ms: u64,
    /// Power cycles.
    pub boot_count: u32,
    /// Boots that followed an unclean shutdown.
    pub crash_count: u32,
    /// Distance accumulated but not yet folded at the last save, km.
    pub pending_distance_km: f32,
    /// Fuel accumulated but not yet folded at the last save, litres.
    pub pending_fuel_l: f32,
}

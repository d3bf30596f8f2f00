//! The parameter identity catalogue.
//!
//! Every value the dashboard tracks has one stable identity here, whatever
//! bus (or computation) produced it. Identities are banded by domain so the
//! numeric ranges read like the catalogue: engine first, diagnostics and
//! computed values at the top. The store indexes a dense array with these
//! discriminants, so the enumeration is closed and stays below
//! [`PARAM_CAPACITY`].

/// Size of the dense identity space.
pub const PARAM_CAPACITY: usize = 256;

/// Where a parameter value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// Never updated.
    #[default]
    Unknown,
    /// J1939 CAN bus.
    J1939,
    /// J1708/J1587 serial bus.
    J1708,
    /// Analogue sensor input.
    Analog,
    /// Derived from other parameters.
    Computed,
    /// Restored from persistent storage.
    Stored,
    /// Scenario generator.
    Simulated,
}

/// Parameter grouping for menus and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Engine,
    Transmission,
    Vehicle,
    Fuel,
    Electrical,
    Environmental,
    Distance,
    Diagnostics,
    Computed,
}

/// Stable parameter identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamId {
    /// Reserved; updates to it are no-ops.
    None = 0,

    // Engine (1..)
    EngineSpeed = 1,
    EngineLoad = 2,
    PedalPosition = 3,
    CoolantTemp = 4,
    OilTemp = 5,
    OilPressure = 6,
    IntakeTemp = 7,
    BoostPressure = 8,
    BarometricPressure = 9,
    EngineHours = 10,

    // Transmission (32..)
    TransOilTemp = 32,
    TransOilPressure = 33,
    CurrentGear = 34,
    SelectedGear = 35,
    OutputShaftSpeed = 36,

    // Vehicle (64..)
    VehicleSpeed = 64,
    CruiseSetSpeed = 65,
    CruiseActive = 66,
    ParkingBrake = 67,
    BrakeSwitch = 68,

    // Fuel (96..)
    FuelLevel1 = 96,
    FuelLevel2 = 97,
    FuelRate = 98,
    InstFuelEconomy = 99,
    AvgFuelEconomy = 100,
    TotalFuelUsed = 101,

    // Electrical (128..)
    BatteryVoltage = 128,
    ChargingVoltage = 129,

    // Environmental (144..)
    AmbientTemp = 144,
    CabTemp = 145,

    // Distance (160..)
    TotalDistance = 160,
    TripADistance = 161,
    TripBDistance = 162,

    // Diagnostics (192..)
    ActiveDtcCount = 192,
    MilStatus = 193,

    // Computed (224..)
    CurrentMpg = 224,
    SpeedMph = 225,
    CoolantTempF = 226,
}

impl ParamId {
    /// Every real identity, catalogue order.
    pub const ALL: [ParamId; 38] = [
        ParamId::EngineSpeed,
        ParamId::EngineLoad,
        ParamId::PedalPosition,
        ParamId::CoolantTemp,
        ParamId::OilTemp,
        ParamId::OilPressure,
        ParamId::IntakeTemp,
        ParamId::BoostPressure,
        ParamId::BarometricPressure,
        ParamId::EngineHours,
        ParamId::TransOilTemp,
        ParamId::TransOilPressure,
        ParamId::CurrentGear,
        ParamId::SelectedGear,
        ParamId::OutputShaftSpeed,
        ParamId::VehicleSpeed,
        ParamId::CruiseSetSpeed,
        ParamId::CruiseActive,
        ParamId::ParkingBrake,
        ParamId::BrakeSwitch,
        ParamId::FuelLevel1,
        ParamId::FuelLevel2,
        ParamId::FuelRate,
        ParamId::InstFuelEconomy,
        ParamId::AvgFuelEconomy,
        ParamId::TotalFuelUsed,
        ParamId::BatteryVoltage,
        ParamId::ChargingVoltage,
        ParamId::AmbientTemp,
        ParamId::CabTemp,
        ParamId::TotalDistance,
        ParamId::TripADistance,
        ParamId::TripBDistance,
        ParamId::ActiveDtcCount,
        ParamId::MilStatus,
        ParamId::CurrentMpg,
        ParamId::SpeedMph,
        ParamId::CoolantTempF,
    ];

    /// Dense-array index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::None => "None",
            ParamId::EngineSpeed => "Engine Speed",
            ParamId::EngineLoad => "Engine Load",
            ParamId::PedalPosition => "Throttle Position",
            ParamId::CoolantTemp => "Coolant Temperature",
            ParamId::OilTemp => "Oil Temperature",
            ParamId::OilPressure => "Oil Pressure",
            ParamId::IntakeTemp => "Intake Temperature",
            ParamId::BoostPressure => "Boost Pressure",
            ParamId::BarometricPressure => "Barometric Pressure",
            ParamId::EngineHours => "Engine Hours",
            ParamId::TransOilTemp => "Trans Oil Temp",
            ParamId::TransOilPressure => "Trans Oil Pressure",
            ParamId::CurrentGear => "Current Gear",
            ParamId::SelectedGear => "Selected Gear",
            ParamId::OutputShaftSpeed => "Output Shaft Speed",
            ParamId::VehicleSpeed => "Vehicle Speed",
            ParamId::CruiseSetSpeed => "Cruise Set Speed",
            ParamId::CruiseActive => "Cruise Active",
            ParamId::ParkingBrake => "Parking Brake",
            ParamId::BrakeSwitch => "Brake Switch",
            ParamId::FuelLevel1 => "Fuel Level 1",
            ParamId::FuelLevel2 => "Fuel Level 2",
            ParamId::FuelRate => "Fuel Rate",
            ParamId::InstFuelEconomy => "Inst Fuel Economy",
            ParamId::AvgFuelEconomy => "Avg Fuel Economy",
            ParamId::TotalFuelUsed => "Total Fuel Used",
            ParamId::BatteryVoltage => "Battery Voltage",
            ParamId::ChargingVoltage => "Charging Voltage",
            ParamId::AmbientTemp => "Ambient Temperature",
            ParamId::CabTemp => "Cab Temperature",
            ParamId::TotalDistance => "Total Distance",
            ParamId::TripADistance => "Trip A Distance",
            ParamId::TripBDistance => "Trip B Distance",
            ParamId::ActiveDtcCount => "Active DTC Count",
            ParamId::MilStatus => "MIL Status",
            ParamId::CurrentMpg => "Current MPG",
            ParamId::SpeedMph => "Speed",
            ParamId::CoolantTempF => "Coolant Temp",
        }
    }

    /// Canonical engineering unit, empty for flags and counts.
    pub fn unit(self) -> &'static str {
        match self {
            ParamId::EngineSpeed | ParamId::OutputShaftSpeed => "rpm",
            ParamId::EngineLoad | ParamId::PedalPosition => "%",
            ParamId::FuelLevel1 | ParamId::FuelLevel2 => "%",
            ParamId::CoolantTemp
            | ParamId::OilTemp
            | ParamId::IntakeTemp
            | ParamId::TransOilTemp
            | ParamId::AmbientTemp
            | ParamId::CabTemp => "\u{b0}C",
            ParamId::CoolantTempF => "\u{b0}F",
            ParamId::OilPressure
            | ParamId::BoostPressure
            | ParamId::BarometricPressure
            | ParamId::TransOilPressure => "kPa",
            ParamId::EngineHours => "h",
            ParamId::VehicleSpeed | ParamId::CruiseSetSpeed => "km/h",
            ParamId::SpeedMph => "mph",
            ParamId::FuelRate => "L/h",
            ParamId::InstFuelEconomy | ParamId::AvgFuelEconomy => "km/L",
            ParamId::TotalFuelUsed => "L",
            ParamId::BatteryVoltage | ParamId::ChargingVoltage => "V",
            ParamId::TotalDistance | ParamId::TripADistance | ParamId::TripBDistance => "km",
            ParamId::CurrentMpg => "mpg",
            _ => "",
        }
    }

    /// Domain band, `None` for the reserved identity.
    pub fn domain(self) -> Option<Domain> {
        let raw = self as u8;
        Some(match raw {
            0 => return None,
            1..=31 => Domain::Engine,
            32..=63 => Domain::Transmission,
            64..=95 => Domain::Vehicle,
            96..=127 => Domain::Fuel,
            128..=143 => Domain::Electrical,
            144..=159 => Domain::Environmental,
            160..=191 => Domain::Distance,
            192..=223 => Domain::Diagnostics,
            _ => Domain::Computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_stay_in_the_dense_range() {
        for id in ParamId::ALL {
            assert!(id.index() < PARAM_CAPACITY);
            assert_ne!(id, ParamId::None);
        }
    }

    #[test]
    fn catalogue_has_names_and_domains() {
        for id in ParamId::ALL {
            assert!(!id.name().is_empty());
            assert!(id.domain().is_some(), "{id:?}");
        }
        assert!(ParamId::None.domain().is_none());
    }

    #[test]
    fn banding_matches_domains() {
        assert_eq!(ParamId::EngineSpeed.domain(), Some(Domain::Engine));
        assert_eq!(ParamId::CurrentGear.domain(), Some(Domain::Transmission));
        assert_eq!(ParamId::VehicleSpeed.domain(), Some(Domain::Vehicle));
        assert_eq!(ParamId::FuelRate.domain(), Some(Domain::Fuel));
        assert_eq!(ParamId::BatteryVoltage.domain(), Some(Domain::Electrical));
        assert_eq!(ParamId::AmbientTemp.domain(), Some(Domain::Environmental));
        assert_eq!(ParamId::TotalDistance.domain(), Some(Domain::Distance));
        assert_eq!(ParamId::ActiveDtcCount.domain(), Some(Domain::Diagnostics));
        assert_eq!(ParamId::CurrentMpg.domain(), Some(Domain::Computed));
    }

    #[test]
    fn units_are_si_except_the_computed_imperials() {
        assert_eq!(ParamId::VehicleSpeed.unit(), "km/h");
        assert_eq!(ParamId::SpeedMph.unit(), "mph");
        assert_eq!(ParamId::CoolantTemp.unit(), "\u{b0}C");
        assert_eq!(ParamId::MilStatus.unit(), "");
    }
}

//! Unit conversions used across the dashboard.
//!
//! The store keeps SI (or SI-adjacent) units: degrees C, km/h, kPa, litres.
//! Display layers and computed parameters convert at the edge.

/// Degrees Celsius to Fahrenheit.
pub fn c_to_f(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}

/// Degrees Fahrenheit to Celsius.
pub fn f_to_c(f: f32) -> f32 {
    (f - 32.0) * 5.0 / 9.0
}

/// Kilometres per hour to miles per hour.
pub fn kmh_to_mph(kmh: f32) -> f32 {
    kmh * 0.621371
}

/// Miles per hour to kilometres per hour.
pub fn mph_to_kmh(mph: f32) -> f32 {
    mph * 1.60934
}

/// Kilopascal to pounds per square inch.
pub fn kpa_to_psi(kpa: f32) -> f32 {
    kpa * 0.145038
}

/// Pounds per square inch to kilopascal.
pub fn psi_to_kpa(psi: f32) -> f32 {
    psi * 6.89476
}

/// Kilopascal to bar.
pub fn kpa_to_bar(kpa: f32) -> f32 {
    kpa * 0.01
}

/// Litres to US gallons.
pub fn l_to_gal(l: f32) -> f32 {
    l * 0.264172
}

/// US gallons to litres.
pub fn gal_to_l(gal: f32) -> f32 {
    gal * 3.78541
}

/// Kilometres per litre to miles per US gallon.
pub fn km_per_l_to_mpg(kpl: f32) -> f32 {
    kpl * 2.35215
}

/// Litres per 100 km to miles per US gallon.
pub fn l_per_100km_to_mpg(l100: f32) -> f32 {
    235.215 / l100
}

/// Miles per US gallon to litres per 100 km.
pub fn mpg_to_l_per_100km(mpg: f32) -> f32 {
    235.215 / mpg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn temperature_round_trips() {
        assert!(close(c_to_f(100.0), 212.0));
        assert!(close(f_to_c(212.0), 100.0));
        assert!(close(f_to_c(c_to_f(37.5)), 37.5));
    }

    #[test]
    fn speed_round_trips() {
        assert!(close(mph_to_kmh(60.0), 96.56));
        assert!(close(kmh_to_mph(mph_to_kmh(55.0)), 55.0));
    }

    #[test]
    fn pressure_and_volume() {
        assert!(close(kpa_to_psi(psi_to_kpa(35.0)), 35.0));
        assert!(close(kpa_to_bar(100.0), 1.0));
        assert!(close(gal_to_l(l_to_gal(200.0)), 200.0));
    }

    #[test]
    fn economy_conversions_agree() {
        // 23.5215 L/100km is 10 mpg, and 10 km/L is 23.5215 mpg.
        assert!(close(l_per_100km_to_mpg(23.5215), 10.0));
        assert!(close(mpg_to_l_per_100km(10.0), 23.5215));
        assert!(close(km_per_l_to_mpg(10.0), 23.5215));
    }
}

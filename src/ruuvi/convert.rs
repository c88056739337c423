use crate::models::{ConvertedReading, RawReading};

/// Scale raw RAWv2 integers into physical units
///
/// Sentinel "not available" values (e.g. 0x8000 temperature) are converted like any
/// other value.
pub fn convert(raw: &RawReading) -> ConvertedReading {
    ConvertedReading {
        // 0.005 °C per bit
        temperature_c: f64::from(raw.temperature) * 0.005,
        // 0.0025 % per bit, not capped
        humidity_pct: f64::from(raw.humidity) * 0.0025,
        // Pa with -50000 offset, reported in kPa
        pressure_kpa: (f64::from(raw.pressure) + 50000.0) / 1000.0,
        // mV above 1600, reported in V
        battery_voltage_v: (f64::from(raw.power_info >> 5) + 1600.0) / 1000.0,
        // 2 dBm steps from -40 dBm
        tx_power_dbm: -40.0 + 2.0 * f64::from(raw.power_info & 0x1F),
        address: raw.address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HardwareAddress;

    fn raw(temperature: i16, humidity: u16, pressure: u16, power_info: u16) -> RawReading {
        RawReading {
            temperature,
            humidity,
            pressure,
            acceleration_x: 0,
            acceleration_y: 0,
            acceleration_z: 0,
            power_info,
            movement_counter: 0,
            measurement_sequence: 0,
            address: HardwareAddress([0; 6]),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn documented_conversions() {
        let converted = convert(&raw(412, 10192, 51028, 0xC59C));
        assert!(close(converted.temperature_c, 2.06));
        assert!(close(converted.humidity_pct, 25.48));
        assert!(close(converted.pressure_kpa, 101.028));
        assert!(close(converted.battery_voltage_v, 3.18));
        assert!(close(converted.tx_power_dbm, 16.0));
    }

    #[test]
    fn negative_temperature() {
        let converted = convert(&raw(-1000, 0, 0, 0));
        assert!(close(converted.temperature_c, -5.0));
        assert!(close(converted.pressure_kpa, 50.0));
        assert!(close(converted.battery_voltage_v, 1.6));
        assert!(close(converted.tx_power_dbm, -40.0));
    }

    #[test]
    fn extremes_are_not_clamped() {
        let converted = convert(&raw(i16::MIN, u16::MAX, u16::MAX, u16::MAX));
        assert!(close(converted.temperature_c, -163.84));
        assert!(close(converted.humidity_pct, 163.8375));
        assert!(close(converted.pressure_kpa, 115.535));
        assert!(close(converted.battery_voltage_v, 3.647));
        assert!(close(converted.tx_power_dbm, 22.0));
    }

    #[test]
    fn address_is_carried_over() {
        let mut input = raw(0, 0, 0, 0);
        input.address = HardwareAddress([1, 2, 3, 4, 5, 6]);
        assert_eq!(convert(&input).address, input.address);
    }
}

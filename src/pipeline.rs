/// Per-advertisement pipeline: vendor guard, decode, convert, attribute, emit
use async_trait::async_trait;
use log::{debug, log_enabled, trace, Level};
use time::OffsetDateTime;

use crate::models::{ConvertedReading, PhysicalReading, SensorIdentity};
use crate::registry::{match_sensor, SensorRegistry};
use crate::ruuvi::{self, DecodeError};

/// Ruuvi Innovations Ltd. manufacturer ID (0x0499)
pub const RUUVI_MANUFACTURER_ID: u16 = 1177;

/// One manufacturer data entry observed by the scanner
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub vendor_id: u16,
    pub payload: Vec<u8>,
    pub rssi: Option<i16>,
    pub observed_at: OffsetDateTime,
}

/// Why an advertisement produced no reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    ForeignVendor,
    UnrecognizedFormat,
    Truncated,
    NoMatch,
}

impl From<DecodeError> for Discard {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::UnrecognizedFormat(_) => Discard::UnrecognizedFormat,
            DecodeError::Truncated { .. } => Discard::Truncated,
        }
    }
}

/// Destination for attributed readings
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn store(&self, reading: &PhysicalReading) -> Result<(), String>;
}

/// Combine converted values with the sensor identity and capture time
pub fn assemble(
    converted: ConvertedReading,
    sensor: &SensorIdentity,
    rssi_dbm: Option<f64>,
    captured_at: OffsetDateTime,
) -> PhysicalReading {
    PhysicalReading {
        sensor_name: sensor.name.clone(),
        temperature_c: converted.temperature_c,
        humidity_pct: converted.humidity_pct,
        pressure_kpa: converted.pressure_kpa,
        battery_voltage_v: converted.battery_voltage_v,
        tx_power_dbm: converted.tx_power_dbm,
        rssi_dbm,
        captured_at,
    }
}

/// Run one advertisement through the pipeline without side effects
pub fn process(
    advertisement: &Advertisement,
    registry: &SensorRegistry,
) -> Result<PhysicalReading, Discard> {
    if advertisement.vendor_id != RUUVI_MANUFACTURER_ID {
        return Err(Discard::ForeignVendor);
    }

    let raw = ruuvi::decode_payload(&advertisement.payload).map_err(|e| {
        debug!("Dropping advertisement: {}", e);
        Discard::from(e)
    })?;

    let sensor = match match_sensor(registry, &raw.address) {
        Some(sensor) => sensor,
        None => {
            trace!("Ignoring unknown sensor {}", raw.address);
            return Err(Discard::NoMatch);
        }
    };

    let (acc_x, acc_y, acc_z) = raw.acceleration_g();
    trace!(
        "{}: acceleration=({:.3}, {:.3}, {:.3}) g, movements={}, sequence={}",
        sensor.name,
        acc_x,
        acc_y,
        acc_z,
        raw.movement_counter,
        raw.measurement_sequence
    );

    Ok(assemble(
        ruuvi::convert(&raw),
        sensor,
        advertisement.rssi.map(f64::from),
        advertisement.observed_at,
    ))
}

/// One-line summary of a reading for the log
pub fn describe(reading: &PhysicalReading) -> String {
    let rssi = match reading.rssi_dbm {
        Some(rssi) => format!("{:.0} dBm", rssi),
        None => "n/a".to_string(),
    };
    format!(
        "{}: temp={:.2}°C, humidity={:.2}%, pressure={:.3} kPa, battery={:.3} V, tx_power={:.0} dBm, rssi={}",
        reading.sensor_name,
        reading.temperature_c,
        reading.humidity_pct,
        reading.pressure_kpa,
        reading.battery_voltage_v,
        reading.tx_power_dbm,
        rssi
    )
}

/// Process an advertisement and hand a matched reading to the sink exactly once
///
/// Returns whether a reading was emitted. Discarded advertisements are not errors;
/// only a failing sink is.
pub async fn forward<S: ReadingSink + ?Sized>(
    advertisement: &Advertisement,
    registry: &SensorRegistry,
    sink: &S,
) -> Result<bool, String> {
    let reading = match process(advertisement, registry) {
        Ok(reading) => reading,
        Err(_) => return Ok(false),
    };

    if log_enabled!(Level::Debug) {
        debug!("Got data from {}", describe(&reading));
    }

    sink.store(&reading).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HardwareAddress, RawReading};
    use crate::registry::SensorRegistryEntry;
    use std::sync::Mutex;
    use time::macros::datetime;

    const BEDROOM: HardwareAddress = HardwareAddress::new([0xE6, 0x99, 0x94, 0x26, 0xC5, 0xC3]);

    fn registry() -> SensorRegistry {
        SensorRegistry::new(vec![SensorRegistryEntry {
            location: "Master bedroom".to_string(),
            address: BEDROOM,
        }])
    }

    fn raw(address: HardwareAddress) -> RawReading {
        RawReading {
            temperature: 412,
            humidity: 10192,
            pressure: 51028,
            acceleration_x: 0,
            acceleration_y: 0,
            acceleration_z: 1000,
            power_info: 0xC59C,
            movement_counter: 3,
            measurement_sequence: 42,
            address,
        }
    }

    fn advertisement(vendor_id: u16, payload: Vec<u8>) -> Advertisement {
        Advertisement {
            vendor_id,
            payload,
            rssi: Some(-71),
            observed_at: datetime!(2024-05-01 12:00:00 UTC),
        }
    }

    #[derive(Default)]
    struct VecSink(Mutex<Vec<PhysicalReading>>);

    #[async_trait]
    impl ReadingSink for VecSink {
        async fn store(&self, reading: &PhysicalReading) -> Result<(), String> {
            self.0.lock().unwrap().push(reading.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ReadingSink for FailingSink {
        async fn store(&self, _reading: &PhysicalReading) -> Result<(), String> {
            Err("database unavailable".to_string())
        }
    }

    #[test]
    fn assembles_matched_reading() {
        let adv = advertisement(RUUVI_MANUFACTURER_ID, raw(BEDROOM).encode().to_vec());
        let reading = process(&adv, &registry()).unwrap();

        assert_eq!(reading.sensor_name, "Master bedroom");
        assert!((reading.temperature_c - 2.06).abs() < 1e-9);
        assert!((reading.humidity_pct - 25.48).abs() < 1e-9);
        assert!((reading.pressure_kpa - 101.028).abs() < 1e-9);
        assert!((reading.battery_voltage_v - 3.18).abs() < 1e-9);
        assert!((reading.tx_power_dbm - 16.0).abs() < 1e-9);
        assert_eq!(reading.rssi_dbm, Some(-71.0));
        assert_eq!(reading.captured_at, datetime!(2024-05-01 12:00:00 UTC));
    }

    #[test]
    fn log_line_includes_tx_power_and_rssi() {
        let adv = advertisement(RUUVI_MANUFACTURER_ID, raw(BEDROOM).encode().to_vec());
        let mut reading = process(&adv, &registry()).unwrap();

        let line = describe(&reading);
        assert!(line.starts_with("Master bedroom: temp=2.06°C"));
        assert!(line.contains("battery=3.180 V"));
        assert!(line.contains("tx_power=16 dBm"));
        assert!(line.ends_with("rssi=-71 dBm"));

        reading.rssi_dbm = None;
        assert!(describe(&reading).ends_with("rssi=n/a"));
    }

    #[test]
    fn rssi_is_optional() {
        let mut adv = advertisement(RUUVI_MANUFACTURER_ID, raw(BEDROOM).encode().to_vec());
        adv.rssi = None;
        assert_eq!(process(&adv, &registry()).unwrap().rssi_dbm, None);
    }

    #[test]
    fn discards_are_classified() {
        let registry = registry();
        let payload = raw(BEDROOM).encode().to_vec();

        assert_eq!(
            process(&advertisement(76, payload.clone()), &registry),
            Err(Discard::ForeignVendor)
        );

        let mut wrong_format = payload.clone();
        wrong_format[0] = 3;
        assert_eq!(
            process(&advertisement(RUUVI_MANUFACTURER_ID, wrong_format), &registry),
            Err(Discard::UnrecognizedFormat)
        );

        assert_eq!(
            process(&advertisement(RUUVI_MANUFACTURER_ID, Vec::new()), &registry),
            Err(Discard::UnrecognizedFormat)
        );

        assert_eq!(
            process(
                &advertisement(RUUVI_MANUFACTURER_ID, payload[..20].to_vec()),
                &registry
            ),
            Err(Discard::Truncated)
        );

        let stranger = raw(HardwareAddress::new([1, 2, 3, 4, 5, 6])).encode().to_vec();
        assert_eq!(
            process(&advertisement(RUUVI_MANUFACTURER_ID, stranger), &registry),
            Err(Discard::NoMatch)
        );
    }

    #[tokio::test]
    async fn forward_emits_once_per_match() {
        let sink = VecSink::default();
        let registry = registry();
        let adv = advertisement(RUUVI_MANUFACTURER_ID, raw(BEDROOM).encode().to_vec());

        assert_eq!(forward(&adv, &registry, &sink).await, Ok(true));
        assert_eq!(sink.0.lock().unwrap().len(), 1);

        let stranger = advertisement(
            RUUVI_MANUFACTURER_ID,
            raw(HardwareAddress::new([0; 6])).encode().to_vec(),
        );
        assert_eq!(forward(&stranger, &registry, &sink).await, Ok(false));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn forward_reports_sink_failure() {
        let adv = advertisement(RUUVI_MANUFACTURER_ID, raw(BEDROOM).encode().to_vec());
        let result = forward(&adv, &registry(), &FailingSink).await;
        assert_eq!(result, Err("database unavailable".to_string()));
    }
}

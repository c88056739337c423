use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use time::OffsetDateTime;

/// 48-bit hardware (MAC) address as broadcast in the RuuviTag payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress(pub [u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hardware address '{0}', expected xx:xx:xx:xx:xx:xx")]
pub struct AddressParseError(pub String);

impl HardwareAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        HardwareAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = AddressParseError;

    /// Parse "AA:BB:CC:DD:EE:FF" (either case). Every octet must be exactly two hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');

        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }

        if parts.next().is_some() {
            return Err(err());
        }

        Ok(HardwareAddress(bytes))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Undecoded RAWv2 fields, exactly as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub temperature: i16,
    pub humidity: u16,
    pub pressure: u16,
    pub acceleration_x: i16,
    pub acceleration_y: i16,
    pub acceleration_z: i16,
    /// Battery voltage (upper 11 bits) and TX power (lower 5 bits)
    pub power_info: u16,
    pub movement_counter: u8,
    pub measurement_sequence: u16,
    pub address: HardwareAddress,
}

/// Physical quantities derived from a `RawReading`, before sensor attribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertedReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_kpa: f64,
    pub battery_voltage_v: f64,
    pub tx_power_dbm: f64,
    pub address: HardwareAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentity {
    pub name: String,
    pub address: HardwareAddress,
}

/// A decoded reading attributed to a configured sensor, ready for the sink
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalReading {
    pub sensor_name: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_kpa: f64,
    pub battery_voltage_v: f64,
    pub tx_power_dbm: f64,
    pub rssi_dbm: Option<f64>,
    pub captured_at: OffsetDateTime,
}

/// Configured sensors and attribution of decoded readings to them
use serde::Deserialize;

use crate::models::{HardwareAddress, SensorIdentity};

/// One configured sensor: display name (location) and payload MAC address
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorRegistryEntry {
    pub location: String,
    pub address: HardwareAddress,
}

/// Ordered, immutable set of known sensors
///
/// Built once at startup and shared read-only between concurrent lookups.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<SensorIdentity>,
}

impl SensorRegistry {
    pub fn new(entries: Vec<SensorRegistryEntry>) -> Self {
        let sensors = entries
            .into_iter()
            .map(|entry| SensorIdentity {
                name: entry.location,
                address: entry.address,
            })
            .collect();
        SensorRegistry { sensors }
    }

    /// First sensor in configuration order whose address equals `address`
    pub fn lookup(&self, address: &HardwareAddress) -> Option<&SensorIdentity> {
        self.sensors.iter().find(|sensor| sensor.address == *address)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorIdentity> {
        self.sensors.iter()
    }
}

/// Attribute a decoded address to a configured sensor, `None` for foreign devices
pub fn match_sensor<'a>(
    registry: &'a SensorRegistry,
    address: &HardwareAddress,
) -> Option<&'a SensorIdentity> {
    registry.lookup(address)
}

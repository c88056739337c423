/// Per-device bookkeeping between BlueZ events and pipeline input
use bluer::Address;
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::pipeline::Advertisement;

#[derive(Debug, Default)]
struct DeviceState {
    rssi: Option<i16>,
    /// Last payload forwarded per manufacturer ID
    last_payloads: HashMap<u16, Vec<u8>>,
}

/// Turns device property updates into advertisements, each packet at most once
///
/// BlueZ re-reports cached manufacturer data when a device reappears in a new
/// discovery session. A payload identical to the last one forwarded for the same
/// device and manufacturer is the same packet (RAWv2 carries a sequence number),
/// so it is suppressed.
#[derive(Debug, Default)]
pub struct AdvertisementTracker {
    devices: HashMap<Address, DeviceState>,
}

impl AdvertisementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_rssi(&mut self, device: Address, rssi: Option<i16>) {
        self.devices.entry(device).or_default().rssi = rssi;
    }

    /// New advertisements in `manufacturer_data`, stamped `observed_at`
    pub fn observe(
        &mut self,
        device: Address,
        manufacturer_data: HashMap<u16, Vec<u8>>,
        observed_at: OffsetDateTime,
    ) -> Vec<Advertisement> {
        let state = self.devices.entry(device).or_default();
        let mut advertisements = Vec::new();

        for (vendor_id, payload) in manufacturer_data {
            if state.last_payloads.get(&vendor_id) == Some(&payload) {
                continue;
            }
            state.last_payloads.insert(vendor_id, payload.clone());
            advertisements.push(Advertisement {
                vendor_id,
                payload,
                rssi: state.rssi,
                observed_at,
            });
        }

        advertisements
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Bluetooth Low Energy scanning for manufacturer-specific advertisements
use bluer::{AdapterEvent, DeviceEvent, DeviceProperty};
use futures_util::stream::SelectAll;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::bluetooth::tracker::AdvertisementTracker;
use crate::pipeline::Advertisement;

/// Open and power on the named Bluetooth controller, or the default one
pub async fn open_adapter(name: Option<&str>) -> Result<bluer::Adapter, bluer::Error> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e);
        }
    };

    let adapter = match name {
        Some(name) => session.adapter(name),
        None => session.default_adapter().await,
    };
    let adapter = match adapter {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get Bluetooth adapter {:?}: {}", name, e);
            return Err(e);
        }
    };

    // Ensure Bluetooth adapter is powered on
    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e);
    }

    info!("Using Bluetooth adapter {}", adapter.name());
    Ok(adapter)
}

/// Run LE discovery and send every new manufacturer data packet as it is reported
///
/// Advertisements are stamped when BlueZ reports them, together with the device's
/// latest RSSI. Vendor filtering is left to the pipeline. Returns when discovery
/// ends or the receiver is dropped. `tracker` outlives a single discovery session so
/// packets BlueZ still caches from an earlier session are not sent again.
pub async fn watch_advertisements(
    adapter: &bluer::Adapter,
    tracker: &mut AdvertisementTracker,
    tx: mpsc::Sender<Advertisement>,
) -> Result<(), bluer::Error> {
    // Configure discovery filter for Low Energy devices only
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: true, // Report every advertisement, not only changed ones
        ..Default::default()
    };

    // Apply the discovery filter (warn if it fails, but continue)
    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    let discovery = match adapter.discover_devices().await {
        Ok(discovery_stream) => discovery_stream,
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e);
        }
    };
    let mut discovery = Box::pin(discovery);
    let mut device_events = SelectAll::new();

    loop {
        tokio::select! {
            event = discovery.next() => match event {
                Some(AdapterEvent::DeviceAdded(addr)) => {
                    let device = match adapter.device(addr) {
                        Ok(device) => device,
                        Err(_) => continue,
                    };

                    tracker.update_rssi(addr, device.rssi().await.ok().flatten());
                    match device.manufacturer_data().await {
                        Ok(Some(manufacturer_data)) => {
                            let observed = tracker.observe(addr, manufacturer_data, OffsetDateTime::now_utc());
                            if !send_all(&tx, observed).await {
                                return Ok(());
                            }
                        }
                        Ok(None) => {}
                        Err(e) => debug!("Failed to get manufacturer data for {}: {}", addr, e),
                    }

                    match device.events().await {
                        Ok(events) => device_events.push(Box::pin(events.map(move |event| (addr, event)))),
                        Err(e) => debug!("Failed to watch {}: {}", addr, e),
                    }
                }
                Some(event) => debug!("Discovery event: {:?}", event),
                None => break,
            },
            Some((addr, event)) = device_events.next(), if !device_events.is_empty() => {
                if let DeviceEvent::PropertyChanged(property) = event {
                    match property {
                        DeviceProperty::Rssi(rssi) => tracker.update_rssi(addr, Some(rssi)),
                        DeviceProperty::ManufacturerData(manufacturer_data) => {
                            let observed = tracker.observe(addr, manufacturer_data, OffsetDateTime::now_utc());
                            if !send_all(&tx, observed).await {
                                return Ok(());
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    info!("Discovery ended after tracking {} devices", tracker.len());
    Ok(())
}

/// False once the receiving side is gone
async fn send_all(tx: &mpsc::Sender<Advertisement>, advertisements: Vec<Advertisement>) -> bool {
    for advertisement in advertisements {
        if tx.send(advertisement).await.is_err() {
            return false;
        }
    }
    true
}

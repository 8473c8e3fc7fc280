/// Bluetooth Low Energy scanning for beacon advertisements
///
/// Records come from the property-change events BlueZ emits for every
/// received advertisement, never from its device cache, so a beacon that is
/// not heard during the window yields nothing.
use bluer::{Adapter, AdapterEvent, Address, DeviceEvent, DeviceProperty};
use futures_util::stream::{SelectAll, Stream, StreamExt};
use log::{debug, error, warn};
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use tokio::time::{sleep, Duration};

use crate::bluetooth::format::AD_TYPE_MANUFACTURER_DATA;
use crate::models::AdvertisementRecord;

type DeviceChanges = Pin<Box<dyn Stream<Item = (Address, DeviceEvent)>>>;

/// Rebuild the manufacturer specific AD structures of an advertisement
///
/// BlueZ hands us manufacturer data already split by company identifier;
/// this turns it back into `length | 0xFF | company (LE) | data` structures
/// so the filter sees the same bytes that went over the air.
pub fn manufacturer_payload(manufacturer_data: &HashMap<u16, Vec<u8>>) -> Vec<u8> {
    let mut companies: Vec<_> = manufacturer_data.keys().copied().collect();
    companies.sort_unstable();

    let mut payload = Vec::new();
    for company in companies {
        let data = &manufacturer_data[&company];
        // length covers type byte + company identifier + data
        let len = data.len() + 3;
        if len > u8::MAX as usize {
            warn!("Skipping oversized manufacturer data for 0x{:04X}", company);
            continue;
        }
        payload.push(len as u8);
        payload.push(AD_TYPE_MANUFACTURER_DATA);
        payload.extend_from_slice(&company.to_le_bytes());
        payload.extend_from_slice(data);
    }
    payload
}

/// Advertisements heard during one scan window
///
/// Each manufacturer data change is one received advertisement. RSSI
/// changes only update the signal strength attached to later records.
#[derive(Debug, Default)]
pub struct AdvertisementLog {
    rssi: HashMap<Address, i16>,
    records: Vec<AdvertisementRecord>,
}

impl AdvertisementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one device property change
    pub fn observe(&mut self, address: Address, property: DeviceProperty) {
        match property {
            DeviceProperty::Rssi(rssi) => {
                self.rssi.insert(address, rssi);
            }
            DeviceProperty::ManufacturerData(data) => self.push(address, &data),
            _ => {}
        }
    }

    fn push(&mut self, address: Address, manufacturer_data: &HashMap<u16, Vec<u8>>) {
        let rssi = self.rssi.get(&address).copied().unwrap_or(i16::MIN);
        self.records.push(AdvertisementRecord::new(
            address.0,
            rssi,
            manufacturer_payload(manufacturer_data),
        ));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<AdvertisementRecord> {
        self.records
    }
}

/// Start following a device reported by discovery
///
/// A device BlueZ did not know before the scan was added because it was just
/// heard, so its current manufacturer data is a fresh advertisement. Cached
/// devices only count once a change event shows they were heard again.
async fn follow_device(
    adapter: &Adapter,
    addr: Address,
    fresh: bool,
    heard: &mut AdvertisementLog,
    changes: &mut SelectAll<DeviceChanges>,
) {
    let device = match adapter.device(addr) {
        Ok(device) => device,
        Err(e) => {
            debug!("Failed to open device {}: {}", addr, e);
            return;
        }
    };

    if fresh {
        if let Ok(Some(rssi)) = device.rssi().await {
            heard.observe(addr, DeviceProperty::Rssi(rssi));
        }
        match device.manufacturer_data().await {
            Ok(Some(data)) => heard.observe(addr, DeviceProperty::ManufacturerData(data)),
            Ok(None) => {}
            Err(e) => debug!("Failed to get manufacturer data for {}: {}", addr, e),
        }
    }

    match device.events().await {
        Ok(events) => changes.push(Box::pin(events.map(move |event| (addr, event)))),
        Err(e) => debug!("Failed to watch device {}: {}", addr, e),
    }
}

/// Scan for advertisements during a bounded window
///
/// Discovery runs for `scan_duration` with duplicate reporting on, and every
/// advertisement received in that time becomes one [`AdvertisementRecord`].
/// Hearing nothing is not an error, the returned batch is simply empty.
///
/// # Returns
/// All records collected in the window, or an error if the adapter could
/// not be brought up
pub async fn scan_advertisements(
    scan_duration: Duration,
) -> Result<Vec<AdvertisementRecord>, Box<dyn std::error::Error>> {
    // Initialize Bluetooth session
    let session = match bluer::Session::new().await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create Bluetooth session: {}", e);
            return Err(e.into());
        }
    };

    let adapter = match session.default_adapter().await {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Failed to get default Bluetooth adapter: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = adapter.set_powered(true).await {
        error!("Failed to power on adapter: {}", e);
        return Err(e.into());
    }

    // Beacons repeat the same payload, so duplicates must be reported
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: true,
        ..Default::default()
    };

    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    let cached: HashSet<Address> = match adapter.device_addresses().await {
        Ok(addresses) => addresses.into_iter().collect(),
        Err(e) => {
            warn!("Failed to get cached device addresses: {}", e);
            HashSet::new()
        }
    };

    let discovery = match adapter.discover_devices_with_changes().await {
        Ok(discovery) => discovery,
        Err(e) => {
            error!("Failed to start device discovery: {}", e);
            return Err(e.into());
        }
    };
    tokio::pin!(discovery);

    let mut heard = AdvertisementLog::new();
    let mut changes: SelectAll<DeviceChanges> = SelectAll::new();
    let deadline = sleep(scan_duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = discovery.next() => match event {
                Some(AdapterEvent::DeviceAdded(addr)) => {
                    let fresh = !cached.contains(&addr);
                    follow_device(&adapter, addr, fresh, &mut heard, &mut changes).await;
                }
                Some(AdapterEvent::DeviceRemoved(addr)) => {
                    debug!("Device {} removed", addr);
                }
                Some(_) => {}
                None => {
                    warn!("Discovery stopped before the scan window ended");
                    break;
                }
            },
            Some((addr, DeviceEvent::PropertyChanged(property))) = changes.next() => {
                heard.observe(addr, property);
            }
        }
    }

    debug!("Scan collected {} advertisement records", heard.len());

    Ok(heard.into_records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::filter::{ad_structures, find_beacon};
    use crate::bluetooth::format::BeaconFormat;

    #[test]
    fn rebuilds_manufacturer_structures() {
        let mut data = HashMap::new();
        data.insert(0x0499u16, vec![0x05, 0x01]);
        data.insert(0x004Cu16, vec![0x02, 0x15, 0xa4]);

        let payload = manufacturer_payload(&data);
        let structures: Vec<_> = ad_structures(&payload).collect();
        assert_eq!(structures.len(), 2);
        assert_eq!(structures[0], (0xff, &[0x4c, 0x00, 0x02, 0x15, 0xa4][..]));
        assert_eq!(structures[1], (0xff, &[0x99, 0x04, 0x05, 0x01][..]));
    }

    #[test]
    fn rebuilt_tilt_payload_is_found() {
        let mut frame = vec![0x02, 0x15];
        frame.extend_from_slice(&[0u8; 16]);
        frame.extend_from_slice(&[0x1a, 0x2c, 0x04, 0x1c, 0xc5]);
        let mut data = HashMap::new();
        data.insert(0x004Cu16, frame);

        let payload = manufacturer_payload(&data);
        assert_eq!(payload[0], 26);
        let beacon = find_beacon(&payload, &BeaconFormat::TILT).unwrap();
        assert_eq!(beacon.len(), BeaconFormat::TILT.frame_len());
    }

    #[test]
    fn empty_manufacturer_data_gives_empty_payload() {
        assert!(manufacturer_payload(&HashMap::new()).is_empty());
    }

    fn tilt_data(temperature: u8) -> HashMap<u16, Vec<u8>> {
        let mut frame = vec![0x02, 0x15];
        frame.extend_from_slice(&[0u8; 16]);
        frame.extend_from_slice(&[0x00, temperature, 0x04, 0x1c, 0xc5]);
        HashMap::from([(0x004Cu16, frame)])
    }

    #[test]
    fn one_record_per_manufacturer_data_change() {
        let tilt = Address([0xc4, 0x7c, 0x8d, 0x6a, 0x11, 0x22]);
        let mut heard = AdvertisementLog::new();
        assert!(heard.is_empty());

        heard.observe(tilt, DeviceProperty::ManufacturerData(tilt_data(67)));
        heard.observe(tilt, DeviceProperty::Rssi(-70));
        heard.observe(tilt, DeviceProperty::ManufacturerData(tilt_data(68)));

        let records = heard.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, tilt.0);
        assert_eq!(records[0].rssi, i16::MIN);
        assert_eq!(records[1].rssi, -70);
        assert_eq!(records[0].payload[23], 67);
        assert_eq!(records[1].payload[23], 68);
    }

    #[test]
    fn rssi_alone_is_not_an_advertisement() {
        let mut heard = AdvertisementLog::new();
        heard.observe(Address([1, 2, 3, 4, 5, 6]), DeviceProperty::Rssi(-40));
        heard.observe(Address([1, 2, 3, 4, 5, 6]), DeviceProperty::Name("Tilt".into()));
        assert!(heard.is_empty());
    }

    #[test]
    fn rssi_is_tracked_per_device() {
        let (a, b) = (Address([1; 6]), Address([2; 6]));
        let mut heard = AdvertisementLog::new();
        heard.observe(a, DeviceProperty::Rssi(-50));
        heard.observe(b, DeviceProperty::ManufacturerData(tilt_data(60)));
        heard.observe(a, DeviceProperty::ManufacturerData(tilt_data(61)));

        let records = heard.into_records();
        assert_eq!(records[0].rssi, i16::MIN);
        assert_eq!(records[1].rssi, -50);
    }
}

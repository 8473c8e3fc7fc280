/// Selection of candidate beacon advertisements from a scan batch
use crate::bluetooth::format::{BeaconFormat, AD_TYPE_MANUFACTURER_DATA};
use crate::models::AdvertisementRecord;

/// Iterate over the AD structures of a raw advertisement payload
///
/// Each structure is `length | type | data`, where `length` covers the type
/// byte and the data. A zero length ends the significant part of the
/// payload; a structure running past the end is discarded.
pub fn ad_structures(payload: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut rest = payload;
    std::iter::from_fn(move || {
        let (&len, tail) = rest.split_first()?;
        let len = len as usize;
        if len == 0 || tail.len() < len {
            rest = &[];
            return None;
        }
        let (structure, next) = tail.split_at(len);
        rest = next;
        Some((structure[0], &structure[1..]))
    })
}

/// Find the manufacturer data carrying a beacon of the given format
///
/// Only the company identifier, sub-type and length header are checked
/// here; the identifier and readings are the decoder's business.
pub fn find_beacon<'a>(payload: &'a [u8], format: &BeaconFormat) -> Option<&'a [u8]> {
    ad_structures(payload)
        .filter(|(ad_type, _)| *ad_type == AD_TYPE_MANUFACTURER_DATA)
        .map(|(_, data)| data)
        .find(|data| header_matches(data, format))
}

fn header_matches(data: &[u8], format: &BeaconFormat) -> bool {
    if data.len() < format.header_len() {
        return false;
    }
    let company = u16::from_le_bytes([
        data[format.company_offset],
        data[format.company_offset + 1],
    ]);
    company == format.company_id
        && data[format.sub_type_offset] == format.sub_type
        && data[format.length_offset] == format.length
}

/// Whether a record looks like a beacon of the given format
pub fn matches(record: &AdvertisementRecord, format: &BeaconFormat) -> bool {
    find_beacon(&record.payload, format).is_some()
}

/// Keep only the records matching the beacon shape, in their original order
///
/// Everything else is dropped silently: other devices advertising nearby are
/// the normal case, not an error.
pub fn filter(records: &[AdvertisementRecord], format: &BeaconFormat) -> Vec<AdvertisementRecord> {
    records
        .iter()
        .filter(|record| matches(record, format))
        .cloned()
        .collect()
}

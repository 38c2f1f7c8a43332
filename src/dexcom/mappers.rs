//! Projection of vendor payloads into the shapes this API returns.

use serde::{Deserialize, Serialize};

/// `GET /v3/users/self/devices` body.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    pub records: Vec<VendorDevice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDevice {
    pub transmitter_generation: String,
    pub display_device: String,
    pub last_upload_date: String,
}

/// A receiver or app the user uploads glucose data from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub generation: String,
    pub display_name: String,
    pub last_upload_timestamp: String,
}

impl From<VendorDevice> for DeviceRecord {
    fn from(d: VendorDevice) -> Self {
        DeviceRecord {
            generation: d.transmitter_generation,
            display_name: d.display_device,
            last_upload_timestamp: d.last_upload_date,
        }
    }
}

/// Order-preserving, field-complete projection.
pub fn map_devices(resp: DevicesResponse) -> Vec<DeviceRecord> {
    resp.records.into_iter().map(DeviceRecord::from).collect()
}

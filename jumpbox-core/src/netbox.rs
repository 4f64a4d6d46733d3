//! Netbox payload decoding.
//!
//! Netbox returns devices as loosely-typed JSON objects whose related
//! fields (`site`, `role`, `tenant`, ...) are nested objects. This module
//! turns one page of that into strict [`DeviceRecord`]s, dropping records
//! that cannot be reached rather than failing the whole page.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::DeviceRecord;

/// One page of a Netbox list endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct DevicePage {
    #[serde(default)]
    pub count: Option<u64>,
    /// Absolute URL of the following page, null on the last one
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<Value>,
}

/// Why a single raw device could not become a [`DeviceRecord`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("device object has no id")]
    MissingId,
    #[error("device {id} has no primary management address")]
    MissingAddress { id: String },
}

/// First page URL for the device listing.
///
/// Only devices with a primary IP are requested, since nothing else can be
/// dispatched to.
pub fn devices_url(base_url: &str, page_size: u32) -> String {
    format!(
        "{}/dcim/devices/?limit={}&has_primary_ip=true",
        base_url.trim_end_matches('/'),
        page_size
    )
}

/// Maps raw Netbox device objects into [`DeviceRecord`]s
#[derive(Clone, Debug)]
pub struct DeviceMapper {
    grouping: Vec<String>,
    strip_member_suffix: bool,
}

impl DeviceMapper {
    pub fn new(grouping: Vec<String>) -> Self {
        Self {
            grouping,
            strip_member_suffix: false,
        }
    }

    pub fn with_strip_member_suffix(mut self, strip: bool) -> Self {
        self.strip_member_suffix = strip;
        self
    }

    pub fn map(&self, raw: &Value) -> Result<DeviceRecord, RecordError> {
        let id = match raw.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(RecordError::MissingId),
        };

        let address = ["primary_ip", "primary_ip4", "primary_ip6"]
            .iter()
            .filter_map(|field| lookup(raw, &format!("{}.address", field)))
            .map(|addr| strip_prefix_len(&addr).to_string())
            .find(|addr| !addr.is_empty())
            .ok_or_else(|| RecordError::MissingAddress { id: id.clone() })?;

        let mut name = ["name", "display", "display_name"]
            .iter()
            .filter_map(|field| lookup(raw, field))
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| format!("device-{}", id));
        if self.strip_member_suffix {
            name = strip_member_suffix(&name).to_string();
        }

        let groups = self
            .grouping
            .iter()
            .map(|key| {
                lookup(raw, key).or_else(|| {
                    // Netbox < 4.0 calls the device role `device_role`
                    (key == "role").then(|| lookup(raw, "device_role")).flatten()
                })
            })
            .collect();

        Ok(DeviceRecord {
            id,
            name,
            address,
            groups,
            status: lookup(raw, "status"),
        })
    }

    /// Map every record of a page, skipping (and logging) the ones that fail.
    pub fn map_page(&self, page: &DevicePage) -> Vec<DeviceRecord> {
        page.results
            .iter()
            .filter_map(|raw| match self.map(raw) {
                Ok(device) => Some(device),
                Err(e) => {
                    tracing::warn!("skipping inventory record: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Resolve a dotted path (`device_type.manufacturer`) to display text.
///
/// Objects resolve to their first present `name`, `display`, `label` or
/// `value`; strings are trimmed, numbers and booleans stringified. Null,
/// blank and missing all mean "no value".
pub fn lookup(raw: &Value, path: &str) -> Option<String> {
    let value = path
        .split('.')
        .try_fold(raw, |v, segment| v.get(segment))?;
    scalar_text(value)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => ["name", "display", "label", "value"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(scalar_text),
        Value::Null | Value::Array(_) => None,
    }
}

/// `10.0.0.1/24` -> `10.0.0.1`
pub fn strip_prefix_len(address: &str) -> &str {
    let address = address.trim();
    match address.rsplit_once('/') {
        Some((host, len)) if !len.is_empty() && len.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => address,
    }
}

/// `core-sw1-2` -> `core-sw1`: one trailing `-<digit>` stack member suffix.
pub fn strip_member_suffix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 1].is_ascii_digit() && bytes[n - 2] == b'-' {
        &name[..n - 2]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper() -> DeviceMapper {
        DeviceMapper::new(vec!["site".into(), "role".into()])
    }

    #[test]
    fn test_map_netbox_device() {
        let raw = json!({
            "id": 17,
            "name": "core-sw1",
            "display": "core-sw1",
            "primary_ip": { "id": 4, "address": "10.0.0.1/24", "family": { "value": 4 } },
            "site": { "id": 1, "name": "nyc", "slug": "nyc" },
            "role": { "id": 2, "name": "switch", "slug": "switch" },
            "status": { "value": "active", "label": "Active" },
            "custom_fields": {}
        });
        let device = mapper().map(&raw).unwrap();
        assert_eq!(device.id, "17");
        assert_eq!(device.name, "core-sw1");
        assert_eq!(device.address, "10.0.0.1");
        assert_eq!(
            device.groups,
            vec![Some("nyc".to_string()), Some("switch".to_string())]
        );
        assert_eq!(device.status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_missing_address_is_rejected() {
        let raw = json!({ "id": 3, "name": "lab-fw", "primary_ip": null });
        assert_eq!(
            mapper().map(&raw),
            Err(RecordError::MissingAddress { id: "3".into() })
        );

        let blank = json!({ "id": 4, "name": "lab-fw2", "primary_ip": { "address": "  " } });
        assert!(mapper().map(&blank).is_err());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let raw = json!({ "name": "ghost", "primary_ip": { "address": "10.9.9.9/32" } });
        assert_eq!(mapper().map(&raw), Err(RecordError::MissingId));
    }

    #[test]
    fn test_address_falls_back_to_ipv4_then_ipv6() {
        let raw = json!({
            "id": 5,
            "name": "edge1",
            "primary_ip": null,
            "primary_ip6": { "address": "2001:db8::1/64" }
        });
        assert_eq!(mapper().map(&raw).unwrap().address, "2001:db8::1");
    }

    #[test]
    fn test_legacy_device_role_and_missing_site() {
        let raw = json!({
            "id": 6,
            "name": "rtr1",
            "primary_ip4": { "address": "192.0.2.1/32" },
            "site": null,
            "device_role": { "name": "router" }
        });
        let device = mapper().map(&raw).unwrap();
        assert_eq!(device.groups, vec![None, Some("router".to_string())]);
    }

    #[test]
    fn test_name_fallbacks() {
        let raw = json!({ "id": 9, "name": null, "primary_ip": { "address": "10.1.1.1" } });
        assert_eq!(mapper().map(&raw).unwrap().name, "device-9");

        let display = json!({ "id": 9, "display": "unnamed-pdu", "primary_ip": { "address": "10.1.1.1" } });
        assert_eq!(mapper().map(&display).unwrap().name, "unnamed-pdu");
    }

    #[test]
    fn test_member_suffix_stripping() {
        let raw = json!({ "id": 1, "name": "stack-a-2", "primary_ip": { "address": "10.0.0.5/24" } });
        let plain = mapper().map(&raw).unwrap();
        assert_eq!(plain.name, "stack-a-2");

        let stripped = mapper().with_strip_member_suffix(true).map(&raw).unwrap();
        assert_eq!(stripped.name, "stack-a");
    }

    #[test]
    fn test_dotted_grouping_path() {
        let raw = json!({
            "id": 1,
            "name": "fw1",
            "primary_ip": { "address": "10.0.0.9" },
            "device_type": { "model": "PA-3220", "manufacturer": { "name": "Palo Alto" } }
        });
        let device = DeviceMapper::new(vec!["device_type.manufacturer".into()])
            .map(&raw)
            .unwrap();
        assert_eq!(device.groups, vec![Some("Palo Alto".to_string())]);
    }

    #[test]
    fn test_map_page_skips_invalid_records() {
        let page: DevicePage = serde_json::from_value(json!({
            "count": 3,
            "next": null,
            "previous": null,
            "results": [
                { "id": 1, "name": "a", "primary_ip": { "address": "10.0.0.1/24" } },
                { "id": 2, "name": "b", "primary_ip": null },
                { "id": 3, "name": "c", "primary_ip": { "address": "10.0.0.3/24" } }
            ]
        }))
        .unwrap();
        let devices = mapper().map_page(&page);
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_strip_helpers() {
        assert_eq!(strip_prefix_len("10.0.0.1/24"), "10.0.0.1");
        assert_eq!(strip_prefix_len("host.example.net"), "host.example.net");
        assert_eq!(strip_prefix_len("2001:db8::1/128"), "2001:db8::1");
        assert_eq!(strip_member_suffix("sw-1"), "sw");
        assert_eq!(strip_member_suffix("sw-12"), "sw-12");
        assert_eq!(strip_member_suffix("sw1"), "sw1");
    }

    #[test]
    fn test_devices_url() {
        assert_eq!(
            devices_url("https://nb.local/api/", 500),
            "https://nb.local/api/dcim/devices/?limit=500&has_primary_ip=true"
        );
    }
}

use async_trait::async_trait;
use thiserror::Error;

use crate::model::DeviceRecord;

/// Coarse failure category of an inventory fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryCause {
    Transport,
    Status,
    Decode,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("inventory returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("inventory response from {url} could not be decoded: {reason}")]
    Decode { url: String, reason: String },
}

impl InventoryError {
    pub fn cause(&self) -> InventoryCause {
        match self {
            Self::Transport { .. } => InventoryCause::Transport,
            Self::Status { .. } => InventoryCause::Status,
            Self::Decode { .. } => InventoryCause::Decode,
        }
    }
}

/// A source of device records.
///
/// - `NetboxClient` (binary crate): paginated reads from the Netbox REST API
/// - [`StaticInventory`]: a fixed list, for tests and offline use
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch every dispatchable device, in inventory order.
    ///
    /// Records that fail validation are dropped by the source; an empty
    /// result is not an error.
    async fn fetch(&self) -> Result<Vec<DeviceRecord>, InventoryError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Inventory backed by an in-memory list
#[derive(Clone, Debug, Default)]
pub struct StaticInventory {
    devices: Vec<DeviceRecord>,
}

impl StaticInventory {
    pub fn new(devices: Vec<DeviceRecord>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn fetch(&self) -> Result<Vec<DeviceRecord>, InventoryError> {
        Ok(self
            .devices
            .iter()
            .filter(|d| !d.address.trim().is_empty())
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, address: &str) -> DeviceRecord {
        DeviceRecord {
            id: id.into(),
            name: format!("dev-{}", id),
            address: address.into(),
            groups: vec![],
            status: None,
        }
    }

    #[tokio::test]
    async fn test_static_inventory_drops_unaddressed() {
        let source = StaticInventory::new(vec![
            device("1", "10.0.0.1"),
            device("2", ""),
            device("3", "host3.example.net"),
        ]);
        let devices = source.fetch().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_error_cause_tags() {
        let err = InventoryError::Status {
            url: "http://nb/api".into(),
            status: 503,
        };
        assert_eq!(err.cause(), InventoryCause::Status);
        assert_eq!(err.to_string(), "inventory returned HTTP 503 for http://nb/api");
    }
}

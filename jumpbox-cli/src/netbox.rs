use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use jumpbox_core::config::NetboxSettings;
use jumpbox_core::inventory::{InventoryError, InventorySource};
use jumpbox_core::model::DeviceRecord;
use jumpbox_core::netbox::{DeviceMapper, DevicePage, devices_url};

/// Upper bound on followed `next` links, in case a proxy rewrites them into a loop
const MAX_PAGES: usize = 10_000;

/// Reads devices from the Netbox REST API
pub struct NetboxClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    mapper: DeviceMapper,
}

impl NetboxClient {
    pub fn new(
        settings: &NetboxSettings,
        token: Option<String>,
        grouping: Vec<String>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&auth_header(&token))
                .context("Netbox token contains invalid characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .user_agent(concat!("jumpbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.url.trim().to_string(),
            page_size: settings.page_size,
            mapper: DeviceMapper::new(grouping)
                .with_strip_member_suffix(settings.strip_member_suffix),
        })
    }

    async fn get_page(&self, url: &str) -> Result<DevicePage, InventoryError> {
        let transport = |e: reqwest::Error| InventoryError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self.http.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InventoryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|e| InventoryError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Netbox v2 tokens (`nbt_...`) use the Bearer scheme, legacy tokens use `Token`
fn auth_header(token: &str) -> String {
    if token.starts_with("nbt_") {
        format!("Bearer {}", token)
    } else {
        format!("Token {}", token)
    }
}

#[async_trait]
impl InventorySource for NetboxClient {
    async fn fetch(&self) -> Result<Vec<DeviceRecord>, InventoryError> {
        let mut devices = Vec::new();
        let mut next = Some(devices_url(&self.base_url, self.page_size));
        let mut pages = 0;

        while let Some(url) = next {
            if pages == MAX_PAGES {
                return Err(InventoryError::Decode {
                    url,
                    reason: format!("gave up after {} pages", MAX_PAGES),
                });
            }
            tracing::debug!(%url, "fetching device page");
            let page = self.get_page(&url).await?;
            let mapped = self.mapper.map_page(&page);
            if mapped.len() < page.results.len() {
                tracing::warn!(
                    skipped = page.results.len() - mapped.len(),
                    "dropped devices without a usable id or address"
                );
            }
            devices.extend(mapped);
            next = page.next.filter(|n| !n.is_empty());
            pages += 1;
        }

        Ok(devices)
    }

    fn name(&self) -> &'static str {
        "netbox"
    }
}

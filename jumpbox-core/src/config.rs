use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "JUMPBOX_CONFIG";
/// Environment variable that overrides the configured Netbox token
pub const TOKEN_ENV: &str = "NETBOX_TOKEN";

const SYSTEM_PATHS: [&str; 2] = ["/etc/jumpbox/jumpbox.yml", "/etc/jumpbox/jumpbox.yaml"];

/// Inventory API connection settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NetboxSettings {
    /// API root, e.g. `https://netbox.example.net/api`
    pub url: String,

    /// Inline API token
    #[serde(default)]
    pub token: Option<String>,

    /// File holding the API token (content is trimmed)
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Devices requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Drop a trailing `-<digit>` stack member suffix from device names
    #[serde(default)]
    pub strip_member_suffix: bool,

    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_page_size() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    10
}

/// Where the menu lands after a session ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTo {
    /// Back at the group the device was picked from
    #[default]
    SameDepth,
    Root,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MenuSettings {
    #[serde(default = "default_title")]
    pub title: String,

    /// Device attributes forming the menu hierarchy, outermost first
    #[serde(default = "default_grouping")]
    pub grouping: Vec<String>,

    #[serde(default)]
    pub return_to: ReturnTo,

    /// Allow `connect <host>` to reach hosts outside the inventory
    #[serde(default)]
    pub quick_connect: bool,
}

fn default_title() -> String {
    "Jumpbox".into()
}
fn default_grouping() -> Vec<String> {
    vec!["site".into(), "role".into()]
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            grouping: default_grouping(),
            return_to: ReturnTo::default(),
            quick_connect: false,
        }
    }
}

/// Outbound SSH invocation settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SshSettings {
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments placed before the target (identity file, options, ...)
    #[serde(default)]
    pub args: Vec<String>,

    /// Default remote username
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Ask for a username before each session when none is configured
    #[serde(default)]
    pub prompt_username: bool,
}

fn default_program() -> String {
    "ssh".into()
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            username: None,
            port: None,
            prompt_username: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogSettings {
    /// Directory for the daily rolling log; logging is off when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            level: default_level(),
        }
    }
}

/// Root configuration file structure
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct JumpboxConfig {
    pub netbox: NetboxSettings,

    #[serde(default)]
    pub menu: MenuSettings,

    #[serde(default)]
    pub ssh: SshSettings,

    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("no config file found, searched: {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl JumpboxConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: JumpboxConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Locate and load the config file.
    ///
    /// An explicit path wins; otherwise `JUMPBOX_CONFIG`, the system paths
    /// under `/etc/jumpbox`, then `~/.jumpbox.yml`.
    pub fn discover(explicit: Option<&Path>) -> Result<(PathBuf, Self), ConfigError> {
        if let Some(path) = explicit {
            return Ok((path.to_path_buf(), Self::load(path)?));
        }

        let mut candidates = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            candidates.push(PathBuf::from(env_path));
        }
        candidates.extend(SYSTEM_PATHS.iter().map(PathBuf::from));
        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join(".jumpbox.yml"));
        }

        Self::discover_in(&candidates)
    }

    /// First existing file among `candidates`
    pub fn discover_in(candidates: &[PathBuf]) -> Result<(PathBuf, Self), ConfigError> {
        for path in candidates {
            if path.exists() {
                return Ok((path.clone(), Self::load(path)?));
            }
        }
        Err(ConfigError::NotFound {
            searched: candidates.to_vec(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.netbox.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("netbox.url is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "netbox.url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.netbox.page_size == 0 {
            return Err(ConfigError::Invalid("netbox.page_size must be positive".into()));
        }
        if self.ssh.program.trim().is_empty() {
            return Err(ConfigError::Invalid("ssh.program is empty".into()));
        }
        if let Some(key) = self.menu.grouping.iter().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("empty grouping key '{}'", key)));
        }
        Ok(())
    }

    /// Resolve the API token: `NETBOX_TOKEN`, then `token`, then `token_file`.
    pub fn token(&self) -> Result<Option<String>, ConfigError> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(Some(token.trim().to_string()));
            }
        }
        self.netbox.configured_token()
    }
}

impl NetboxSettings {
    /// Token from the config file alone, ignoring the environment
    pub fn configured_token(&self) -> Result<Option<String>, ConfigError> {
        if let Some(token) = &self.token {
            return Ok(Some(token.trim().to_string()));
        }
        match &self.token_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
netbox:
  url: https://netbox.example.net/api
"#;
        let config = JumpboxConfig::from_str(yaml).unwrap();
        assert_eq!(config.netbox.page_size, 1000);
        assert_eq!(config.netbox.timeout_secs, 10);
        assert_eq!(config.menu.grouping, vec!["site", "role"]);
        assert_eq!(config.menu.return_to, ReturnTo::SameDepth);
        assert!(!config.menu.quick_connect);
        assert_eq!(config.ssh.program, "ssh");
        assert!(config.log.dir.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
netbox:
  url: http://netbox.local/api
  token: abc123
  page_size: 50
  strip_member_suffix: true
menu:
  title: NOC Jumpbox
  grouping: [site, tenant, role]
  return_to: root
  quick_connect: true
ssh:
  program: /usr/bin/ssh
  args: ["-o", "StrictHostKeyChecking=yes"]
  username: netops
  port: 2222
log:
  dir: /var/log/jumpbox
  level: debug
"#;
        let config = JumpboxConfig::from_str(yaml).unwrap();
        assert_eq!(config.netbox.page_size, 50);
        assert!(config.netbox.strip_member_suffix);
        assert_eq!(config.menu.grouping.len(), 3);
        assert_eq!(config.menu.return_to, ReturnTo::Root);
        assert_eq!(config.ssh.username.as_deref(), Some("netops"));
        assert_eq!(config.ssh.port, Some(2222));
        assert_eq!(config.netbox.configured_token().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let yaml = r#"
netbox:
  url: netbox.local
"#;
        let result = JumpboxConfig::from_str(yaml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let yaml = r#"
netbox:
  url: https://netbox.local/api
  page_size: 0
"#;
        assert!(matches!(
            JumpboxConfig::from_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_netbox_section_is_yaml_error() {
        let result = JumpboxConfig::from_str("menu:\n  title: x\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret-token  ").unwrap();
        let settings = NetboxSettings {
            url: "https://netbox.local/api".into(),
            token: None,
            token_file: Some(file.path().to_path_buf()),
            page_size: 10,
            timeout_secs: 1,
            strip_member_suffix: false,
            accept_invalid_certs: false,
        };
        assert_eq!(settings.configured_token().unwrap().as_deref(), Some("s3cret-token"));
    }

    #[test]
    fn test_discover_in_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let present = dir.path().join("jumpbox.yml");
        std::fs::write(&present, "netbox:\n  url: https://nb.local/api\n").unwrap();

        let (path, config) = JumpboxConfig::discover_in(&[missing, present.clone()]).unwrap();
        assert_eq!(path, present);
        assert_eq!(config.netbox.url, "https://nb.local/api");
    }

    #[test]
    fn test_discover_in_reports_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        let err = JumpboxConfig::discover_in(std::slice::from_ref(&missing)).unwrap_err();
        match err {
            ConfigError::NotFound { searched } => assert_eq!(searched, vec![missing]),
            other => panic!("unexpected error: {other}"),
        }
    }
}

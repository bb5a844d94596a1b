//! # Configuration
//!
//! Engine-wide settings that used to be process globals (is an S4 connector
//! present, is this host an AD member) travel in an explicit [`EngineConfig`]
//! value. Every object receives it through its [`Context`](crate::Context), so
//! tests can vary it per instance.
//!
//! ## Sources
//!
//! Resolved in priority order by [`confique`]:
//! 1. **Environment variables**: `UDM_S4CONNECTOR_PRESENT`, `UDM_AD_MEMBER_MODE`, ...
//! 2. **Config file**: a TOML file passed to [`EngineConfig::load`].
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `s4connector_present` | `false` | SIDs are derived from the uid number (`S-1-4-<uid>`) |
//! | `ad_member_mode` | `false` | Properties flagged `readonly_when_synced` are locked on synced objects |
//! | `policy_create_max_retries` | `32` | Attempts to find a free policy name before giving up |
//! | `temporary_move_container_prefix` | `temporary_move_container_` | Name of the helper container for case-only moves |
//! | `kerberos_realm` | `EXAMPLE.COM` | Realm appended to computer principals |
//! | `domain_sid` | `S-1-5-21-0-0-0` | Domain SID prefix for algorithmic RIDs |
//! | `max_move_depth` | `1000` | Recursion guard for subtree walks |

use crate::error::Result;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// An S4 connector synchronizes this domain with Samba 4.
    #[config(env = "UDM_S4CONNECTOR_PRESENT", default = false)]
    pub s4connector_present: bool,

    /// The domain is a member of an Active Directory; synced objects are
    /// partially read-only.
    #[config(env = "UDM_AD_MEMBER_MODE", default = false)]
    pub ad_member_mode: bool,

    #[config(env = "UDM_POLICY_CREATE_MAX_RETRIES", default = 32)]
    pub policy_create_max_retries: u32,

    #[config(default = "temporary_move_container_")]
    pub temporary_move_container_prefix: String,

    #[config(env = "UDM_KERBEROS_REALM", default = "EXAMPLE.COM")]
    pub kerberos_realm: String,

    #[config(env = "UDM_DOMAIN_SID", default = "S-1-5-21-0-0-0")]
    pub domain_sid: String,

    #[config(default = 1000)]
    pub max_move_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            s4connector_present: false,
            ad_member_mode: false,
            policy_create_max_retries: 32,
            temporary_move_container_prefix: "temporary_move_container_".to_string(),
            kerberos_realm: "EXAMPLE.COM".to_string(),
            domain_sid: "S-1-5-21-0-0-0".to_string(),
            max_move_depth: 1000,
        }
    }
}

impl EngineConfig {
    /// Load from the environment layered over `path` (if it exists) over
    /// compiled defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = EngineConfig::builder()
            .env()
            .file(path.as_ref())
            .load()?;
        Ok(config)
    }

    /// Kerberos principal for a host: `host/<fqdn>@<REALM>`.
    pub fn host_principal(&self, fqdn: &str) -> String {
        format!("host/{}@{}", fqdn, self.kerberos_realm.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.s4connector_present);
        assert!(!config.ad_member_mode);
        assert_eq!(config.policy_create_max_retries, 32);
        assert_eq!(
            config.temporary_move_container_prefix,
            "temporary_move_container_"
        );
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("udm.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        let overrides = EngineConfig {
            s4connector_present: true,
            policy_create_max_retries: 5,
            kerberos_realm: "CORP.TEST".to_string(),
            ..Default::default()
        };
        write!(file, "{}", toml::to_string(&overrides).unwrap()).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert!(config.s4connector_present);
        assert_eq!(config.policy_create_max_retries, 5);
        assert_eq!(config.kerberos_realm, "CORP.TEST");
        assert_eq!(config.max_move_depth, 1000);
    }

    #[test]
    fn test_host_principal_uppercases_realm() {
        let config = EngineConfig {
            kerberos_realm: "corp.test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.host_principal("pc1.corp.test"),
            "host/pc1.corp.test@CORP.TEST"
        );
    }
}

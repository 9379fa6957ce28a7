//! Node configuration.
//!
//! Loaded from a TOML file with CLI overrides; defaults apply when the
//! file is absent. The chain core reads none of this; the mode, listen
//! address, and peer knobs parameterize the transport collaborator.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Node operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Chain, mempool, miner, and shell.
    #[default]
    Full,
    /// No mining; otherwise as full.
    Light,
    /// Discovery-only node: no chain, no shell.
    Boot,
}

impl fmt::Display for NodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMode::Full => f.write_str("full"),
            NodeMode::Light => f.write_str("light"),
            NodeMode::Boot => f.write_str("boot"),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Operating mode.
    #[serde(default)]
    pub mode: NodeMode,
    /// Network listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Maximum peer connections.
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,
    /// Whether the DHT runs in server mode.
    #[serde(default)]
    pub dht_server_mode: bool,
    /// Bootstrap peer multiaddresses.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:7600".to_string()
}

fn default_max_peers() -> usize {
    32
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mode: NodeMode::default(),
            listen_addr: default_listen_addr(),
            max_peers: default_max_peers(),
            dht_server_mode: false,
            bootstrap_peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file and CLI args.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("failed to read config file")?;
            toml::from_str(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        if let Some(ref mode) = args.mode {
            config.mode = match mode.to_lowercase().as_str() {
                "light" => NodeMode::Light,
                "boot" => NodeMode::Boot,
                _ => NodeMode::Full,
            };
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(max_peers) = args.max_peers {
            config.max_peers = max_peers;
        }
        if let Some(ref level) = args.log_level {
            config.log_level = level.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();

        assert_eq!(config.mode, NodeMode::Full);
        assert_eq!(config.log_level, "info");
        assert!(config.bootstrap_peers.is_empty());
    }

    #[test]
    fn test_parse_with_partial_fields() {
        let config: NodeConfig = toml::from_str(
            r#"
            mode = "boot"
            bootstrap_peers = ["/ip4/10.0.0.1/tcp/7600"]
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, NodeMode::Boot);
        assert_eq!(config.bootstrap_peers.len(), 1);
        assert_eq!(config.max_peers, 32);
    }

    #[test]
    fn test_load_applies_file_then_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galena.toml");
        std::fs::write(&path, "mode = \"light\"\nlog_level = \"debug\"\n").unwrap();

        let args = crate::Args {
            config: path.clone(),
            mode: None,
            listen: Some("127.0.0.1:9000".to_string()),
            max_peers: None,
            log_level: None,
        };
        let config = NodeConfig::load(&path, &args).unwrap();

        assert_eq!(config.mode, NodeMode::Light);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_round_trip() {
        let config = NodeConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.mode, config.mode);
        assert_eq!(parsed.listen_addr, config.listen_addr);
    }
}

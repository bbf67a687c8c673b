use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/batchdl/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory every relative destination is resolved against.
    pub root_path: Option<PathBuf>,
    /// Concurrency used when a request does not name one.
    pub default_concurrency: i64,
    /// Bytes per second used when a request does not name a throttle (0 = unlimited).
    pub default_throttle_bytes_per_sec: i64,
    /// Whole-request timeout in seconds; zero or negative means 600.
    pub max_timeout_secs: i64,
    pub connect_timeout_secs: u64,
    /// Receive buffer size in bytes.
    pub chunk_size: usize,
    /// Control socket path for `serve`. None = `$XDG_STATE_HOME/batchdl/control.sock`.
    pub socket_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            default_concurrency: 3,
            default_throttle_bytes_per_sec: 0,
            max_timeout_secs: 600,
            connect_timeout_secs: 30,
            chunk_size: 80 * 1024,
            socket_path: None,
        }
    }
}

impl AgentConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        u64::try_from(self.max_timeout_secs)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(600)
    }

    /// Root for destinations: configured path, else `$XDG_DOWNLOAD_DIR`, else the cwd.
    pub fn effective_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root_path {
            return Ok(root.clone());
        }
        match std::env::var_os("XDG_DOWNLOAD_DIR") {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => Ok(std::env::current_dir()?),
        }
    }

    pub fn effective_socket_path(&self) -> Result<PathBuf> {
        match &self.socket_path {
            Some(p) => Ok(p.clone()),
            None => default_socket_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("batchdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

pub fn default_socket_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("batchdl")?;
    Ok(xdg_dirs.place_state_file("control.sock")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AgentConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AgentConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: AgentConfig = toml::from_str(&data)?;
    Ok(cfg)
}

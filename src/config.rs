use crate::constants::{
    FTP_DEFAULT_HOME, FTP_DEFAULT_PORT, FTP_DEFAULT_USER, INACTIVITY_TIMER, TFTP_DEFAULT_PORT,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory served to clients, every path is confined below it.
    pub root: PathBuf,
    /// FTP control port, 0 disables the FTP service.
    pub ftp_port: u16,
    /// TFTP port, 0 disables the TFTP service.
    pub tftp_port: u16,
    /// Address advertised in PASV replies, e.g. a NAT's public address.
    pub pasv_address: Option<Ipv4Addr>,
    /// Seconds without command or data activity before a session is dropped.
    pub inactivity_timeout: u64,
    /// Accept a root directory the unprivileged user can write to.
    pub writable: bool,
    /// Account to switch to when started with elevated privileges.
    pub ftp_user: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(FTP_DEFAULT_HOME),
            ftp_port: FTP_DEFAULT_PORT,
            tftp_port: TFTP_DEFAULT_PORT,
            pasv_address: None,
            inactivity_timeout: INACTIVITY_TIMER.as_secs(),
            writable: false,
            ftp_user: String::from(FTP_DEFAULT_USER),
        }
    }
}

impl ServerConfig {
    pub fn inactivity(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout.max(1))
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolves the configured root to its canonical form.
    ///
    /// The sandbox compares canonical paths against this value, so a root
    /// that cannot be canonicalized is fatal at startup.
    pub fn canonicalize_root(&mut self) -> Result<()> {
        let root = self.server.root.canonicalize().with_context(|| {
            format!("Cannot access FTP root {}", self.server.root.display())
        })?;
        self.server.root = root;
        Ok(())
    }
}

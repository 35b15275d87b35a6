//! Service configuration.
//!
//! Read from a YAML file; any field may be omitted. Command-line flags
//! override file values.
//!
//! ```yaml
//! addr: ":3000"
//! model_path: typing.dnn
//! data_dir: database
//! base_csv: free-text.csv
//! ext_csv: free-text-new.csv
//! static_dir: web
//! load_policy: keep_on_failure
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use keyprint::LoadPolicy;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address; a leading `:` binds all interfaces.
    pub addr: String,
    pub model_path: PathBuf,
    pub data_dir: PathBuf,
    /// Reference dataset. Relative paths resolve under `data_dir`.
    pub base_csv: PathBuf,
    /// Dataset new samples are appended to. Relative paths resolve under
    /// `data_dir`.
    pub ext_csv: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    pub load_policy: LoadPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            model_path: PathBuf::from("typing.dnn"),
            data_dir: PathBuf::from("database"),
            base_csv: PathBuf::from("free-text.csv"),
            ext_csv: PathBuf::from("free-text-new.csv"),
            static_dir: None,
            load_policy: LoadPolicy::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("read config {}", path.display()))?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(&data).with_context(|| format!("parse config {}", path.display()))
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn base_csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.base_csv)
    }

    pub fn ext_csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.ext_csv)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.addr)
    }
}

/// Parses `host:port`, or `:port` for all interfaces.
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    addr.parse()
        .with_context(|| format!("invalid listen address {addr:?}"))
}

/// Clap value parser for `--load-policy`.
pub fn parse_load_policy(s: &str) -> std::result::Result<LoadPolicy, String> {
    match s {
        "keep_on_failure" | "keep-on-failure" => Ok(LoadPolicy::KeepOnFailure),
        "release_first" | "release-first" => Ok(LoadPolicy::ReleaseFirst),
        _ => Err(format!(
            "unknown load policy {s:?} (expected keep_on_failure or release_first)"
        )),
    }
}

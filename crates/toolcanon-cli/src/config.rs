//! `toolcanon.toml` loading.
//!
//! ```toml
//! [compaction]
//! item_head = 10
//! item_tail = 5
//!
//! [exec]
//! timeout_secs = 120
//! max_output_bytes = 1048576
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use toolcanon_core::CompactionConfig;
use toolcanon_exec::ExecConfig;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "toolcanon.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub compaction: CompactionConfig,
    pub exec: ExecConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse toolcanon config")
    }

    /// Load `explicit` if given (it must exist), else `./toolcanon.toml` if
    /// present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("load {:?}", path))
    }
}

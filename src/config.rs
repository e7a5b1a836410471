use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};

use crate::layer4::{WolConfig, DEFAULT_WOL_PORT};
use crate::registry::RegistryConfig;

pub const ENV_BROADCAST_ADDR: &str = "WAKEBOT_BROADCAST_ADDR";
pub const ENV_PORT: &str = "WAKEBOT_PORT";
pub const ENV_TOKEN_FILE: &str = "WAKEBOT_TOKEN_FILE";
pub const ENV_DATA_DIR: &str = "WAKEBOT_DATA_DIR";

/// Deserializes an absent field as None and an unset field as T::default.
///
/// This avoid having Option<Option<T>> as in serde_with::rust::double_option
pub fn deserialize_absent_or_null<'de, D, T: Default>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.or(Some(T::default())))
}

/// Expands `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("cannot expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotSection {
    pub token_file: String,
    pub prefix: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            token_file: "token.txt".into(),
            prefix: "%".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub data_dir: String,
    pub file_suffix: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: ".".into(),
            file_suffix: "-macs.json".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WolSection {
    pub broadcast_addr: Option<IpAddr>,
    pub interface: Option<String>,
    pub port: u16,
    pub send_timeout_ms: u64,
}

impl Default for WolSection {
    fn default() -> Self {
        Self {
            broadcast_addr: None,
            interface: None,
            port: DEFAULT_WOL_PORT,
            send_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_absent_or_null")]
    pub bot: Option<BotSection>,

    #[serde(default, deserialize_with = "deserialize_absent_or_null")]
    pub storage: Option<StorageSection>,

    #[serde(default, deserialize_with = "deserialize_absent_or_null")]
    pub wol: Option<WolSection>,
}

impl Config {
    /// Reads the YAML file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!("config file '{}' not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(text)?)
    }

    /// Applies `WAKEBOT_*` overrides, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_BROADCAST_ADDR) {
            let addr = v.parse::<IpAddr>()
                .map_err(|e| anyhow!("{}='{}': {}", ENV_BROADCAST_ADDR, v, e))?;
            self.wol.get_or_insert_with(Default::default).broadcast_addr = Some(addr);
        }
        if let Some(v) = lookup(ENV_PORT) {
            let port = v.parse::<u16>()
                .map_err(|e| anyhow!("{}='{}': {}", ENV_PORT, v, e))?;
            self.wol.get_or_insert_with(Default::default).port = port;
        }
        if let Some(v) = lookup(ENV_TOKEN_FILE) {
            self.bot.get_or_insert_with(Default::default).token_file = v;
        }
        if let Some(v) = lookup(ENV_DATA_DIR) {
            self.storage.get_or_insert_with(Default::default).data_dir = v;
        }
        Ok(())
    }

    pub fn bot(&self) -> BotSection {
        self.bot.clone().unwrap_or_default()
    }

    pub fn storage(&self) -> StorageSection {
        self.storage.clone().unwrap_or_default()
    }

    pub fn wol(&self) -> WolSection {
        self.wol.clone().unwrap_or_default()
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        expand_path(&self.bot().token_file)
    }

    pub fn registry_config(&self) -> Result<RegistryConfig> {
        let storage = self.storage();
        Ok(RegistryConfig {
            data_dir: expand_path(&storage.data_dir)?,
            file_suffix: storage.file_suffix,
        })
    }

    /// Builds the sender configuration; `fallback` is used when no
    /// broadcast address is configured.
    pub fn wol_config(&self, fallback: IpAddr) -> WolConfig {
        let wol = self.wol();
        WolConfig {
            broadcast_addr: wol.broadcast_addr.unwrap_or(fallback),
            port: wol.port,
            send_timeout: Duration::from_millis(wol.send_timeout_ms),
        }
    }
}

/// Reads the bot token. The token is trimmed and must not be empty.
pub fn load_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read bot token from '{}'", path.display()))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(anyhow!("bot token file '{}' is empty", path.display()));
    }
    Ok(token.to_owned())
}

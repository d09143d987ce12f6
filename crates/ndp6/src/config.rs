//! Construction-time configuration.
//!
//! Mirrors the teacher's `NetworkConfig`/`LinkBuilder` shape: a fluent
//! builder with chained setters that consume and return `self`, validated
//! only once at `build()` time into [`Error::ConstructionInvalid`] rather
//! than panicking on a bad field as it's set.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{AddrGenMode, StableType};

/// Validated, immutable engine configuration. Field names and defaults
/// follow the external-interface table exactly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ifindex: i32,
    pub ifname: String,
    pub stable_type: StableType,
    pub network_id: Option<String>,
    pub addr_gen_mode: AddrGenMode,
    pub max_addresses: u32,
    pub router_solicitations: i32,
    pub router_solicitation_interval: u32,
    pub namespace_path: Option<String>,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Parse from a TOML document, e.g. loaded from a config file on disk.
    /// Field names match the builder's setter names.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(input)?;
        raw.into_engine_config()
    }
}

/// Serde-deserializable mirror of [`EngineConfig`], with the same defaults
/// as the builder so a TOML file only needs to name what it overrides.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawConfig {
    ifindex: i32,
    ifname: String,
    #[serde(default)]
    stable_type: RawStableType,
    network_id: Option<String>,
    #[serde(default)]
    addr_gen_mode: RawAddrGenMode,
    #[serde(default = "default_max_addresses")]
    max_addresses: u32,
    #[serde(default = "default_router_solicitations")]
    router_solicitations: i32,
    #[serde(default = "default_router_solicitation_interval")]
    router_solicitation_interval: u32,
    namespace_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawStableType {
    #[default]
    Uuid,
    StableId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawAddrGenMode {
    #[default]
    Eui64,
    StablePrivacy,
}

fn default_max_addresses() -> u32 {
    16
}

fn default_router_solicitations() -> i32 {
    3
}

fn default_router_solicitation_interval() -> u32 {
    4
}

impl RawConfig {
    fn into_engine_config(self) -> Result<EngineConfig> {
        let stable_type = match self.stable_type {
            RawStableType::Uuid => StableType::Uuid,
            RawStableType::StableId => StableType::StableId,
        };
        let addr_gen_mode = match self.addr_gen_mode {
            RawAddrGenMode::Eui64 => AddrGenMode::Eui64,
            RawAddrGenMode::StablePrivacy => AddrGenMode::StablePrivacy,
        };
        validate(
            self.ifindex,
            self.ifname,
            stable_type,
            self.network_id,
            addr_gen_mode,
            self.max_addresses,
            self.router_solicitations,
            self.router_solicitation_interval,
            self.namespace_path,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn validate(
    ifindex: i32,
    ifname: String,
    stable_type: StableType,
    network_id: Option<String>,
    addr_gen_mode: AddrGenMode,
    max_addresses: u32,
    router_solicitations: i32,
    router_solicitation_interval: u32,
    namespace_path: Option<String>,
) -> Result<EngineConfig> {
    if ifindex <= 0 {
        return Err(Error::ConstructionInvalid(format!(
            "ifindex must be > 0, got {ifindex}"
        )));
    }
    if ifname.is_empty() {
        return Err(Error::ConstructionInvalid("ifname must be non-empty".into()));
    }
    if router_solicitations < 1 {
        return Err(Error::ConstructionInvalid(format!(
            "router_solicitations must be >= 1, got {router_solicitations}"
        )));
    }
    if router_solicitation_interval < 1 {
        return Err(Error::ConstructionInvalid(format!(
            "router_solicitation_interval must be >= 1, got {router_solicitation_interval}"
        )));
    }
    Ok(EngineConfig {
        ifindex,
        ifname,
        stable_type,
        network_id,
        addr_gen_mode,
        max_addresses,
        router_solicitations,
        router_solicitation_interval,
        namespace_path,
    })
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    ifindex: Option<i32>,
    ifname: Option<String>,
    stable_type: StableType,
    network_id: Option<String>,
    addr_gen_mode: AddrGenMode,
    max_addresses: u32,
    router_solicitations: i32,
    router_solicitation_interval: u32,
    namespace_path: Option<String>,
}

impl EngineConfigBuilder {
    fn new() -> Self {
        Self {
            ifindex: None,
            ifname: None,
            stable_type: StableType::default(),
            network_id: None,
            addr_gen_mode: AddrGenMode::default(),
            max_addresses: default_max_addresses(),
            router_solicitations: default_router_solicitations(),
            router_solicitation_interval: default_router_solicitation_interval(),
            namespace_path: None,
        }
    }

    pub fn ifindex(mut self, ifindex: i32) -> Self {
        self.ifindex = Some(ifindex);
        self
    }

    pub fn ifname(mut self, ifname: impl Into<String>) -> Self {
        self.ifname = Some(ifname.into());
        self
    }

    pub fn stable_type(mut self, stable_type: StableType) -> Self {
        self.stable_type = stable_type;
        self
    }

    pub fn network_id(mut self, network_id: impl Into<String>) -> Self {
        self.network_id = Some(network_id.into());
        self
    }

    pub fn addr_gen_mode(mut self, mode: AddrGenMode) -> Self {
        self.addr_gen_mode = mode;
        self
    }

    /// 0 disables the address cap.
    pub fn max_addresses(mut self, max_addresses: u32) -> Self {
        self.max_addresses = max_addresses;
        self
    }

    pub fn router_solicitations(mut self, count: i32) -> Self {
        self.router_solicitations = count;
        self
    }

    pub fn router_solicitation_interval(mut self, seconds: u32) -> Self {
        self.router_solicitation_interval = seconds;
        self
    }

    pub fn namespace_path(mut self, path: impl Into<String>) -> Self {
        self.namespace_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        let ifindex = self
            .ifindex
            .ok_or_else(|| Error::ConstructionInvalid("ifindex is required".into()))?;
        let ifname = self
            .ifname
            .ok_or_else(|| Error::ConstructionInvalid("ifname is required".into()))?;
        validate(
            ifindex,
            ifname,
            self.stable_type,
            self.network_id,
            self.addr_gen_mode,
            self.max_addresses,
            self.router_solicitations,
            self.router_solicitation_interval,
            self.namespace_path,
        )
    }
}

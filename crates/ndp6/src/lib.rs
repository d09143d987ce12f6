//! IPv6 Neighbor Discovery / SLAAC state machine.
//!
//! This crate implements the core of IPv6 Stateless Address
//! Autoconfiguration: router-solicitation retransmission, RA merging into a
//! preference-ordered, lifetime-tracked snapshot, per-prefix address
//! synthesis (EUI-64 or RFC 7217 stable-privacy) with DAD retry, lifetime
//! aging, and change notification.
//!
//! The core itself never opens a socket, never performs DAD, and never
//! speaks DHCPv6 — it only reacts to outcomes reported by the caller
//! through the [`io`] capability traits. See [`Engine`] for the full public
//! surface.
//!
//! ```ignore
//! use ndp6::{AddrGenMode, Engine, EngineConfig};
//!
//! let config = EngineConfig::builder()
//!     .ifindex(2)
//!     .ifname("eth0")
//!     .addr_gen_mode(AddrGenMode::Eui64)
//!     .build()?;
//!
//! let mut engine = Engine::new(config, clock, transport, timers, change_sink, deriver);
//! engine.start();
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod namespace;
pub mod reaper;
pub mod scheduler;
pub mod snapshot;
pub mod synth;
pub mod types;

#[cfg(feature = "driver")]
pub mod driver;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{Engine, LinkParams};
pub use error::{Error, Result};
pub use io::{ChangeSink, Clock as ClockTrait, StableDerive, TimerKind, Timers, Transport};
pub use snapshot::{Category, ChangeMask, Snapshot};
pub use types::{
    AddrGenMode, AddressEntry, DhcpLevel, DnsDomainEntry, DnsServerEntry, GatewayEntry, Preference,
    RouteEntry, StableType,
};

//! Capability interfaces the engine is built against.
//!
//! The spec's object model describes a transport *subclass* that overrides
//! two hooks and a process-global monotonic clock. Neither translates
//! directly: Rust has no virtual dispatch chain to hang hooks off of, and a
//! global clock would make the reaper and scheduler untestable. Both become
//! narrow capability traits injected at construction, following the
//! teacher's `Connection`-shaped constructors and its namespace module's
//! guard-returning functions.

use std::net::Ipv6Addr;

use crate::error::Result;
use crate::snapshot::{ChangeMask, Snapshot};
use crate::types::StableType;

/// Monotonic time source, in signed 32-bit seconds. A real driver backs
/// this with `tokio::time::Instant`; tests back it with a `Cell<i32>` they
/// can advance by hand.
pub trait Clock {
    fn now(&self) -> i32;
}

/// The transport-facing hook supplied by an external subclass or strategy.
pub trait Transport {
    /// Send exactly one Router Solicitation on the bound interface.
    fn send_rs(&mut self) -> Result<()>;

    /// One-time transport initialisation, called after the RA-timeout
    /// timer is armed.
    fn start(&mut self) -> Result<()>;
}

/// The three named one-shot timers the engine arms independently. Each
/// `arm` call with an existing pending timer of the same kind replaces it
/// (invariant: at most one timer per kind at any instant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    SendRs,
    Reaper,
    RaTimeout,
}

/// Timer scheduling capability. `arm` schedules `kind` to fire after
/// `delay_secs` seconds, replacing any previously armed timer of the same
/// kind; `cancel` disarms it if pending.
pub trait Timers {
    fn arm(&mut self, kind: TimerKind, delay_secs: u32);
    fn cancel(&mut self, kind: TimerKind);
}

/// Stable-privacy address derivation (RFC 7217), supplied by the caller
/// since the secret key material and hashing scheme live outside this
/// crate's scope.
pub trait StableDerive {
    /// Fill host bits of `address` deterministically from `stable_type`,
    /// `ifname`, `network_id`, and `dad_counter`. Distinct `dad_counter`
    /// values must yield distinct addresses so DAD retry can make progress.
    fn derive_stable(
        &mut self,
        stable_type: StableType,
        address: &Ipv6Addr,
        ifname: &str,
        network_id: Option<&str>,
        dad_counter: u8,
    ) -> Result<Ipv6Addr>;
}

/// The two consumer-facing signals, registered once at construction.
/// Exactly one consumer is required; multi-subscriber fan-out is not a
/// core concern.
pub trait ChangeSink {
    /// Dispatched synchronously before the triggering call returns, with
    /// the post-mutation snapshot visible. The snapshot borrow does not
    /// outlive this call.
    fn config_changed(&mut self, snapshot: Snapshot<'_>, mask: ChangeMask);

    /// The RA-timeout fired before any RA was seen. Carries no snapshot:
    /// no collection mutation is implied.
    fn ra_timeout(&mut self);
}

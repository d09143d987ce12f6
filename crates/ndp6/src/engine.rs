//! The engine: one long-lived object bound to a single network interface.
//!
//! Every public method here is a plain synchronous `&mut self` call, per the
//! concurrency model: no internal locking, no suspension points, the owning
//! event loop serialises calls and delivers timer callbacks between them,
//! never nested inside one.

use std::net::Ipv6Addr;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::io::{ChangeSink, Clock, StableDerive, TimerKind, Timers, Transport};
use crate::namespace;
use crate::reaper::{sweep_expiring, sweep_with_refresh};
use crate::scheduler::Scheduler;
use crate::snapshot::{Category, ChangeMask, Snapshot};
use crate::synth;
use crate::types::{
    AddrGenMode, AddressEntry, DhcpLevel, DnsDomainEntry, DnsServerEntry, GatewayEntry, Preference,
    RouteEntry,
};

/// Scalar link parameters carried by an RA but outside the change-mask's
/// tracked categories (spec's bitmap has no bit for them). Stored for
/// observation; mutating them never triggers a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkParams {
    pub hop_limit: Option<u8>,
    pub mtu: Option<u32>,
    pub reachable_time: Option<u32>,
    pub retrans_timer: Option<u32>,
}

/// The core IPv6 SLAAC state machine.
pub struct Engine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    transport: Box<dyn Transport>,
    timers: Box<dyn Timers>,
    change_sink: Box<dyn ChangeSink>,
    deriver: Box<dyn StableDerive>,

    gateways: Vec<GatewayEntry>,
    addresses: Vec<AddressEntry>,
    routes: Vec<RouteEntry>,
    dns_servers: Vec<DnsServerEntry>,
    dns_domains: Vec<DnsDomainEntry>,

    dhcp_level: DhcpLevel,
    link_params: LinkParams,
    iid: u64,

    scheduler: Scheduler,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        clock: Box<dyn Clock>,
        transport: Box<dyn Transport>,
        timers: Box<dyn Timers>,
        change_sink: Box<dyn ChangeSink>,
        deriver: Box<dyn StableDerive>,
    ) -> Self {
        let scheduler = Scheduler::new(config.router_solicitations, config.router_solicitation_interval);
        Self {
            config,
            clock,
            transport,
            timers,
            change_sink,
            deriver,
            gateways: Vec::new(),
            addresses: Vec::new(),
            routes: Vec::new(),
            dns_servers: Vec::new(),
            dns_domains: Vec::new(),
            dhcp_level: DhcpLevel::default(),
            link_params: LinkParams::default(),
            iid: 0,
            scheduler,
        }
    }

    // -- observation -----------------------------------------------------

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            gateways: &self.gateways,
            addresses: &self.addresses,
            routes: &self.routes,
            dns_servers: &self.dns_servers,
            dns_domains: &self.dns_domains,
            dhcp_level: self.dhcp_level,
            link_params: self.link_params,
        }
    }

    pub fn dhcp_level(&self) -> DhcpLevel {
        self.dhcp_level
    }

    pub fn link_params(&self) -> LinkParams {
        self.link_params
    }

    pub fn solicitations_left(&self) -> i32 {
        self.scheduler.solicitations_left()
    }

    pub fn failed_sends(&self) -> u64 {
        self.scheduler.failed_sends()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- lifecycle ---------------------------------------------------------

    /// Arm the RA-timeout timer, run one-time transport init, and kick off
    /// the first round of router solicitation.
    pub fn start(&mut self) {
        let now = self.clock.now();
        let budget = self.config.router_solicitations as i64;
        let interval = self.config.router_solicitation_interval as i64;
        let delay = (budget * interval + 1).clamp(30, 120) as u32;
        self.timers.arm(TimerKind::RaTimeout, delay);

        self.with_namespace(|engine| {
            if let Err(e) = engine.transport.start() {
                tracing::warn!(error = %e, "transport start failed");
            }
        });

        self.scheduler.solicit(now, self.timers.as_mut());
    }

    /// Dispatch a fired timer by kind.
    pub fn on_timer(&mut self, kind: TimerKind) {
        let now = self.clock.now();
        match kind {
            TimerKind::SendRs => {
                self.with_namespace(|engine| {
                    let now = engine.clock.now();
                    engine
                        .scheduler
                        .on_timer_fire(now, engine.transport.as_mut(), engine.timers.as_mut());
                });
            }
            TimerKind::Reaper => {
                self.run_reaper_sweep(now, ChangeMask::empty());
            }
            TimerKind::RaTimeout => {
                self.change_sink.ra_timeout();
            }
        }
    }

    fn with_namespace<F: FnOnce(&mut Self)>(&mut self, f: F) {
        match self.config.namespace_path.clone() {
            Some(path) => match namespace::enter_path(&path) {
                Ok(guard) => {
                    f(self);
                    drop(guard);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "namespace entry failed, aborting timer callback");
                }
            },
            None => f(self),
        }
    }

    // -- merge engine (spec §4.1) -----------------------------------------

    /// Insert or update a default router, keeping the collection in
    /// descending preference order. Returns whether the snapshot changed.
    pub fn add_gateway(&mut self, new: GatewayEntry) -> bool {
        let mut insertion_index = None;
        let mut i = 0;
        while i < self.gateways.len() {
            if self.gateways[i].address == new.address {
                if new.lifetime == 0 {
                    self.gateways.remove(i);
                    return true;
                }
                if self.gateways[i].preference != new.preference {
                    self.gateways.remove(i);
                    continue;
                }
                self.gateways[i] = new;
                return false;
            }
            if insertion_index.is_none() && self.gateways[i].preference.rank() < new.preference.rank() {
                insertion_index = Some(i);
            }
            i += 1;
        }
        if new.lifetime > 0 {
            let idx = insertion_index.unwrap_or(self.gateways.len());
            self.gateways.insert(idx, new);
            true
        } else {
            false
        }
    }

    /// Preference-ordered insertion identical to `add_gateway`, keyed by
    /// `(network, plen)`. Panics if `plen` is out of `1..=128`: a caller
    /// contract breach, not a runtime condition.
    pub fn add_route(&mut self, new: RouteEntry) -> bool {
        validate_plen(new.plen).expect("add_route precondition violated");

        let mut insertion_index = None;
        let mut i = 0;
        while i < self.routes.len() {
            if self.routes[i].network == new.network && self.routes[i].plen == new.plen {
                if new.lifetime == 0 {
                    self.routes.remove(i);
                    return true;
                }
                if self.routes[i].preference != new.preference {
                    self.routes.remove(i);
                    continue;
                }
                self.routes[i] = new;
                return false;
            }
            if insertion_index.is_none() && self.routes[i].preference.rank() < new.preference.rank() {
                insertion_index = Some(i);
            }
            i += 1;
        }
        if new.lifetime > 0 {
            let idx = insertion_index.unwrap_or(self.routes.len());
            self.routes.insert(idx, new);
            true
        } else {
            false
        }
    }

    pub fn add_dns_server(&mut self, new: DnsServerEntry) -> bool {
        if let Some(i) = self.dns_servers.iter().position(|e| e.address == new.address) {
            if new.lifetime == 0 {
                self.dns_servers.remove(i);
                return true;
            }
            let changed =
                self.dns_servers[i].timestamp != new.timestamp || self.dns_servers[i].lifetime != new.lifetime;
            self.dns_servers[i] = new;
            changed
        } else if new.lifetime > 0 {
            self.dns_servers.push(new);
            true
        } else {
            false
        }
    }

    pub fn add_dns_domain(&mut self, new: DnsDomainEntry) -> bool {
        if let Some(i) = self.dns_domains.iter().position(|e| e.domain == new.domain) {
            if new.lifetime == 0 {
                self.dns_domains.remove(i);
                return true;
            }
            let changed =
                self.dns_domains[i].timestamp != new.timestamp || self.dns_domains[i].lifetime != new.lifetime;
            self.dns_domains[i] = new;
            changed
        } else if new.lifetime > 0 {
            self.dns_domains.push(new);
            true
        } else {
            false
        }
    }

    /// Set the DHCP-level hint parsed from an RA's M/O flags. Part of the
    /// same caller-driven ingress as `add_gateway` et al: the decoder calls
    /// this, accumulates the returned flag into its own mask, then finally
    /// calls `ra_received`.
    pub fn set_dhcp_level(&mut self, level: DhcpLevel) -> bool {
        if self.dhcp_level == level {
            false
        } else {
            self.dhcp_level = level;
            true
        }
    }

    /// Record scalar link parameters (hop limit, MTU, reachable/retrans
    /// timers). These never participate in change notification: the
    /// spec's bitmap has no bit for them.
    pub fn set_link_params(&mut self, params: LinkParams) {
        self.link_params = params;
    }

    /// Resolve host bits via the configured synthesiser, then merge by full
    /// address exactly like the other collections.
    pub fn complete_and_add_address(&mut self, mut new: AddressEntry) -> bool {
        if let Err(e) = synth::complete_address(
            self.config.addr_gen_mode,
            self.iid,
            &mut new,
            self.deriver.as_mut(),
            self.config.stable_type,
            &self.config.ifname,
            self.config.network_id.as_deref(),
        ) {
            tracing::warn!(error = %e, "address synthesis failed, dropping candidate address");
            return false;
        }

        if let Some(i) = self.addresses.iter().position(|e| e.address == new.address) {
            if new.lifetime == 0 {
                self.addresses.remove(i);
                return true;
            }
            let old = &self.addresses[i];
            let old_expiry = old.timestamp as i64 + old.lifetime as i64;
            let old_preferred_expiry = old.timestamp as i64 + old.preferred as i64;
            let new_expiry = new.timestamp as i64 + new.lifetime as i64;
            let new_preferred_expiry = new.timestamp as i64 + new.preferred as i64;
            let changed = old_expiry != new_expiry || old_preferred_expiry != new_preferred_expiry;
            self.addresses[i] = new;
            changed
        } else if new.lifetime > 0 {
            let uncapped = self.config.max_addresses == 0;
            if uncapped || (self.addresses.len() as u32) < self.config.max_addresses {
                self.addresses.push(new);
                true
            } else {
                tracing::warn!(
                    max_addresses = self.config.max_addresses,
                    "address cap reached, dropping new address"
                );
                false
            }
        } else {
            false
        }
    }

    // -- DAD ingress (spec §4.2) -------------------------------------------

    /// The kernel reported a tentative address collision. Retry synthesis
    /// for every stored entry matching `address`; drop any that fail again.
    pub fn dad_failed(&mut self, address: Ipv6Addr) {
        let mut mutated = false;
        let mut i = 0;
        while i < self.addresses.len() {
            if self.addresses[i].address != address {
                i += 1;
                continue;
            }
            let mut entry = self.addresses[i].clone();
            match synth::complete_address(
                self.config.addr_gen_mode,
                self.iid,
                &mut entry,
                self.deriver.as_mut(),
                self.config.stable_type,
                &self.config.ifname,
                self.config.network_id.as_deref(),
            ) {
                Ok(()) => {
                    self.addresses[i] = entry;
                    mutated = true;
                    i += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, %address, "DAD retry failed, dropping address");
                    self.addresses.remove(i);
                    mutated = true;
                }
            }
        }
        if mutated {
            let mut mask = ChangeMask::empty();
            mask.set(Category::Addresses);
            self.emit_change(mask);
        }
    }

    // -- IID rotation (spec §4.7) -------------------------------------------

    /// Install a new interface identifier. Returns whether addresses were
    /// wiped as a result.
    pub fn set_iid(&mut self, new_iid: u64) -> bool {
        if self.config.addr_gen_mode == AddrGenMode::StablePrivacy {
            self.iid = new_iid;
            return false;
        }
        if self.iid == new_iid {
            return false;
        }
        self.iid = new_iid;
        if self.addresses.is_empty() {
            return false;
        }
        self.addresses.clear();
        let mut mask = ChangeMask::empty();
        mask.set(Category::Addresses);
        self.emit_change(mask);
        let now = self.clock.now();
        self.scheduler.solicit(now, self.timers.as_mut());
        true
    }

    // -- RA ingress (spec §6) -----------------------------------------------

    /// Clears the RS and RA-timeout timers, clears the sticky send error,
    /// and runs a reaper sweep whose starting mask is `mask`.
    pub fn ra_received(&mut self, now: i32, mask: ChangeMask) {
        self.scheduler.cancel(self.timers.as_mut());
        self.timers.cancel(TimerKind::RaTimeout);
        self.scheduler.clear_error();
        self.run_reaper_sweep(now, mask);
    }

    // -- lifetime reaper (spec §4.4) -----------------------------------------

    fn run_reaper_sweep(&mut self, now: i32, mut mask: ChangeMask) {
        let now64 = now as i64;

        let gw = sweep_expiring(now64, &mut self.gateways);
        if gw.changed {
            mask.set(Category::Gateways);
        }
        let addr = sweep_expiring(now64, &mut self.addresses);
        if addr.changed {
            mask.set(Category::Addresses);
        }
        let rt = sweep_expiring(now64, &mut self.routes);
        if rt.changed {
            mask.set(Category::Routes);
        }
        let dns_s = sweep_with_refresh(now64, &mut self.dns_servers);
        if dns_s.changed {
            mask.set(Category::DnsServers);
        }
        let dns_d = sweep_with_refresh(now64, &mut self.dns_domains);
        if dns_d.changed {
            mask.set(Category::DnsDomains);
        }

        if dns_s.needs_refresh || dns_d.needs_refresh {
            self.scheduler.solicit(now, self.timers.as_mut());
        }

        let mut next_event: Option<i64> = None;
        for candidate in [gw.next_event, addr.next_event, rt.next_event, dns_s.next_event, dns_d.next_event]
            .into_iter()
            .flatten()
        {
            next_event = Some(next_event.map_or(candidate, |n| n.min(candidate)));
        }

        if !mask.is_empty() {
            self.emit_change(mask);
        }

        match next_event {
            Some(at) => {
                let delay = (at - now64).clamp(0, i32::MAX as i64) as u32;
                self.timers.arm(TimerKind::Reaper, delay);
            }
            None => self.timers.cancel(TimerKind::Reaper),
        }
    }

    fn emit_change(&mut self, mask: ChangeMask) {
        let snapshot = Snapshot {
            gateways: &self.gateways,
            addresses: &self.addresses,
            routes: &self.routes,
            dns_servers: &self.dns_servers,
            dns_domains: &self.dns_domains,
            dhcp_level: self.dhcp_level,
            link_params: self.link_params,
        };
        self.change_sink.config_changed(snapshot, mask);
    }
}

fn validate_plen(plen: u8) -> Result<()> {
    if (1..=128).contains(&plen) {
        Ok(())
    } else {
        Err(crate::error::Error::PreconditionViolated(format!(
            "plen must be in 1..=128, got {plen}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::{FakeChangeSink, FakeClock, FakeStableDerive, FakeTimers, FakeTransport};

    fn test_config() -> EngineConfig {
        EngineConfig::builder()
            .ifindex(2)
            .ifname("eth0")
            .router_solicitations(3)
            .router_solicitation_interval(4)
            .build()
            .unwrap()
    }

    fn new_engine(config: EngineConfig) -> Engine {
        Engine::new(
            config,
            Box::new(FakeClock::at(0)),
            Box::new(FakeTransport::default()),
            Box::new(FakeTimers::default()),
            Box::new(FakeChangeSink::default()),
            Box::new(FakeStableDerive::default()),
        )
    }

    #[test]
    fn add_gateway_keeps_descending_preference_order() {
        let mut engine = new_engine(test_config());
        let entry = |addr: &str, pref: Preference| GatewayEntry {
            address: addr.parse().unwrap(),
            timestamp: 0,
            lifetime: 600,
            preference: pref,
        };
        engine.add_gateway(entry("2001:db8::a", Preference::Low));
        engine.add_gateway(entry("2001:db8::b", Preference::High));
        engine.add_gateway(entry("2001:db8::c", Preference::Medium));

        let addrs: Vec<Ipv6Addr> = engine.gateways.iter().map(|g| g.address).collect();
        assert_eq!(
            addrs,
            vec![
                "2001:db8::b".parse().unwrap(),
                "2001:db8::c".parse().unwrap(),
                "2001:db8::a".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn add_gateway_withdrawal_removes_entry() {
        let mut engine = new_engine(test_config());
        let gw = GatewayEntry {
            address: "fe80::1".parse().unwrap(),
            timestamp: 0,
            lifetime: 600,
            preference: Preference::Medium,
        };
        assert!(engine.add_gateway(gw.clone()));
        let withdrawal = GatewayEntry { lifetime: 0, ..gw };
        assert!(engine.add_gateway(withdrawal));
        assert!(engine.gateways.is_empty());
    }

    #[test]
    fn add_gateway_identical_repeat_is_unchanged() {
        let mut engine = new_engine(test_config());
        let gw = GatewayEntry {
            address: "fe80::1".parse().unwrap(),
            timestamp: 0,
            lifetime: 600,
            preference: Preference::Medium,
        };
        assert!(engine.add_gateway(gw.clone()));
        assert!(!engine.add_gateway(gw));
    }

    #[test]
    #[should_panic]
    fn add_route_rejects_zero_plen() {
        let mut engine = new_engine(test_config());
        engine.add_route(RouteEntry {
            network: "2001:db8::".parse().unwrap(),
            plen: 0,
            gateway: "fe80::1".parse().unwrap(),
            timestamp: 0,
            lifetime: 600,
            preference: Preference::Medium,
        });
    }

    #[test]
    fn add_dns_server_withdrawal_on_empty_is_noop() {
        let mut engine = new_engine(test_config());
        let withdrawal = DnsServerEntry {
            address: "2001:db8::53".parse().unwrap(),
            timestamp: 0,
            lifetime: 0,
        };
        assert!(!engine.add_dns_server(withdrawal));
    }

    #[test]
    fn complete_and_add_address_eui64_fresh_slaac() {
        let mut engine = new_engine(
            EngineConfig::builder()
                .ifindex(2)
                .ifname("eth0")
                .build()
                .unwrap(),
        );
        engine.set_iid(0x0200_0000_0000_0001);
        let candidate = AddressEntry {
            address: "2001:db8::".parse().unwrap(),
            timestamp: 2,
            lifetime: 3600,
            preferred: 1800,
            dad_counter: 0,
        };
        assert!(engine.complete_and_add_address(candidate));
        assert_eq!(engine.addresses.len(), 1);
        assert_eq!(
            engine.addresses[0].address,
            "2001:db8::200:0:0:1".parse::<Ipv6Addr>().unwrap()
        );
    }

    #[test]
    fn complete_and_add_address_respects_cap() {
        let mut engine = new_engine(
            EngineConfig::builder()
                .ifindex(2)
                .ifname("eth0")
                .addr_gen_mode(AddrGenMode::StablePrivacy)
                .max_addresses(1)
                .build()
                .unwrap(),
        );
        let make = |net: &str| AddressEntry {
            address: net.parse().unwrap(),
            timestamp: 0,
            lifetime: 600,
            preferred: 300,
            dad_counter: 0,
        };
        assert!(engine.complete_and_add_address(make("2001:db8:1::")));
        assert!(!engine.complete_and_add_address(make("2001:db8:2::")));
        assert_eq!(engine.addresses.len(), 1);
    }

    #[test]
    fn set_iid_noop_when_unchanged() {
        let mut engine = new_engine(test_config());
        engine.set_iid(0x01);
        assert!(!engine.set_iid(0x01));
    }

    #[test]
    fn set_iid_on_empty_collection_emits_no_change() {
        let mut engine = new_engine(test_config());
        assert!(!engine.set_iid(0x0200_0000_0000_0001));
        assert!(engine.addresses.is_empty());
    }

    #[test]
    fn set_iid_stable_privacy_never_wipes_addresses() {
        let mut engine = new_engine(
            EngineConfig::builder()
                .ifindex(2)
                .ifname("eth0")
                .addr_gen_mode(AddrGenMode::StablePrivacy)
                .build()
                .unwrap(),
        );
        engine
            .complete_and_add_address(AddressEntry {
                address: "2001:db8::".parse().unwrap(),
                timestamp: 0,
                lifetime: 600,
                preferred: 300,
                dad_counter: 0,
            });
        assert!(!engine.set_iid(0xABCD));
        assert_eq!(engine.addresses.len(), 1);
    }

    #[test]
    fn scenario_lifetime_aging() {
        let mut engine = new_engine(test_config());
        engine.add_gateway(GatewayEntry {
            address: "fe80::1".parse().unwrap(),
            timestamp: 100,
            lifetime: 60,
            preference: Preference::Medium,
        });
        engine.run_reaper_sweep(159, ChangeMask::empty());
        assert_eq!(engine.gateways.len(), 1);
        engine.run_reaper_sweep(160, ChangeMask::empty());
        assert!(engine.gateways.is_empty());
    }

    #[test]
    fn scenario_dns_half_life_refresh() {
        let mut engine = new_engine(test_config());
        engine.add_dns_server(DnsServerEntry {
            address: "2001:db8::53".parse().unwrap(),
            timestamp: 100,
            lifetime: 600,
        });
        engine.run_reaper_sweep(399, ChangeMask::empty());
        assert_eq!(engine.dns_servers.len(), 1);
        engine.run_reaper_sweep(400, ChangeMask::empty());
        assert_eq!(engine.dns_servers.len(), 1);
        engine.run_reaper_sweep(700, ChangeMask::empty());
        assert!(engine.dns_servers.is_empty());
    }

    #[test]
    fn start_arms_ra_timeout_clamped() {
        let mut engine = new_engine(test_config());
        engine.start();
        // 3 * 4 + 1 = 13, clamped to [30, 120] => 30.
        // Exercised indirectly: no public getter for the timer map here,
        // but start() must not panic and must leave solicitations armed.
        assert_eq!(engine.solicitations_left(), 3);
    }
}

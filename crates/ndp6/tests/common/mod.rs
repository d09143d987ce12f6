//! Fake collaborators shared by the integration scenarios, mirroring the
//! in-crate `io::test_support` fakes but built only against the public API
//! since integration tests link against the crate as an ordinary consumer.
//!
//! Each fake is split into a plain inner type and an `Rc<RefCell<_>>`
//! handle implementing the relevant trait, so a test can keep a clone of
//! the handle for assertions after the inner type has been boxed into the
//! engine.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::rc::Rc;

use ndp6::{
    ChangeMask, ChangeSink, ClockTrait, Error, Result, Snapshot, StableDerive, StableType, TimerKind,
    Timers, Transport,
};

#[derive(Debug, Default)]
pub struct FakeClock {
    now: Cell<i32>,
}

impl FakeClock {
    pub fn shared(now: i32) -> Rc<FakeClock> {
        Rc::new(FakeClock { now: Cell::new(now) })
    }

    pub fn advance_to(&self, now: i32) {
        self.now.set(now);
    }
}

impl ClockTrait for FakeClock {
    fn now(&self) -> i32 {
        self.now.get()
    }
}

impl ClockTrait for Rc<FakeClock> {
    fn now(&self) -> i32 {
        FakeClock::now(self)
    }
}

#[derive(Debug, Default)]
pub struct TimerLog {
    pub armed: HashMap<TimerKind, u32>,
}

#[derive(Debug, Clone)]
pub struct SharedTimers(Rc<RefCell<TimerLog>>);

impl SharedTimers {
    pub fn new() -> (Self, Rc<RefCell<TimerLog>>) {
        let log = Rc::new(RefCell::new(TimerLog::default()));
        (Self(log.clone()), log)
    }
}

impl Timers for SharedTimers {
    fn arm(&mut self, kind: TimerKind, delay_secs: u32) {
        self.0.borrow_mut().armed.insert(kind, delay_secs);
    }
    fn cancel(&mut self, kind: TimerKind) {
        self.0.borrow_mut().armed.remove(&kind);
    }
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub send_rs_calls: u32,
    pub start_calls: u32,
}

#[derive(Debug, Clone)]
pub struct SharedTransport(Rc<RefCell<TransportLog>>);

impl SharedTransport {
    pub fn new() -> (Self, Rc<RefCell<TransportLog>>) {
        let log = Rc::new(RefCell::new(TransportLog::default()));
        (Self(log.clone()), log)
    }
}

impl Transport for SharedTransport {
    fn send_rs(&mut self) -> Result<()> {
        self.0.borrow_mut().send_rs_calls += 1;
        Ok(())
    }
    fn start(&mut self) -> Result<()> {
        self.0.borrow_mut().start_calls += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedChange {
    pub mask: ChangeMask,
    pub gateway_count: usize,
    pub address_count: usize,
    pub dns_server_count: usize,
}

#[derive(Debug, Default)]
pub struct ChangeLog {
    pub changes: Vec<RecordedChange>,
    pub ra_timeouts: u32,
}

#[derive(Debug, Clone)]
pub struct SharedChangeSink(Rc<RefCell<ChangeLog>>);

impl SharedChangeSink {
    pub fn new() -> (Self, Rc<RefCell<ChangeLog>>) {
        let log = Rc::new(RefCell::new(ChangeLog::default()));
        (Self(log.clone()), log)
    }
}

impl ChangeSink for SharedChangeSink {
    fn config_changed(&mut self, snapshot: Snapshot<'_>, mask: ChangeMask) {
        self.0.borrow_mut().changes.push(RecordedChange {
            mask,
            gateway_count: snapshot.gateways.len(),
            address_count: snapshot.addresses.len(),
            dns_server_count: snapshot.dns_servers.len(),
        });
    }

    fn ra_timeout(&mut self) {
        self.0.borrow_mut().ra_timeouts += 1;
    }
}

/// Scripted stable-privacy deriver: returns `script[dad_counter]` verbatim,
/// or fails once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedDeriver {
    pub script: Vec<Ipv6Addr>,
}

impl StableDerive for ScriptedDeriver {
    fn derive_stable(
        &mut self,
        _stable_type: StableType,
        _address: &Ipv6Addr,
        _ifname: &str,
        _network_id: Option<&str>,
        dad_counter: u8,
    ) -> Result<Ipv6Addr> {
        self.script
            .get(dad_counter as usize)
            .copied()
            .ok_or_else(|| Error::AddressSynthesisFailed("scripted deriver exhausted".into()))
    }
}

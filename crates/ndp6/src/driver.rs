//! Thin convenience event loop wiring the engine's three named timers to a
//! real `tokio::time` clock.
//!
//! This is ambient scaffolding, not part of the algorithmic core: the
//! engine itself never awaits anything, and every entry point here just
//! turns a fired deadline into a call to `Engine::on_timer`. Grounded on
//! the teacher's `tokio::select!` multiplexing of namespace and
//! netlink-socket readiness in its event stream implementation.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::time::{sleep_until, Instant};

use crate::engine::Engine;
use crate::io::{TimerKind, Timers};

/// Holds the next deadline (if any) for each of the three named timers.
/// Shared between the `Engine` (which arms/cancels through the [`Timers`]
/// trait) and [`drive`] (which polls it).
#[derive(Debug, Default)]
pub struct TimerBank {
    send_rs: Option<Instant>,
    reaper: Option<Instant>,
    ra_timeout: Option<Instant>,
}

/// Cheap handle implementing [`Timers`] by mutating a shared [`TimerBank`].
/// `Engine::new` takes this boxed as `Box<dyn Timers>`.
#[derive(Debug, Clone)]
pub struct SharedTimerBank(Rc<RefCell<TimerBank>>);

impl SharedTimerBank {
    pub fn new() -> (Self, Rc<RefCell<TimerBank>>) {
        let bank = Rc::new(RefCell::new(TimerBank::default()));
        (Self(bank.clone()), bank)
    }
}

impl Timers for SharedTimerBank {
    fn arm(&mut self, kind: TimerKind, delay_secs: u32) {
        let deadline = Instant::now() + std::time::Duration::from_secs(delay_secs as u64);
        let mut bank = self.0.borrow_mut();
        match kind {
            TimerKind::SendRs => bank.send_rs = Some(deadline),
            TimerKind::Reaper => bank.reaper = Some(deadline),
            TimerKind::RaTimeout => bank.ra_timeout = Some(deadline),
        }
    }

    fn cancel(&mut self, kind: TimerKind) {
        let mut bank = self.0.borrow_mut();
        match kind {
            TimerKind::SendRs => bank.send_rs = None,
            TimerKind::Reaper => bank.reaper = None,
            TimerKind::RaTimeout => bank.ra_timeout = None,
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => sleep_until(instant).await,
        None => std::future::pending().await,
    }
}

/// Runs the timer-driven half of the engine forever, dispatching whichever
/// of the three timers fires first to `Engine::on_timer`. The caller feeds
/// RA/DAD ingress into `engine` from its own transport-reading task;
/// `engine` must have been constructed with the `Timers` half of the same
/// `bank` this function polls (via [`SharedTimerBank`]).
pub async fn drive(engine: &mut Engine, bank: &Rc<RefCell<TimerBank>>) -> ! {
    loop {
        let (send_rs, reaper, ra_timeout) = {
            let b = bank.borrow();
            (b.send_rs, b.reaper, b.ra_timeout)
        };

        tokio::select! {
            biased;
            _ = wait_for(send_rs) => {
                bank.borrow_mut().send_rs = None;
                engine.on_timer(TimerKind::SendRs);
            }
            _ = wait_for(reaper) => {
                bank.borrow_mut().reaper = None;
                engine.on_timer(TimerKind::Reaper);
            }
            _ = wait_for(ra_timeout) => {
                bank.borrow_mut().ra_timeout = None;
                engine.on_timer(TimerKind::RaTimeout);
            }
        }
    }
}

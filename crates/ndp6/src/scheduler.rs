//! Router-solicitation retransmission schedule.

use crate::io::{TimerKind, Timers, Transport};

/// State for the RS retry loop. `router_solicitations` and
/// `router_solicitation_interval` are fixed at construction; everything
/// else tracks in-flight retry progress.
#[derive(Debug)]
pub struct Scheduler {
    router_solicitations: i32,
    router_solicitation_interval: u32,
    solicitations_left: i32,
    scheduled: bool,
    last_rs: i32,
    last_send_rs_error: Option<String>,
    /// Monotonically increasing count of failed `send_rs` calls, exposed
    /// alongside `solicitations_left` so a caller can observe a transport
    /// that retries forever without ever decrementing budget (spec §9 open
    /// question: on-failure non-decrement is preserved as-is).
    failed_sends: u64,
}

impl Scheduler {
    pub fn new(router_solicitations: i32, router_solicitation_interval: u32) -> Self {
        Self {
            router_solicitations,
            router_solicitation_interval,
            solicitations_left: 0,
            scheduled: false,
            last_rs: 0,
            last_send_rs_error: None,
            failed_sends: 0,
        }
    }

    pub fn solicitations_left(&self) -> i32 {
        self.solicitations_left
    }

    pub fn failed_sends(&self) -> u64 {
        self.failed_sends
    }

    /// Clears sticky send-error state. Called on `ra_received`.
    pub fn clear_error(&mut self) {
        self.last_send_rs_error = None;
    }

    /// Arm (or leave alone, if already armed) the RS retry timer.
    pub fn solicit(&mut self, now: i32, timers: &mut dyn Timers) {
        if self.scheduled {
            return;
        }
        self.solicitations_left = self.router_solicitations;
        let next = (self.last_rs as i64 + self.router_solicitation_interval as i64 - now as i64)
            .clamp(0, i32::MAX as i64) as u32;
        timers.arm(TimerKind::SendRs, next);
        self.scheduled = true;
    }

    /// Cancel a pending retry (called on `ra_received`).
    pub fn cancel(&mut self, timers: &mut dyn Timers) {
        if self.scheduled {
            timers.cancel(TimerKind::SendRs);
            self.scheduled = false;
        }
    }

    /// Invoked when the RS timer fires: sends one solicitation, records the
    /// outcome, and reschedules if budget remains.
    pub fn on_timer_fire(&mut self, now: i32, transport: &mut dyn Transport, timers: &mut dyn Timers) {
        self.scheduled = false;
        let result = transport.send_rs();
        self.last_rs = now;

        match result {
            Ok(()) => {
                self.solicitations_left -= 1;
                self.last_send_rs_error = None;
            }
            Err(err) => {
                self.failed_sends += 1;
                let message = err.to_string();
                if self.last_send_rs_error.as_deref() != Some(message.as_str()) {
                    tracing::warn!(error = %message, "send_rs failed");
                } else {
                    tracing::debug!(error = %message, "send_rs failed (repeat)");
                }
                self.last_send_rs_error = Some(message);
            }
        }

        if self.solicitations_left > 0 {
            timers.arm(TimerKind::SendRs, self.router_solicitation_interval);
            self.scheduled = true;
        }
    }
}

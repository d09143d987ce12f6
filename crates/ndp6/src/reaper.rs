//! Lifetime sweeping: expiry deletion and DNS half-life refresh detection.
//!
//! Collections stay as plain `Vec<T>` per the design note against ordered
//! trees or hash maps (expected sizes are a handful of entries; a linear
//! scan is both correct and cache-friendly, and preserves the preference
//! ordering a keyed map would lose).

use crate::types::Aging;

/// Outcome of sweeping a collection with no refresh semantics (gateways,
/// addresses, routes).
pub(crate) struct SweepOutcome {
    pub changed: bool,
    /// Earliest still-live expiry across surviving entries, if any.
    pub next_event: Option<i64>,
}

/// Outcome of sweeping a collection with half-life refresh semantics (DNS
/// servers, DNS domains).
pub(crate) struct RefreshSweepOutcome {
    pub changed: bool,
    pub next_event: Option<i64>,
    /// True if any surviving entry crossed its refresh boundary this sweep.
    pub needs_refresh: bool,
}

fn earliest(current: Option<i64>, candidate: i64) -> Option<i64> {
    Some(current.map_or(candidate, |existing| existing.min(candidate)))
}

/// Delete every entry whose expiry has passed; track the earliest
/// still-pending expiry among survivors.
pub(crate) fn sweep_expiring<T: Aging>(now: i64, items: &mut Vec<T>) -> SweepOutcome {
    let mut changed = false;
    let mut next_event = None;
    items.retain(|item| {
        let expiry = item.expiry();
        if now >= expiry {
            changed = true;
            false
        } else {
            next_event = earliest(next_event, expiry);
            true
        }
    });
    SweepOutcome { changed, next_event }
}

/// As [`sweep_expiring`], but also flags entries that have crossed their
/// half-life refresh boundary without expiring. Refreshed entries are not
/// deleted; the refresh boundary still folds into `next_event` so the next
/// sweep can track it again if it wasn't already past it this round.
pub(crate) fn sweep_with_refresh<T: Aging>(now: i64, items: &mut Vec<T>) -> RefreshSweepOutcome {
    let mut changed = false;
    let mut next_event = None;
    let mut needs_refresh = false;
    items.retain(|item| {
        let expiry = item.expiry();
        if now >= expiry {
            changed = true;
            return false;
        }
        let refresh = item.refresh_boundary();
        if now >= refresh {
            needs_refresh = true;
            next_event = earliest(next_event, expiry);
        } else {
            next_event = earliest(next_event, expiry.min(refresh));
        }
        true
    });
    RefreshSweepOutcome {
        changed,
        next_event,
        needs_refresh,
    }
}

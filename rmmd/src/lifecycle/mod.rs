//! Deferred destruction of realm data.
//!
//! A realm that was created successfully gets `RPV_GUARD_SECONDS` before
//! the dispatcher asks it for its retention period value (RPV) with
//! `RPV_GET`. The answer, or `REALM_DESTROY_TIMER_SECONDS` when the realm
//! reports 0, decides when `DATA_DESTROY_ALL` is issued on its behalf.
//!
//! Every tracked realm carries its own state; pending deadlines of all
//! realms share the single secure timer through `DeadlineQueue`.

pub mod queue;

use self::queue::DeadlineQueue;
use crate::config::{REALM_DESTROY_TIMER_SECONDS, RPV_GUARD_SECONDS};
use crate::error::Result;
use crate::registry::{RealmRegistry, RecordHandle};
use crate::rmi;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    /// Waiting to ask for, or for the answer to, `RPV_GET`.
    AwaitingRpv { issued: bool },
    /// `DATA_DESTROY_ALL` goes out once the counter reaches `deadline`.
    AwaitingDestroyTimeout { deadline: u64 },
}

/// A call the automaton wants to inject into the RMM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    GetRpv { rd: u64 },
    DestroyAll { rd: u64 },
}

impl Action {
    pub fn fid(&self) -> u32 {
        match self {
            Action::GetRpv { .. } => rmi::RPV_GET,
            Action::DestroyAll { .. } => rmi::DATA_DESTROY_ALL,
        }
    }

    pub fn rd(&self) -> u64 {
        match self {
            Action::GetRpv { rd } | Action::DestroyAll { rd } => *rd,
        }
    }
}

/// A snapshot of the system counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    pub now: u64,
    /// Counter ticks per second.
    pub frequency: u64,
}

impl Clock {
    pub fn after_secs(&self, secs: u64) -> u64 {
        self.now.saturating_add(secs.saturating_mul(self.frequency))
    }

    pub fn after_ms(&self, ms: u64) -> u64 {
        let ticks = ms.saturating_mul(self.frequency) / 1000;
        self.now.saturating_add(ticks.max(1))
    }
}

/// What the secure timer must be changed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerUpdate {
    Arm(u64),
    Disarm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hardware {
    Disarmed,
    Armed(u64),
    /// Condition met; stays asserted until reprogrammed.
    Fired,
}

/// Realm records plus their pending deadlines.
///
/// `hardware` models one secure timer for the whole system. CNTPS_* are
/// banked per core, so the board must route every `SecureTimer::arm` and
/// `SecureTimer::disarm` to a single owning core.
#[derive(Debug)]
pub struct Tracker {
    registry: RealmRegistry,
    queue: DeadlineQueue,
    hardware: Hardware,
    /// Lower bound for the next expiry after a deferred fire.
    not_before: u64,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            registry: RealmRegistry::new(),
            queue: DeadlineQueue::new(),
            hardware: Hardware::Disarmed,
            not_before: 0,
        }
    }

    pub fn registry(&self) -> &RealmRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &DeadlineQueue {
        &self.queue
    }

    pub fn state(&self, rd: u64) -> Option<State> {
        self.registry.lookup(rd).map(|r| r.state)
    }

    /// REALM_CREATE was seen on its way to the RMM.
    pub fn on_create_observed(&mut self, rd: u64) -> Result<RecordHandle> {
        self.queue.cancel(rd);
        self.registry.register(rd)
    }

    /// REALM_CREATE completed with `status`.
    pub fn on_create_complete(&mut self, rd: u64, status: u64, clock: Clock) {
        if status != rmi::SUCCESS {
            debug!("REALM_CREATE of 0x{:x} failed: {}", rd, status);
            return;
        }
        let Some(record) = self.registry.get_mut(rd) else {
            debug!("REALM_CREATE of untracked realm 0x{:x}", rd);
            return;
        };
        match record.state {
            State::Idle => {
                record.state = State::AwaitingRpv { issued: false };
                self.schedule(rd, clock.after_secs(RPV_GUARD_SECONDS));
            }
            state => warn!("REALM_CREATE completion for 0x{:x} in {:?}", rd, state),
        }
    }

    /// REALM_ACTIVATE was seen on its way to the RMM.
    pub fn on_activate(&mut self, rd: u64, clock: Clock) {
        let Some(record) = self.registry.get_mut(rd) else {
            return;
        };
        if record.state != State::Idle {
            trace!("REALM_ACTIVATE of 0x{:x} in {:?}", rd, record.state);
            return;
        }
        let deadline = clock.after_secs(REALM_DESTROY_TIMER_SECONDS);
        record.state = State::AwaitingDestroyTimeout { deadline };
        self.schedule(rd, deadline);
    }

    /// RPV_GET completed with retention value `rpv` in seconds, as reported
    /// in x1 of REQ_COMPLETE.
    pub fn on_rpv_complete(&mut self, rd: u64, rpv: u64, clock: Clock) {
        let Some(record) = self.registry.get_mut(rd) else {
            warn!("RPV_GET completion for untracked realm 0x{:x}", rd);
            return;
        };
        if !matches!(record.state, State::AwaitingRpv { .. }) {
            warn!("RPV_GET completion for 0x{:x} in {:?}", rd, record.state);
            return;
        }
        record.rpv = rpv;
        let secs = if rpv == 0 {
            REALM_DESTROY_TIMER_SECONDS
        } else {
            rpv
        };
        let deadline = clock.after_secs(secs);
        record.state = State::AwaitingDestroyTimeout { deadline };
        info!("realm 0x{:x} data destroyed in {}s", rd, secs);
        self.schedule(rd, deadline);
    }

    /// REALM_DESTROY completed with `status`. A destroyed realm is no
    /// longer a target for automatic calls.
    pub fn on_realm_destroyed(&mut self, rd: u64, status: u64) {
        if status != rmi::SUCCESS {
            return;
        }
        if let Some(record) = self.registry.get_mut(rd) {
            record.state = State::Idle;
        }
        if self.queue.cancel(rd).is_some() {
            debug!("cancelled pending deadline of 0x{:x}", rd);
        }
    }

    /// The secure timer expired at `clock.now`.
    ///
    /// Returns the call to issue for the earliest due deadline, if any and if
    /// `can_issue`. Otherwise the deadline is kept and the next expiry is
    /// pushed back to `TIMER_RETRY_MS`.
    pub fn on_timer_fire(&mut self, clock: Clock, can_issue: bool) -> Option<Action> {
        self.hardware = Hardware::Fired;

        let Some(due) = self.queue.peek().copied().filter(|d| d.at <= clock.now) else {
            debug!("timer fired with nothing due");
            return None;
        };
        if !can_issue {
            debug!("deferring deadline of 0x{:x}", due.rd);
            self.not_before = clock.after_ms(crate::config::TIMER_RETRY_MS);
            return None;
        }
        self.not_before = 0;
        self.queue.pop_due(clock.now);

        let Some(record) = self.registry.get_mut(due.rd) else {
            warn!("deadline for untracked realm 0x{:x}", due.rd);
            return None;
        };
        match record.state {
            State::AwaitingRpv { .. } => {
                record.state = State::AwaitingRpv { issued: true };
                Some(Action::GetRpv { rd: due.rd })
            }
            State::AwaitingDestroyTimeout { .. } => {
                record.state = State::Idle;
                Some(Action::DestroyAll { rd: due.rd })
            }
            State::Idle => {
                warn!("stale deadline for idle realm 0x{:x}", due.rd);
                None
            }
        }
    }

    /// Brings the secure timer in line with the queue head.
    pub fn timer_update(&mut self) -> Option<TimerUpdate> {
        let target = self.queue.earliest().map(|at| at.max(self.not_before));
        let update = match (target, self.hardware) {
            (Some(cval), Hardware::Armed(armed)) if cval == armed => return None,
            (None, Hardware::Disarmed) => return None,
            (Some(cval), _) => {
                self.hardware = Hardware::Armed(cval);
                TimerUpdate::Arm(cval)
            }
            (None, _) => {
                self.hardware = Hardware::Disarmed;
                TimerUpdate::Disarm
            }
        };
        Some(update)
    }

    fn schedule(&mut self, rd: u64, at: u64) {
        if !self.queue.schedule(rd, at) {
            error!("no room for the deadline of 0x{:x}", rd);
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    const RD: u64 = 0xAA;

    fn at(now: u64) -> Clock {
        Clock { now, frequency: 1 }
    }

    fn created(rd: u64) -> Tracker {
        let mut tracker = Tracker::new();
        tracker.on_create_observed(rd).unwrap();
        tracker.on_create_complete(rd, rmi::SUCCESS, at(0));
        tracker
    }

    #[test]
    fn create_then_rpv_then_destroy() {
        let mut tracker = created(RD);
        assert_eq!(tracker.state(RD), Some(State::AwaitingRpv { issued: false }));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(RPV_GUARD_SECONDS)));

        let action = tracker.on_timer_fire(at(RPV_GUARD_SECONDS), true);
        assert_eq!(action, Some(Action::GetRpv { rd: RD }));
        assert_eq!(tracker.state(RD), Some(State::AwaitingRpv { issued: true }));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Disarm));

        tracker.on_rpv_complete(RD, 3, at(10));
        assert_eq!(
            tracker.state(RD),
            Some(State::AwaitingDestroyTimeout { deadline: 13 })
        );
        assert_eq!(tracker.registry().lookup(RD).unwrap().rpv, 3);
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(13)));

        let action = tracker.on_timer_fire(at(13), true);
        assert_eq!(action, Some(Action::DestroyAll { rd: RD }));
        assert_eq!(action.unwrap().fid(), rmi::DATA_DESTROY_ALL);
        assert_eq!(tracker.state(RD), Some(State::Idle));
    }

    #[test]
    fn zero_rpv_uses_default_timeout() {
        let mut tracker = created(RD);
        tracker.on_timer_fire(at(RPV_GUARD_SECONDS), true);
        tracker.on_rpv_complete(RD, 0, at(100));
        assert_eq!(
            tracker.state(RD),
            Some(State::AwaitingDestroyTimeout {
                deadline: 100 + REALM_DESTROY_TIMER_SECONDS
            })
        );
    }

    #[test]
    fn failed_create_is_not_scheduled() {
        let mut tracker = Tracker::new();
        tracker.on_create_observed(RD).unwrap();
        tracker.on_create_complete(RD, 1, at(0));
        assert_eq!(tracker.state(RD), Some(State::Idle));
        assert!(tracker.queue().is_empty());
        assert_eq!(tracker.timer_update(), None);
    }

    #[test]
    fn untracked_create_is_ignored() {
        let mut tracker = Tracker::new();
        tracker.on_create_complete(RD, rmi::SUCCESS, at(0));
        assert_eq!(tracker.state(RD), None);
        assert!(tracker.queue().is_empty());
    }

    #[test]
    fn fire_with_nothing_tracked_is_noop() {
        let mut tracker = Tracker::new();
        assert_eq!(tracker.on_timer_fire(at(1000), true), None);
        assert!(tracker.registry().is_empty());
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Disarm));
    }

    #[test]
    fn null_descriptor_is_never_scheduled() {
        let mut tracker = Tracker::new();
        assert_eq!(tracker.on_create_observed(0), Err(Error::NullDescriptor));
        tracker.on_create_complete(0, rmi::SUCCESS, at(0));
        tracker.on_activate(0, at(0));

        assert!(tracker.queue().is_empty());
        assert_eq!(tracker.on_timer_fire(at(RPV_GUARD_SECONDS), true), None);
        assert_eq!(tracker.state(0), None);
    }

    #[test]
    fn early_fire_keeps_state() {
        let mut tracker = created(RD);
        tracker.timer_update();
        assert_eq!(tracker.on_timer_fire(at(1), true), None);
        assert_eq!(tracker.state(RD), Some(State::AwaitingRpv { issued: false }));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(RPV_GUARD_SECONDS)));
    }

    #[test]
    fn rpv_completion_mismatch_is_ignored() {
        let mut tracker = Tracker::new();
        tracker.on_create_observed(RD).unwrap();
        tracker.on_rpv_complete(RD, 3, at(0));
        assert_eq!(tracker.state(RD), Some(State::Idle));
        assert!(tracker.queue().is_empty());
    }

    #[test]
    fn rpv_completion_before_issue_still_schedules() {
        let mut tracker = created(RD);
        tracker.on_rpv_complete(RD, 7, at(1));
        assert_eq!(
            tracker.state(RD),
            Some(State::AwaitingDestroyTimeout { deadline: 8 })
        );
        assert_eq!(tracker.queue().earliest(), Some(8));
    }

    #[test]
    fn activate_starts_default_timeout_only_when_idle() {
        let mut tracker = Tracker::new();
        tracker.on_create_observed(RD).unwrap();
        tracker.on_activate(RD, at(4));
        assert_eq!(
            tracker.state(RD),
            Some(State::AwaitingDestroyTimeout {
                deadline: 4 + REALM_DESTROY_TIMER_SECONDS
            })
        );

        let mut tracker = created(RD);
        tracker.on_activate(RD, at(1));
        assert_eq!(tracker.state(RD), Some(State::AwaitingRpv { issued: false }));
        assert_eq!(tracker.queue().earliest(), Some(RPV_GUARD_SECONDS));
    }

    #[test]
    fn deferred_fire_backs_off() {
        let mut tracker = created(RD);
        tracker.timer_update();

        let clock = Clock {
            now: 2000,
            frequency: 1000,
        };
        assert_eq!(tracker.on_timer_fire(clock, false), None);
        assert_eq!(tracker.state(RD), Some(State::AwaitingRpv { issued: false }));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(2010)));

        let clock = Clock {
            now: 2010,
            frequency: 1000,
        };
        assert_eq!(tracker.on_timer_fire(clock, true), Some(Action::GetRpv { rd: RD }));
    }

    #[test]
    fn destroy_cancels_schedule() {
        let mut tracker = created(RD);
        tracker.timer_update();
        tracker.on_realm_destroyed(RD, rmi::SUCCESS);

        assert_eq!(tracker.state(RD), Some(State::Idle));
        assert!(tracker.queue().is_empty());
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Disarm));
        assert_eq!(tracker.on_timer_fire(at(RPV_GUARD_SECONDS), true), None);
    }

    #[test]
    fn realms_progress_independently() {
        let (a, b) = (0xA000, 0xB000);
        let mut tracker = Tracker::new();
        tracker.on_create_observed(a).unwrap();
        tracker.on_create_observed(b).unwrap();
        tracker.on_create_complete(a, rmi::SUCCESS, at(0));
        tracker.on_create_complete(b, rmi::SUCCESS, at(1));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(RPV_GUARD_SECONDS)));

        let now = RPV_GUARD_SECONDS + 1;
        assert_eq!(tracker.on_timer_fire(at(now), true), Some(Action::GetRpv { rd: a }));
        // b expired meanwhile, so the timer is re-armed at its deadline right away
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(now)));
        assert_eq!(tracker.on_timer_fire(at(now), true), Some(Action::GetRpv { rd: b }));

        tracker.on_rpv_complete(b, 5, at(now));
        tracker.on_rpv_complete(a, 50, at(now));
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(now + 5)));
        assert_eq!(
            tracker.on_timer_fire(at(now + 5), true),
            Some(Action::DestroyAll { rd: b })
        );
        assert_eq!(tracker.timer_update(), Some(TimerUpdate::Arm(now + 50)));
        assert_eq!(
            tracker.state(a),
            Some(State::AwaitingDestroyTimeout { deadline: now + 50 })
        );
    }

    #[test]
    fn recreate_restarts_tracking() {
        let mut tracker = created(RD);
        tracker.on_create_observed(RD).unwrap();
        assert_eq!(tracker.state(RD), Some(State::Idle));
        assert!(tracker.queue().is_empty());
    }
}

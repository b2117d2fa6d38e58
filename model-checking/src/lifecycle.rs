use islet_rmmd::config::{REALM_DESTROY_TIMER_SECONDS, RPV_GUARD_SECONDS};
use islet_rmmd::lifecycle::{Action, Clock, State, Tracker};
use islet_rmmd::rmi;

#[kani::proof]
#[kani::unwind(12)]
fn verify_rpv_schedules_destroy() {
    let rd: u64 = kani::any();
    let rpv: u64 = kani::any();
    let now: u64 = kani::any();
    let frequency: u64 = kani::any();
    kani::assume(rd != 0);
    kani::assume(rpv < (1 << 32));
    kani::assume(now < (1 << 32));
    kani::assume(frequency > 0 && frequency < (1 << 24));

    let mut tracker = Tracker::new();
    tracker.on_create_observed(rd).unwrap();
    tracker.on_create_complete(rd, rmi::SUCCESS, Clock { now: 0, frequency });
    let due = RPV_GUARD_SECONDS * frequency;
    let action = tracker.on_timer_fire(Clock { now: due, frequency }, true);
    assert!(action == Some(Action::GetRpv { rd }));

    tracker.on_rpv_complete(rd, rpv, Clock { now, frequency });

    let secs = if rpv == 0 { REALM_DESTROY_TIMER_SECONDS } else { rpv };
    let deadline = now + secs * frequency;
    kani::cover!(rpv == 0);
    assert!(tracker.state(rd) == Some(State::AwaitingDestroyTimeout { deadline }));
    assert!(tracker.queue().earliest() == Some(deadline));
}

#[kani::proof]
#[kani::unwind(12)]
fn verify_fire_before_deadline_is_noop() {
    let rd: u64 = kani::any();
    let now: u64 = kani::any();
    let can_issue: bool = kani::any();
    kani::assume(rd != 0);
    kani::assume(now < RPV_GUARD_SECONDS);

    let mut tracker = Tracker::new();
    tracker.on_create_observed(rd).unwrap();
    tracker.on_create_complete(rd, rmi::SUCCESS, Clock { now: 0, frequency: 1 });

    let action = tracker.on_timer_fire(Clock { now, frequency: 1 }, can_issue);

    assert!(action.is_none());
    assert!(tracker.state(rd) == Some(State::AwaitingRpv { issued: false }));
    assert!(tracker.queue().earliest() == Some(RPV_GUARD_SECONDS));
}

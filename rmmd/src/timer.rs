use crate::config::{EL3_TIMER_IRQ, GIC_HIGHEST_SEC_PRIORITY};
use crate::context::Origin;
use crate::lifecycle::{Clock, TimerUpdate, Tracker};
use crate::platform::Platform;
use crate::rmi;
use crate::smc::{Next, World};
use crate::Rmmd;

impl<P: Platform> Rmmd<P> {
    /// Routes the secure physical timer to EL3 on the calling core.
    pub fn timer_init(&self) {
        self.platform
            .enable_el3_interrupt(EL3_TIMER_IRQ, GIC_HIGHEST_SEC_PRIORITY);
    }

    pub(crate) fn clock(&self) -> Clock {
        Clock {
            now: self.platform.counter(),
            frequency: self.platform.frequency(),
        }
    }

    /// Programs the secure timer for the tracker's earliest deadline.
    /// Must be called with the tracker locked.
    pub(crate) fn sync_timer(&self, tracker: &mut Tracker) {
        match tracker.timer_update() {
            Some(TimerUpdate::Arm(cval)) => {
                trace!("RMMD: timer armed at {}", cval);
                self.platform.arm(cval);
            }
            Some(TimerUpdate::Disarm) => {
                trace!("RMMD: timer disarmed");
                self.platform.disarm();
            }
            None => {}
        }
    }

    /// EL3 interrupt handler for the secure physical timer.
    ///
    /// `interrupted` is the world that was running when the interrupt was
    /// taken. A due call can only be injected when that is the Normal world
    /// and no other call is in flight on this core; otherwise the deadline
    /// stays queued and the timer is re-armed a little later.
    pub fn el3_timer_handler(&self, interrupted: World) -> Next {
        let id = self.platform.acknowledge();
        self.platform.end_of_interrupt(id);
        if id != EL3_TIMER_IRQ {
            warn!("RMMD: unexpected EL3 interrupt {}", id);
            return Next::Eret(interrupted);
        }

        let can_issue = interrupted == World::NonSecure && self.cpu_state().inflight().is_none();
        let action = {
            let clock = self.clock();
            let mut tracker = self.tracker();
            let action = tracker.on_timer_fire(clock, can_issue);
            self.sync_timer(&mut tracker);
            action
        };

        let Some(action) = action else {
            return Next::Eret(interrupted);
        };
        info!(
            "RMMD: issuing {} for realm 0x{:x}",
            rmi::to_str(action.fid()),
            action.rd()
        );
        let regs = [action.fid() as u64, action.rd(), 0, 0, 0, 0, 0, 0];
        self.forward_to_realm(regs, false, Origin::Lifecycle)
    }
}

//! World switching.
//!
//! `switch_world` hands a core from one world to another for an ordinary
//! forwarded call. `sync_entry`/`sync_exit` bracket a blocking excursion
//! into the RMM (boot, warm boot) during which EL3 waits for the RMM to
//! call back with a single status value.

use crate::context::CpuState;
use crate::platform::Platform;
use crate::smc::{Next, World};
use crate::Rmmd;

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Per-core capsule of a synchronous entry.
#[derive(Debug, Default)]
pub struct SyncSlot {
    /// C runtime context saved by the entry trampoline.
    c_rt_ctx: AtomicU64,
    pending: AtomicBool,
}

impl SyncSlot {
    pub const fn new() -> Self {
        Self {
            c_rt_ctx: AtomicU64::new(0),
            pending: AtomicBool::new(false),
        }
    }

    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl<P: Platform> Rmmd<P> {
    /// Saves the EL2 state of `from`, restores the one of `to` and makes `to`
    /// the target of the next exception return.
    pub(crate) fn switch_world(&self, cpu: &mut CpuState, from: World, to: World) {
        self.platform
            .save_el2_sysregs(&mut cpu.context_mut(from).el2_sysregs);
        self.platform
            .restore_el2_sysregs(&cpu.context(to).el2_sysregs);
        cpu.set_next(to);
    }

    /// Runs the RMM on this core until it calls `BOOT_COMPLETE`, returning
    /// the status it reported.
    pub fn sync_entry(&self) -> u64 {
        let slot = self.sync_slot();
        {
            let mut cpu = self.cpu_state();
            if !cpu.realm_initialised() {
                panic!("RMMD: synchronous entry into an uninitialised realm context");
            }
            if slot.pending.swap(true, Ordering::AcqRel) {
                panic!("RMMD: nested synchronous entry");
            }
            self.platform
                .restore_el2_sysregs(&cpu.context(World::Realm).el2_sysregs);
            cpu.set_next(World::Realm);
        }

        // SAFETY: the realm context of this core was checked above and its EL2
        // registers were just restored.
        let rc = unsafe { self.platform.rmm_enter(&slot.c_rt_ctx) };

        {
            let mut cpu = self.cpu_state();
            self.platform
                .save_el2_sysregs(&mut cpu.context_mut(World::Realm).el2_sysregs);
        }
        slot.pending.store(false, Ordering::Release);
        rc
    }

    /// Leaves the RMM back to the pending `sync_entry` with `rc`.
    pub fn sync_exit(&self, rc: u64) -> Next {
        let slot = self.sync_slot();
        if !slot.pending() {
            panic!("RMMD: synchronous exit without a pending entry");
        }
        Next::Resume {
            c_rt_ctx: slot.c_rt_ctx.load(Ordering::Acquire),
            value: rc,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::context::El2Sysregs;
    use crate::smc::{Next, World};
    use crate::test_utils::*;

    #[test]
    fn entry_returns_exit_value() {
        let rmmd = rmmd_with(MockPlatform::new());
        rmmd.setup().unwrap();
        let weak = std::sync::Arc::downgrade(&rmmd);
        rmmd.platform().on_rmm_entry(move || {
            let rmmd = weak.upgrade().unwrap();
            assert!(rmmd.sync_slot().pending());
            match rmmd.sync_exit(0x1234) {
                Next::Resume { value, .. } => value,
                next => panic!("unexpected {:?}", next),
            }
        });

        assert_eq!(rmmd.sync_entry(), 0x1234);
        assert!(!rmmd.sync_slot().pending());
        assert_eq!(rmmd.cpu_state().next(), Some(World::Realm));
    }

    #[test]
    fn entry_leaves_other_worlds_alone() {
        let rmmd = rmmd_with(MockPlatform::new());
        rmmd.setup().unwrap();
        let ns = {
            let mut cpu = rmmd.cpu_state();
            cpu.context_mut(World::NonSecure)
                .gpregs
                .write_return_value(&[1, 2, 3, 4, 5, 6, 7, 8]);
            *cpu.context(World::NonSecure)
        };
        install_boot_complete(&rmmd, 0);

        assert_eq!(rmmd.sync_entry(), 0);
        assert_eq!(rmmd.cpu_state().context(World::NonSecure), &ns);
    }

    #[test]
    fn entry_saves_realm_el2_state() {
        let rmmd = rmmd_with(MockPlatform::new());
        rmmd.setup().unwrap();
        let weak = std::sync::Arc::downgrade(&rmmd);
        rmmd.platform().on_rmm_entry(move || {
            let rmmd = weak.upgrade().unwrap();
            rmmd.platform().live_el2().vbar_el2 = 0x8000;
            0
        });

        rmmd.sync_entry();
        let cpu = rmmd.cpu_state();
        assert_eq!(cpu.context(World::Realm).el2_sysregs.vbar_el2, 0x8000);
    }

    #[test]
    #[should_panic(expected = "without a pending entry")]
    fn exit_without_entry_halts() {
        let rmmd = rmmd_with(MockPlatform::new());
        let _ = rmmd.sync_exit(0);
    }

    #[test]
    #[should_panic(expected = "uninitialised")]
    fn entry_needs_realm_context() {
        let rmmd = rmmd_with(MockPlatform::new());
        rmmd.sync_entry();
    }

    #[test]
    fn world_switch_swaps_el2_state() {
        let rmmd = rmmd_with(MockPlatform::new());
        let realm = El2Sysregs {
            hcr_el2: 0x80,
            ..Default::default()
        };
        *rmmd.platform().live_el2() = El2Sysregs {
            hcr_el2: 0x1,
            ..Default::default()
        };

        let mut cpu = rmmd.cpu_state();
        cpu.context_mut(World::Realm).el2_sysregs = realm;
        rmmd.switch_world(&mut cpu, World::NonSecure, World::Realm);

        assert_eq!(cpu.context(World::NonSecure).el2_sysregs.hcr_el2, 0x1);
        assert_eq!(*rmmd.platform().live_el2(), realm);
        assert_eq!(cpu.next(), Some(World::Realm));
    }
}

#![no_std]
#![warn(rust_2018_idioms)]

#[cfg(any(test, fuzzing, kani))]
extern crate std;

#[macro_use]
extern crate log;

#[macro_use]
pub mod r#macro;

#[cfg(target_arch = "aarch64")]
pub mod arch;
pub mod boot;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod lifecycle;
pub mod logger;
pub mod platform;
pub mod registry;
pub mod rmi;
pub mod rmm_el3;
pub mod smc;
pub mod switch;
#[cfg(any(test, fuzzing, kani))]
pub mod test_utils;
pub mod timer;

use crate::config::NUM_OF_CPU;
use crate::context::{CpuState, EntryPointInfo};
use crate::lifecycle::Tracker;
use crate::platform::Platform;
use crate::smc::{Next, SmcFlags};
use crate::switch::SyncSlot;

use core::sync::atomic::{AtomicBool, Ordering};
use spin::mutex::{Mutex, MutexGuard};
use spin::Once;

/// The dispatcher state owned by EL3.
///
/// A single instance is shared by every core. Per-core state is indexed with
/// `Platform::core_pos()`; the realm tracker is the only state that cores
/// (and the timer interrupt path) contend on.
pub struct Rmmd<P: Platform> {
    platform: P,
    boot_failed: AtomicBool,
    entry_point: Once<EntryPointInfo>,
    cpus: [Mutex<CpuState>; NUM_OF_CPU],
    sync: [SyncSlot; NUM_OF_CPU],
    tracker: Mutex<Tracker>,
}

impl<P: Platform> Rmmd<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            boot_failed: AtomicBool::new(false),
            entry_point: Once::new(),
            cpus: core::array::from_fn(|_| Mutex::new(CpuState::new())),
            sync: core::array::from_fn(|_| SyncSlot::new()),
            tracker: Mutex::new(Tracker::new()),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn boot_failed(&self) -> bool {
        self.boot_failed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_boot_failed(&self) {
        self.boot_failed.store(true, Ordering::Release);
    }

    /// Entry point of the runtime service for both owned SMC ranges.
    ///
    /// `regs` holds x0..x7 as trapped from the caller, `flags` the caller's
    /// security state. The return value tells the exception-return path
    /// where to go next.
    pub fn handle_smc(&self, regs: [u64; 8], flags: SmcFlags) -> Next {
        let fid = regs[0] as u32;
        if rmi::is_rmi_fid(fid) {
            self.rmi_handler(regs, flags)
        } else if rmm_el3::is_rmm_el3_fid(fid) {
            self.rmm_el3_handler(regs, flags)
        } else {
            warn!("RMMD: Unowned function id 0x{:x}", fid);
            self.reject(flags)
        }
    }

    pub(crate) fn core_pos(&self) -> usize {
        let core = self.platform.core_pos();
        if core >= NUM_OF_CPU {
            panic!("RMMD: core position {} out of range", core);
        }
        core
    }

    /// Locks the calling core's world contexts.
    pub fn cpu_state(&self) -> MutexGuard<'_, CpuState> {
        self.cpus[self.core_pos()].lock()
    }

    pub(crate) fn sync_slot(&self) -> &SyncSlot {
        &self.sync[self.core_pos()]
    }

    /// Locks the realm registry and its pending deadlines.
    pub fn tracker(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock()
    }

    /// Answers the caller with `SMC_UNK` and returns to it.
    pub(crate) fn reject(&self, flags: SmcFlags) -> Next {
        let world = flags.world();
        self.cpu_state()
            .context_mut(world)
            .gpregs
            .write_return_value(&[smc::SMC_UNK]);
        Next::Eret(world)
    }
}

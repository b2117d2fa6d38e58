//! Helpers a board can build its `Platform` from on real hardware.

use crate::platform::SecureTimer;

use aarch64_cpu::registers::*;
use core::arch::asm;

const ID_AA64PFR0_EL1_RME_SHIFT: u64 = 52;
const ID_AA64PFR0_EL1_RME_MASK: u64 = 0xf;

const CNTPS_CTL_ENABLE: u64 = 1 << 0;

/// Linear core index from the MPIDR affinity fields.
#[inline(always)]
pub fn core_pos(cores_per_cluster: usize) -> usize {
    let cluster = MPIDR_EL1.read(MPIDR_EL1::Aff1) as usize;
    let core = MPIDR_EL1.read(MPIDR_EL1::Aff0) as usize;
    cluster * cores_per_cluster + core
}

pub fn rme_present() -> bool {
    let pfr0: u64;
    // SAFETY: reading an ID register has no side effects.
    unsafe { asm!("mrs {}, id_aa64pfr0_el1", out(reg) pfr0) };
    (pfr0 >> ID_AA64PFR0_EL1_RME_SHIFT) & ID_AA64PFR0_EL1_RME_MASK != 0
}

/// The secure EL1 physical timer, accessed from EL3.
pub struct SecurePhysicalTimer;

impl SecureTimer for SecurePhysicalTimer {
    fn counter(&self) -> u64 {
        CNTPCT_EL0.get()
    }

    fn frequency(&self) -> u64 {
        CNTFRQ_EL0.get()
    }

    fn arm(&self, cval: u64) {
        // SAFETY: CNTPS_* are only touched by EL3.
        unsafe {
            asm!("msr cntps_cval_el1, {}", in(reg) cval);
            asm!("msr cntps_ctl_el1, {}", in(reg) CNTPS_CTL_ENABLE);
            asm!("isb");
        }
    }

    fn disarm(&self) {
        // SAFETY: see `arm`.
        unsafe {
            asm!("msr cntps_ctl_el1, {}", in(reg) 0u64);
            asm!("isb");
        }
    }
}

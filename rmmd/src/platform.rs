//! Collaborators the dispatcher relies on but does not implement.
//!
//! A board crate implements these traits on top of its GPT library,
//! attestation backend, GIC driver and context management trampolines and
//! hands the result to `Rmmd::new`.

use crate::context::{El2Sysregs, EntryPointInfo};
use crate::rmm_el3::El3Error;

use core::sync::atomic::AtomicU64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GptError {
    /// The address is not covered by the GPT or not granule aligned.
    InvalidAddress,
    /// The granule is not in the PAS the transition starts from.
    Permission,
}

/// Granule protection table transitions between the NS and Realm PAS.
pub trait Gpt {
    fn delegate(&self, pa: u64, size: usize) -> Result<(), GptError>;
    fn undelegate(&self, pa: u64, size: usize) -> Result<(), GptError>;
}

pub trait Attestation {
    /// Writes the platform token for a challenge of `challenge_size` bytes
    /// already placed at `buf_pa`. Returns the number of bytes written and
    /// the number still pending.
    fn platform_token(
        &self,
        buf_pa: u64,
        buf_size: usize,
        challenge_size: usize,
    ) -> Result<(usize, usize), El3Error>;

    /// Writes the realm attestation private key for `curve` to `buf_pa`.
    fn realm_attest_key(
        &self,
        buf_pa: u64,
        buf_size: usize,
        curve: u64,
    ) -> Result<usize, El3Error>;

    /// Serves one RMM_EL3_TOKEN_SIGN operation.
    fn token_sign(
        &self,
        _op: u64,
        _buf_pa: u64,
        _buf_size: usize,
        _curve: u64,
    ) -> Result<usize, El3Error> {
        Err(El3Error::Unknown)
    }
}

pub trait InterruptController {
    /// Reads the interrupt acknowledge register.
    fn acknowledge(&self) -> u32;
    fn end_of_interrupt(&self, id: u32);
    /// Routes `id` to EL3 with `priority` and enables it on this core.
    fn enable_el3_interrupt(&self, id: u32, priority: u8);
}

/// The secure physical timer and the system counter.
pub trait SecureTimer {
    fn counter(&self) -> u64;
    fn frequency(&self) -> u64;
    /// Fires once the counter reaches `cval`.
    fn arm(&self, cval: u64);
    fn disarm(&self);
}

/// Save/restore trampolines around a world switch.
pub trait ContextCapsule {
    fn save_el2_sysregs(&self, regs: &mut El2Sysregs);
    fn restore_el2_sysregs(&self, regs: &El2Sysregs);

    /// Stores the callee-saved registers of the current C runtime at
    /// `c_rt_ctx`, performs the exception return into this core's Realm
    /// context and comes back with the value of the matching synchronous
    /// exit.
    ///
    /// # Safety
    ///
    /// The Realm context of this core must be initialised and EL2 system
    /// registers for the Realm world must be live.
    unsafe fn rmm_enter(&self, c_rt_ctx: &AtomicU64) -> u64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedBuffer {
    pub base: u64,
    pub size: usize,
}

pub trait Platform:
    Gpt + Attestation + InterruptController + SecureTimer + ContextCapsule + Send + Sync
{
    /// Linear index of the calling core.
    fn core_pos(&self) -> usize;
    fn rme_present(&self) -> bool;
    /// Entry point of the RMM image as left by the loader.
    fn realm_entry_point(&self) -> Option<EntryPointInfo>;
    fn shared_buffer(&self) -> SharedBuffer;
    /// Lays the boot manifest into the shared buffer.
    fn load_manifest(&self, buf: &SharedBuffer) -> Result<(), i32>;
}

use crate::context::{El2Sysregs, EntryPointInfo};
use crate::platform::{
    Attestation, ContextCapsule, Gpt, GptError, InterruptController, Platform, SecureTimer,
    SharedBuffer,
};
use crate::rmi::{REALM_CREATE, REQ_COMPLETE};
use crate::rmm_el3::{El3Error, BOOT_COMPLETE, GTSI_DELEGATE, GTSI_UNDELEGATE};
use crate::smc::{Next, SmcFlags, World};
use crate::Rmmd;

use core::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use spin::mutex::{Mutex, MutexGuard};
use std::boxed::Box;
use std::sync::Arc;
use std::vec::Vec;

pub const MOCK_RMM_ENTRY: u64 = 0xFFC0_0000;
pub const MOCK_SHARED_BUF: u64 = 0xFFBF_F000;
pub const MOCK_TOKEN_LEN: usize = 0x4a0;
pub const MOCK_KEY_LEN: usize = 48;
pub const ATTEST_KEY_CURVE_ECC_SECP384R1: u64 = 0;

type RmmEntryHook = Box<dyn Fn() -> u64 + Send + Sync>;

/// A platform that records what the dispatcher asks of it.
///
/// The counter runs at 1Hz so deadlines read as seconds.
pub struct MockPlatform {
    pub rme: bool,
    pub entry: Option<EntryPointInfo>,
    pub manifest_rc: i32,
    core: AtomicUsize,
    counter: AtomicU64,
    pending_irq: AtomicU32,
    eois: Mutex<Vec<u32>>,
    enabled_irqs: Mutex<Vec<(u32, u8)>>,
    armed: Mutex<Option<u64>>,
    live_el2: Mutex<El2Sysregs>,
    gpt_result: Mutex<Result<(), GptError>>,
    gpt_calls: Mutex<Vec<(u32, u64)>>,
    rmm: Mutex<Option<RmmEntryHook>>,
    entries: AtomicUsize,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            rme: true,
            entry: Some(EntryPointInfo {
                pc: MOCK_RMM_ENTRY,
                spsr: 0x3c9,
                args: [0; 8],
            }),
            manifest_rc: 0,
            core: AtomicUsize::new(0),
            counter: AtomicU64::new(0),
            pending_irq: AtomicU32::new(crate::config::EL3_TIMER_IRQ),
            eois: Mutex::new(Vec::new()),
            enabled_irqs: Mutex::new(Vec::new()),
            armed: Mutex::new(None),
            live_el2: Mutex::new(El2Sysregs::default()),
            gpt_result: Mutex::new(Ok(())),
            gpt_calls: Mutex::new(Vec::new()),
            rmm: Mutex::new(None),
            entries: AtomicUsize::new(0),
        }
    }

    pub fn without_rme() -> Self {
        Self {
            rme: false,
            ..Self::new()
        }
    }

    /// Installs what the RMM does when it is entered synchronously.
    pub fn on_rmm_entry<F>(&self, f: F)
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        *self.rmm.lock() = Some(Box::new(f));
    }

    pub fn set_core(&self, core: usize) {
        self.core.store(core, Ordering::Relaxed);
    }

    pub fn set_counter(&self, now: u64) {
        self.counter.store(now, Ordering::Relaxed);
    }

    pub fn set_pending_irq(&self, id: u32) {
        self.pending_irq.store(id, Ordering::Relaxed);
    }

    pub fn set_gpt_result(&self, result: Result<(), GptError>) {
        *self.gpt_result.lock() = result;
    }

    pub fn live_el2(&self) -> MutexGuard<'_, El2Sysregs> {
        self.live_el2.lock()
    }

    pub fn armed(&self) -> Option<u64> {
        *self.armed.lock()
    }

    pub fn eois(&self) -> Vec<u32> {
        self.eois.lock().clone()
    }

    pub fn enabled_irqs(&self) -> Vec<(u32, u8)> {
        self.enabled_irqs.lock().clone()
    }

    pub fn gpt_calls(&self) -> Vec<(u32, u64)> {
        self.gpt_calls.lock().clone()
    }

    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpt for MockPlatform {
    fn delegate(&self, pa: u64, _size: usize) -> Result<(), GptError> {
        self.gpt_calls.lock().push((GTSI_DELEGATE, pa));
        *self.gpt_result.lock()
    }

    fn undelegate(&self, pa: u64, _size: usize) -> Result<(), GptError> {
        self.gpt_calls.lock().push((GTSI_UNDELEGATE, pa));
        *self.gpt_result.lock()
    }
}

impl Attestation for MockPlatform {
    fn platform_token(
        &self,
        _buf_pa: u64,
        buf_size: usize,
        _challenge_size: usize,
    ) -> Result<(usize, usize), El3Error> {
        if buf_size < MOCK_TOKEN_LEN {
            return Err(El3Error::NoMemory);
        }
        Ok((MOCK_TOKEN_LEN, 0))
    }

    fn realm_attest_key(
        &self,
        _buf_pa: u64,
        buf_size: usize,
        curve: u64,
    ) -> Result<usize, El3Error> {
        if curve != ATTEST_KEY_CURVE_ECC_SECP384R1 {
            return Err(El3Error::Invalid);
        }
        if buf_size < MOCK_KEY_LEN {
            return Err(El3Error::NoMemory);
        }
        Ok(MOCK_KEY_LEN)
    }

    fn token_sign(
        &self,
        op: u64,
        _buf_pa: u64,
        buf_size: usize,
        _curve: u64,
    ) -> Result<usize, El3Error> {
        match op {
            1..=3 if buf_size >= MOCK_KEY_LEN => Ok(MOCK_KEY_LEN),
            1..=3 => Err(El3Error::NoMemory),
            _ => Err(El3Error::Invalid),
        }
    }
}

impl InterruptController for MockPlatform {
    fn acknowledge(&self) -> u32 {
        self.pending_irq.load(Ordering::Relaxed)
    }

    fn end_of_interrupt(&self, id: u32) {
        self.eois.lock().push(id);
    }

    fn enable_el3_interrupt(&self, id: u32, priority: u8) {
        self.enabled_irqs.lock().push((id, priority));
    }
}

impl SecureTimer for MockPlatform {
    fn counter(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn frequency(&self) -> u64 {
        1
    }

    fn arm(&self, cval: u64) {
        *self.armed.lock() = Some(cval);
    }

    fn disarm(&self) {
        *self.armed.lock() = None;
    }
}

impl ContextCapsule for MockPlatform {
    fn save_el2_sysregs(&self, regs: &mut El2Sysregs) {
        *regs = *self.live_el2.lock();
    }

    fn restore_el2_sysregs(&self, regs: &El2Sysregs) {
        *self.live_el2.lock() = *regs;
    }

    unsafe fn rmm_enter(&self, _c_rt_ctx: &AtomicU64) -> u64 {
        self.entries.fetch_add(1, Ordering::Relaxed);
        match self.rmm.lock().as_ref() {
            Some(rmm) => rmm(),
            None => crate::rmm_el3::BOOT_SUCCESS,
        }
    }
}

impl Platform for MockPlatform {
    fn core_pos(&self) -> usize {
        self.core.load(Ordering::Relaxed)
    }

    fn rme_present(&self) -> bool {
        self.rme
    }

    fn realm_entry_point(&self) -> Option<EntryPointInfo> {
        self.entry
    }

    fn shared_buffer(&self) -> SharedBuffer {
        SharedBuffer {
            base: MOCK_SHARED_BUF,
            size: crate::config::RMM_SHARED_BUFFER_SIZE,
        }
    }

    fn load_manifest(&self, _buf: &SharedBuffer) -> Result<(), i32> {
        match self.manifest_rc {
            0 => Ok(()),
            rc => Err(rc),
        }
    }
}

pub fn rmmd_with(platform: MockPlatform) -> Arc<Rmmd<MockPlatform>> {
    Arc::new(Rmmd::new(platform))
}

/// Makes the RMM answer every synchronous entry with BOOT_COMPLETE(`rc`).
pub fn install_boot_complete(rmmd: &Arc<Rmmd<MockPlatform>>, rc: u64) {
    let weak = Arc::downgrade(rmmd);
    rmmd.platform().on_rmm_entry(move || {
        let Some(rmmd) = weak.upgrade() else {
            return rc;
        };
        let regs = [BOOT_COMPLETE as u64, rc, 0, 0, 0, 0, 0, 0];
        match rmmd.handle_smc(regs, SmcFlags::FROM_REALM) {
            Next::Resume { value, .. } => value,
            next => panic!("BOOT_COMPLETE returned {:?}", next),
        }
    });
}

/// A dispatcher whose RMM cold booted successfully on core 0.
pub fn booted() -> Arc<Rmmd<MockPlatform>> {
    let rmmd = rmmd_with(MockPlatform::new());
    rmmd.setup().unwrap();
    install_boot_complete(&rmmd, crate::rmm_el3::BOOT_SUCCESS);
    rmmd.rmm_init().unwrap();
    rmmd
}

pub fn ns_call(rmmd: &Rmmd<MockPlatform>, regs: [u64; 8]) -> Next {
    rmmd.handle_smc(regs, SmcFlags::FROM_NON_SECURE)
}

pub fn realm_call(rmmd: &Rmmd<MockPlatform>, regs: [u64; 8]) -> Next {
    rmmd.handle_smc(regs, SmcFlags::FROM_REALM)
}

pub fn ns_regs(rmmd: &Rmmd<MockPlatform>) -> [u64; 8] {
    rmmd.cpu_state().context(World::NonSecure).gpregs.smc_regs()
}

pub fn realm_regs(rmmd: &Rmmd<MockPlatform>) -> [u64; 8] {
    rmmd.cpu_state().context(World::Realm).gpregs.smc_regs()
}

/// Host creates realm `rd` and the RMM answers with `status`.
pub fn create_realm(rmmd: &Rmmd<MockPlatform>, rd: u64, status: u64) {
    let params = rd + 0x1000;
    assert_eq!(
        ns_call(rmmd, [REALM_CREATE as u64, rd, params, 0, 0, 0, 0, 0]),
        Next::Eret(World::Realm)
    );
    assert_eq!(
        realm_call(rmmd, [REQ_COMPLETE as u64, status, 0, 0, 0, 0, 0, 0]),
        Next::Eret(World::NonSecure)
    );
}

/// Lets the counter reach `now` and takes the timer interrupt from `world`.
pub fn fire_timer(rmmd: &Rmmd<MockPlatform>, now: u64, world: World) -> Next {
    rmmd.platform().set_counter(now);
    rmmd.el3_timer_handler(world)
}

pub const NUM_OF_CPU: usize = 8;

pub const PAGE_BITS: usize = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_BITS; // 4KiB
pub const GRANULE_SIZE: usize = PAGE_SIZE;

/// Size of the buffer shared with the RMM for manifest and attestation data.
pub const RMM_SHARED_BUFFER_SIZE: usize = PAGE_SIZE;

pub const RMM_EL3_IFC_VERSION_MAJOR: u64 = 0;
pub const RMM_EL3_IFC_VERSION_MINOR: u64 = 2;
pub const RMM_EL3_INTERFACE_VERSION: u64 =
    (RMM_EL3_IFC_VERSION_MAJOR << 16) | RMM_EL3_IFC_VERSION_MINOR;

pub const SMCCC_1_3_SVE_HINT: u64 = 1 << 16;

pub const MAX_REALM_NUMS: usize = 10;

/// Time left to a freshly created realm before its retention value is asked.
pub const RPV_GUARD_SECONDS: u64 = 2;
/// Retention used when a realm reports none.
pub const REALM_DESTROY_TIMER_SECONDS: u64 = 30;
/// Backoff when a deadline expires while the Normal world is not running.
pub const TIMER_RETRY_MS: u64 = 10;

/// Secure physical timer PPI.
pub const EL3_TIMER_IRQ: u32 = 29;
pub const GIC_HIGHEST_SEC_PRIORITY: u8 = 0x00;

crate::const_assert_eq!(RMM_SHARED_BUFFER_SIZE % GRANULE_SIZE, 0);

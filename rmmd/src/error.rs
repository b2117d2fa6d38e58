#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The realm registry holds `MAX_REALM_NUMS` records already.
    CapacityExceeded,
    /// A realm descriptor address of 0 never names a realm.
    NullDescriptor,
    /// The CPU does not implement FEAT_RME.
    RmeNotPresent,
    /// No RMM image or a null entry point was handed over by the loader.
    NoRmmImage,
    ManifestLoad(i32),
    /// The RMM reported a non-zero status through BOOT_COMPLETE.
    RmmBoot(u64),
    /// A previous boot step failed on some core.
    BootFailed,
}

pub type Result<T> = core::result::Result<T, Error>;

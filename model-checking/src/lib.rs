#[cfg(kani)]
mod common;
#[cfg(all(kani, feature = "mc_boot"))]
mod boot;
#[cfg(all(kani, feature = "mc_lifecycle"))]
mod lifecycle;
#[cfg(all(kani, feature = "mc_registry"))]
mod registry;
#[cfg(all(kani, feature = "mc_smc_dispatch"))]
mod smc_dispatch;

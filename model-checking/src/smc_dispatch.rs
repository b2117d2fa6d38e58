use crate::common::{any_flags_from, any_rmi_regs};
use islet_rmmd::smc::{Next, World, SMC_UNK};
use islet_rmmd::test_utils::*;

#[kani::proof]
#[kani::unwind(9)]
fn verify_secure_rmi_rejected() {
    let rmmd = booted();
    let regs = any_rmi_regs();
    let flags = any_flags_from(World::Secure);
    let realm_pre = realm_regs(&rmmd);

    let next = rmmd.handle_smc(regs, flags);

    kani::cover!();
    assert!(next == Next::Eret(World::Secure));
    assert!(rmmd.cpu_state().context(World::Secure).gpregs.registers[0] == SMC_UNK);
    assert!(realm_regs(&rmmd) == realm_pre);
}

#[kani::proof]
#[kani::unwind(9)]
fn verify_ns_rmi_forwarded() {
    let rmmd = booted();
    let regs = any_rmi_regs();
    let flags = any_flags_from(World::NonSecure);

    let next = rmmd.handle_smc(regs, flags);
    let forwarded = realm_regs(&rmmd);

    kani::cover!();
    assert!(next == Next::Eret(World::Realm));
    assert!(forwarded[1..] == regs[1..]);
    assert!(forwarded[0] & !(1 << 16) == regs[0] & !(1 << 16));
}

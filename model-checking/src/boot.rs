use crate::common::any_flags_from;
use islet_rmmd::smc::{Next, World, SMC_UNK};
use islet_rmmd::test_utils::*;

#[kani::proof]
#[kani::unwind(9)]
fn verify_failed_boot_rejects_everything() {
    let rmmd = rmmd_with(MockPlatform::without_rme());
    let _ = rmmd.setup();

    let regs: [u64; 8] = kani::any();
    let fid = regs[0] as u32;
    kani::assume(
        islet_rmmd::rmi::is_rmi_fid(fid) || islet_rmmd::rmm_el3::is_rmm_el3_fid(fid),
    );
    let world: bool = kani::any();
    let world = if world { World::NonSecure } else { World::Realm };
    let flags = any_flags_from(world);

    let next = rmmd.handle_smc(regs, flags);

    kani::cover!();
    assert!(next == Next::Eret(world));
    assert!(rmmd.cpu_state().context(world).gpregs.registers[0] == SMC_UNK);
}

use islet_rmmd::rmi;
use islet_rmmd::smc::{SmcFlags, World};

/// Symbolic x0..x7 whose function id is in the RMI range.
pub fn any_rmi_regs() -> [u64; 8] {
    let regs: [u64; 8] = kani::any();
    kani::assume(rmi::is_rmi_fid(regs[0] as u32));
    regs
}

/// Symbolic flags of a caller in `world`.
pub fn any_flags_from(world: World) -> SmcFlags {
    let flags = SmcFlags::from_bits_retain(kani::any());
    kani::assume(flags.world() == world);
    flags
}

#![no_main]

use islet_rmmd::rmm_el3::{BOOT_COMPLETE, FNUM_MAX, FNUM_MIN};
use islet_rmmd::smc::{Next, SmcFlags, World};
use islet_rmmd::test_utils::*;

use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Debug, arbitrary::Arbitrary)]
struct RmmEl3Fuzz {
    offset: u8,
    args: [u64; 7],
}

fuzz_target!(|data: RmmEl3Fuzz| {
    let rmmd = booted();
    let fid = FNUM_MIN + data.offset as u32 % (FNUM_MAX - FNUM_MIN + 1);
    if fid == BOOT_COMPLETE {
        return;
    }

    let mut regs = [0u64; 8];
    regs[0] = fid as u64;
    regs[1..].copy_from_slice(&data.args);

    let next = rmmd.handle_smc(regs, SmcFlags::FROM_REALM);
    assert_eq!(next, Next::Eret(World::Realm));
});

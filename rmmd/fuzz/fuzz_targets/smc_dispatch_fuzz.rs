#![no_main]

use islet_rmmd::rmi;
use islet_rmmd::rmm_el3::BOOT_COMPLETE;
use islet_rmmd::smc::{Next, SmcFlags, World, SMC_UNK};
use islet_rmmd::test_utils::*;

use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Debug, arbitrary::Arbitrary)]
struct SmcFuzz {
    calls: Vec<(u32, [u64; 7], u64)>,
}

fuzz_target!(|data: SmcFuzz| {
    let rmmd = booted();

    for (fid, args, flags) in data.calls.iter().take(64) {
        let flags = SmcFlags::from_bits_retain(*flags);
        let world = flags.world();
        // Halting on a stray BOOT_COMPLETE is intended.
        if *fid == BOOT_COMPLETE && world == World::Realm {
            continue;
        }

        let mut regs = [0u64; 8];
        regs[0] = *fid as u64;
        regs[1..].copy_from_slice(args);

        let next = rmmd.handle_smc(regs, flags);
        assert!(matches!(next, Next::Eret(_)));

        if world == World::Secure {
            assert_eq!(next, Next::Eret(World::Secure));
            assert_eq!(
                rmmd.cpu_state().context(World::Secure).gpregs.registers[0],
                SMC_UNK
            );
        }
        if world == World::NonSecure && rmi::is_rmi_fid(*fid) {
            assert_eq!(next, Next::Eret(World::Realm));
        }
    }
});

//! Services EL3 offers to the RMM.

pub mod features;

use crate::config::GRANULE_SIZE;
use crate::platform::{GptError, Platform};
use crate::smc::{Next, SmcFlags, World};
use crate::Rmmd;

use tinyvec::{array_vec, ArrayVec};

define_interface! {
    command {
        GTSI_DELEGATE = 0xc400_01b0,
        GTSI_UNDELEGATE = 0xc400_01b1,
        ATTEST_GET_REALM_KEY = 0xc400_01b2,
        ATTEST_GET_PLAT_TOKEN = 0xc400_01b3,
        EL3_FEATURES = 0xc400_01b4,
        EL3_TOKEN_SIGN = 0xc400_01b5,
        BOOT_COMPLETE = 0xc400_01cf,
    }
}

pub const FNUM_MIN: u32 = GTSI_DELEGATE;
pub const FNUM_MAX: u32 = BOOT_COMPLETE;

pub const BOOT_SUCCESS: u64 = 0;

pub const SUCCESS: u64 = 0;

pub fn is_rmm_el3_fid(fid: u32) -> bool {
    (FNUM_MIN..=FNUM_MAX).contains(&fid)
}

/// Result codes of the RMM-EL3 interface other than `E_RMM_OK`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum El3Error {
    Unknown,
    BadAddress,
    BadPas,
    NoMemory,
    Invalid,
}

impl From<El3Error> for i64 {
    fn from(err: El3Error) -> Self {
        match err {
            El3Error::Unknown => -1,
            El3Error::BadAddress => -2,
            El3Error::BadPas => -3,
            El3Error::NoMemory => -4,
            El3Error::Invalid => -5,
        }
    }
}

impl From<El3Error> for u64 {
    fn from(err: El3Error) -> Self {
        i64::from(err) as u64
    }
}

impl From<GptError> for El3Error {
    fn from(err: GptError) -> Self {
        match err {
            GptError::InvalidAddress => El3Error::BadAddress,
            GptError::Permission => El3Error::BadPas,
        }
    }
}

fn code<T>(result: &Result<T, El3Error>) -> u64 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => (*e).into(),
    }
}

impl<P: Platform> Rmmd<P> {
    pub(crate) fn rmm_el3_handler(&self, regs: [u64; 8], flags: SmcFlags) -> Next {
        let fid = regs[0] as u32;
        let [_, x1, x2, x3, ..] = regs;

        if self.boot_failed() {
            warn!("RMMD: Failed to boot up RMM. Ignoring RMM-EL3 call");
            return self.reject(flags);
        }
        if flags.world() != World::Realm {
            warn!("RMMD: RMM-EL3 call originated from secure or normal world");
            return self.reject(flags);
        }
        trace!("RMMD: {} x1=0x{:x} x2=0x{:x} x3=0x{:x}", to_str(fid), x1, x2, x3);

        let ret: ArrayVec<[u64; 3]> = match fid {
            GTSI_DELEGATE => {
                let rc = self.gtsi(fid, x1, |pa| self.platform.delegate(pa, GRANULE_SIZE));
                array_vec!([u64; 3] => rc)
            }
            GTSI_UNDELEGATE => {
                let rc = self.gtsi(fid, x1, |pa| self.platform.undelegate(pa, GRANULE_SIZE));
                array_vec!([u64; 3] => rc)
            }
            ATTEST_GET_PLAT_TOKEN => {
                let res = self
                    .platform
                    .platform_token(x1, x2 as usize, x3 as usize);
                let (len, remaining) = res.unwrap_or((0, 0));
                array_vec!([u64; 3] => code(&res), len as u64, remaining as u64)
            }
            ATTEST_GET_REALM_KEY => {
                let res = self.platform.realm_attest_key(x1, x2 as usize, x3);
                array_vec!([u64; 3] => code(&res), res.unwrap_or(0) as u64)
            }
            EL3_FEATURES => match features::read(x1) {
                Ok(value) => array_vec!([u64; 3] => SUCCESS, value),
                Err(e) => array_vec!([u64; 3] => u64::from(e)),
            },
            #[cfg(feature = "token_sign")]
            EL3_TOKEN_SIGN => {
                let res = self.platform.token_sign(x1, x2, x3 as usize, regs[4]);
                array_vec!([u64; 3] => code(&res), res.unwrap_or(0) as u64)
            }
            BOOT_COMPLETE => {
                trace!("RMMD: running rmmd_rmm_sync_exit");
                return self.sync_exit(x1);
            }
            _ => {
                warn!("RMMD: Unsupported RMM-EL3 call 0x{:08x}", fid);
                array_vec!([u64; 3] => crate::smc::SMC_UNK)
            }
        };

        self.cpu_state()
            .context_mut(World::Realm)
            .gpregs
            .write_return_value(&ret);
        Next::Eret(World::Realm)
    }

    fn gtsi<F>(&self, fid: u32, pa: u64, transition: F) -> u64
    where
        F: FnOnce(u64) -> Result<(), GptError>,
    {
        match transition(pa) {
            Ok(()) => SUCCESS,
            Err(e) => {
                error!("RMMD: {} failed for 0x{:x}: {:?}", to_str(fid), pa, e);
                El3Error::from(e).into()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::smc::SMC_UNK;
    use crate::test_utils::*;

    const PA: u64 = 0x8800_0000;

    fn e(err: El3Error) -> u64 {
        err.into()
    }

    #[test]
    fn result_codes() {
        assert_eq!(e(El3Error::Unknown), u64::MAX);
        assert_eq!(e(El3Error::Invalid) as i64, -5);
        assert_eq!(El3Error::from(GptError::InvalidAddress), El3Error::BadAddress);
        assert_eq!(El3Error::from(GptError::Permission), El3Error::BadPas);
    }

    #[test]
    fn delegate_success() {
        let rmmd = booted();
        let next = realm_call(&rmmd, [GTSI_DELEGATE as u64, PA, 0, 0, 0, 0, 0, 0]);

        assert_eq!(next, Next::Eret(World::Realm));
        assert_eq!(realm_regs(&rmmd)[0], SUCCESS);
        assert_eq!(rmmd.platform().gpt_calls(), [(GTSI_DELEGATE, PA)]);
    }

    #[test]
    fn gpt_errors_are_mapped() {
        let rmmd = booted();

        rmmd.platform().set_gpt_result(Err(GptError::InvalidAddress));
        realm_call(&rmmd, [GTSI_DELEGATE as u64, PA, 0, 0, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::BadAddress));

        rmmd.platform().set_gpt_result(Err(GptError::Permission));
        realm_call(&rmmd, [GTSI_UNDELEGATE as u64, PA, 0, 0, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::BadPas));
    }

    #[test]
    fn only_realm_may_call() {
        let rmmd = booted();
        for flags in [SmcFlags::FROM_NON_SECURE, SmcFlags::FROM_SECURE] {
            let next = rmmd.handle_smc([GTSI_DELEGATE as u64, PA, 0, 0, 0, 0, 0, 0], flags);
            let world = flags.world();
            assert_eq!(next, Next::Eret(world));
            assert_eq!(
                rmmd.cpu_state().context(world).gpregs.registers[0],
                SMC_UNK
            );
        }
        assert!(rmmd.platform().gpt_calls().is_empty());
    }

    #[test]
    fn unknown_after_failed_boot() {
        let rmmd = rmmd_with(MockPlatform::without_rme());
        assert!(rmmd.setup().is_err());

        realm_call(&rmmd, [GTSI_DELEGATE as u64, PA, 0, 0, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], SMC_UNK);
        assert!(rmmd.platform().gpt_calls().is_empty());
    }

    #[test]
    fn platform_token() {
        let rmmd = booted();
        realm_call(&rmmd, [ATTEST_GET_PLAT_TOKEN as u64, PA, 0x1000, 64, 0, 0, 0, 0]);
        assert_eq!(&realm_regs(&rmmd)[..3], &[SUCCESS, MOCK_TOKEN_LEN as u64, 0]);

        realm_call(&rmmd, [ATTEST_GET_PLAT_TOKEN as u64, PA, 0x10, 64, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::NoMemory));
    }

    #[test]
    fn realm_key() {
        let rmmd = booted();
        realm_call(&rmmd, [ATTEST_GET_REALM_KEY as u64, PA, 0x1000, 0, 0, 0, 0, 0]);
        assert_eq!(&realm_regs(&rmmd)[..2], &[SUCCESS, MOCK_KEY_LEN as u64]);

        realm_call(&rmmd, [ATTEST_GET_REALM_KEY as u64, PA, 0x1000, 7, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::Invalid));
    }

    #[test]
    fn features_register() {
        let rmmd = booted();
        realm_call(&rmmd, [EL3_FEATURES as u64, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&realm_regs(&rmmd)[..2], &[SUCCESS, features::feat_reg0()]);

        realm_call(&rmmd, [EL3_FEATURES as u64, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::Invalid));
    }

    #[cfg(not(feature = "token_sign"))]
    #[test]
    fn token_sign_disabled() {
        let rmmd = booted();
        realm_call(&rmmd, [EL3_TOKEN_SIGN as u64, 1, PA, 0x1000, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], SMC_UNK);
    }

    #[cfg(feature = "token_sign")]
    #[test]
    fn token_sign_enabled() {
        let rmmd = booted();
        realm_call(&rmmd, [EL3_TOKEN_SIGN as u64, 3, PA, 0x1000, 0, 0, 0, 0]);
        assert_eq!(&realm_regs(&rmmd)[..2], &[SUCCESS, MOCK_KEY_LEN as u64]);

        realm_call(&rmmd, [EL3_TOKEN_SIGN as u64, 9, PA, 0x1000, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], e(El3Error::Invalid));
    }

    #[test]
    fn unassigned_fid_is_unknown() {
        let rmmd = booted();
        realm_call(&rmmd, [0xc400_01c0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(realm_regs(&rmmd)[0], SMC_UNK);
    }

    #[test]
    #[should_panic(expected = "without a pending entry")]
    fn boot_complete_outside_boot_halts() {
        let rmmd = booted();
        realm_call(&rmmd, [BOOT_COMPLETE as u64, 0, 0, 0, 0, 0, 0, 0]);
    }
}

//! Bringing the RMM up.
//!
//! `setup` runs once on the primary core before any SMC is served. The
//! cold boot of the RMM (`rmm_init`) follows on the same core and every
//! secondary core warm boots it from `cpu_on_finish`. Any failure is sticky:
//! from then on both SMC ranges answer `SMC_UNK`.

use crate::config::{NUM_OF_CPU, RMM_EL3_INTERFACE_VERSION};
use crate::context::EntryPointInfo;
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::rmm_el3::BOOT_SUCCESS;
use crate::Rmmd;

impl<P: Platform> Rmmd<P> {
    pub fn setup(&self) -> Result<()> {
        let res = self.prepare();
        if let Err(e) = res {
            self.mark_boot_failed();
            error!("RMMD: setup failed: {:?}", e);
        }
        res
    }

    fn prepare(&self) -> Result<()> {
        if !self.platform.rme_present() {
            error!("RMMD: RME is not supported by the CPU");
            return Err(Error::RmeNotPresent);
        }

        let ep = match self.platform.realm_entry_point() {
            Some(ep) if ep.pc != 0 => ep,
            _ => {
                warn!("RMMD: RMM image not found. RMM calls will return SMC_UNK");
                return Err(Error::NoRmmImage);
            }
        };

        let buf = self.platform.shared_buffer();
        self.platform.load_manifest(&buf).map_err(|rc| {
            error!("RMMD: Failed to load boot manifest: {}", rc);
            Error::ManifestLoad(rc)
        })?;

        let ep = self.entry_point.call_once(|| ep);
        let mut args = [0; 8];
        args[0] = self.core_pos() as u64;
        args[1] = RMM_EL3_INTERFACE_VERSION;
        args[2] = NUM_OF_CPU as u64;
        args[3] = buf.base;
        self.cpu_state().init_realm(&EntryPointInfo { args, ..*ep });

        self.timer_init();
        Ok(())
    }

    /// Cold boots the RMM on the primary core.
    pub fn rmm_init(&self) -> Result<()> {
        if self.boot_failed() {
            return Err(Error::BootFailed);
        }
        info!("RMMD: RMM init start");
        self.boot_rmm()?;
        info!("RMMD: RMM init end");
        Ok(())
    }

    /// Warm boots the RMM on a core that was just powered on.
    pub fn cpu_on_finish(&self) -> Result<()> {
        if self.boot_failed() {
            return Err(Error::BootFailed);
        }
        let ep = self.entry_point.get().ok_or(Error::BootFailed)?;

        let mut args = [0; 8];
        args[0] = self.core_pos() as u64;
        self.cpu_state().init_realm(&EntryPointInfo { args, ..*ep });

        self.timer_init();
        self.boot_rmm()
    }

    fn boot_rmm(&self) -> Result<()> {
        let rc = self.sync_entry();
        if rc != BOOT_SUCCESS {
            error!("RMMD: RMM boot failed on CPU{}: {}", self.core_pos(), rc);
            self.mark_boot_failed();
            return Err(Error::RmmBoot(rc));
        }
        Ok(())
    }
}

use crate::config::SMCCC_1_3_SVE_HINT;
use crate::context::{InFlight, Origin};
use crate::platform::Platform;
use crate::smc::{Next, SmcFlags, World};
use crate::Rmmd;

define_interface! {
    command {
        VERSION = 0xc400_0150,
        GRANULE_DELEGATE = 0xc400_0151,
        GRANULE_UNDELEGATE = 0xc400_0152,
        DATA_CREATE = 0xc400_0153,
        DATA_CREATE_UNKNOWN = 0xc400_0154,
        DATA_DESTROY = 0xc400_0155,
        REALM_ACTIVATE = 0xc400_0157,
        REALM_CREATE = 0xc400_0158,
        REALM_DESTROY = 0xc400_0159,
        REC_CREATE = 0xc400_015a,
        REC_DESTROY = 0xc400_015b,
        REC_ENTER = 0xc400_015c,
        RTT_CREATE = 0xc400_015d,
        RTT_DESTROY = 0xc400_015e,
        RTT_MAP_UNPROTECTED = 0xc400_015f,
        RTT_READ_ENTRY = 0xc400_0161,
        RTT_UNMAP_UNPROTECTED = 0xc400_0162,
        PSCI_COMPLETE = 0xc400_0164,
        FEATURES = 0xc400_0165,
        RTT_FOLD = 0xc400_0166,
        REC_AUX_COUNT = 0xc400_0167,
        RTT_INIT_RIPAS = 0xc400_0168,
        RTT_SET_RIPAS = 0xc400_0169,
        DATA_DESTROY_ALL = 0xc400_0170,
        RPV_GET = 0xc400_0171,
        REQ_COMPLETE = 0xc400_018f,
    }
}

pub const FNUM_MIN: u32 = VERSION;
pub const FNUM_MAX: u32 = REQ_COMPLETE;

pub const SUCCESS: u64 = 0;

pub fn is_rmi_fid(fid: u32) -> bool {
    (FNUM_MIN..=FNUM_MAX).contains(&fid)
}

impl<P: Platform> Rmmd<P> {
    pub(crate) fn rmi_handler(&self, regs: [u64; 8], flags: SmcFlags) -> Next {
        let fid = regs[0] as u32;

        if self.boot_failed() {
            warn!("RMMD: Failed to boot up RMM. Ignoring RMI call");
            return self.reject(flags);
        }

        match flags.world() {
            World::Secure => {
                warn!("RMMD: RMI invoked by secure world.");
                self.reject(flags)
            }
            World::NonSecure => {
                trace!("RMMD: {} from NS", to_str(fid));
                self.observe(fid, &regs);
                self.forward_to_realm(regs, flags.sve_hint(), Origin::Host)
            }
            World::Realm if fid == REQ_COMPLETE => self.complete(regs, flags),
            World::Realm => {
                warn!("RMMD: Unsupported RMM call 0x{:08x}", fid);
                self.reject(flags)
            }
        }
    }

    /// Hands `regs` to the RMM as the next call to serve on this core.
    pub(crate) fn forward_to_realm(&self, regs: [u64; 8], sve_hint: bool, origin: Origin) -> Next {
        let mut forwarded = regs;
        if sve_hint {
            forwarded[0] |= SMCCC_1_3_SVE_HINT;
        }

        let mut cpu = self.cpu_state();
        if let Some(prev) = cpu.inflight() {
            warn!("RMMD: {} still in flight", to_str(prev.fid));
        }
        cpu.set_inflight(InFlight {
            fid: regs[0] as u32,
            args: regs,
            origin,
        });
        self.switch_world(&mut cpu, World::NonSecure, World::Realm);
        cpu.context_mut(World::Realm)
            .gpregs
            .write_return_value(&forwarded);
        Next::Eret(World::Realm)
    }

    /// REQ_COMPLETE: the RMM finished the call in flight on this core.
    fn complete(&self, regs: [u64; 8], flags: SmcFlags) -> Next {
        let call = self.cpu_state().take_inflight();
        let Some(call) = call else {
            warn!("RMMD: REQ_COMPLETE without a forwarded call");
            return self.reject(flags);
        };
        trace!("RMMD: {} completed with {}", to_str(call.fid), regs[1]);
        self.notify_completion(&call, &regs);

        let mut cpu = self.cpu_state();
        self.switch_world(&mut cpu, World::Realm, World::NonSecure);
        if call.origin == Origin::Host {
            // x1..x5 of the RMM become x0..x4 of the host.
            cpu.context_mut(World::NonSecure)
                .gpregs
                .write_return_value(&regs[1..6]);
        }
        Next::Eret(World::NonSecure)
    }

    fn observe(&self, fid: u32, regs: &[u64; 8]) {
        let rd = regs[1];
        match fid {
            REALM_CREATE => {
                if let Err(e) = self.tracker().on_create_observed(rd) {
                    error!("RMMD: realm 0x{:x} is not tracked: {:?}", rd, e);
                }
            }
            REALM_ACTIVATE => {
                let clock = self.clock();
                let mut tracker = self.tracker();
                tracker.on_activate(rd, clock);
                self.sync_timer(&mut tracker);
            }
            _ => {}
        }
    }

    fn notify_completion(&self, call: &InFlight, regs: &[u64; 8]) {
        let (rd, status) = (call.args[1], regs[1]);
        let clock = self.clock();
        let mut tracker = self.tracker();
        match call.fid {
            REALM_CREATE => tracker.on_create_complete(rd, status, clock),
            // RPV_GET has no status, x1 is the RPV.
            RPV_GET => tracker.on_rpv_complete(rd, regs[1], clock),
            REALM_DESTROY => tracker.on_realm_destroyed(rd, status),
            DATA_DESTROY_ALL if status == SUCCESS => {
                info!("RMMD: realm data of 0x{:x} destroyed", rd);
                return;
            }
            DATA_DESTROY_ALL => {
                error!("RMMD: DATA_DESTROY_ALL of 0x{:x} failed: {}", rd, status);
                return;
            }
            _ => return,
        }
        self.sync_timer(&mut tracker);
    }
}

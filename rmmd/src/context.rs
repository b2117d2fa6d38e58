use crate::smc::World;

/// General purpose registers x0..x30, padded to an even count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct GpRegs {
    pub registers: [u64; 32],
}

impl GpRegs {
    pub fn write_return_value(&mut self, values: &[u64]) {
        self.registers[..values.len()].copy_from_slice(values);
    }

    /// x0..x7, the SMCCC argument and result registers.
    pub fn smc_regs(&self) -> [u64; 8] {
        let mut regs = [0; 8];
        regs.copy_from_slice(&self.registers[..8]);
        regs
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct El3State {
    pub elr_el3: u64,
    pub spsr_el3: u64,
}

/// EL2 system registers banked per world.
///
/// Only the trampoline in the platform layer knows how to move these in and
/// out of the CPU; the dispatcher decides when.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct El2Sysregs {
    pub actlr_el2: u64,
    pub afsr0_el2: u64,
    pub afsr1_el2: u64,
    pub amair_el2: u64,
    pub cnthctl_el2: u64,
    pub cntvoff_el2: u64,
    pub cptr_el2: u64,
    pub elr_el2: u64,
    pub esr_el2: u64,
    pub far_el2: u64,
    pub hacr_el2: u64,
    pub hcr_el2: u64,
    pub hpfar_el2: u64,
    pub hstr_el2: u64,
    pub icc_sre_el2: u64,
    pub ich_hcr_el2: u64,
    pub ich_vmcr_el2: u64,
    pub mair_el2: u64,
    pub mdcr_el2: u64,
    pub sctlr_el2: u64,
    pub spsr_el2: u64,
    pub sp_el2: u64,
    pub tcr_el2: u64,
    pub tpidr_el2: u64,
    pub ttbr0_el2: u64,
    pub vbar_el2: u64,
    pub vmpidr_el2: u64,
    pub vpidr_el2: u64,
    pub vtcr_el2: u64,
    pub vttbr_el2: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CpuContext {
    pub gpregs: GpRegs,
    pub el3_state: El3State,
    pub el2_sysregs: El2Sysregs,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryPointInfo {
    pub pc: u64,
    pub spsr: u64,
    pub args: [u64; 8],
}

/// Who asked for the call that is currently executing in the RMM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Issued by the Normal world and forwarded on its behalf.
    Host,
    /// Injected by the dispatcher from the realm destruction timer.
    Lifecycle,
}

/// A forwarded call whose REQ_COMPLETE has not been seen yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InFlight {
    pub fid: u32,
    pub args: [u64; 8],
    pub origin: Origin,
}

/// State of one physical core.
#[derive(Debug)]
pub struct CpuState {
    contexts: [CpuContext; World::COUNT],
    next: Option<World>,
    inflight: Option<InFlight>,
}

impl CpuState {
    pub const fn new() -> Self {
        const EMPTY: CpuContext = CpuContext {
            gpregs: GpRegs { registers: [0; 32] },
            el3_state: El3State {
                elr_el3: 0,
                spsr_el3: 0,
            },
            el2_sysregs: El2Sysregs {
                actlr_el2: 0,
                afsr0_el2: 0,
                afsr1_el2: 0,
                amair_el2: 0,
                cnthctl_el2: 0,
                cntvoff_el2: 0,
                cptr_el2: 0,
                elr_el2: 0,
                esr_el2: 0,
                far_el2: 0,
                hacr_el2: 0,
                hcr_el2: 0,
                hpfar_el2: 0,
                hstr_el2: 0,
                icc_sre_el2: 0,
                ich_hcr_el2: 0,
                ich_vmcr_el2: 0,
                mair_el2: 0,
                mdcr_el2: 0,
                sctlr_el2: 0,
                spsr_el2: 0,
                sp_el2: 0,
                tcr_el2: 0,
                tpidr_el2: 0,
                ttbr0_el2: 0,
                vbar_el2: 0,
                vmpidr_el2: 0,
                vpidr_el2: 0,
                vtcr_el2: 0,
                vttbr_el2: 0,
            },
        };
        Self {
            contexts: [EMPTY; World::COUNT],
            next: None,
            inflight: None,
        }
    }

    pub fn context(&self, world: World) -> &CpuContext {
        &self.contexts[world.index()]
    }

    pub fn context_mut(&mut self, world: World) -> &mut CpuContext {
        &mut self.contexts[world.index()]
    }

    /// Prepares the Realm context to start executing at `ep`.
    pub fn init_realm(&mut self, ep: &EntryPointInfo) {
        let realm = self.context_mut(World::Realm);
        *realm = CpuContext::default();
        realm.el3_state.elr_el3 = ep.pc;
        realm.el3_state.spsr_el3 = ep.spsr;
        realm.gpregs.write_return_value(&ep.args);
    }

    pub fn realm_initialised(&self) -> bool {
        self.context(World::Realm).el3_state.elr_el3 != 0
    }

    /// Selects the context restored by the next exception return.
    pub fn set_next(&mut self, world: World) {
        self.next = Some(world);
    }

    pub fn next(&self) -> Option<World> {
        self.next
    }

    pub fn inflight(&self) -> Option<&InFlight> {
        self.inflight.as_ref()
    }

    pub fn set_inflight(&mut self, call: InFlight) {
        self.inflight = Some(call);
    }

    pub fn take_inflight(&mut self) -> Option<InFlight> {
        self.inflight.take()
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_return_value_keeps_upper_registers() {
        let mut regs = GpRegs::default();
        regs.registers[5] = 0x55;
        regs.write_return_value(&[1, 2, 3]);
        assert_eq!(&regs.registers[..6], &[1, 2, 3, 0, 0, 0x55]);
    }

    #[test]
    fn init_realm_sets_entry_and_arguments() {
        let mut cpu = CpuState::new();
        assert!(!cpu.realm_initialised());

        let ep = EntryPointInfo {
            pc: 0x1000,
            spsr: 0x3c9,
            args: [7, 0x2, 8, 0xffff_0000, 0, 0, 0, 0],
        };
        cpu.init_realm(&ep);

        let realm = cpu.context(World::Realm);
        assert!(cpu.realm_initialised());
        assert_eq!(realm.el3_state.elr_el3, 0x1000);
        assert_eq!(realm.gpregs.smc_regs(), ep.args);
        assert_eq!(cpu.context(World::NonSecure), &CpuContext::default());
    }
}

use crate::config::SMCCC_1_3_SVE_HINT;

use bitflags::bitflags;

/// Unknown SMC function id, written as -1 in x0.
pub const SMC_UNK: u64 = u64::MAX;

bitflags! {
    /// Flags the runtime service framework passes along with a trapped SMC.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SmcFlags: u64 {
        /// SCR_EL3.NS of the caller.
        const NS = 1 << 0;
        /// SCR_EL3.NSE of the caller.
        const NSE = 1 << 5;
        /// SMCCC v1.3 hint that the caller has no live SVE state.
        const SVE_HINT = SMCCC_1_3_SVE_HINT;
    }
}

impl SmcFlags {
    pub const FROM_SECURE: Self = Self::empty();
    pub const FROM_NON_SECURE: Self = Self::NS;
    pub const FROM_REALM: Self = Self::NS.union(Self::NSE);

    /// Security state of the caller.
    ///
    /// NSE without NS is a reserved encoding and is treated as Secure, which
    /// makes it ineligible for every call this service owns.
    pub fn world(&self) -> World {
        match (self.contains(Self::NS), self.contains(Self::NSE)) {
            (true, true) => World::Realm,
            (true, false) => World::NonSecure,
            _ => World::Secure,
        }
    }

    pub fn sve_hint(&self) -> bool {
        self.contains(Self::SVE_HINT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum World {
    Secure = 0,
    NonSecure = 1,
    Realm = 2,
}

impl World {
    pub const COUNT: usize = 3;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Where the exception-return path goes after a handler finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    /// ERET into the saved context of the given world.
    Eret(World),
    /// Unwind to the C runtime context saved by the pending synchronous
    /// entry and return `value` from it.
    Resume { c_rt_ctx: u64, value: u64 },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn world_from_flags() {
        assert_eq!(SmcFlags::FROM_SECURE.world(), World::Secure);
        assert_eq!(SmcFlags::FROM_NON_SECURE.world(), World::NonSecure);
        assert_eq!(SmcFlags::FROM_REALM.world(), World::Realm);
        assert_eq!(SmcFlags::NSE.world(), World::Secure);
    }

    #[test]
    fn sve_hint_is_independent_of_world() {
        let flags = SmcFlags::FROM_NON_SECURE | SmcFlags::SVE_HINT;
        assert!(flags.sve_hint());
        assert_eq!(flags.world(), World::NonSecure);
        assert!(!SmcFlags::FROM_REALM.sve_hint());
    }
}

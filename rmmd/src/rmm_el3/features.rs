use super::El3Error;

use bitflags::bitflags;

pub const FEAT_REG_0_IDX: u64 = 0;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FeatReg0: u64 {
        /// RMM_EL3_TOKEN_SIGN is served.
        const TOKEN_SIGN = 1 << 0;
    }
}

pub fn feat_reg0() -> u64 {
    let mut reg = FeatReg0::empty();
    if cfg!(feature = "token_sign") {
        reg |= FeatReg0::TOKEN_SIGN;
    }
    reg.bits()
}

/// Reads the RMM-EL3 feature register `idx`.
pub fn read(idx: u64) -> Result<u64, El3Error> {
    match idx {
        FEAT_REG_0_IDX => Ok(feat_reg0()),
        _ => Err(El3Error::Invalid),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_register_zero_exists() {
        assert!(read(FEAT_REG_0_IDX).is_ok());
        assert_eq!(read(1), Err(El3Error::Invalid));
        assert_eq!(read(u64::MAX), Err(El3Error::Invalid));
    }

    #[test]
    fn token_sign_bit_follows_build() {
        let reg = FeatReg0::from_bits_retain(feat_reg0());
        assert_eq!(reg.contains(FeatReg0::TOKEN_SIGN), cfg!(feature = "token_sign"));
    }
}
